//! Synthetic fixture data
//!
//! Generates plausible but entirely made-up earnings events and analyst
//! snapshots for a fixed roster of large caps. Every record is tagged
//! `DataSource::Synthetic`; nothing here is real market data.

use chrono::{Datelike, Duration, NaiveDate};
use rand::Rng;
use serde::Serialize;
use tracing::{info, warn};

use crate::cache::{CacheManager, EVENT_FRESHNESS_HOURS, SNAPSHOT_FRESHNESS_HOURS};
use crate::data::{AnalystSnapshot, DataSource, EarningsEvent, EarningsTime, Recommendation};

/// Seeding is refused above this many cached events unless forced, so a
/// store holding real data is not diluted with fixtures
pub const PROTECTED_EVENT_COUNT: usize = 15;

/// A company in the fixture roster
#[derive(Debug, Clone, Copy, Serialize)]
pub struct Company {
    pub symbol: &'static str,
    pub name: &'static str,
}

/// Companies that already reported (first five) and that report soon (rest)
pub static COMPANIES: [Company; 12] = [
    Company { symbol: "AAPL", name: "Apple Inc." },
    Company { symbol: "MSFT", name: "Microsoft Corp." },
    Company { symbol: "GOOGL", name: "Alphabet Inc." },
    Company { symbol: "AMZN", name: "Amazon.com Inc." },
    Company { symbol: "META", name: "Meta Platforms Inc." },
    Company { symbol: "TSLA", name: "Tesla Inc." },
    Company { symbol: "NVDA", name: "NVIDIA Corp." },
    Company { symbol: "NFLX", name: "Netflix Inc." },
    Company { symbol: "AMD", name: "Advanced Micro Devices" },
    Company { symbol: "INTC", name: "Intel Corp." },
    Company { symbol: "ORCL", name: "Oracle Corp." },
    Company { symbol: "CRM", name: "Salesforce Inc." },
];

const REPORTED_COUNT: usize = 5;

/// Looks up a roster company's display name
pub fn company_name(symbol: &str) -> Option<&'static str> {
    COMPANIES
        .iter()
        .find(|c| c.symbol.eq_ignore_ascii_case(symbol))
        .map(|c| c.name)
}

fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

/// Builds one event per roster company around `today`
///
/// Reported companies get dates in the past fortnight with actuals filled
/// in; upcoming companies get weekly dates from five days out with estimates
/// only.
pub fn generate_events<R: Rng>(rng: &mut R, today: NaiveDate) -> Vec<EarningsEvent> {
    let year = today.year();
    let mut events = Vec::with_capacity(COMPANIES.len());

    for (i, company) in COMPANIES.iter().take(REPORTED_COUNT).enumerate() {
        let date = today - Duration::days(15 - 3 * i as i64);
        let revenue_estimate = f64::from(rng.gen_range(300..=1200_u32)) * 1e8;
        let time = if rng.gen_bool(0.5) {
            EarningsTime::BeforeOpen
        } else {
            EarningsTime::AfterClose
        };

        events.push(
            EarningsEvent::new(company.symbol, company.name, date, format!("Q4 {}", year - 1), year - 1)
                .with_time(time)
                .with_eps(
                    Some(round2(rng.gen_range(1.0..5.0))),
                    Some(round2(rng.gen_range(1.0..5.5))),
                )
                .with_revenue(
                    Some(revenue_estimate),
                    Some((revenue_estimate * rng.gen_range(0.95..1.08)).round()),
                )
                .with_source(DataSource::Synthetic),
        );
    }

    for (i, company) in COMPANIES.iter().skip(REPORTED_COUNT).enumerate() {
        let date = today + Duration::days(5 + 7 * i as i64);
        let time = match rng.gen_range(0..3) {
            0 => EarningsTime::BeforeOpen,
            1 => EarningsTime::AfterClose,
            _ => EarningsTime::DuringHours,
        };

        events.push(
            EarningsEvent::new(company.symbol, company.name, date, format!("Q1 {}", year), year)
                .with_time(time)
                .with_eps(Some(round2(rng.gen_range(0.5..8.0))), None)
                .with_revenue(Some(f64::from(rng.gen_range(250..=1000_u32)) * 1e8), None)
                .with_source(DataSource::Synthetic),
        );
    }

    events
}

/// Builds an analyst snapshot with targets bracketing a random price
pub fn generate_snapshot<R: Rng>(rng: &mut R, symbol: &str) -> AnalystSnapshot {
    let price = rng.gen_range(50.0..500.0);
    let mean = round2(price * rng.gen_range(0.9..1.3));
    let high = round2(price * rng.gen_range(1.1..1.5)).max(mean);
    let low = round2(price * rng.gen_range(0.7..0.9));
    let recommendation = match rng.gen_range(0..3) {
        0 => Recommendation::Buy,
        1 => Recommendation::Hold,
        _ => Recommendation::Sell,
    };

    AnalystSnapshot::new(symbol, round2(price))
        .with_targets(Some(low), Some(mean), Some(high))
        .with_recommendation(recommendation, Some(rng.gen_range(8..=30)))
        .with_source(DataSource::Synthetic)
}

/// Outcome of a seeding run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SeedReport {
    pub events_written: usize,
    /// Events left alone because the cached copy is still fresh
    pub events_fresh: usize,
    pub snapshots_written: usize,
    /// Snapshots left alone because the cached one is still fresh
    pub snapshots_fresh: usize,
    /// True when seeding was refused to protect existing data
    pub protected: bool,
}

/// Controls how `seed` treats data already in the cache
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeedOptions {
    /// Cached events younger than this are not regenerated
    pub event_freshness_hours: u64,
    /// Cached snapshots younger than this are not regenerated
    pub snapshot_freshness_hours: u64,
    /// Seed even when the cache holds more than [`PROTECTED_EVENT_COUNT`] events
    pub force: bool,
}

impl Default for SeedOptions {
    fn default() -> Self {
        Self {
            event_freshness_hours: EVENT_FRESHNESS_HOURS,
            snapshot_freshness_hours: SNAPSHOT_FRESHNESS_HOURS,
            force: false,
        }
    }
}

/// Seeds the cache with synthetic fixtures
///
/// Refuses when the cache already holds more than [`PROTECTED_EVENT_COUNT`]
/// events unless `options.force` is set. An event or snapshot is only
/// regenerated when the cached copy is missing or older than its freshness
/// window.
///
/// # Arguments
/// * `cache` - The cache to write into
/// * `rng` - Source of randomness for the generated values
/// * `today` - Reference date the event calendar is built around
/// * `options` - Freshness windows and the force flag
///
/// # Returns
/// A [`SeedReport`] counting written and skipped records
pub fn seed<R: Rng>(
    cache: &CacheManager,
    rng: &mut R,
    today: NaiveDate,
    options: SeedOptions,
) -> SeedReport {
    let existing = cache.stats().event_count;
    if !options.force && existing > PROTECTED_EVENT_COUNT {
        warn!(
            existing,
            "cache already holds data; skipping synthetic seed (use --force to override)"
        );
        return SeedReport {
            protected: true,
            ..SeedReport::default()
        };
    }

    let mut report = SeedReport::default();

    let mut stale_events = Vec::new();
    for event in generate_events(rng, today) {
        let fresh = cache
            .get_events(Some(&event.symbol), Some(event.earnings_date), Some(event.earnings_date))
            .first()
            .map(|cached| cached.is_fresh(options.event_freshness_hours))
            .unwrap_or(false);
        if fresh {
            report.events_fresh += 1;
        } else {
            stale_events.push(event);
        }
    }
    report.events_written = cache.put_events(&stale_events);

    for company in COMPANIES.iter() {
        let fresh = cache
            .get_snapshot(company.symbol)
            .map(|s| s.is_fresh(options.snapshot_freshness_hours))
            .unwrap_or(false);
        if fresh {
            report.snapshots_fresh += 1;
            continue;
        }
        if cache.put_snapshot(&generate_snapshot(rng, company.symbol)) {
            report.snapshots_written += 1;
        }
    }

    info!(
        events = report.events_written,
        events_fresh = report.events_fresh,
        snapshots = report.snapshots_written,
        snapshots_fresh = report.snapshots_fresh,
        "seeded synthetic fixtures"
    );
    report
}
