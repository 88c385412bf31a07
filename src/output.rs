//! Plain-text rendering of cache contents for the terminal

use std::fmt::Write;

use crate::cache::EventDetail;
use crate::data::{AnalystSnapshot, EarningsEvent};
use crate::synthetic::SeedReport;

/// Formats a currency amount with a B/M/K suffix
pub fn format_money(amount: f64) -> String {
    let abs = amount.abs();
    let sign = if amount < 0.0 { "-" } else { "" };
    if abs >= 1e9 {
        format!("{}${:.2}B", sign, abs / 1e9)
    } else if abs >= 1e6 {
        format!("{}${:.2}M", sign, abs / 1e6)
    } else if abs >= 1e3 {
        format!("{}${:.2}K", sign, abs / 1e3)
    } else {
        format!("{}${:.2}", sign, abs)
    }
}

fn estimate_pair(estimate: Option<f64>, actual: Option<f64>, fmt: impl Fn(f64) -> String) -> String {
    let est = estimate.map(&fmt).unwrap_or_else(|| "-".to_string());
    match actual {
        Some(act) => format!("{} / {}", est, fmt(act)),
        None => est,
    }
}

fn beat_label(event: &EarningsEvent) -> &'static str {
    match event.beat_estimate {
        Some(true) => "beat",
        Some(false) => "miss",
        None => "",
    }
}

/// One line per event; an empty slice renders as a "no data" notice
pub fn format_events(events: &[EarningsEvent]) -> String {
    if events.is_empty() {
        return "No earnings events for this range.".to_string();
    }

    let mut out = String::new();
    for event in events {
        let _ = writeln!(
            out,
            "{}  {:<8} {:<24} {:<8} {:<20} EPS {:<14} Rev {:<22} {:<4} [{}]",
            event.earnings_date,
            event.symbol,
            event.company_name,
            event.quarter,
            event.earnings_time.label(),
            estimate_pair(event.eps_estimate, event.eps_actual, |v| format!("{:.2}", v)),
            estimate_pair(event.revenue_estimate, event.revenue_actual, format_money),
            beat_label(event),
            event.data_source,
        );
    }
    out.truncate(out.trim_end().len());
    out
}

/// Renders a snapshot, or the "no analyst coverage" notice when absent
pub fn format_snapshot(symbol: &str, snapshot: Option<&AnalystSnapshot>) -> String {
    let snapshot = match snapshot {
        Some(s) => s,
        None => return format!("{}: no analyst coverage", symbol.trim().to_uppercase()),
    };

    let mut out = String::new();
    let _ = writeln!(out, "{}  price ${:.2}", snapshot.symbol, snapshot.current_price);
    let target = |v: Option<f64>| v.map(|t| format!("${:.2}", t)).unwrap_or_else(|| "-".to_string());
    let _ = writeln!(
        out,
        "  targets: low {}  mean {}  high {}",
        target(snapshot.target_low),
        target(snapshot.target_mean),
        target(snapshot.target_high)
    );
    if let Some(upside) = snapshot.consensus_upside() {
        let _ = writeln!(out, "  upside to mean: {:+.1}%", upside * 100.0);
    }
    if let Some(rec) = &snapshot.recommendation {
        let analysts = snapshot
            .analyst_count
            .map(|n| format!(" ({} analysts)", n))
            .unwrap_or_default();
        let _ = writeln!(out, "  recommendation: {}{}", rec, analysts);
    }
    let _ = write!(out, "  source: {}", snapshot.data_source);
    out
}

/// Renders an event with its analyst snapshot
pub fn format_detail(detail: &EventDetail) -> String {
    let event = &detail.event;
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{} ({}) - {} {}",
        event.company_name, event.symbol, event.quarter, event.earnings_date
    );
    let _ = writeln!(
        out,
        "  {} - {}",
        event.earnings_time.label(),
        if detail.is_future { "upcoming" } else { "reported" }
    );
    let _ = writeln!(
        out,
        "  EPS: {}",
        estimate_pair(event.eps_estimate, event.eps_actual, |v| format!("{:.2}", v))
    );
    let _ = writeln!(
        out,
        "  Revenue: {}",
        estimate_pair(event.revenue_estimate, event.revenue_actual, format_money)
    );
    if !beat_label(event).is_empty() {
        let _ = writeln!(out, "  Result: {}", beat_label(event));
    }
    out.push_str(&format_snapshot(&event.symbol, detail.snapshot.as_ref()));
    out
}

pub fn format_seed_report(report: &SeedReport) -> String {
    if report.protected {
        return "Cache already holds data; nothing seeded (use --force to override).".to_string();
    }
    format!(
        "Seeded {} synthetic events and {} snapshots ({} events and {} snapshots still fresh).",
        report.events_written, report.snapshots_written, report.events_fresh, report.snapshots_fresh
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{DataSource, EarningsTime, Recommendation};
    use chrono::NaiveDate;

    fn reported_event() -> EarningsEvent {
        let mut event = EarningsEvent::new(
            "AAPL",
            "Apple Inc.",
            NaiveDate::from_ymd_opt(2024, 1, 25).unwrap(),
            "Q1 2024",
            2024,
        )
        .with_time(EarningsTime::AfterClose)
        .with_eps(Some(2.10), Some(2.18))
        .with_revenue(Some(117.5e9), Some(119.6e9))
        .with_source(DataSource::Other("manual_input".to_string()));
        event.beat_estimate = event.derived_beat();
        event
    }

    #[test]
    fn test_format_money_suffixes() {
        assert_eq!(format_money(117.5e9), "$117.50B");
        assert_eq!(format_money(9.73e6), "$9.73M");
        assert_eq!(format_money(1500.0), "$1.50K");
        assert_eq!(format_money(12.0), "$12.00");
        assert_eq!(format_money(-2.5e9), "-$2.50B");
    }

    #[test]
    fn test_format_events_empty_is_notice() {
        assert_eq!(format_events(&[]), "No earnings events for this range.");
    }

    #[test]
    fn test_format_events_line_contents() {
        let rendered = format_events(&[reported_event()]);
        assert!(rendered.starts_with("2024-01-25"));
        assert!(rendered.contains("AAPL"));
        assert!(rendered.contains("2.10 / 2.18"));
        assert!(rendered.contains("$117.50B / $119.60B"));
        assert!(rendered.contains("beat"));
        assert!(rendered.contains("[manual_input]"));
        assert!(!rendered.ends_with('\n'));
    }

    #[test]
    fn test_format_snapshot_absent() {
        assert_eq!(format_snapshot("aapl", None), "AAPL: no analyst coverage");
    }

    #[test]
    fn test_format_snapshot_present() {
        let snapshot = AnalystSnapshot::new("AAPL", 200.0)
            .with_targets(Some(180.0), Some(250.0), Some(280.0))
            .with_recommendation(Recommendation::Buy, Some(25))
            .with_source(DataSource::Synthetic);
        let rendered = format_snapshot("AAPL", Some(&snapshot));
        assert!(rendered.contains("price $200.00"));
        assert!(rendered.contains("mean $250.00"));
        assert!(rendered.contains("+25.0%"));
        assert!(rendered.contains("buy (25 analysts)"));
        assert!(rendered.contains("source: synthetic"));
    }

    #[test]
    fn test_format_detail_without_coverage() {
        let detail = EventDetail {
            event: reported_event(),
            snapshot: None,
            is_future: false,
        };
        let rendered = format_detail(&detail);
        assert!(rendered.contains("Apple Inc. (AAPL)"));
        assert!(rendered.contains("reported"));
        assert!(rendered.contains("Result: beat"));
        assert!(rendered.ends_with("AAPL: no analyst coverage"));
    }

    #[test]
    fn test_format_seed_report() {
        let protected = SeedReport {
            protected: true,
            ..SeedReport::default()
        };
        assert!(format_seed_report(&protected).contains("--force"));

        let report = SeedReport {
            events_written: 12,
            events_fresh: 0,
            snapshots_written: 10,
            snapshots_fresh: 2,
            protected: false,
        };
        assert_eq!(
            format_seed_report(&report),
            "Seeded 12 synthetic events and 10 snapshots (0 events and 2 snapshots still fresh)."
        );
    }
}
