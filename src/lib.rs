//! Earnings cache library
//!
//! Persists corporate earnings events and analyst snapshots in a local SQLite
//! store. The binary and the integration tests both build on these modules.

pub mod cache;
pub mod cli;
pub mod config;
pub mod data;
pub mod maintenance;
pub mod output;
pub mod synthetic;
