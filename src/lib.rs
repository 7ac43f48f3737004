//! Stocker: daily quote ingestion and technical-signal screening.
//!
//! Pulls daily bars for a universe of securities, folds them into running
//! SMA / MACD / RSI / KDJ state and ranks the universe by KDJ J.

pub mod config;
pub mod core;
pub mod db;
pub mod error;
pub mod indicators;
pub mod jobs;
pub mod logging;
pub mod metrics;
pub mod models;
pub mod services;
pub mod signals;
