//! ==============================================================================
//! maceta-host - live monitoring for networked plant pots
//! ==============================================================================
//!
//! each maceta reports temperature and humidity into a realtime database
//! under `sensors/{id}/{metric}`. this crate keeps the last 15 readings per
//! (sensor, metric), derives statistics, tracks which pot each dashboard tab
//! is looking at, and serves the dashboard.
//!
//! modules:
//!     - domain      readings, series, records
//!     - feed        RealtimeFeed capability + snapshot parsing
//!     - memory_feed in-process feed (tests, simulator)
//!     - firebase    rest polling feed
//!     - aggregator  the live state
//!     - selection   active-sensor state machine
//!     - stats       average / median / mode / min / max
//!     - classify    humidity -> soil state
//!     - timefmt     epoch seconds -> HH:MM:SS (America/Lima)
//!     - i18n        es / en strings
//!     - config      host.toml
//!     - simulator   fake macetas
//!     - render      html
//!     - server      axum routes
//!
//! ==============================================================================

pub mod aggregator;
pub mod classify;
pub mod config;
pub mod domain;
pub mod error;
pub mod feed;
pub mod firebase;
pub mod i18n;
pub mod memory_feed;
pub mod render;
pub mod selection;
pub mod server;
pub mod simulator;
pub mod stats;
pub mod timefmt;

pub use aggregator::Aggregator;
pub use domain::{Metric, MetricSeries, Reading, SensorId, SensorRecord, WINDOW_SIZE};
pub use feed::RealtimeFeed;
pub use selection::{SelectionPolicy, SelectionState, View};
pub use stats::{statistics_for, SensorStats};
