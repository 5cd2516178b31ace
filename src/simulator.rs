//! ==============================================================================
//! simulator.rs - fake macetas for running without a database
//! ==============================================================================
//!
//! purpose:
//!     writes one temperature and one humidity reading per configured sensor
//!     into the memory feed every interval, laid out exactly the way the real
//!     database stores them:
//!
//! ```text
//!         sensors/{id}/temperature/{push-key} = { time, value }
//!         sensors/{id}/humidity/{push-key}    = { time, value }
//! ```
//!
//! ```text
//!     values follow a slow sine/cosine around 20 °C and 50 %, phase-shifted
//!     per sensor so the pots don't move in lockstep.
//! ```
//!
//! ==============================================================================

use crate::domain::{Metric, WINDOW_SIZE};
use crate::memory_feed::MemoryFeed;

use serde_json::json;
use std::time::Duration;

const BASE_TEMPERATURE: f64 = 20.0;
const BASE_HUMIDITY: f64 = 50.0;
/// readings kept per metric node; listeners never read past the window
const KEEP_READINGS: usize = WINDOW_SIZE;

pub struct Simulator {
    feed: MemoryFeed,
    sensors: Vec<String>,
    tick: u64,
}

impl Simulator {
    pub fn new(feed: MemoryFeed, sensors: Vec<String>) -> Self {
        Self { feed, sensors, tick: 0 }
    }

    /// write one reading per (sensor, metric) stamped `now`
    pub fn step(&mut self, now: i64) {
        for (index, sensor) in self.sensors.iter().enumerate() {
            for metric in Metric::ALL {
                let value = sample(metric, index, self.tick);
                let path = format!("sensors/{}/{}", sensor, metric.key());
                self.feed
                    .push_bounded(&path, json!({ "time": now, "value": value }), KEEP_READINGS);
            }
        }
        self.tick += 1;
    }

    pub async fn run(mut self, interval: Duration) {
        tracing::info!(
            "[SIMULATOR] writing {} sensors every {}s",
            self.sensors.len(),
            interval.as_secs()
        );
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            let now = chrono::Utc::now().timestamp();
            self.step(now);
        }
    }
}

/// deterministic reading for `metric` of sensor `index` at step `tick`, one decimal
pub fn sample(metric: Metric, index: usize, tick: u64) -> f64 {
    let phase = tick as f64 * 0.2 + index as f64;
    let raw = match metric {
        Metric::Temperature => BASE_TEMPERATURE + phase.sin() * 10.0,
        Metric::Humidity => BASE_HUMIDITY + (phase * 1.5).cos() * 15.0,
    };
    (raw * 10.0).round() / 10.0
}
