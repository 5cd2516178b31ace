//! ==============================================================================
//! domain.rs - sensor readings and per-sensor series
//! ==============================================================================
//!
//! purpose:
//!     the value types the aggregator hands to the display layer.
//!
//! relationships:
//!     - produced by: aggregator.rs (from feed snapshots)
//!     - consumed by: stats.rs, render.rs, server.rs (json api)
//!
//! ==============================================================================

use serde::{Deserialize, Serialize};
use std::fmt;

/// how many readings are kept per (sensor, metric)
pub const WINDOW_SIZE: usize = 15;

/// opaque key of one physical device (e.g. "maceta1")
pub type SensorId = String;

/// one timestamped measurement of a single metric
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    /// epoch seconds
    pub time: i64,
    pub value: f64,
}

impl Reading {
    pub fn new(time: i64, value: f64) -> Self {
        Self { time, value }
    }
}

/// the two metrics every maceta reports
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Metric {
    Temperature,
    Humidity,
}

impl Metric {
    pub const ALL: [Metric; 2] = [Metric::Temperature, Metric::Humidity];

    /// path segment under `sensors/{id}/`
    pub fn key(self) -> &'static str {
        match self {
            Metric::Temperature => "temperature",
            Metric::Humidity => "humidity",
        }
    }

    pub fn unit(self) -> &'static str {
        match self {
            Metric::Temperature => "°C",
            Metric::Humidity => "%",
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// up to WINDOW_SIZE readings, ascending by time
///
/// the only way in is `from_unordered`, so every series the aggregator holds
/// is sorted and bounded no matter what order the feed delivered it in.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct MetricSeries(Vec<Reading>);

impl MetricSeries {
    pub fn from_unordered(mut readings: Vec<Reading>) -> Self {
        readings.sort_by_key(|r| r.time);
        if readings.len() > WINDOW_SIZE {
            // keep the most recent ones
            readings.drain(..readings.len() - WINDOW_SIZE);
        }
        Self(readings)
    }

    pub fn readings(&self) -> &[Reading] {
        &self.0
    }

    pub fn values(&self) -> Vec<f64> {
        self.0.iter().map(|r| r.value).collect()
    }

    pub fn latest(&self) -> Option<&Reading> {
        self.0.last()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// everything known about one sensor
///
/// a metric stays `None` until its first snapshot with data arrives.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct SensorRecord {
    pub temperature: Option<MetricSeries>,
    pub humidity: Option<MetricSeries>,
}

impl SensorRecord {
    pub fn series(&self, metric: Metric) -> Option<&MetricSeries> {
        match metric {
            Metric::Temperature => self.temperature.as_ref(),
            Metric::Humidity => self.humidity.as_ref(),
        }
    }

    /// replace one metric's series in a single assignment
    pub fn set_series(&mut self, metric: Metric, series: MetricSeries) {
        match metric {
            Metric::Temperature => self.temperature = Some(series),
            Metric::Humidity => self.humidity = Some(series),
        }
    }

    pub fn latest(&self, metric: Metric) -> Option<&Reading> {
        self.series(metric).and_then(MetricSeries::latest)
    }
}
