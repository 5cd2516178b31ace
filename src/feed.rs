//! ==============================================================================
//! feed.rs - realtime feed capability
//! ==============================================================================
//!
//! purpose:
//!     the aggregator never talks to a database directly. it is handed a
//!     `RealtimeFeed` at construction and asks it for subscriptions; every
//!     subscription pushes `FeedEvent`s into one channel that a single
//!     consumer drains.
//!
//! relationships:
//!     - implemented by: memory_feed.rs (in-process tree, tests + simulator)
//!     - implemented by: firebase.rs (rest polling against the hosted db)
//!     - used by: aggregator.rs
//!
//! snapshot shape:
//!     `None` means "no data exists at this path". `Some(value)` is the json
//!     the store holds there, children in the order the store enumerates them.
//!
//! ==============================================================================

use crate::domain::{Metric, Reading, SensorId, WINDOW_SIZE};
use crate::error::FeedError;

use serde_json::Value;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

pub type SubscriptionId = u64;

/// what a subscription listens to
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FeedQuery {
    pub path: String,
    /// only the last N children (by key)
    pub limit_to_last: Option<usize>,
    /// children collapsed to `true`; used for the sensor list
    pub keys_only: bool,
}

impl FeedQuery {
    pub const SENSORS_PATH: &'static str = "sensors";

    /// the discovery query: every known sensor id
    pub fn sensors() -> Self {
        Self {
            path: Self::SENSORS_PATH.to_string(),
            limit_to_last: None,
            keys_only: true,
        }
    }

    /// the last WINDOW_SIZE readings of one metric of one sensor
    pub fn metric(id: &str, metric: Metric) -> Self {
        Self {
            path: format!("{}/{}/{}", Self::SENSORS_PATH, id, metric.key()),
            limit_to_last: Some(WINDOW_SIZE),
            keys_only: false,
        }
    }

    /// path split on '/', rejecting empty segments
    pub fn segments(&self) -> Result<Vec<&str>, FeedError> {
        let segments: Vec<&str> = self.path.split('/').collect();
        if segments.iter().any(|s| s.is_empty() || s.contains(['.', '#', '$', '[', ']'])) {
            return Err(FeedError::InvalidPath(self.path.clone()));
        }
        Ok(segments)
    }
}

#[derive(Clone, Debug)]
pub struct FeedEvent {
    pub subscription: SubscriptionId,
    pub snapshot: Option<Value>,
}

/// the sending half a feed holds for one subscription
#[derive(Clone, Debug)]
pub struct FeedSink {
    id: SubscriptionId,
    tx: UnboundedSender<FeedEvent>,
}

impl FeedSink {
    pub fn new(id: SubscriptionId, tx: UnboundedSender<FeedEvent>) -> Self {
        Self { id, tx }
    }

    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// returns false once the consumer is gone
    pub fn deliver(&self, snapshot: Option<Value>) -> bool {
        self.tx
            .send(FeedEvent { subscription: self.id, snapshot })
            .is_ok()
    }
}

/// receiving half, drained by whoever owns the aggregator
pub struct FeedEvents {
    rx: UnboundedReceiver<FeedEvent>,
}

impl FeedEvents {
    pub async fn recv(&mut self) -> Option<FeedEvent> {
        self.rx.recv().await
    }

    pub fn try_recv(&mut self) -> Option<FeedEvent> {
        self.rx.try_recv().ok()
    }
}

pub fn event_channel() -> (UnboundedSender<FeedEvent>, FeedEvents) {
    let (tx, rx) = mpsc::unbounded_channel();
    (tx, FeedEvents { rx })
}

/// a live listener; dropping it releases the listener in the feed
pub struct Subscription {
    id: SubscriptionId,
    release: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl Subscription {
    pub fn new(id: SubscriptionId, release: impl FnOnce() + Send + Sync + 'static) -> Self {
        Self { id, release: Some(Box::new(release)) }
    }

    pub fn id(&self) -> SubscriptionId {
        self.id
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}

/// the capability the aggregator is constructed with
pub trait RealtimeFeed: Send + Sync {
    /// start listening; the current value (if any) should be delivered soon
    /// after, then again every time it changes
    fn subscribe(&self, query: FeedQuery, sink: FeedSink) -> Result<Subscription, FeedError>;
}

// ==============================================================================
// snapshot parsing
// ==============================================================================

/// child keys in delivery order
///
/// arrays show up when a store's keys happen to be small integers; holes
/// (`null`) are skipped.
pub fn snapshot_keys(value: &Value) -> Vec<SensorId> {
    match value {
        Value::Object(map) => map.keys().cloned().collect(),
        Value::Array(items) => items
            .iter()
            .enumerate()
            .filter(|(_, v)| !v.is_null())
            .map(|(i, _)| i.to_string())
            .collect(),
        _ => Vec::new(),
    }
}

/// every well-formed `{time, value}` child; the rest are skipped
pub fn parse_readings(value: &Value) -> Vec<Reading> {
    let children: Box<dyn Iterator<Item = &Value> + '_> = match value {
        Value::Object(map) => Box::new(map.values()),
        Value::Array(items) => Box::new(items.iter().filter(|v| !v.is_null())),
        _ => Box::new(std::iter::empty()),
    };

    children
        .filter_map(|child| {
            let reading = parse_reading(child);
            if reading.is_none() {
                tracing::warn!("skipping malformed reading: {}", child);
            }
            reading
        })
        .collect()
}

fn parse_reading(child: &Value) -> Option<Reading> {
    let time = number(child.get("time")?)?;
    let value = number(child.get("value")?)?;
    if !time.is_finite() || !value.is_finite() {
        return None;
    }
    Some(Reading::new(time as i64, value))
}

/// json number, or a string holding one
fn number(v: &Value) -> Option<f64> {
    match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn keys_follow_delivery_order() {
        let snapshot = json!({"s2": true, "s1": true, "s10": true});
        assert_eq!(snapshot_keys(&snapshot), vec!["s2", "s1", "s10"]);
    }

    #[test]
    fn array_keys_skip_holes() {
        let snapshot = json!([null, {"a": 1}, null, {"b": 2}]);
        assert_eq!(snapshot_keys(&snapshot), vec!["1", "3"]);
    }

    #[test]
    fn readings_accept_numeric_strings_and_skip_garbage() {
        let snapshot = json!({
            "-a": {"time": 100, "value": 21.5},
            "-b": {"time": "101", "value": "22"},
            "-c": {"time": 102},
            "-d": {"time": 103, "value": "warm"},
            "-e": "nope"
        });
        let readings = parse_readings(&snapshot);
        assert_eq!(readings, vec![Reading::new(100, 21.5), Reading::new(101, 22.0)]);
    }

    #[test]
    fn scalar_snapshot_has_no_readings() {
        assert!(parse_readings(&json!(42)).is_empty());
        assert!(snapshot_keys(&json!("x")).is_empty());
    }

    #[test]
    fn metric_query_is_bounded() {
        let query = FeedQuery::metric("maceta1", Metric::Humidity);
        assert_eq!(query.path, "sensors/maceta1/humidity");
        assert_eq!(query.limit_to_last, Some(WINDOW_SIZE));
        assert!(!query.keys_only);
    }

    #[test]
    fn bad_paths_are_rejected() {
        let query = FeedQuery::metric("a.b", Metric::Temperature);
        assert!(matches!(query.segments(), Err(FeedError::InvalidPath(_))));
        assert_eq!(FeedQuery::sensors().segments().ok(), Some(vec!["sensors"]));
    }

    #[test]
    fn dropping_subscription_runs_release_once() {
        use std::sync::atomic::{AtomicUsize, Ordering};
        use std::sync::Arc;

        let released = Arc::new(AtomicUsize::new(0));
        let counter = released.clone();
        let sub = Subscription::new(7, move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(sub.id(), 7);
        drop(sub);
        assert_eq!(released.load(Ordering::SeqCst), 1);
    }
}
