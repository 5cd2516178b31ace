use maceta_host::aggregator::Aggregator;
use maceta_host::error::FeedError;
use maceta_host::feed::{FeedEvents, FeedQuery, FeedSink, RealtimeFeed, Subscription};
use maceta_host::memory_feed::MemoryFeed;
use maceta_host::{Metric, SelectionPolicy, SelectionState, View, WINDOW_SIZE};

use serde_json::json;
use std::sync::{Arc, Mutex};

fn setup() -> (MemoryFeed, Aggregator, FeedEvents) {
    let feed = MemoryFeed::new();
    let (mut agg, events) = Aggregator::new(Arc::new(feed.clone()));
    agg.start();
    (feed, agg, events)
}

fn reading(feed: &MemoryFeed, sensor: &str, metric: Metric, time: i64, value: f64) {
    feed.push(
        &format!("sensors/{}/{}", sensor, metric.key()),
        json!({ "time": time, "value": value }),
    );
}

#[test]
fn default_selection_is_first_discovered() {
    let (feed, mut agg, mut events) = setup();
    agg.process_pending(&mut events);
    assert!(agg.known_sensor_ids().is_empty());
    assert_eq!(agg.active_selection(View::Principal), None);

    feed.set("sensors/s2", json!({"temperature": {"-a": {"time": 1, "value": 20}}}));
    feed.set("sensors/s1", json!({"temperature": {"-a": {"time": 1, "value": 21}}}));
    agg.process_pending(&mut events);

    assert_eq!(agg.known_sensor_ids(), ["s2", "s1"]);
    for view in View::ALL {
        assert_eq!(agg.active_selection(view).map(String::as_str), Some("s2"));
    }
}

#[test]
fn series_sorted_regardless_of_delivery_order() {
    let (feed, mut agg, mut events) = setup();
    for t in [50, 10, 40, 20, 30] {
        reading(&feed, "m1", Metric::Temperature, t, t as f64 / 2.0);
    }
    agg.process_pending(&mut events);

    let series = agg
        .record_for("m1")
        .and_then(|r| r.series(Metric::Temperature))
        .expect("temperature series");
    let times: Vec<i64> = series.readings().iter().map(|r| r.time).collect();
    assert_eq!(times, vec![10, 20, 30, 40, 50]);
}

#[test]
fn window_never_exceeds_fifteen() {
    let (feed, mut agg, mut events) = setup();
    for t in 0..40 {
        reading(&feed, "m1", Metric::Humidity, t, 50.0);
        agg.process_pending(&mut events);
        let len = agg
            .record_for("m1")
            .and_then(|r| r.series(Metric::Humidity))
            .map_or(0, |s| s.len());
        assert!(len <= WINDOW_SIZE);
    }
    let series = agg.record_for("m1").and_then(|r| r.series(Metric::Humidity)).expect("series");
    assert_eq!(series.len(), WINDOW_SIZE);
    assert_eq!(series.readings()[0].time, 25);
}

#[test]
fn unknown_is_absent_known_without_readings_is_unset() {
    let (feed, mut agg, mut events) = setup();
    // discovered through another child, no readings under either metric yet
    feed.set("sensors/m1/meta", json!({"name": "albahaca"}));
    agg.process_pending(&mut events);

    assert!(agg.record_for("unknown").is_none());
    let record = agg.record_for("m1").expect("record exists once discovered");
    assert!(record.temperature.is_none());
    assert!(record.humidity.is_none());
    assert_eq!(agg.stats_for("m1", Metric::Temperature), None);
}

#[test]
fn no_data_keeps_previous_series() {
    let (feed, mut agg, mut events) = setup();
    reading(&feed, "m1", Metric::Temperature, 1, 20.0);
    reading(&feed, "m1", Metric::Humidity, 1, 60.0);
    agg.process_pending(&mut events);

    // humidity vanishes from the store: the listener reports "no data"
    feed.remove("sensors/m1/humidity");
    agg.process_pending(&mut events);

    let record = agg.record_for("m1").expect("record");
    assert_eq!(record.latest(Metric::Humidity).map(|r| r.value), Some(60.0));
}

#[test]
fn metric_updates_leave_selection_alone() {
    let (feed, mut agg, mut events) = setup();
    reading(&feed, "a", Metric::Temperature, 1, 20.0);
    reading(&feed, "b", Metric::Temperature, 1, 20.0);
    agg.process_pending(&mut events);
    agg.select_sensor(View::Statistics, "b");

    reading(&feed, "a", Metric::Humidity, 2, 30.0);
    agg.process_pending(&mut events);
    assert_eq!(agg.active_selection(View::Statistics).map(String::as_str), Some("b"));
    assert_eq!(agg.active_selection(View::Principal).map(String::as_str), Some("a"));
}

#[test]
fn toggle_and_single_select_repick() {
    let (feed, mut agg, mut events) = setup();
    reading(&feed, "a", Metric::Temperature, 1, 20.0);
    reading(&feed, "b", Metric::Temperature, 1, 20.0);
    agg.process_pending(&mut events);

    // devices toggles
    assert_eq!(agg.selection_policy(View::Devices), SelectionPolicy::Toggle);
    assert_eq!(agg.select_sensor(View::Devices, "a"), SelectionState::Unselected);
    assert_eq!(agg.select_sensor(View::Devices, "b"), SelectionState::Selected("b".into()));

    // statistics keeps
    assert_eq!(agg.select_sensor(View::Statistics, "a"), SelectionState::Selected("a".into()));
    assert_eq!(agg.select_sensor(View::Statistics, "a"), SelectionState::Selected("a".into()));
}

#[test]
fn toggled_off_view_stays_unselected_while_readings_arrive() {
    let (feed, mut agg, mut events) = setup();
    reading(&feed, "a", Metric::Temperature, 1, 20.0);
    agg.process_pending(&mut events);
    assert_eq!(agg.select_sensor(View::Devices, "a"), SelectionState::Unselected);

    // every write under sensors/ re-notifies discovery with the same ids
    reading(&feed, "a", Metric::Temperature, 2, 21.0);
    reading(&feed, "b", Metric::Humidity, 2, 55.0);
    agg.process_pending(&mut events);

    assert_eq!(agg.known_sensor_ids(), ["a", "b"]);
    assert_eq!(agg.selection_state(View::Devices), SelectionState::Unselected);
    assert_eq!(agg.active_selection(View::Principal).map(String::as_str), Some("a"));
}

#[test]
fn policies_can_be_overridden() {
    let feed = MemoryFeed::new();
    let (agg, mut events) = Aggregator::new(Arc::new(feed.clone()));
    let mut agg = agg.with_policy(View::Principal, SelectionPolicy::Toggle);
    agg.start();
    reading(&feed, "a", Metric::Temperature, 1, 20.0);
    agg.process_pending(&mut events);

    assert_eq!(agg.select_sensor(View::Principal, "a"), SelectionState::Unselected);
}

#[test]
fn picking_unknown_sensor_is_ignored() {
    let (feed, mut agg, mut events) = setup();
    reading(&feed, "a", Metric::Temperature, 1, 20.0);
    agg.process_pending(&mut events);

    assert_eq!(agg.select_sensor(View::Devices, "ghost"), SelectionState::Selected("a".into()));
}

#[test]
fn selection_survives_sensor_disappearing() {
    let (feed, mut agg, mut events) = setup();
    reading(&feed, "a", Metric::Temperature, 1, 20.0);
    reading(&feed, "b", Metric::Temperature, 1, 22.0);
    agg.process_pending(&mut events);
    agg.select_sensor(View::Principal, "b");

    feed.remove("sensors/b");
    agg.process_pending(&mut events);

    assert_eq!(agg.known_sensor_ids(), ["a"]);
    assert_eq!(agg.active_selection(View::Principal).map(String::as_str), Some("b"));
    // the stale record is still readable
    assert_eq!(agg.record_for("b").and_then(|r| r.latest(Metric::Temperature)).map(|r| r.value), Some(22.0));
}

#[test]
fn empty_discovery_keeps_stale_records() {
    let (feed, mut agg, mut events) = setup();
    reading(&feed, "a", Metric::Temperature, 1, 20.0);
    agg.process_pending(&mut events);

    feed.remove("sensors");
    agg.process_pending(&mut events);

    assert!(agg.known_sensor_ids().is_empty());
    // known limitation: no eviction
    assert!(agg.record_for("a").is_some());
    assert_eq!(agg.active_selection(View::Principal).map(String::as_str), Some("a"));
}

#[test]
fn reconciliation_releases_removed_and_keeps_unchanged() {
    let (feed, mut agg, mut events) = setup();
    reading(&feed, "a", Metric::Temperature, 1, 20.0);
    reading(&feed, "b", Metric::Temperature, 1, 20.0);
    agg.process_pending(&mut events);

    // discovery + 2 metrics x 2 sensors
    assert_eq!(feed.listener_count(), 5);
    assert_eq!(agg.subscription_count(), 5);
    let before = feed.listener_paths();

    feed.remove("sensors/b");
    reading(&feed, "c", Metric::Humidity, 1, 50.0);
    agg.process_pending(&mut events);

    let after = feed.listener_paths();
    assert_eq!(feed.listener_count(), 5);
    assert!(after.iter().all(|p| !p.starts_with("sensors/b/")));
    assert!(after.contains(&"sensors/c/temperature".to_string()));
    assert!(after.contains(&"sensors/c/humidity".to_string()));
    // a's listeners were never recreated: same relative order, still first
    let a_before: Vec<&String> = before.iter().filter(|p| p.starts_with("sensors/a/")).collect();
    let a_after: Vec<&String> = after.iter().filter(|p| p.starts_with("sensors/a/")).collect();
    assert_eq!(a_before, a_after);
    assert_eq!(after[1..3], before[1..3]);
}

/// hands out sinks without ever releasing them, so a test can keep
/// delivering on a subscription the aggregator already dropped
#[derive(Default)]
struct StubbornFeed {
    sinks: Mutex<Vec<(FeedQuery, FeedSink)>>,
}

impl StubbornFeed {
    fn sink_for(&self, path: &str) -> FeedSink {
        let sinks = self.sinks.lock().unwrap();
        sinks
            .iter()
            .rev()
            .find(|(q, _)| q.path == path)
            .map(|(_, s)| s.clone())
            .expect("subscribed")
    }
}

impl RealtimeFeed for StubbornFeed {
    fn subscribe(&self, query: FeedQuery, sink: FeedSink) -> Result<Subscription, FeedError> {
        let id = sink.id();
        self.sinks.lock().unwrap().push((query, sink));
        Ok(Subscription::new(id, || {}))
    }
}

#[test]
fn events_for_released_subscriptions_are_dropped() {
    let feed = Arc::new(StubbornFeed::default());
    let (mut agg, mut events) = Aggregator::new(feed.clone());
    agg.start();

    let discovery = feed.sink_for("sensors");
    discovery.deliver(Some(json!({"a": true})));
    agg.process_pending(&mut events);
    let temperature = feed.sink_for("sensors/a/temperature");

    discovery.deliver(None);
    agg.process_pending(&mut events);

    // a listener that ignored its release keeps firing
    temperature.deliver(Some(json!({"-1": {"time": 1, "value": 99.0}})));
    agg.process_pending(&mut events);

    let record = agg.record_for("a").expect("stale record kept");
    assert!(record.temperature.is_none());
}

#[test]
fn rediscovered_sensor_gets_fresh_subscriptions() {
    let feed = Arc::new(StubbornFeed::default());
    let (mut agg, mut events) = Aggregator::new(feed.clone());
    agg.start();

    let discovery = feed.sink_for("sensors");
    discovery.deliver(Some(json!({"a": true})));
    agg.process_pending(&mut events);
    let old = feed.sink_for("sensors/a/temperature");

    discovery.deliver(Some(json!({})));
    discovery.deliver(Some(json!({"a": true})));
    agg.process_pending(&mut events);
    let new = feed.sink_for("sensors/a/temperature");
    assert_ne!(old.id(), new.id());

    old.deliver(Some(json!({"-1": {"time": 1, "value": 1.0}})));
    new.deliver(Some(json!({"-1": {"time": 2, "value": 2.0}})));
    agg.process_pending(&mut events);

    let latest = agg.record_for("a").and_then(|r| r.latest(Metric::Temperature)).copied();
    assert_eq!(latest.map(|r| (r.time, r.value)), Some((2, 2.0)));
}

/// memory feed that refuses a fixed number of humidity subscriptions
struct FlakyFeed {
    inner: MemoryFeed,
    humidity_failures: Mutex<usize>,
}

impl RealtimeFeed for FlakyFeed {
    fn subscribe(&self, query: FeedQuery, sink: FeedSink) -> Result<Subscription, FeedError> {
        if query.path.ends_with("/humidity") {
            let mut left = self.humidity_failures.lock().unwrap();
            if *left > 0 {
                *left -= 1;
                return Err(FeedError::InvalidPath(query.path));
            }
        }
        self.inner.subscribe(query, sink)
    }
}

#[test]
fn partly_failed_subscription_is_retried() {
    let memory = MemoryFeed::new();
    let feed = Arc::new(FlakyFeed { inner: memory.clone(), humidity_failures: Mutex::new(1) });
    let (mut agg, mut events) = Aggregator::new(feed);
    agg.start();

    reading(&memory, "a", Metric::Temperature, 1, 20.0);
    agg.process_pending(&mut events);
    // the half that succeeded was released again
    assert_eq!(agg.subscription_count(), 1);
    assert_eq!(memory.listener_count(), 1);
    assert_eq!(agg.known_sensor_ids(), ["a"]);

    // next discovery snapshot, same ids
    reading(&memory, "a", Metric::Humidity, 2, 60.0);
    agg.process_pending(&mut events);

    assert_eq!(agg.subscription_count(), 3);
    let record = agg.record_for("a").expect("record");
    assert_eq!(record.latest(Metric::Temperature).map(|r| r.value), Some(20.0));
    assert_eq!(record.latest(Metric::Humidity).map(|r| r.value), Some(60.0));
}

#[test]
fn shutdown_releases_everything() {
    let (feed, mut agg, mut events) = setup();
    reading(&feed, "a", Metric::Temperature, 1, 20.0);
    agg.process_pending(&mut events);
    assert!(feed.listener_count() > 0);

    agg.shutdown();
    assert_eq!(feed.listener_count(), 0);
    assert_eq!(agg.subscription_count(), 0);

    // nothing mutates state any more
    reading(&feed, "a", Metric::Temperature, 2, 30.0);
    agg.process_pending(&mut events);
    assert_eq!(agg.record_for("a").and_then(|r| r.latest(Metric::Temperature)).map(|r| r.value), Some(20.0));
}

#[test]
fn dropping_aggregator_releases_listeners() {
    let (feed, mut agg, mut events) = setup();
    reading(&feed, "a", Metric::Temperature, 1, 20.0);
    agg.process_pending(&mut events);
    drop(agg);
    assert_eq!(feed.listener_count(), 0);
}

#[test]
fn stats_follow_series() {
    let (feed, mut agg, mut events) = setup();
    for (t, v) in [(1, 10.0), (2, 20.0), (3, 30.0), (4, 40.0)] {
        reading(&feed, "a", Metric::Temperature, t, v);
    }
    agg.process_pending(&mut events);

    let stats = agg.stats_for("a", Metric::Temperature).expect("stats");
    assert_eq!(stats.median, 25.0);
    assert_eq!(stats.min, 10.0);
    assert_eq!(stats.max, 40.0);
    assert_eq!(agg.stats_for("a", Metric::Humidity), None);
}

#[test]
fn malformed_readings_are_skipped() {
    let (feed, mut agg, mut events) = setup();
    feed.set(
        "sensors/a/humidity",
        json!({
            "-1": {"time": 1, "value": 40},
            "-2": {"value": 41},
            "-3": {"time": "3", "value": "42.5"}
        }),
    );
    agg.process_pending(&mut events);

    let values = agg
        .record_for("a")
        .and_then(|r| r.series(Metric::Humidity))
        .map(|s| s.values());
    assert_eq!(values, Some(vec![40.0, 42.5]));
}

#[tokio::test]
async fn drive_applies_events_as_they_arrive() {
    use tokio::sync::RwLock;

    let feed = MemoryFeed::new();
    let (mut agg, events) = Aggregator::new(Arc::new(feed.clone()));
    agg.start();
    let shared = Arc::new(RwLock::new(agg));
    let task = tokio::spawn(maceta_host::aggregator::drive(shared.clone(), events));

    reading(&feed, "m1", Metric::Temperature, 5, 23.5);

    let mut seen = None;
    for _ in 0..50 {
        tokio::task::yield_now().await;
        seen = shared
            .read()
            .await
            .record_for("m1")
            .and_then(|r| r.latest(Metric::Temperature))
            .map(|r| r.value);
        if seen.is_some() {
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    }
    task.abort();
    assert_eq!(seen, Some(23.5));
}
