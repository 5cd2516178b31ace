//! ==============================================================================
//! aggregator.rs - live sensor time-series aggregator
//! ==============================================================================
//!
//! purpose:
//!     turns feed events into per-sensor series and keeps every view's
//!     active-sensor selection consistent while sensors come and go.
//!
//! flow:
//!
//! ```text
//!     feed ──(FeedEvent)──► channel ──► drive() ──► Aggregator::apply()
//!                                                     │
//!              ┌──────────────────────────────────────┤
//!              ▼                                      ▼
//!     discovery snapshot                      metric snapshot
//!       - replace known ids                     - parse + sort + bound
//!       - reconcile metric subscriptions        - swap into the record
//!       - offer default selection
//! ```
//!
//! ownership:
//!     the aggregator is the only writer of the record map and the
//!     selections. readers get borrows; the display layer asks for
//!     selection changes through `select_sensor`.
//!
//! relationships:
//!     - uses: feed.rs (RealtimeFeed capability, parsing)
//!     - uses: selection.rs (state machine), stats.rs
//!     - used by: main.rs, server.rs
//!
//! ==============================================================================

use crate::domain::{Metric, MetricSeries, SensorId, SensorRecord};
use crate::feed::{
    event_channel, parse_readings, snapshot_keys, FeedEvent, FeedEvents, FeedQuery, FeedSink,
    RealtimeFeed, Subscription, SubscriptionId,
};
use crate::selection::{Selection, SelectionPolicy, SelectionState, View};
use crate::stats::{statistics_for, SensorStats};

use serde_json::Value;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;
use tokio::sync::RwLock;

#[derive(Clone, Debug, PartialEq, Eq)]
enum Target {
    Discovery,
    Metric(SensorId, Metric),
}

pub struct Aggregator {
    feed: Arc<dyn RealtimeFeed>,
    tx: UnboundedSender<FeedEvent>,
    next_subscription: SubscriptionId,
    // live subscription id -> what its events update
    targets: HashMap<SubscriptionId, Target>,
    discovery: Option<Subscription>,
    metric_subscriptions: HashMap<SensorId, Vec<Subscription>>,
    known: Vec<SensorId>,
    records: HashMap<SensorId, SensorRecord>,
    selections: BTreeMap<View, Selection>,
    log_readings: bool,
}

impl Aggregator {
    /// build an aggregator over `feed`; events arrive on the returned queue
    /// and must be fed back through `apply` (or `drive`)
    pub fn new(feed: Arc<dyn RealtimeFeed>) -> (Self, FeedEvents) {
        let (tx, events) = event_channel();
        let selections = View::ALL
            .iter()
            .map(|&view| (view, Selection::new(view.default_policy())))
            .collect();

        let aggregator = Self {
            feed,
            tx,
            next_subscription: 0,
            targets: HashMap::new(),
            discovery: None,
            metric_subscriptions: HashMap::new(),
            known: Vec::new(),
            records: HashMap::new(),
            selections,
            log_readings: false,
        };
        (aggregator, events)
    }

    /// override a view's re-pick policy; only meaningful before any pick
    pub fn with_policy(mut self, view: View, policy: SelectionPolicy) -> Self {
        self.selections.insert(view, Selection::new(policy));
        self
    }

    /// log every metric update at info level
    pub fn with_reading_log(mut self, enabled: bool) -> Self {
        self.log_readings = enabled;
        self
    }

    /// subscribe to sensor discovery; calling it again is a no-op
    pub fn start(&mut self) {
        if self.discovery.is_some() {
            return;
        }
        self.discovery = self.subscribe(FeedQuery::sensors(), Target::Discovery);
    }

    /// release every subscription; records and selections stay readable
    pub fn shutdown(&mut self) {
        let released = self.targets.len();
        self.discovery = None;
        self.metric_subscriptions.clear();
        self.targets.clear();
        tracing::info!("[AGGREGATOR] released {} subscriptions", released);
    }

    // ==========================================================================
    // event handling
    // ==========================================================================

    pub fn apply(&mut self, event: FeedEvent) {
        let Some(target) = self.targets.get(&event.subscription).cloned() else {
            tracing::trace!("dropping event for released subscription {}", event.subscription);
            return;
        };

        match target {
            Target::Discovery => self.on_discovery(event.snapshot),
            Target::Metric(id, metric) => self.on_metric(id, metric, event.snapshot),
        }
    }

    /// apply whatever is already queued; returns how many events were applied
    pub fn process_pending(&mut self, events: &mut FeedEvents) -> usize {
        let mut applied = 0;
        while let Some(event) = events.try_recv() {
            self.apply(event);
            applied += 1;
        }
        applied
    }

    fn on_discovery(&mut self, snapshot: Option<Value>) {
        let ids = snapshot.as_ref().map(snapshot_keys).unwrap_or_default();

        let next: HashSet<&SensorId> = ids.iter().collect();
        let removed: Vec<SensorId> = self
            .metric_subscriptions
            .keys()
            .filter(|id| !next.contains(id))
            .cloned()
            .collect();
        for id in &removed {
            if let Some(subs) = self.metric_subscriptions.remove(id) {
                for sub in &subs {
                    self.targets.remove(&sub.id());
                }
                tracing::info!("[AGGREGATOR] sensor {} left discovery, {} subscriptions released", id, subs.len());
            }
        }

        for id in &ids {
            // records outlive discovery: a sensor that left keeps its last data
            self.records.entry(id.clone()).or_default();

            if self.metric_subscriptions.contains_key(id) {
                continue;
            }
            let subs: Vec<Subscription> = Metric::ALL
                .iter()
                .filter_map(|&metric| {
                    self.subscribe(FeedQuery::metric(id, metric), Target::Metric(id.clone(), metric))
                })
                .collect();
            if subs.len() < Metric::ALL.len() {
                // leave it out of the map so the next discovery snapshot retries
                for sub in &subs {
                    self.targets.remove(&sub.id());
                }
                tracing::warn!("[AGGREGATOR] ⚠ sensor {} only partly subscribed, retrying on next discovery", id);
                continue;
            }
            tracing::info!("[AGGREGATOR] sensor {} discovered", id);
            self.metric_subscriptions.insert(id.clone(), subs);
        }

        self.known = ids;

        for (view, selection) in self.selections.iter_mut() {
            if selection.offer_default(&self.known) {
                tracing::debug!("[AGGREGATOR] {} defaulted to {:?}", view.as_str(), selection.active());
            }
        }
    }

    fn on_metric(&mut self, id: SensorId, metric: Metric, snapshot: Option<Value>) {
        let Some(value) = snapshot else {
            // no data exists: keep whatever the record already had
            tracing::debug!("[AGGREGATOR] {}/{} has no data", id, metric);
            return;
        };

        let series = MetricSeries::from_unordered(parse_readings(&value));
        if self.log_readings {
            if let Some(latest) = series.latest() {
                tracing::info!(
                    "[{}] {}: {:.1}{} ({} readings)",
                    id,
                    metric,
                    latest.value,
                    metric.unit(),
                    series.len()
                );
            }
        }
        self.records.entry(id).or_default().set_series(metric, series);
    }

    fn subscribe(&mut self, query: FeedQuery, target: Target) -> Option<Subscription> {
        let id = self.next_subscription;
        self.next_subscription += 1;

        // register first: the feed may deliver before subscribe returns
        self.targets.insert(id, target);
        match self.feed.subscribe(query.clone(), FeedSink::new(id, self.tx.clone())) {
            Ok(sub) => Some(sub),
            Err(e) => {
                self.targets.remove(&id);
                tracing::warn!("[AGGREGATOR] ⚠ could not subscribe to {}: {}", query.path, e);
                None
            }
        }
    }

    // ==========================================================================
    // read side
    // ==========================================================================

    /// latest discovery snapshot, in discovery order
    pub fn known_sensor_ids(&self) -> &[SensorId] {
        &self.known
    }

    pub fn record_for(&self, id: &str) -> Option<&SensorRecord> {
        self.records.get(id)
    }

    pub fn active_selection(&self, view: View) -> Option<&SensorId> {
        self.selections.get(&view).and_then(Selection::active)
    }

    pub fn selection_state(&self, view: View) -> SelectionState {
        self.selections
            .get(&view)
            .map(|s| s.state().clone())
            .unwrap_or_default()
    }

    pub fn selection_policy(&self, view: View) -> SelectionPolicy {
        self.selections
            .get(&view)
            .map_or(view.default_policy(), Selection::policy)
    }

    /// apply a user pick; unknown ids leave the selection as it was
    pub fn select_sensor(&mut self, view: View, id: &str) -> SelectionState {
        if !self.known.iter().any(|k| k == id) {
            tracing::debug!("[AGGREGATOR] ignoring pick of unknown sensor {}", id);
            return self.selection_state(view);
        }
        let selection = self
            .selections
            .entry(view)
            .or_insert_with(|| Selection::new(view.default_policy()));
        selection.pick(id).clone()
    }

    /// the view's selected sensor and its record, if any
    pub fn active_record(&self, view: View) -> Option<(&SensorId, Option<&SensorRecord>)> {
        let id = self.active_selection(view)?;
        Some((id, self.records.get(id)))
    }

    /// statistics of one sensor's metric, `None` while the series is unset or empty
    pub fn stats_for(&self, id: &str, metric: Metric) -> Option<SensorStats> {
        let series = self.records.get(id)?.series(metric)?;
        if series.is_empty() {
            return None;
        }
        Some(statistics_for(series))
    }

    /// live feed subscriptions held right now
    pub fn subscription_count(&self) -> usize {
        self.discovery.iter().count()
            + self.metric_subscriptions.values().map(Vec::len).sum::<usize>()
    }
}

/// apply events as they arrive, one at a time under the write lock
pub async fn drive(aggregator: Arc<RwLock<Aggregator>>, mut events: FeedEvents) {
    while let Some(event) = events.recv().await {
        aggregator.write().await.apply(event);
    }
}
