//! ==============================================================================
//! memory_feed.rs - in-process realtime feed
//! ==============================================================================
//!
//! purpose:
//!     a json tree with realtime-database semantics, held in memory.
//!     stands in for the hosted database in tests and when the host runs
//!     with the simulator instead of a real project.
//!
//! semantics:
//!     - writes are by '/'-separated path; intermediate objects are created
//!     - push_bounded trims a list to its newest children in the same write
//!     - objects keep insertion order (serde_json "preserve_order")
//!     - empty objects and nulls count as "no data"
//!     - a listener is re-evaluated whenever a write lands on its path, above
//!       it, or below it, and is also fed the current value on subscribe
//!
//! relationships:
//!     - implements: feed.rs (RealtimeFeed)
//!     - written by: simulator.rs, tests
//!
//! ==============================================================================

use crate::error::FeedError;
use crate::feed::{FeedQuery, FeedSink, RealtimeFeed, Subscription};

use parking_lot::Mutex;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::sync::{Arc, Weak};

struct Listener {
    query: FeedQuery,
    segments: Vec<String>,
    sink: FeedSink,
}

#[derive(Default)]
struct Inner {
    root: Map<String, Value>,
    listeners: BTreeMap<u64, Listener>,
    next_listener: u64,
    next_push: u64,
}

/// cheap to clone; clones share the same tree
#[derive(Clone, Default)]
pub struct MemoryFeed {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryFeed {
    pub fn new() -> Self {
        Self::default()
    }

    /// replace the value at `path`; `Value::Null` removes it
    pub fn set(&self, path: &str, value: Value) {
        let segments = split(path);
        let mut inner = self.inner.lock();
        write_at(&mut inner.root, &segments, value);
        notify(&inner, &segments);
    }

    /// append a child under `path` with a fresh, ordered key; returns the key
    pub fn push(&self, path: &str, value: Value) -> String {
        self.push_inner(path, value, None)
    }

    /// like `push`, then drop the oldest children so at most `keep` remain.
    /// listeners see one notification for the whole write.
    pub fn push_bounded(&self, path: &str, value: Value, keep: usize) -> String {
        self.push_inner(path, value, Some(keep))
    }

    fn push_inner(&self, path: &str, value: Value, keep: Option<usize>) -> String {
        let parent = split(path);
        let mut inner = self.inner.lock();
        let key = format!("-{:019}", inner.next_push);
        inner.next_push += 1;

        let mut segments = parent.clone();
        segments.push(key.clone());
        write_at(&mut inner.root, &segments, value);

        if let Some(keep) = keep {
            if let Some(children) = object_at_mut(&mut inner.root, &parent) {
                let excess = children.len().saturating_sub(keep);
                let oldest: Vec<String> = children.keys().take(excess).cloned().collect();
                for old in &oldest {
                    children.shift_remove(old);
                }
            }
        }

        notify(&inner, &segments);
        key
    }

    pub fn remove(&self, path: &str) {
        self.set(path, Value::Null);
    }

    /// current value at `path`, `None` when nothing is stored there
    pub fn get(&self, path: &str) -> Option<Value> {
        let segments = split(path);
        let inner = self.inner.lock();
        read_at(&inner.root, &segments).cloned()
    }

    /// live listeners, for checking that subscriptions get released
    pub fn listener_count(&self) -> usize {
        self.inner.lock().listeners.len()
    }

    /// paths of the live listeners, in subscription order
    pub fn listener_paths(&self) -> Vec<String> {
        self.inner
            .lock()
            .listeners
            .values()
            .map(|l| l.query.path.clone())
            .collect()
    }
}

impl RealtimeFeed for MemoryFeed {
    fn subscribe(&self, query: FeedQuery, sink: FeedSink) -> Result<Subscription, FeedError> {
        let segments: Vec<String> = query.segments()?.into_iter().map(str::to_string).collect();

        let mut inner = self.inner.lock();
        let key = inner.next_listener;
        inner.next_listener += 1;

        let listener = Listener { query, segments, sink };
        listener.sink.deliver(evaluate(&inner.root, &listener));
        let id = listener.sink.id();
        inner.listeners.insert(key, listener);
        drop(inner);

        tracing::debug!("[MEMORY FEED] listener {} attached (subscription {})", key, id);

        let weak: Weak<Mutex<Inner>> = Arc::downgrade(&self.inner);
        Ok(Subscription::new(id, move || {
            if let Some(inner) = weak.upgrade() {
                inner.lock().listeners.remove(&key);
                tracing::debug!("[MEMORY FEED] listener {} released", key);
            }
        }))
    }
}

// ==============================================================================
// tree helpers
// ==============================================================================

fn split(path: &str) -> Vec<String> {
    path.split('/')
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn read_at<'a>(root: &'a Map<String, Value>, segments: &[String]) -> Option<&'a Value> {
    let (first, rest) = segments.split_first()?;
    let mut node = root.get(first)?;
    for segment in rest {
        node = node.as_object()?.get(segment)?;
    }
    Some(node)
}

fn object_at_mut<'a>(
    root: &'a mut Map<String, Value>,
    segments: &[String],
) -> Option<&'a mut Map<String, Value>> {
    let mut node = root;
    for segment in segments {
        node = node.get_mut(segment)?.as_object_mut()?;
    }
    Some(node)
}

fn write_at(root: &mut Map<String, Value>, segments: &[String], value: Value) {
    let Some((last, parents)) = segments.split_last() else {
        // writing the root itself
        *root = match value {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        return;
    };

    let mut node = root;
    for segment in parents {
        let child = node
            .entry(segment.clone())
            .or_insert_with(|| Value::Object(Map::new()));
        if !child.is_object() {
            *child = Value::Object(Map::new());
        }
        node = match child {
            Value::Object(map) => map,
            _ => return,
        };
    }

    if value.is_null() {
        node.shift_remove(last);
    } else {
        node.insert(last.clone(), value);
    }
}

/// what a listener should see right now
fn evaluate(root: &Map<String, Value>, listener: &Listener) -> Option<Value> {
    let value = read_at(root, &listener.segments)?;
    let query = &listener.query;

    match value {
        Value::Null => None,
        Value::Object(map) if map.is_empty() => None,
        Value::Object(map) => {
            let skip = query
                .limit_to_last
                .map_or(0, |limit| map.len().saturating_sub(limit));
            let children = map.iter().skip(skip).map(|(k, v)| {
                let v = if query.keys_only { Value::Bool(true) } else { v.clone() };
                (k.clone(), v)
            });
            Some(Value::Object(children.collect()))
        }
        other => Some(other.clone()),
    }
}

/// re-deliver to every listener related to the written path
fn notify(inner: &Inner, written: &[String]) {
    for listener in inner.listeners.values() {
        if related(&listener.segments, written) {
            listener.sink.deliver(evaluate(&inner.root, listener));
        }
    }
}

/// one path is a prefix of the other
fn related(a: &[String], b: &[String]) -> bool {
    a.iter().zip(b.iter()).all(|(x, y)| x == y)
}
