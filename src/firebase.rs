//! ==============================================================================
//! firebase.rs - realtime database feed over the rest api
//! ==============================================================================
//!
//! purpose:
//!     implements `RealtimeFeed` against a hosted Firebase Realtime Database
//!     by polling `GET {database_url}/{path}.json`.
//!
//! how a subscription works:
//!     - one tokio task per subscription, ticking every poll interval
//!     - the first answer is always delivered (even `null` = "no data")
//!     - after that, only answers that differ from the last delivered one
//!     - request failures are logged and the tick is skipped; the aggregator
//!       just sees no new data, same as a permission-denied listener
//!     - dropping the Subscription aborts the task
//!
//! query mapping:
//!     - keys_only      -> shallow=true
//!     - limit_to_last  -> orderBy="$key"&limitToLast=N
//!     - auth_token     -> auth=<token>
//!
//! ==============================================================================

use crate::config::FeedConfig;
use crate::error::FeedError;
use crate::feed::{FeedQuery, FeedSink, RealtimeFeed, Subscription};

use serde_json::Value;
use std::time::Duration;
use tokio::time::MissedTickBehavior;

#[derive(Clone)]
pub struct FirebaseFeed {
    client: reqwest::Client,
    base_url: String,
    auth_token: Option<String>,
    interval: Duration,
}

impl FirebaseFeed {
    pub fn new(config: &FeedConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: config.database_url.trim_end_matches('/').to_string(),
            auth_token: config.auth_token.clone(),
            interval: Duration::from_secs(config.poll_interval_seconds.max(1)),
        }
    }

    /// shorter ticks for tests against a local server
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn url_for(&self, query: &FeedQuery) -> String {
        format!("{}/{}.json", self.base_url, query.path)
    }

    pub fn params_for(&self, query: &FeedQuery) -> Vec<(&'static str, String)> {
        let mut params = Vec::new();
        if query.keys_only {
            params.push(("shallow", "true".to_string()));
        }
        if let Some(limit) = query.limit_to_last {
            params.push(("orderBy", "\"$key\"".to_string()));
            params.push(("limitToLast", limit.to_string()));
        }
        if let Some(token) = &self.auth_token {
            params.push(("auth", token.clone()));
        }
        params
    }

    /// one poll: `Ok(None)` when the database answers `null`
    pub async fn fetch(&self, query: &FeedQuery) -> Result<Option<Value>, FeedError> {
        let url = self.url_for(query);
        let response = self
            .client
            .get(&url)
            .query(&self.params_for(query))
            .send()
            .await
            .map_err(|source| FeedError::Http { url: url.clone(), source })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FeedError::Status { url, status: status.as_u16() });
        }

        let body: Value = response
            .json()
            .await
            .map_err(|source| FeedError::Http { url, source })?;
        Ok(match body {
            Value::Null => None,
            other => Some(other),
        })
    }
}

impl RealtimeFeed for FirebaseFeed {
    fn subscribe(&self, query: FeedQuery, sink: FeedSink) -> Result<Subscription, FeedError> {
        query.segments()?;
        let runtime = tokio::runtime::Handle::try_current().map_err(|_| FeedError::NoRuntime)?;

        let id = sink.id();
        let feed = self.clone();
        let task = runtime.spawn(async move { feed.poll(query, sink).await });
        let abort = task.abort_handle();

        Ok(Subscription::new(id, move || abort.abort()))
    }
}

impl FirebaseFeed {
    async fn poll(self, query: FeedQuery, sink: FeedSink) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut last: Option<Option<Value>> = None;
        let mut failing = false;

        loop {
            ticker.tick().await;

            match self.fetch(&query).await {
                Ok(snapshot) => {
                    if failing {
                        tracing::info!("[FIREBASE] {} reachable again", query.path);
                        failing = false;
                    }
                    if last.as_ref() == Some(&snapshot) {
                        continue;
                    }
                    if !sink.deliver(snapshot.clone()) {
                        // aggregator is gone
                        break;
                    }
                    last = Some(snapshot);
                }
                Err(e) => {
                    if !failing {
                        tracing::warn!("[FIREBASE] ⚠ {}", e);
                        failing = true;
                    } else {
                        tracing::debug!("[FIREBASE] still failing: {}", e);
                    }
                }
            }
        }
    }
}
