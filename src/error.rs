use thiserror::Error;

/// failures of the realtime feed layer
///
/// none of these cross the aggregator's interface: a subscription that
/// cannot be created or polled simply never delivers data.
#[derive(Error, Debug)]
pub enum FeedError {
    #[error("feed request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("feed returned HTTP {status} for {url}")]
    Status { url: String, status: u16 },
    #[error("invalid feed path '{0}'")]
    InvalidPath(String),
    #[error("feed subscriptions need a running tokio runtime")]
    NoRuntime,
}
