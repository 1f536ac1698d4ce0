//! Fetch failures surfaced by the API client

use thiserror::Error;

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{url} returned status {status}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
    },
    #[error("invalid JSON from {url}: {source}")]
    Json {
        url: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("unexpected response shape from {url}: {reason}")]
    Shape { url: String, reason: String },
}

/// Coarse failure class: the network or the payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchErrorKind {
    Network,
    Parse,
}

impl FetchError {
    pub fn kind(&self) -> FetchErrorKind {
        match self {
            FetchError::Transport { .. } | FetchError::Status { .. } => FetchErrorKind::Network,
            FetchError::Json { .. } | FetchError::Shape { .. } => FetchErrorKind::Parse,
        }
    }
}
