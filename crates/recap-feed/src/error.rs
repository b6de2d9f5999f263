use thiserror::Error;

/// Errors raised while decoding a schedule payload
#[derive(Debug, Error)]
pub enum FeedError {
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Payload is empty")]
    Empty,
}
