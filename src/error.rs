use thiserror::Error;

/// A string that does not look like a `YYYY-MM-DD` calendar date.
#[derive(Debug, Clone, Error)]
#[error("invalid date key {0:?}: expected YYYY-MM-DD")]
pub struct InvalidDateKey(pub String);

/// The live snapshot feed broke. Non-fatal: the store keeps the last-known
/// mapping and reports a degraded status.
#[derive(Debug, Error)]
pub enum SubscriptionError {
    #[error("remote snapshot channel closed")]
    ChannelClosed,
    #[error("remote snapshot feed failed: {0}")]
    Remote(String),
}

/// A merge-write to the remote collection failed. The draft stays dirty and
/// the caller decides whether to retry.
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("remote write failed: {0}")]
    Remote(String),
    #[error("record could not be encoded: {0}")]
    Encode(String),
}

/// Photo normalization failure. The destination slot is left unchanged.
#[derive(Debug, Error)]
pub enum ImageError {
    #[error("image could not be decoded: {0}")]
    Decode(String),
    #[error("image could not be encoded: {0}")]
    Encode(String),
    #[error("image worker task failed: {0}")]
    Worker(String),
}

/// Rejected draft state transitions.
#[derive(Debug, Error)]
pub enum DraftError {
    #[error("no day is open")]
    Closed,
    #[error("a save is already in flight")]
    SaveInFlight,
    #[error("draft could not be encoded: {0}")]
    Encode(String),
}
