use thiserror::Error;

/// Errors surfaced to callers. Transport/serialization/listener failures are
/// recovered locally and never become a `SimError` — they are only
/// observable as `ERROR` events (see `sim-engine`).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SimError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("illegal state: {0}")]
    IllegalState(String),

    #[error("not found: {0}")]
    NotFound(String),
}
