/// Error taxonomy for the market view core
///
/// Transport and payload errors on the push feeds are absorbed where they
/// occur and never reach these types; what remains is carried as explicit
/// state, nothing here is fatal to the process.
use thiserror::Error;

/// Errors from the REST surface (snapshots, symbol list, order submission).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    /// Request never produced a response (DNS, refused, timeout)
    #[error("request failed: {0}")]
    Transport(String),

    /// Non-success HTTP status
    #[error("http status {0}")]
    Status(u16),

    /// Response body failed to decode
    #[error("malformed response: {0}")]
    Malformed(String),
}

impl ApiError {
    /// Whether retrying without operator intervention could help.
    pub fn is_transient(&self) -> bool {
        match self {
            ApiError::Transport(_) => true,
            ApiError::Status(status) => *status >= 500,
            ApiError::Malformed(_) => false,
        }
    }
}

/// Order submission failures, surfaced inline on the quick-order form.
///
/// `Validation` never reaches the network; `Rejected` carries the backend's
/// reason; `Connection` is a transport failure, worded generically for the
/// user but distinguishable by kind.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OrderError {
    #[error("invalid order: {0}")]
    Validation(String),

    #[error("order rejected: {0}")]
    Rejected(String),

    #[error("connection error")]
    Connection,
}
