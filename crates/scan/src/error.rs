//! Scan Error Types
//!
//! Structured errors using `exn` for automatic location tracking and error
//! tree construction.

use derive_more::{Display, Error};

/// A discovery or scan error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for discovery and scan operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// The HTTP client could not be constructed.
    #[display("could not build HTTP client")]
    Client,
    /// The request never produced a response (DNS, TLS, timeout, reset).
    #[display("network error")]
    Network,
    /// The server answered, but not with success.
    #[display("unexpected HTTP status {_0}")]
    Status(#[error(not(source))] u16),
    /// The response body exceeded the configured limit.
    #[display("response larger than {_0} bytes")]
    TooLarge(#[error(not(source))] u64),
    /// A configured URL or selector doesn't parse.
    #[display("invalid configuration: {_0}")]
    InvalidConfig(#[error(not(source))] String),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Network => true,
            Self::Status(code) => *code == 429 || *code >= 500,
            Self::Client | Self::TooLarge(_) | Self::InvalidConfig(_) => false,
        }
    }
}
