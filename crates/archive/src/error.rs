//! Archive Error Types
//!
//! Structured errors using `exn` for automatic location tracking and error
//! tree construction.

use derive_more::{Display, Error};

/// An archive error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for archive operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    #[display("database error")]
    Database,
    #[display("database migration error")]
    Migration,
    /// Reading or writing image bytes failed.
    #[display("image store error")]
    Storage,
    /// A unique row (content hash or origin) already exists.
    #[display("constraint violation: {_0}")]
    Constraint(#[error(not(source))] &'static str),
    /// The URL has no scheme+host origin (e.g. `data:` URLs).
    #[display("URL has no tuple origin: {_0}")]
    OpaqueOrigin(#[error(not(source))] String),
    /// Serialization/deserialization error.
    #[display("invalid archive data: {_0}")]
    InvalidData(#[error(not(source))] &'static str),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Database | Self::Storage)
    }
}
