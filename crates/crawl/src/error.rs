//! Crawl Error Types
//!
//! A crawl error always concerns a single site: the loop logs it, abandons
//! that site, and carries on.

use derive_more::{Display, Error};

/// A per-site crawl error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for crawl operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The site could not be fetched or parsed.
    #[display("could not scan site")]
    Scan,
    /// Reading or writing the archive failed.
    #[display("archive error")]
    Archive,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        // Failed sites come back around in later random batches.
        true
    }
}
