//! The crawl loop.
//!
//! Each round asks a [`DiscoverySource`](hoard_scan::DiscoverySource) for a
//! random batch of sites, then visits them one at a time: sites whose origin
//! is already in the [`OriginLedger`](hoard_archive::OriginLedger) are
//! skipped, the rest are scanned once, every valid and previously unseen
//! image is stored in the [`ArtifactStore`](hoard_archive::ArtifactStore),
//! and finally the origin is recorded so it is never visited again.
//!
//! Failures are contained: a failed discovery costs one backoff period, and a
//! failed site is abandoned without recording its origin, leaving it free to
//! turn up in a later batch.

mod crawler;
pub mod error;
mod report;

pub use crate::crawler::{Crawler, DEFAULT_BACKOFF, extension};
pub use crate::report::RoundReport;
