//! SQLite-backed archive of badge images and crawled site origins.
//!
//! # Architecture
//! The archive persists two entity types:
//! - **Artifacts**: unique images, keyed by the BLAKE3 hash of their raw
//!   bytes. Each artifact gets a dense sequential id, and its bytes live in
//!   the image store (a [`hoard_storage::StorageBackend`]) as `{id}{ext}`.
//! - **Origins**: the scheme+host of every site that has been crawled, so
//!   no site is ever visited twice.
//!
//! Both tables live in the same database; [`ArtifactStore`] and
//! [`OriginLedger`] are views over one [`Database`] pool.

mod db;
pub mod error;
mod hash;
mod ledger;
mod models;
mod store;

pub use crate::db::Database;
pub use crate::hash::{ContentHash, hash};
pub use crate::ledger::OriginLedger;
pub use crate::models::{Artifact, Origin};
pub use crate::store::{ArtifactStore, MAX_RESULTS};
