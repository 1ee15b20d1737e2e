//! Byte storage for archived badge images.
//!
//! The archive keeps image bytes outside of the database, one file per
//! artifact, named after the artifact's id and source extension. This crate
//! provides the [`StorageBackend`] abstraction those files are written
//! through, plus the path validation every backend enforces.

pub mod backend;
pub mod error;
mod models;
mod path;

pub use crate::backend::StorageBackend;
pub use crate::models::FileInfo;
pub use crate::path::validate as validate_path;
use std::sync::Arc;

pub type BackendHandle = Arc<dyn StorageBackend + Send + Sync>;
