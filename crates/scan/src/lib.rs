//! Collaborators of the crawl loop: where sites come from, what's on them,
//! and which image URLs are worth keeping.
//!
//! The crawl loop only ever sees the [`DiscoverySource`], [`SiteScanner`] and
//! [`BadgeValidator`] traits. This crate also provides the HTTP-backed
//! implementations the binary runs with: [`HttpDiscovery`], [`HttpScanner`]
//! and [`BadgeUrlShape`].

mod consts;
mod discovery;
pub mod error;
pub mod http;
mod scanner;
#[cfg(test)]
mod testing;
mod validator;

pub use crate::discovery::{HttpDiscovery, parse_gallery};
use crate::error::Result;
pub use crate::scanner::{HttpScanner, ImageRef, has_dimensions, parse_images};
pub use crate::validator::BadgeUrlShape;
use async_trait::async_trait;
use url::Url;

/// Source of randomly selected candidate sites.
#[async_trait]
pub trait DiscoverySource: Send + Sync {
    /// A fresh batch of site URLs. Each call may return a different set.
    async fn fetch_batch(&self) -> Result<Vec<Url>>;
}

/// Finds badge candidates on a single page.
#[async_trait]
pub trait SiteScanner: Send + Sync {
    /// Fetch `url` and return the images it embeds, with their bytes.
    ///
    /// One hop only. Images that can't be downloaded are left out of the
    /// report rather than failing the scan.
    async fn scan(&self, url: &Url) -> Result<ScanReport>;
}

/// Predicate over image URLs.
pub trait BadgeValidator: Send + Sync {
    fn is_valid(&self, url: &Url) -> bool;
}

/// An image found on a scanned page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    /// Where the bytes were fetched from.
    pub url: Url,
    pub bytes: Vec<u8>,
    /// Where the image links to, if it's wrapped in a link.
    pub link: Option<Url>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanReport {
    pub images: Vec<Candidate>,
}
