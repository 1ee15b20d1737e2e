use crate::consts::IMAGE_SELECTOR;
use crate::error::Result;
use crate::http::{fetch_bytes, fetch_text, is_http};
use crate::{Candidate, ScanReport, SiteScanner};
use async_trait::async_trait;
use futures::StreamExt;
use hoard_config::ScanConfig;
use scraper::{ElementRef, Html};
use std::collections::HashSet;
use std::io::Cursor;
use tracing::instrument;
use url::Url;

/// An image reference found on a page, before its bytes are fetched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRef {
    pub image: Url,
    /// Nearest enclosing `a[href]`, resolved.
    pub link: Option<Url>,
}

/// Scans a single page over HTTP and downloads the images it embeds.
///
/// Only the page itself is fetched; links are recorded, never followed.
pub struct HttpScanner {
    client: reqwest::Client,
    max_images: usize,
    max_image_bytes: u64,
    concurrency: usize,
    dimensions: Option<(u32, u32)>,
}

impl HttpScanner {
    pub fn new(client: reqwest::Client, config: &ScanConfig) -> Self {
        Self {
            client,
            max_images: config.max_images,
            max_image_bytes: config.max_image_bytes,
            concurrency: config.concurrency.max(1),
            dimensions: config.badge.enforce_dimensions.then_some((config.badge.width, config.badge.height)),
        }
    }

    async fn download(&self, found: ImageRef) -> Option<Candidate> {
        let bytes = match fetch_bytes(&self.client, &found.image, self.max_image_bytes).await {
            Ok(bytes) => bytes,
            Err(err) => {
                tracing::debug!(url = %found.image, error = ?err, "Skipping image that failed to download");
                return None;
            },
        };
        if let Some((width, height)) = self.dimensions
            && !has_dimensions(&bytes, width, height)
        {
            tracing::debug!(url = %found.image, "Skipping image with the wrong dimensions");
            return None;
        }
        Some(Candidate { url: found.image, bytes, link: found.link })
    }
}

#[async_trait]
impl SiteScanner for HttpScanner {
    #[instrument(skip_all, fields(url = %url))]
    async fn scan(&self, url: &Url) -> Result<ScanReport> {
        let html = fetch_text(&self.client, url).await?;
        let found = parse_images(&html, url, self.max_images);
        tracing::debug!(count = found.len(), "Found images");
        // Order preserving: candidates come back in page order.
        let images: Vec<Candidate> = futures::stream::iter(found)
            .map(|found| self.download(found))
            .buffered(self.concurrency)
            .filter_map(std::future::ready)
            .collect()
            .await;
        Ok(ScanReport { images })
    }
}

/// Find the distinct http(s) images on a page, in document order.
///
/// `src` attributes are resolved against `base`. At most `max` images are
/// returned.
pub fn parse_images(html: &str, base: &Url, max: usize) -> Vec<ImageRef> {
    let document = Html::parse_document(html);
    let mut seen = HashSet::new();
    document
        .select(&IMAGE_SELECTOR)
        .filter_map(|img| {
            let image = base.join(img.value().attr("src")?.trim()).ok()?;
            Some(ImageRef { link: enclosing_link(img, base), image })
        })
        .filter(|found| is_http(&found.image))
        .filter(|found| seen.insert(found.image.clone()))
        .take(max)
        .collect()
}

fn enclosing_link(element: ElementRef<'_>, base: &Url) -> Option<Url> {
    let anchor = element
        .ancestors()
        .filter_map(ElementRef::wrap)
        .find(|ancestor| ancestor.value().name() == "a" && ancestor.value().attr("href").is_some())?;
    base.join(anchor.value().attr("href")?.trim()).ok()
}

/// Whether `bytes` decode to an image of exactly `width`×`height`.
///
/// Only the header is read. Bytes in an unrecognised format never match.
pub fn has_dimensions(bytes: &[u8], width: u32, height: u32) -> bool {
    image::ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .ok()
        .and_then(|reader| reader.into_dimensions().ok())
        == Some((width, height))
}
