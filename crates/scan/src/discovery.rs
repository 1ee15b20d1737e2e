use crate::DiscoverySource;
use crate::error::{ErrorKind, Result};
use crate::http::{fetch_text, is_http};
use async_trait::async_trait;
use exn::ResultExt;
use hoard_config::DiscoveryConfig;
use scraper::{Html, Selector};
use std::collections::HashSet;
use tracing::instrument;
use url::Url;

/// Discovers sites by scraping a page that lists random sites.
///
/// Every fetch of the configured page is expected to return a different
/// random selection.
pub struct HttpDiscovery {
    client: reqwest::Client,
    url: Url,
    selector: Selector,
}

impl HttpDiscovery {
    pub fn new(client: reqwest::Client, config: &DiscoveryConfig) -> Result<Self> {
        let url = Url::parse(&config.url).or_raise(|| ErrorKind::InvalidConfig(format!("discovery URL {}", config.url)))?;
        let selector = Selector::parse(&config.selector)
            .map_err(|e| ErrorKind::InvalidConfig(format!("discovery selector {}: {e}", config.selector)))?;
        Ok(Self { client, url, selector })
    }
}

#[async_trait]
impl DiscoverySource for HttpDiscovery {
    #[instrument(skip(self), fields(url = %self.url))]
    async fn fetch_batch(&self) -> Result<Vec<Url>> {
        let html = fetch_text(&self.client, &self.url).await?;
        let urls = parse_gallery(&html, &self.url, &self.selector);
        tracing::debug!(count = urls.len(), "Discovered sites");
        Ok(urls)
    }
}

/// Extract site links from a listing page.
///
/// Links are resolved against `base`; anything that isn't http(s) is
/// dropped, and each URL is kept once, in page order.
pub fn parse_gallery(html: &str, base: &Url, selector: &Selector) -> Vec<Url> {
    let document = Html::parse_document(html);
    let mut seen = HashSet::new();
    document
        .select(selector)
        .filter_map(|element| element.value().attr("href"))
        .filter_map(|href| base.join(href.trim()).ok())
        .filter(is_http)
        .filter(|url| seen.insert(url.clone()))
        .collect()
}
