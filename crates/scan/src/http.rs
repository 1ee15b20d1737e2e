//! Thin helpers over [`reqwest`] shared by discovery and scanning.

use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use hoard_config::HttpConfig;
use tracing::instrument;
use url::Url;

/// Build the HTTP client used for every request of a crawl.
pub fn client(config: &HttpConfig) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(&config.user_agent)
        .timeout(config.timeout())
        .redirect(reqwest::redirect::Policy::limited(5))
        .build()
        .or_raise(|| ErrorKind::Client)
}

async fn get(client: &reqwest::Client, url: &Url) -> Result<reqwest::Response> {
    let response = client.get(url.clone()).send().await.or_raise(|| ErrorKind::Network)?;
    let status = response.status();
    if !status.is_success() {
        exn::bail!(ErrorKind::Status(status.as_u16()));
    }
    Ok(response)
}

/// Fetch a page as text, decoded per its declared charset.
#[instrument(level = "debug", skip_all, fields(url = %url))]
pub(crate) async fn fetch_text(client: &reqwest::Client, url: &Url) -> Result<String> {
    get(client, url).await?.text().await.or_raise(|| ErrorKind::Network)
}

/// Fetch a body as raw bytes, giving up as soon as it exceeds `max_bytes`.
#[instrument(level = "debug", skip_all, fields(url = %url))]
pub(crate) async fn fetch_bytes(client: &reqwest::Client, url: &Url, max_bytes: u64) -> Result<Vec<u8>> {
    let mut response = get(client, url).await?;
    if response.content_length().is_some_and(|len| len > max_bytes) {
        exn::bail!(ErrorKind::TooLarge(max_bytes));
    }
    let mut bytes = Vec::new();
    while let Some(chunk) = response.chunk().await.or_raise(|| ErrorKind::Network)? {
        if (bytes.len() + chunk.len()) as u64 > max_bytes {
            exn::bail!(ErrorKind::TooLarge(max_bytes));
        }
        bytes.extend_from_slice(&chunk);
    }
    Ok(bytes)
}

/// Whether the URL is something we'd fetch.
pub(crate) fn is_http(url: &Url) -> bool {
    matches!(url.scheme(), "http" | "https") && url.host().is_some()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{self, MockSite};
    use rstest::rstest;

    #[rstest]
    #[case("https://a.test/", true)]
    #[case("http://a.test/x", true)]
    #[case("ftp://a.test/x", false)]
    #[case("mailto:me@a.test", false)]
    #[case("data:image/gif;base64,AAAA", false)]
    fn test_is_http(#[case] url: &str, #[case] expected: bool) {
        assert_eq!(is_http(&Url::parse(url).unwrap()), expected);
    }

    #[test]
    fn test_client_builds_from_defaults() {
        client(&HttpConfig::default()).unwrap();
    }

    #[tokio::test]
    async fn test_fetch_bytes() {
        let site = MockSite::default()
            .image("/small.png", vec![7; 16])
            .image("/big.png", vec![0; 4096])
            .status("/gone.png", 410)
            .serve()
            .await;
        let client = testing::client();
        let fetch = |path: &str| {
            let url = site.join(path).unwrap();
            let client = client.clone();
            async move { fetch_bytes(&client, &url, 1024).await }
        };
        assert_eq!(fetch("small.png").await.unwrap(), vec![7; 16]);
        assert!(matches!(&*fetch("big.png").await.unwrap_err(), ErrorKind::TooLarge(1024)));
        assert!(matches!(&*fetch("gone.png").await.unwrap_err(), ErrorKind::Status(410)));
        assert!(matches!(&*fetch("unknown.png").await.unwrap_err(), ErrorKind::Status(404)));
    }

    #[tokio::test]
    async fn test_fetch_text() {
        let site = MockSite::default().page("/", "<p>hello</p>").serve().await;
        assert_eq!(fetch_text(&testing::client(), &site).await.unwrap(), "<p>hello</p>");
    }
}
