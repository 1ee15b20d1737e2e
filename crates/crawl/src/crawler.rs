use crate::RoundReport;
use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use hoard_archive::{ArtifactStore, Origin, OriginLedger, hash};
use hoard_scan::{BadgeValidator, Candidate, DiscoverySource, SiteScanner};
use std::convert::Infallible;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::instrument;
use url::Url;

/// Pause after a failed discovery fetch, unless configured otherwise.
pub const DEFAULT_BACKOFF: Duration = Duration::from_secs(1);

/// Drives discovery, scanning and archiving.
///
/// The crawler is the archive's only writer and works strictly in sequence:
/// one site at a time, one image at a time. Ledger lookups always hit the
/// database, so an origin recorded earlier in a round is already skipped
/// later in that same round.
pub struct Crawler {
    store: ArtifactStore,
    ledger: OriginLedger,
    discovery: Arc<dyn DiscoverySource>,
    scanner: Arc<dyn SiteScanner>,
    validator: Arc<dyn BadgeValidator>,
    backoff: Duration,
    rounds: AtomicU64,
}

impl Crawler {
    pub fn new(
        store: ArtifactStore,
        ledger: OriginLedger,
        discovery: Arc<dyn DiscoverySource>,
        scanner: Arc<dyn SiteScanner>,
        validator: Arc<dyn BadgeValidator>,
    ) -> Self {
        Self {
            store,
            ledger,
            discovery,
            scanner,
            validator,
            backoff: DEFAULT_BACKOFF,
            rounds: AtomicU64::new(0),
        }
    }

    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }

    /// Crawl forever. Each round starts as soon as the previous one ends.
    pub async fn run(&self) -> Infallible {
        loop {
            self.round().await;
        }
    }

    /// Crawl a fixed number of rounds, returning their combined tally.
    pub async fn rounds(&self, count: u64) -> RoundReport {
        let mut total = RoundReport::default();
        for _ in 0..count {
            total += self.round().await;
        }
        total
    }

    /// One discovery batch, each site visited in turn.
    ///
    /// Never fails: discovery errors back off and end the round early, and
    /// site errors abandon only that site.
    #[instrument(skip_all, fields(round = tracing::field::Empty))]
    pub async fn round(&self) -> RoundReport {
        let round = self.rounds.fetch_add(1, Ordering::Relaxed);
        tracing::Span::current().record("round", round);
        let mut report = RoundReport::default();
        let urls = match self.discovery.fetch_batch().await {
            Ok(urls) => urls,
            Err(err) => {
                tracing::warn!(error = ?err, backoff = ?self.backoff, "Discovery failed, connection might be unstable");
                report.discovery_failures += 1;
                tokio::time::sleep(self.backoff).await;
                return report;
            },
        };
        report.discovered = urls.len() as u64;
        for url in &urls {
            if let Err(err) = self.visit(url, &mut report).await {
                report.failed += 1;
                tracing::warn!(url = %url, error = ?err, "Abandoned site");
            }
        }
        tracing::info!(
            discovered = report.discovered,
            skipped = report.skipped,
            scanned = report.scanned,
            failed = report.failed,
            rejected = report.rejected,
            duplicates = report.duplicates,
            stored = report.stored,
            "Round complete"
        );
        report
    }

    /// Process one discovered site. The origin is recorded only once every
    /// image on the page has been dealt with.
    async fn visit(&self, url: &Url, report: &mut RoundReport) -> Result<()> {
        let Ok(origin) = Origin::of(url) else {
            tracing::debug!(url = %url, "Skipping URL without a tuple origin");
            report.skipped += 1;
            return Ok(());
        };
        if self.ledger.has(&origin).await.or_raise(|| ErrorKind::Archive)? {
            tracing::debug!(url = %url, origin = %origin, "Skipping known origin");
            report.skipped += 1;
            return Ok(());
        }
        tracing::info!(url = %url, "Scanning site");
        let scan = self.scanner.scan(url).await.or_raise(|| ErrorKind::Scan)?;
        report.scanned += 1;
        for candidate in &scan.images {
            self.consider(candidate, report).await?;
        }
        self.ledger.record(&origin).await.or_raise(|| ErrorKind::Archive)?;
        tracing::debug!(origin = %origin, "Recorded origin");
        Ok(())
    }

    async fn consider(&self, candidate: &Candidate, report: &mut RoundReport) -> Result<()> {
        if !self.validator.is_valid(&candidate.url) {
            report.rejected += 1;
            return Ok(());
        }
        let hash = hash(&candidate.bytes);
        if self.store.exists(&hash).await.or_raise(|| ErrorKind::Archive)? {
            tracing::debug!(url = %candidate.url, hash = %hash, "Skipping known badge");
            report.duplicates += 1;
            return Ok(());
        }
        let link = candidate.link.as_ref().map(Url::as_str).unwrap_or_default();
        let artifact = self
            .store
            .insert(&candidate.bytes, &extension(&candidate.url), candidate.url.as_str(), link, &hash)
            .await
            .or_raise(|| ErrorKind::Archive)?;
        report.stored += 1;
        tracing::info!(id = artifact.id, url = %candidate.url, hash = %hash, "Stored new badge");
        Ok(())
    }
}

/// File extension for an image URL: everything from the last `.` in its
/// path, or the whole path if there is no `.`.
///
/// `https://a.test/badge.png` gives `.png`; `https://a.test/badge` gives
/// `/badge`.
pub fn extension(url: &Url) -> String {
    let path = url.path();
    match path.rfind('.') {
        Some(index) => path[index..].to_string(),
        None => path.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use hoard_archive::Database;
    use hoard_scan::error::{ErrorKind as ScanErrorKind, Result as ScanResult};
    use hoard_scan::{BadgeUrlShape, ScanReport};
    use hoard_storage::backend::MockBackend;
    use rstest::rstest;
    use std::collections::{HashMap, VecDeque};
    use std::sync::Mutex;

    /// Hands out the queued batches in order; `None` is a failed fetch.
    #[derive(Default)]
    struct FakeDiscovery {
        batches: Mutex<VecDeque<Option<Vec<Url>>>>,
    }

    #[async_trait]
    impl DiscoverySource for FakeDiscovery {
        async fn fetch_batch(&self) -> ScanResult<Vec<Url>> {
            match self.batches.lock().unwrap().pop_front() {
                Some(Some(urls)) => Ok(urls),
                Some(None) => Err(exn::Exn::from(ScanErrorKind::Network)),
                None => Ok(Vec::new()),
            }
        }
    }

    /// Serves canned pages; `None` is a failed scan, unknown pages are empty.
    #[derive(Default)]
    struct FakeScanner {
        pages: HashMap<Url, Option<Vec<Candidate>>>,
        scanned: Mutex<Vec<Url>>,
    }

    #[async_trait]
    impl SiteScanner for FakeScanner {
        async fn scan(&self, url: &Url) -> ScanResult<ScanReport> {
            self.scanned.lock().unwrap().push(url.clone());
            match self.pages.get(url) {
                Some(Some(images)) => Ok(ScanReport { images: images.clone() }),
                Some(None) => Err(exn::Exn::from(ScanErrorKind::Status(500))),
                None => Ok(ScanReport::default()),
            }
        }
    }

    struct Harness {
        crawler: Crawler,
        store: ArtifactStore,
        ledger: OriginLedger,
        backend: Arc<MockBackend>,
        scanner: Arc<FakeScanner>,
    }

    impl Harness {
        fn scanned(&self) -> Vec<String> {
            self.scanner.scanned.lock().unwrap().iter().map(Url::to_string).collect()
        }

        async fn recorded(&self, url: &str) -> bool {
            self.ledger.has(&url.parse().unwrap()).await.unwrap()
        }
    }

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    fn badge(src: &str, bytes: &[u8], link: Option<&str>) -> Candidate {
        Candidate { url: url(src), bytes: bytes.to_vec(), link: link.map(url) }
    }

    async fn harness(batches: Vec<Option<Vec<&str>>>, pages: Vec<(&str, Option<Vec<Candidate>>)>) -> Harness {
        let db = Database::connect_in_memory().await.unwrap();
        let backend = Arc::new(MockBackend::default());
        let store = ArtifactStore::open(&db, backend.clone()).await.unwrap();
        let ledger = OriginLedger::from(&db);
        let discovery = FakeDiscovery {
            batches: Mutex::new(
                batches.into_iter().map(|batch| batch.map(|urls| urls.into_iter().map(url).collect())).collect(),
            ),
        };
        let scanner = Arc::new(FakeScanner {
            pages: pages.into_iter().map(|(page, images)| (url(page), images)).collect(),
            ..FakeScanner::default()
        });
        let crawler = Crawler::new(
            store.clone(),
            ledger.clone(),
            Arc::new(discovery),
            scanner.clone(),
            Arc::new(BadgeUrlShape),
        );
        Harness { crawler, store, ledger, backend, scanner }
    }

    #[tokio::test]
    async fn test_end_to_end_round() {
        let h = harness(
            vec![Some(vec!["https://a.test/page", "https://a.test/other"])],
            vec![(
                "https://a.test/page",
                Some(vec![
                    badge("https://a.test/buttons/me.gif", b"GIF89a-me", Some("https://b.test/")),
                    badge("https://a.test/notes.html", b"<html>", None),
                ]),
            )],
        )
        .await;

        let report = h.crawler.round().await;

        assert_eq!(h.store.count().await.unwrap(), 1);
        let artifact = h.store.get(0).await.unwrap().unwrap();
        assert_eq!(artifact.filename, "0.gif");
        assert_eq!(artifact.source_url, "https://a.test/buttons/me.gif");
        assert_eq!(artifact.link_target, "https://b.test/");
        assert_eq!(artifact.content_hash, hash(b"GIF89a-me"));
        assert!(h.recorded("https://a.test").await);
        // Live ledger: the second URL shares the first one's origin.
        assert_eq!(h.scanned(), vec!["https://a.test/page"]);
        assert_eq!(
            report,
            RoundReport { discovered: 2, skipped: 1, scanned: 1, rejected: 1, stored: 1, ..RoundReport::default() }
        );
    }

    #[tokio::test]
    async fn test_failed_scan_is_isolated() {
        let h = harness(
            vec![Some(vec!["https://one.test/", "https://two.test/", "https://three.test/"])],
            vec![
                ("https://one.test/", Some(vec![badge("https://one.test/1.png", b"one", None)])),
                ("https://two.test/", None),
                ("https://three.test/", Some(vec![badge("https://three.test/3.png", b"three", None)])),
            ],
        )
        .await;

        let report = h.crawler.round().await;

        assert_eq!(report.failed, 1);
        assert_eq!(report.stored, 2);
        assert_eq!(h.store.count().await.unwrap(), 2);
        assert!(h.recorded("https://one.test").await);
        assert!(!h.recorded("https://two.test").await);
        assert!(h.recorded("https://three.test").await);
        assert_eq!(h.ledger.count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_failed_site_is_retried_in_a_later_round() {
        let h = harness(
            vec![Some(vec!["https://flaky.test/"]), Some(vec!["https://flaky.test/"])],
            vec![("https://flaky.test/", None)],
        )
        .await;
        let total = h.crawler.rounds(2).await;
        assert_eq!(total.failed, 2);
        assert_eq!(h.scanned().len(), 2);
        assert!(!h.recorded("https://flaky.test").await);
    }

    #[tokio::test]
    async fn test_recorded_origin_is_never_rescanned() {
        let h = harness(
            vec![Some(vec!["https://a.test/"]), Some(vec!["https://a.test/elsewhere", "http://a.test/"])],
            vec![],
        )
        .await;
        let total = h.crawler.rounds(2).await;
        // A different scheme is a different origin.
        assert_eq!(h.scanned(), vec!["https://a.test/", "http://a.test/"]);
        assert_eq!(total.skipped, 1);
        assert_eq!(total.scanned, 2);
    }

    #[tokio::test]
    async fn test_each_unique_image_is_stored_once() {
        let h = harness(
            vec![Some(vec!["https://one.test/", "https://two.test/"])],
            vec![
                (
                    "https://one.test/",
                    Some(vec![
                        badge("https://one.test/a.gif", b"shared", None),
                        badge("https://one.test/again.gif", b"shared", None),
                        badge("https://one.test/b.gif", b"only-one", None),
                    ]),
                ),
                ("https://two.test/", Some(vec![badge("https://two.test/copy.gif", b"shared", None)])),
            ],
        )
        .await;

        let report = h.crawler.round().await;

        assert_eq!(report.stored, 2);
        assert_eq!(report.duplicates, 2);
        assert_eq!(h.store.count().await.unwrap(), 2);
        assert_eq!(h.backend.len().await, 2);
        let first = h.store.get(0).await.unwrap().unwrap();
        assert_eq!(first.source_url, "https://one.test/a.gif");
    }

    #[tokio::test]
    async fn test_ids_stay_dense_across_skips() {
        let h = harness(
            vec![Some(vec!["https://one.test/", "https://two.test/"])],
            vec![
                (
                    "https://one.test/",
                    Some(vec![
                        badge("https://one.test/x.svg", b"rejected", None),
                        badge("https://one.test/a.gif", b"a", None),
                        badge("https://one.test/dupe.gif", b"a", None),
                    ]),
                ),
                (
                    "https://two.test/",
                    Some(vec![badge("https://two.test/b.png", b"b", None), badge("https://two.test/badge", b"c", None)]),
                ),
            ],
        )
        .await;
        h.crawler.round().await;
        let artifacts = h.store.page(100, 0).await.unwrap();
        let ids: Vec<u64> = artifacts.iter().map(|a| a.id).collect();
        let filenames: Vec<&str> = artifacts.iter().map(|a| a.filename.as_str()).collect();
        assert_eq!(ids, vec![0, 1, 2]);
        assert_eq!(filenames, vec!["0.gif", "1.png", "2/badge"]);
    }

    #[tokio::test]
    async fn test_storage_failure_abandons_the_site() {
        let h = harness(
            vec![Some(vec!["https://one.test/", "https://two.test/"])],
            vec![("https://one.test/", Some(vec![badge("https://one.test/a.gif", b"a", None)]))],
        )
        .await;
        h.backend.fail_writes(true);

        let report = h.crawler.round().await;

        assert_eq!(report.failed, 1);
        assert_eq!(report.stored, 0);
        assert!(!h.recorded("https://one.test").await);
        // The round carried on to a site with nothing to store.
        assert!(h.recorded("https://two.test").await);
        assert_eq!(h.store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_opaque_origin_is_skipped() {
        let h = harness(vec![Some(vec!["data:text/html,hello", "https://a.test/"])], vec![]).await;
        let report = h.crawler.round().await;
        assert_eq!(report.skipped, 1);
        assert_eq!(h.scanned(), vec!["https://a.test/"]);
    }

    #[tokio::test]
    async fn test_discovery_failure_backs_off() {
        let h = harness(vec![None, Some(vec!["https://a.test/"])], vec![]).await;
        let crawler = h.crawler.with_backoff(Duration::from_millis(50));

        let start = tokio::time::Instant::now();
        let report = crawler.round().await;
        assert!(start.elapsed() >= Duration::from_millis(50));
        assert_eq!(report, RoundReport { discovery_failures: 1, ..RoundReport::default() });
        assert!(h.scanner.scanned.lock().unwrap().is_empty());

        // The next round proceeds normally.
        let report = crawler.round().await;
        assert_eq!(report.scanned, 1);
        // Both rounds are numbered, the failed one included.
        assert_eq!(crawler.rounds.load(Ordering::Relaxed), 2);
    }

    #[rstest]
    #[case("https://x.test/badge.png", ".png")]
    #[case("https://x.test/buttons/88x31.GIF?v=1", ".GIF")]
    #[case("https://x.test/badge", "/badge")]
    #[case("https://x.test/v1.2/badge", ".2/badge")]
    #[case("https://x.test/", "/")]
    fn test_extension(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(extension(&url(input)), expected);
    }
}
