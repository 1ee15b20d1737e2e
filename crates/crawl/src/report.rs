use derive_more::{AddAssign, Display};

/// Tally of what happened during one or more crawl rounds.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, AddAssign, Display)]
#[display(
    "{discovery_failures} discovery failures, {discovered} discovered, {skipped} skipped, \
     {scanned} scanned, {failed} failed, {rejected} rejected, {duplicates} duplicates, {stored} stored"
)]
pub struct RoundReport {
    /// Discovery fetches that failed (at most one per round).
    pub discovery_failures: u64,
    /// Site URLs returned by discovery.
    pub discovered: u64,
    /// URLs whose origin was already crawled or has no tuple origin.
    pub skipped: u64,
    /// Sites fetched by the scanner.
    pub scanned: u64,
    /// Sites abandoned because of a scan or archive failure.
    pub failed: u64,
    /// Images whose URL the validator refused.
    pub rejected: u64,
    /// Images whose content was already archived.
    pub duplicates: u64,
    /// New artifacts.
    pub stored: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accumulate() {
        let mut total = RoundReport::default();
        total += RoundReport { discovered: 3, stored: 1, ..RoundReport::default() };
        total += RoundReport { discovered: 2, stored: 2, failed: 1, ..RoundReport::default() };
        total += RoundReport { discovery_failures: 1, ..RoundReport::default() };
        assert_eq!(total.discovered, 5);
        assert_eq!(total.stored, 3);
        assert_eq!(total.failed, 1);
        assert_eq!(total.discovery_failures, 1);
        assert_eq!(
            total.to_string(),
            "1 discovery failures, 5 discovered, 0 skipped, 0 scanned, 1 failed, 0 rejected, 0 duplicates, 3 stored"
        );
    }
}
