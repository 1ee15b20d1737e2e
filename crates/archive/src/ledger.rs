use crate::Database;
use crate::error::{ErrorKind, Result};
use crate::models::Origin;
use crate::store::is_unique_violation;
use exn::ResultExt;
use sqlx::SqlitePool;
use time::UtcDateTime;

/// Set of site origins that have already been crawled.
///
/// Entries are permanent; an origin recorded once is never crawled again.
#[derive(Debug, Clone)]
pub struct OriginLedger {
    pool: SqlitePool,
}

impl From<&Database> for OriginLedger {
    fn from(db: &Database) -> Self {
        Self { pool: db.pool().clone() }
    }
}

impl OriginLedger {
    pub async fn has(&self, origin: &Origin) -> Result<bool> {
        let found: i64 = sqlx::query_scalar(include_str!("../queries/origin_exists.sql"))
            .bind(origin.as_str())
            .fetch_one(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        Ok(found != 0)
    }

    /// Mark an origin as crawled.
    ///
    /// Returns [`ErrorKind::Constraint`] if it was already recorded.
    pub async fn record(&self, origin: &Origin) -> Result<()> {
        let result = sqlx::query(include_str!("../queries/insert_origin.sql"))
            .bind(UtcDateTime::now().unix_timestamp())
            .bind(origin.as_str())
            .execute(&self.pool)
            .await;
        match result {
            Ok(_) => Ok(()),
            Err(e) if is_unique_violation(&e) => Err(e).or_raise(|| ErrorKind::Constraint("origin")),
            Err(e) => Err(e).or_raise(|| ErrorKind::Database),
        }
    }

    pub async fn count(&self) -> Result<u64> {
        let count: i64 = sqlx::query_scalar(include_str!("../queries/count_origins.sql"))
            .fetch_one(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        u64::try_from(count).or_raise(|| ErrorKind::InvalidData("origin count"))
    }
}
