//! Content-addressed storage of unique badge images.

use crate::Database;
use crate::error::{ErrorKind, Result};
use crate::hash::ContentHash;
use crate::models::{Artifact, ArtifactRow};
use exn::ResultExt;
use futures::TryStreamExt;
use hoard_storage::{BackendHandle, FileInfo, validate_path};
use sqlx::SqlitePool;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use time::UtcDateTime;
use tokio::sync::Mutex;
use tracing::instrument;

/// Upper bound on rows returned by any listing query.
pub const MAX_RESULTS: u64 = 1000;

/// Repository of [`Artifact`]s and the image files they reference.
///
/// Each unique [`ContentHash`] is stored at most once. Ids come from a
/// sequence owned by the store: it is read from the database when the store
/// is opened and only advances after an artifact row is committed, so ids are
/// dense (`0..N`) no matter how many inserts fail along the way.
///
/// # Single writer
///
/// [`insert`](Self::insert) holds the sequence lock for its whole duration,
/// including the duplicate check. Clones share the same lock, so concurrent
/// callers can never be handed the same id. Two *processes* writing to the
/// same archive are not supported.
///
/// # Failure atomicity
///
/// The image file is written before its row. A failure between the two
/// leaves at worst an unreferenced file (see [`orphans`](Self::orphans)),
/// never a row pointing at a missing file. When the row write fails, the file
/// is deleted again; if that delete fails too, the file is left behind as an
/// orphan. The id isn't consumed either way, so the next insert reuses it.
#[derive(Clone)]
pub struct ArtifactStore {
    pool: SqlitePool,
    backend: BackendHandle,
    sequence: Arc<Mutex<u64>>,
}

impl ArtifactStore {
    /// Open the store, synchronising the id sequence with the database.
    pub async fn open(db: &Database, backend: BackendHandle) -> Result<Self> {
        let pool = db.pool().clone();
        let next: i64 = sqlx::query_scalar(include_str!("../queries/next_artifact_id.sql"))
            .fetch_one(&pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        let next = u64::try_from(next).or_raise(|| ErrorKind::InvalidData("artifact id"))?;
        tracing::debug!(backend = backend.name(), next_id = next, "Opened artifact store");
        Ok(Self { pool, backend, sequence: Arc::new(Mutex::new(next)) })
    }

    /// Number of artifacts currently stored.
    pub async fn count(&self) -> Result<u64> {
        let count: i64 = sqlx::query_scalar(include_str!("../queries/count_artifacts.sql"))
            .fetch_one(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        u64::try_from(count).or_raise(|| ErrorKind::InvalidData("artifact count"))
    }

    /// Whether an artifact with this content hash is already stored.
    pub async fn exists(&self, hash: &ContentHash) -> Result<bool> {
        let found: i64 = sqlx::query_scalar(include_str!("../queries/artifact_exists.sql"))
            .bind(hash.as_bytes().as_slice())
            .fetch_one(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        Ok(found != 0)
    }

    /// Store a new unique image.
    ///
    /// Assigns the next id, writes `bytes` to `{id}{extension}` in the image
    /// store, then writes the artifact row.
    ///
    /// Returns [`ErrorKind::Constraint`] without writing anything if `hash`
    /// is already stored, and [`ErrorKind::Storage`] or
    /// [`ErrorKind::Database`] if either write fails.
    #[instrument(level = "debug", skip_all, fields(bytes = bytes.len(), hash = %hash, url = source_url))]
    pub async fn insert(
        &self,
        bytes: &[u8],
        extension: &str,
        source_url: &str,
        link_target: &str,
        hash: &ContentHash,
    ) -> Result<Artifact> {
        let mut next = self.sequence.lock().await;
        if self.exists(hash).await? {
            exn::bail!(ErrorKind::Constraint("content hash"));
        }
        let artifact = Artifact {
            id: *next,
            discovered_at: UtcDateTime::now(),
            filename: format!("{}{}", *next, extension),
            source_url: source_url.to_string(),
            link_target: link_target.to_string(),
            content_hash: *hash,
        };
        let row = ArtifactRow::try_from(&artifact)?;
        let path = Path::new(&artifact.filename);
        self.backend.write(path, bytes).await.or_raise(|| ErrorKind::Storage)?;
        let inserted = sqlx::query(include_str!("../queries/insert_artifact.sql"))
            .bind(row.id)
            .bind(row.discovered_at)
            .bind(row.filename)
            .bind(row.source_url)
            .bind(row.link_target)
            .bind(row.content_hash)
            .execute(&self.pool)
            .await;
        if let Err(e) = inserted {
            // Best effort; a file that survives shows up in `orphans`.
            if let Err(cleanup) = self.backend.delete(path).await {
                tracing::warn!(path = %path.display(), error = ?cleanup, "Could not remove orphaned image file");
            }
            let kind = if is_unique_violation(&e) { ErrorKind::Constraint("content hash") } else { ErrorKind::Database };
            return Err(e).or_raise(|| kind);
        }
        *next += 1;
        Ok(artifact)
    }

    /// Get an artifact by id.
    pub async fn get(&self, id: u64) -> Result<Option<Artifact>> {
        let id = i64::try_from(id).or_raise(|| ErrorKind::InvalidData("artifact id"))?;
        let row: Option<ArtifactRow> = sqlx::query_as(include_str!("../queries/get_artifact.sql"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        row.map(Artifact::try_from).transpose()
    }

    /// Case-insensitive substring search over source URLs and link targets.
    ///
    /// Returns at most [`MAX_RESULTS`] artifacts, ordered by id.
    pub async fn search(&self, text: &str) -> Result<Vec<Artifact>> {
        let rows: Vec<ArtifactRow> = sqlx::query_as(include_str!("../queries/search_artifacts.sql"))
            .bind(text)
            .bind(text)
            .bind(MAX_RESULTS as i64)
            .fetch_all(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        rows.into_iter().map(Artifact::try_from).collect()
    }

    /// A page of artifacts ordered by id. `limit` is capped at [`MAX_RESULTS`].
    pub async fn page(&self, limit: u64, offset: u64) -> Result<Vec<Artifact>> {
        let limit = limit.min(MAX_RESULTS) as i64;
        let offset = i64::try_from(offset).or_raise(|| ErrorKind::InvalidData("page offset"))?;
        let rows: Vec<ArtifactRow> = sqlx::query_as(include_str!("../queries/page_artifacts.sql"))
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        rows.into_iter().map(Artifact::try_from).collect()
    }

    /// A random, unordered sample of up to `n` artifacts (capped at
    /// [`MAX_RESULTS`]).
    pub async fn sample(&self, n: u64) -> Result<Vec<Artifact>> {
        let rows: Vec<ArtifactRow> = sqlx::query_as(include_str!("../queries/sample_artifacts.sql"))
            .bind(n.min(MAX_RESULTS) as i64)
            .fetch_all(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        rows.into_iter().map(Artifact::try_from).collect()
    }

    /// Read an artifact's image bytes back from the image store.
    pub async fn read(&self, artifact: &Artifact) -> Result<Vec<u8>> {
        self.backend.read(Path::new(&artifact.filename)).await.or_raise(|| ErrorKind::Storage)
    }

    /// Files in the image store that no artifact row references.
    ///
    /// These are left behind when a row write fails after its file was
    /// written. Nothing is deleted.
    #[instrument(skip(self))]
    pub async fn orphans(&self) -> Result<Vec<FileInfo>> {
        let filenames: Vec<String> = sqlx::query_scalar(include_str!("../queries/list_artifact_filenames.sql"))
            .fetch_all(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        let known = filenames
            .iter()
            .map(|f| validate_path(f).or_raise(|| ErrorKind::InvalidData("stored filename")))
            .collect::<Result<HashSet<PathBuf>>>()?;
        self.backend
            .list_stream()
            .try_filter(|file| std::future::ready(!known.contains(&file.path)))
            .try_collect()
            .await
            .or_raise(|| ErrorKind::Storage)
    }
}

pub(crate) fn is_unique_violation(error: &sqlx::Error) -> bool {
    matches!(error, sqlx::Error::Database(db) if db.is_unique_violation())
}
