use crate::error::{Error, ErrorKind};
use crate::hash::ContentHash;
use exn::ResultExt;
use time::UtcDateTime;

/// A stored, unique badge image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    /// Dense sequence number, assigned once in discovery order.
    pub id: u64,
    pub discovered_at: UtcDateTime,
    /// `{id}{extension}`, relative to the image store root.
    pub filename: String,
    /// Where the image bytes were fetched from.
    pub source_url: String,
    /// Where the badge links to; empty if it isn't wrapped in a link.
    pub link_target: String,
    pub content_hash: ContentHash,
}

#[derive(sqlx::FromRow)]
pub(crate) struct ArtifactRow {
    pub(crate) id: i64,
    pub(crate) discovered_at: i64,
    pub(crate) filename: String,
    pub(crate) source_url: String,
    pub(crate) link_target: String,
    pub(crate) content_hash: Vec<u8>,
}
impl TryFrom<&Artifact> for ArtifactRow {
    type Error = Error;
    fn try_from(artifact: &Artifact) -> Result<Self, Self::Error> {
        Ok(Self {
            id: i64::try_from(artifact.id).or_raise(|| ErrorKind::InvalidData("artifact id"))?,
            discovered_at: artifact.discovered_at.unix_timestamp(),
            filename: artifact.filename.clone(),
            source_url: artifact.source_url.clone(),
            link_target: artifact.link_target.clone(),
            content_hash: artifact.content_hash.as_bytes().to_vec(),
        })
    }
}
impl TryFrom<ArtifactRow> for Artifact {
    type Error = Error;
    fn try_from(row: ArtifactRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: u64::try_from(row.id).or_raise(|| ErrorKind::InvalidData("artifact id"))?,
            discovered_at: UtcDateTime::from_unix_timestamp(row.discovered_at)
                .or_raise(|| ErrorKind::InvalidData("discovery date"))?,
            filename: row.filename,
            source_url: row.source_url,
            link_target: row.link_target,
            content_hash: ContentHash::try_from(row.content_hash.as_slice())?,
        })
    }
}
