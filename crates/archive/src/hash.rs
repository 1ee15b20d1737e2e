//! Content hashing of raw image bytes.

use crate::error::{Error, ErrorKind};
use exn::ResultExt;
use std::fmt;
use std::str::FromStr;

/// BLAKE3 digest of an image's raw bytes.
///
/// Used purely as the deduplication key: two byte-identical images always
/// produce the same hash, and the archive stores at most one artifact per
/// hash. Displays as 64 lowercase hex characters.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContentHash([u8; blake3::OUT_LEN]);

impl ContentHash {
    /// Hash raw bytes.
    pub fn of(bytes: impl AsRef<[u8]>) -> Self {
        Self(*blake3::hash(bytes.as_ref()).as_bytes())
    }

    pub fn as_bytes(&self) -> &[u8; blake3::OUT_LEN] {
        &self.0
    }
}

/// Hash raw image bytes. Shorthand for [`ContentHash::of`].
pub fn hash(bytes: impl AsRef<[u8]>) -> ContentHash {
    ContentHash::of(bytes)
}

impl TryFrom<&[u8]> for ContentHash {
    type Error = Error;
    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        let bytes = <[u8; blake3::OUT_LEN]>::try_from(bytes).or_raise(|| ErrorKind::InvalidData("content hash length"))?;
        Ok(Self(bytes))
    }
}

impl FromStr for ContentHash {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hash = blake3::Hash::from_hex(s).or_raise(|| ErrorKind::InvalidData("content hash hex"))?;
        Ok(Self(*hash.as_bytes()))
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(blake3::Hash::from_bytes(self.0).to_hex().as_str())
    }
}

impl fmt::Debug for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentHash({self})")
    }
}
