use crate::error::{Error, ErrorKind, Result};
use exn::ResultExt;
use std::fmt;
use std::str::FromStr;
use url::Url;

/// A site's scheme and host (plus port, when it isn't the scheme's default).
///
/// Path, query and fragment are discarded, so every page of a site maps to
/// the same origin: `https://a.test/page?x#y` becomes `https://a.test`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Origin(String);

impl Origin {
    /// Derive the origin of a URL.
    ///
    /// Returns [`ErrorKind::OpaqueOrigin`] for URLs without a tuple origin,
    /// such as `data:` or `file:` URLs.
    pub fn of(url: &Url) -> Result<Self> {
        let origin = url.origin();
        if !origin.is_tuple() {
            exn::bail!(ErrorKind::OpaqueOrigin(url.to_string()));
        }
        Ok(Self(origin.ascii_serialization()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for Origin {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self> {
        let url = Url::parse(s).or_raise(|| ErrorKind::OpaqueOrigin(s.to_string()))?;
        Self::of(&url)
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
