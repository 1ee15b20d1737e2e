//! Path validation.
//!
//! Stored filenames are derived from URLs found on arbitrary websites, so
//! every path handed to a backend goes through [`validate`] first.

use std::path::{Component, Path, PathBuf};

use crate::error::{ErrorKind, Result};

/// Validates a storage path and returns its normalized form.
///
/// A valid path is relative to the storage root and never escapes it. `.`
/// components, repeated and trailing separators are dropped; `..` is resolved
/// as long as it stays within the root. Null bytes are rejected.
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use hoard_storage::validate_path;
/// assert!(validate_path("0.gif").is_ok());
/// assert!(validate_path("12/badge").is_ok());
/// assert!(validate_path("../0.gif").is_err());
/// assert!(validate_path("a\0b").is_err());
/// assert_eq!(validate_path("/7.png").unwrap(), Path::new("7.png"));
/// assert_eq!(validate_path("3/./x/../badge").unwrap(), Path::new("3/badge"));
/// ```
pub fn validate(path: impl AsRef<Path>) -> Result<PathBuf> {
    let original = path.as_ref();
    let invalid = || ErrorKind::InvalidPath(original.to_path_buf());
    let mut components = Vec::new();
    for component in original.components() {
        match component {
            Component::Normal(s) => {
                // Null bytes survive Path::components() on Unix but truncate in syscalls.
                if s.as_encoded_bytes().contains(&0) {
                    exn::bail!(invalid());
                }
                components.push(s)
            },
            // Leading slashes are treated as relative to the storage root.
            Component::CurDir | Component::RootDir => {},
            Component::Prefix(_) => exn::bail!(invalid()),
            Component::ParentDir => {
                if components.pop().is_none() {
                    exn::bail!(invalid());
                }
            },
        }
    }
    match components.is_empty() {
        true => exn::bail!(invalid()),
        false => Ok(components.into_iter().collect()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("0.gif", "0.gif")]
    #[case("41.png", "41.png")]
    #[case("3/badge", "3/badge")]
    #[case("/9.jpg", "9.jpg")]
    #[case("a//b//c", "a/b/c")]
    #[case("a/./b/./c", "a/b/c")]
    #[case("a/b/..", "a")]
    #[case("12.v2/badge/", "12.v2/badge")]
    fn test_valid_paths(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(validate(input).unwrap(), Path::new(expected));
    }

    #[rstest]
    #[case("")]
    #[case(".")]
    #[case("./")]
    #[case("//")]
    #[case("..")]
    #[case("../0.gif")]
    #[case("a/../../b")]
    #[case("a\0b")]
    fn test_invalid_paths(#[case] input: &str) {
        let err = validate(input).unwrap_err();
        assert!(matches!(&*err, ErrorKind::InvalidPath(_)));
    }
}
