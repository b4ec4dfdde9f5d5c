//! Normalized identities for resources governed by capability tokens

use crate::constants::FILE_URI_SCHEME;
use crate::errors::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};
use std::ops::Deref;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use url::Url;

/// A normalized path identifying the resource a token governs.
///
/// Normalization is lexical only (no symlink resolution, no file-system access), so
/// the same logical location maps to the same identity across process restarts.
/// `file://` URIs are accepted and reduced to their path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ResourceIdentity(String);

impl ResourceIdentity {
    /// Create a new ResourceIdentity from a path or `file://` URI
    pub fn new(raw: impl AsRef<str>) -> Result<Self> {
        let raw = raw.as_ref().trim();
        if raw.is_empty() {
            return Err(Error::configuration("resource identity cannot be empty"));
        }

        if raw.starts_with(FILE_URI_SCHEME) {
            return Self::from_file_uri(raw);
        }
        Ok(Self(normalize(raw)))
    }

    /// Reduce a local `file://` URI to its decoded path
    fn from_file_uri(raw: &str) -> Result<Self> {
        let url = Url::parse(raw)
            .map_err(|e| Error::configuration(format!("invalid file URI '{raw}': {e}")))?;
        let path = url.to_file_path().map_err(|()| {
            Error::configuration(format!(
                "unsupported file URI '{raw}': only local absolute paths are allowed"
            ))
        })?;
        let text = path.to_str().ok_or_else(|| {
            Error::configuration(format!("file URI '{raw}' is not valid UTF-8"))
        })?;
        Ok(Self(normalize(text)))
    }

    /// Create an identity from a file-system path
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = path.to_str().ok_or_else(|| {
            Error::configuration(format!("path '{}' is not valid UTF-8", path.display()))
        })?;
        Self::new(text)
    }

    /// Get the normalized identity string
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// View the identity as a file-system path
    #[must_use]
    pub fn to_path_buf(&self) -> PathBuf {
        PathBuf::from(&self.0)
    }

    /// Whether the identity is rooted
    #[must_use]
    pub fn is_absolute(&self) -> bool {
        self.0.starts_with('/')
    }
}

fn normalize(path: &str) -> String {
    let absolute = path.starts_with('/');
    let mut segments: Vec<&str> = Vec::new();

    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => match segments.last() {
                Some(&last) if last != ".." => {
                    segments.pop();
                }
                // Cannot climb above the root
                _ if absolute => {}
                _ => segments.push(".."),
            },
            other => segments.push(other),
        }
    }

    let joined = segments.join("/");
    match (absolute, joined.is_empty()) {
        (true, _) => format!("/{joined}"),
        (false, true) => ".".to_string(),
        (false, false) => joined,
    }
}

impl Display for ResourceIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Deref for ResourceIdentity {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl AsRef<str> for ResourceIdentity {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl FromStr for ResourceIdentity {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

impl TryFrom<&str> for ResourceIdentity {
    type Error = Error;

    fn try_from(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

impl TryFrom<String> for ResourceIdentity {
    type Error = Error;

    fn try_from(s: String) -> Result<Self> {
        Self::new(s)
    }
}

impl From<ResourceIdentity> for String {
    fn from(identity: ResourceIdentity) -> Self {
        identity.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_plain_paths_are_normalized() {
        let cases = [
            ("/Users/x/Documents", "/Users/x/Documents"),
            ("/Users/x/Documents/", "/Users/x/Documents"),
            ("  /Users//x/./Documents ", "/Users/x/Documents"),
            ("/Users/x/Downloads/../Documents", "/Users/x/Documents"),
            ("/../..", "/"),
            ("/", "/"),
            ("relative/./dir/..", "relative"),
            ("../shared", "../shared"),
            ("a/..", "."),
        ];

        for (raw, expected) in cases {
            assert_eq!(ResourceIdentity::new(raw).unwrap().as_str(), expected, "{raw}");
        }
    }

    #[test]
    fn test_file_uris_reduce_to_paths() {
        let from_uri = ResourceIdentity::new("file:///Users/x/My%20Documents/").unwrap();
        let from_host = ResourceIdentity::new("file://localhost/Users/x/My%20Documents").unwrap();
        let from_path = ResourceIdentity::new("/Users/x/My Documents").unwrap();

        assert_eq!(from_uri, from_path);
        assert_eq!(from_host, from_path);
    }

    #[test]
    fn test_invalid_identities_are_rejected() {
        assert!(ResourceIdentity::new("").is_err());
        assert!(ResourceIdentity::new("   ").is_err());
        assert!(ResourceIdentity::new("file://server/share").is_err());
        assert!(ResourceIdentity::new("file:///bad%FFbyte").is_err());
    }

    #[test]
    fn test_file_uri_decoding_handles_escapes_and_dot_segments() {
        let cases = [
            ("file:///Users/x/%C3%A9t%C3%A9", "/Users/x/été"),
            ("file:///Users/x/Downloads/../Documents", "/Users/x/Documents"),
            ("file:///Users/x/100%25", "/Users/x/100%"),
            ("file:///Users/x/caf%c3%a9", "/Users/x/café"),
        ];

        for (raw, expected) in cases {
            assert_eq!(ResourceIdentity::new(raw).unwrap().as_str(), expected, "{raw}");
        }
    }

    #[test]
    fn test_serde_uses_the_normalized_string() {
        let identity = ResourceIdentity::new("/tmp//x/").unwrap();
        let json = serde_json::to_string(&identity).unwrap();
        assert_eq!(json, "\"/tmp/x\"");

        let parsed: ResourceIdentity = serde_json::from_str("\"/tmp/./x\"").unwrap();
        assert_eq!(parsed, identity);
    }

    proptest! {
        #[test]
        fn normalization_is_idempotent(path in "(/[a-zA-Z0-9 ._-]{1,8}){1,6}/?") {
            let once = ResourceIdentity::new(&path).unwrap();
            let twice = ResourceIdentity::new(once.as_str()).unwrap();
            prop_assert_eq!(once, twice);
        }
    }
}
