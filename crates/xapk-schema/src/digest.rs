//! Content digest newtype.

use serde::{Deserialize, Serialize};

/// Newtype for a content digest rendered as a hex string.
///
/// The inner string is trimmed and lowercased on construction, so a digest
/// read from the server compares equal to one computed locally regardless of
/// the server's casing. No length validation is applied: identity is plain
/// string equality.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(from = "String", into = "String")]
pub struct ContentDigest(String);

impl ContentDigest {
    /// Create a new `ContentDigest`, normalising the input.
    pub fn new(s: impl AsRef<str>) -> Self {
        Self(s.as_ref().trim().to_ascii_lowercase())
    }

    /// Return the inner hex string as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the digest is the empty string.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl std::fmt::Display for ContentDigest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for ContentDigest {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<String> for ContentDigest {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<&str> for ContentDigest {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<ContentDigest> for String {
    fn from(digest: ContentDigest) -> Self {
        digest.0
    }
}
