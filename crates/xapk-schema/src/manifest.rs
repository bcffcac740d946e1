//! Server-supplied description of a split-APK bundle.
//!
//! The lookup service returns a [`RawManifest`] in which every field may be
//! absent. [`RawManifest::validate`] turns it into a [`Manifest`] whose fields
//! are all present and whose split entries all carry a derivable in-archive
//! name.

use serde::{Deserialize, Serialize};

use crate::digest::ContentDigest;
use crate::naming::canonical_split_name;
use crate::{APK_EXTENSION, XAPK_EXTENSION};

/// Errors that can occur when validating a [`RawManifest`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ManifestError {
    /// A required field is absent or empty.
    #[error("missing required field `{0}`")]
    MissingField(String),

    /// The manifest lists no split entries.
    #[error("manifest lists no split entries")]
    NoSplitEntries,

    /// The package identifier cannot be used as a file name.
    #[error("`package_id` `{0}` is not a plain file name")]
    UnsafePackageId(String),

    /// A split source URL does not carry an identity token.
    #[error("`{field}` has no split token in `{url}`")]
    MalformedSourceUrl {
        /// Path of the offending field, e.g. `split_entries[1].source_url`.
        field: String,
        /// The URL as supplied.
        url: String,
    },
}

/// One expected split as described by the server, before validation.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct RawSplitEntry {
    /// Download URL of the split; its file name encodes the split token.
    pub source_url: Option<String>,
    /// Expected content digest.
    pub digest: Option<ContentDigest>,
    /// Expected size in bytes.
    pub byte_size: Option<u64>,
}

/// Manifest as returned by the lookup service (e.g. `manifest.json`).
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct RawManifest {
    /// Package identifier (e.g. "com.example.app").
    pub package_id: Option<String>,
    /// Version code of the bundle.
    pub version_code: Option<u64>,
    /// Expected digest of the base package.
    pub base_digest: Option<ContentDigest>,
    /// Expected splits, in manifest order.
    pub split_entries: Option<Vec<RawSplitEntry>>,
}

impl RawManifest {
    /// Parse a manifest from its JSON form.
    ///
    /// # Errors
    ///
    /// Returns the `serde_json` error if `s` is not a JSON object of the
    /// expected shape. Missing fields are not an error at this stage.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }

    /// Check that every required field is present and build a [`Manifest`].
    ///
    /// # Errors
    ///
    /// Returns [`ManifestError::MissingField`] naming the first absent or empty
    /// field, [`ManifestError::NoSplitEntries`] if the split list is empty, or
    /// [`ManifestError::MalformedSourceUrl`] if a split URL has no token.
    pub fn validate(&self) -> Result<Manifest, ManifestError> {
        let package_id = self
            .package_id
            .as_deref()
            .filter(|id| !id.trim().is_empty())
            .ok_or_else(|| ManifestError::MissingField("package_id".to_string()))?
            .trim();
        if !is_plain_file_name(package_id) {
            return Err(ManifestError::UnsafePackageId(package_id.to_string()));
        }
        let version_code = self
            .version_code
            .ok_or_else(|| ManifestError::MissingField("version_code".to_string()))?;
        let base_digest = self
            .base_digest
            .clone()
            .filter(|d| !d.is_empty())
            .ok_or_else(|| ManifestError::MissingField("base_digest".to_string()))?;
        let raw_entries = self
            .split_entries
            .as_ref()
            .ok_or_else(|| ManifestError::MissingField("split_entries".to_string()))?;
        if raw_entries.is_empty() {
            return Err(ManifestError::NoSplitEntries);
        }

        let split_entries = raw_entries
            .iter()
            .enumerate()
            .map(|(i, raw)| SplitEntry::from_raw(i, raw))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Manifest {
            package_id: package_id.to_string(),
            version_code,
            base_digest,
            split_entries,
        })
    }
}

/// The package id names the output file, so it must stay a single path
/// component inside the output directory.
fn is_plain_file_name(id: &str) -> bool {
    !id.contains(['/', '\\'])
        && !id.contains("..")
        && !id.chars().any(char::is_control)
}

/// A validated split entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitEntry {
    /// Download URL of the split.
    pub source_url: String,
    /// Expected content digest.
    pub digest: ContentDigest,
    /// Expected size in bytes.
    pub byte_size: u64,
    canonical_name: String,
}

impl SplitEntry {
    /// Build an entry, deriving its in-archive name from `source_url`.
    ///
    /// Returns `None` if the URL does not carry a split token.
    pub fn new(
        source_url: impl Into<String>,
        digest: ContentDigest,
        byte_size: u64,
    ) -> Option<Self> {
        let source_url = source_url.into();
        let canonical_name = canonical_split_name(&source_url)?;
        Some(Self {
            source_url,
            digest,
            byte_size,
            canonical_name,
        })
    }

    fn from_raw(index: usize, raw: &RawSplitEntry) -> Result<Self, ManifestError> {
        let field = |name: &str| format!("split_entries[{index}].{name}");

        let source_url = raw
            .source_url
            .as_deref()
            .filter(|url| !url.is_empty())
            .ok_or_else(|| ManifestError::MissingField(field("source_url")))?;
        let digest = raw
            .digest
            .clone()
            .filter(|d| !d.is_empty())
            .ok_or_else(|| ManifestError::MissingField(field("digest")))?;
        let byte_size = raw
            .byte_size
            .ok_or_else(|| ManifestError::MissingField(field("byte_size")))?;

        Self::new(source_url, digest, byte_size).ok_or_else(|| ManifestError::MalformedSourceUrl {
            field: field("source_url"),
            url: source_url.to_string(),
        })
    }

    /// Name of this split inside the container (e.g. `config.en.apk`).
    pub fn canonical_name(&self) -> &str {
        &self.canonical_name
    }
}

/// A manifest with every required field present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Manifest {
    /// Package identifier; base name of the container and its base entry.
    pub package_id: String,
    /// Version code; part of the container file name.
    pub version_code: u64,
    /// Expected digest of the base package.
    pub base_digest: ContentDigest,
    /// Expected splits, in manifest order.
    pub split_entries: Vec<SplitEntry>,
}

impl Manifest {
    /// File name of the combined container: `{package_id}-{version_code}.xapk`.
    pub fn output_file_name(&self) -> String {
        format!("{}-{}.{XAPK_EXTENSION}", self.package_id, self.version_code)
    }

    /// Name of the base package inside the container: `{package_id}.apk`.
    pub fn base_entry_name(&self) -> String {
        format!("{}.{APK_EXTENSION}", self.package_id)
    }

    /// Sum of the expected split sizes.
    pub fn expected_split_bytes(&self) -> u64 {
        self.split_entries.iter().map(|e| e.byte_size).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EXAMPLE: &str = r#"{
        "package_id": "com.example.app",
        "version_code": 7,
        "base_digest": "abc123",
        "split_entries": [
            {
                "source_url": "https://cdn.example/apk/com.example.app-7-config.en-v1.apk",
                "digest": "def456",
                "byte_size": 1000
            }
        ]
    }"#;

    #[test]
    fn validates_complete_manifest() {
        let manifest = RawManifest::from_json(EXAMPLE).unwrap().validate().unwrap();

        assert_eq!(manifest.package_id, "com.example.app");
        assert_eq!(manifest.version_code, 7);
        assert_eq!(manifest.base_digest.as_str(), "abc123");
        assert_eq!(manifest.output_file_name(), "com.example.app-7.xapk");
        assert_eq!(manifest.base_entry_name(), "com.example.app.apk");
        assert_eq!(manifest.split_entries.len(), 1);
        assert_eq!(manifest.split_entries[0].canonical_name(), "config.en.apk");
        assert_eq!(manifest.expected_split_bytes(), 1000);
    }

    #[test]
    fn missing_top_level_fields_are_named() {
        let full = RawManifest::from_json(EXAMPLE).unwrap();

        let mut raw = full.clone();
        raw.package_id = None;
        assert_eq!(
            raw.validate(),
            Err(ManifestError::MissingField("package_id".into()))
        );

        let mut raw = full.clone();
        raw.version_code = None;
        assert_eq!(
            raw.validate(),
            Err(ManifestError::MissingField("version_code".into()))
        );

        let mut raw = full.clone();
        raw.base_digest = Some(ContentDigest::new("  "));
        assert_eq!(
            raw.validate(),
            Err(ManifestError::MissingField("base_digest".into()))
        );

        let mut raw = full.clone();
        raw.split_entries = None;
        assert_eq!(
            raw.validate(),
            Err(ManifestError::MissingField("split_entries".into()))
        );

        let mut raw = full;
        raw.split_entries = Some(Vec::new());
        assert_eq!(raw.validate(), Err(ManifestError::NoSplitEntries));
    }

    #[test]
    fn incomplete_split_entry_is_named_by_index() {
        let mut raw = RawManifest::from_json(EXAMPLE).unwrap();
        raw.split_entries.as_mut().unwrap().push(RawSplitEntry {
            source_url: Some("https://cdn.example/com.example.app-7-config.de-v1.apk".into()),
            digest: None,
            byte_size: Some(10),
        });

        assert_eq!(
            raw.validate(),
            Err(ManifestError::MissingField("split_entries[1].digest".into()))
        );
    }

    #[test]
    fn source_url_without_token_is_malformed() {
        let mut raw = RawManifest::from_json(EXAMPLE).unwrap();
        raw.split_entries.as_mut().unwrap()[0].source_url =
            Some("https://cdn.example/base.apk".into());

        match raw.validate() {
            Err(ManifestError::MalformedSourceUrl { field, url }) => {
                assert_eq!(field, "split_entries[0].source_url");
                assert_eq!(url, "https://cdn.example/base.apk");
            }
            other => panic!("expected malformed url, got {other:?}"),
        }
    }

    #[test]
    fn package_id_must_stay_inside_output_dir() {
        for id in ["../escaped", "a/b", "..", "com.example..app", "a\\b", "/abs", "bad\nid"] {
            let mut raw = RawManifest::from_json(EXAMPLE).unwrap();
            raw.package_id = Some(id.to_string());
            assert_eq!(
                raw.validate(),
                Err(ManifestError::UnsafePackageId(id.trim().to_string())),
                "{id:?} should be rejected"
            );
        }

        let mut raw = RawManifest::from_json(EXAMPLE).unwrap();
        raw.package_id = Some("  com.example.app_2 ".to_string());
        assert_eq!(raw.validate().unwrap().output_file_name(), "com.example.app_2-7.xapk");
    }

    #[test]
    fn empty_object_reports_first_missing_field() {
        let raw = RawManifest::from_json("{}").unwrap();
        assert_eq!(
            raw.validate(),
            Err(ManifestError::MissingField("package_id".into()))
        );
    }
}
