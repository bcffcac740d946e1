//! Resolving candidate digests against the manifest.
//!
//! Matching is exact digest equality and never looks at file names. Should
//! the manifest list one digest twice, the first entry in manifest order wins.

use std::collections::HashSet;

use xapk_schema::{ContentDigest, Manifest, SplitEntry};

/// Result of resolving one candidate digest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchResult<'m> {
    /// The candidate is the base package.
    Base,
    /// The candidate is this split.
    Split(&'m SplitEntry),
    /// The digest is not in the manifest.
    Unmatched,
}

/// Whether `digest` is the manifest's base digest.
pub fn match_base(digest: &ContentDigest, manifest: &Manifest) -> bool {
    *digest == manifest.base_digest
}

/// The first split entry whose digest equals `digest`.
pub fn match_split<'m>(digest: &ContentDigest, manifest: &'m Manifest) -> Option<&'m SplitEntry> {
    manifest.split_entries.iter().find(|entry| entry.digest == *digest)
}

/// Classify a digest as base, split or unmatched.
pub fn classify<'m>(digest: &ContentDigest, manifest: &'m Manifest) -> MatchResult<'m> {
    if match_base(digest, manifest) {
        MatchResult::Base
    } else if let Some(entry) = match_split(digest, manifest) {
        MatchResult::Split(entry)
    } else {
        MatchResult::Unmatched
    }
}

/// Canonical names already placed in the container during one session.
#[derive(Debug, Default)]
pub struct NameLedger {
    seen: HashSet<String>,
}

impl NameLedger {
    /// An empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `name`. Returns `false` if it was already recorded.
    pub fn claim(&mut self, name: &str) -> bool {
        self.seen.insert(name.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use xapk_schema::RawManifest;

    fn manifest() -> Manifest {
        RawManifest::from_json(
            r#"{
                "package_id": "com.example.app",
                "version_code": 7,
                "base_digest": "abc123",
                "split_entries": [
                    {"source_url": "https://cdn.example/com.example.app-7-config.en-v1.apk", "digest": "def456", "byte_size": 1000},
                    {"source_url": "https://cdn.example/com.example.app-7-config.xxhdpi-v1.apk", "digest": "0a0b0c", "byte_size": 2000}
                ]
            }"#,
        )
        .unwrap()
        .validate()
        .unwrap()
    }

    #[test]
    fn base_matches_by_digest_only() {
        let manifest = manifest();
        assert!(match_base(&ContentDigest::new("abc123"), &manifest));
        assert!(match_base(&ContentDigest::new("ABC123"), &manifest));
        assert!(!match_base(&ContentDigest::new("zzz999"), &manifest));
    }

    #[test]
    fn split_matches_resolve_canonical_name() {
        let manifest = manifest();
        let entry = match_split(&ContentDigest::new("0a0b0c"), &manifest).unwrap();
        assert_eq!(entry.canonical_name(), "config.xxhdpi.apk");
        assert!(match_split(&ContentDigest::new("notfound"), &manifest).is_none());
    }

    #[test]
    fn classify_covers_all_variants() {
        let manifest = manifest();
        assert_eq!(classify(&"abc123".into(), &manifest), MatchResult::Base);
        assert!(matches!(
            classify(&"def456".into(), &manifest),
            MatchResult::Split(entry) if entry.canonical_name() == "config.en.apk"
        ));
        assert_eq!(classify(&"notfound".into(), &manifest), MatchResult::Unmatched);
    }

    #[test]
    fn first_entry_wins_on_duplicate_digest() {
        let mut manifest = manifest();
        manifest.split_entries[1].digest = ContentDigest::new("def456");
        let entry = match_split(&ContentDigest::new("def456"), &manifest).unwrap();
        assert_eq!(entry.canonical_name(), "config.en.apk");
    }

    #[test]
    fn ledger_detects_repeats() {
        let mut ledger = NameLedger::new();
        assert!(ledger.claim("com.example.app.apk"));
        assert!(ledger.claim("config.en.apk"));
        assert!(!ledger.claim("config.en.apk"));
        assert!(!ledger.claim("com.example.app.apk"));
        assert!(ledger.claim("config.xxhdpi.apk"));
    }
}
