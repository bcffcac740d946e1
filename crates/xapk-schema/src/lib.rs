//! Shared types and naming conventions for split-APK assembly.
//!
//! This crate holds the server-supplied manifest shape, the content digest
//! newtype and the fixed-format rules that turn a split's source URL into its
//! in-archive name. It performs no I/O.

pub mod digest;
pub mod manifest;
pub mod naming;

// Re-exports
pub use digest::ContentDigest;
pub use manifest::{Manifest, ManifestError, RawManifest, RawSplitEntry, SplitEntry};
pub use naming::{canonical_split_name, filename_from_url, split_token};

/// Extension of an installable package inside the container.
pub const APK_EXTENSION: &str = "apk";

/// Extension of the combined container written to disk.
pub const XAPK_EXTENSION: &str = "xapk";
