//! Terminal errors of an assembly run

use thiserror::Error;
use xapk_schema::{ContentDigest, ManifestError};

use crate::candidate::CandidateError;
use crate::io::{ArchiveError, SinkError};

/// Every way a run can end without a finished container.
///
/// None of these are retried; the caller re-runs with corrected input.
#[derive(Error, Debug)]
pub enum AssemblyError {
    /// The manifest is missing a field or has an unusable value.
    #[error("Manifest is incomplete: {0}")]
    ManifestIncomplete(#[from] ManifestError),

    /// No base candidate was supplied.
    #[error("No base package file was supplied")]
    BaseFileMissing,

    /// The split candidate list was empty.
    #[error("No split package files were supplied")]
    SplitFilesMissing,

    /// The base candidate's digest is not the manifest's base digest.
    #[error("Checksum mismatch for base package `{label}`: expected {expected}, got {actual}")]
    ChecksumMismatch {
        /// Label of the candidate.
        label: String,
        /// Digest from the manifest.
        expected: ContentDigest,
        /// Digest of the candidate.
        actual: ContentDigest,
    },

    /// A split candidate's digest is not in the manifest.
    #[error("Could not identify split file `{label}` (digest {digest})")]
    SplitIdentifyFailure {
        /// Label of the candidate.
        label: String,
        /// Digest of the candidate.
        digest: ContentDigest,
    },

    /// A split candidate resolves to an entry name already placed.
    #[error("Split file `{label}` resolves to `{name}`, which is already in the archive")]
    DuplicateSplit {
        /// Label of the candidate.
        label: String,
        /// The entry name it resolved to.
        name: String,
    },

    /// The archive writer rejected an entry or the trailer.
    #[error("Archive encoding failed: {0}")]
    EncodingFailure(#[from] ArchiveError),

    /// A candidate could not be read.
    #[error("Failed to read `{label}`: {source}")]
    ReadFailure {
        /// Label of the candidate.
        label: String,
        /// Underlying failure.
        #[source]
        source: CandidateError,
    },

    /// The output sink failed.
    #[error("Output error: {0}")]
    Sink(#[from] SinkError),
}

impl AssemblyError {
    /// The single message shown to the user for this failure.
    pub fn user_message(&self) -> String {
        match self {
            Self::ManifestIncomplete(_) => {
                "The server returned incomplete data for this app. Try again later.".to_string()
            }
            Self::BaseFileMissing => "Please select the base APK file.".to_string(),
            Self::SplitFilesMissing => "Please select the split APK files.".to_string(),
            Self::ChecksumMismatch { label, .. } => {
                format!("{label} is not the base APK of this app version.")
            }
            Self::SplitIdentifyFailure { label, .. } => {
                format!("{label} does not match any split APK of this app version.")
            }
            Self::DuplicateSplit { label, name } => {
                format!("{label} was already added as {name}.")
            }
            Self::EncodingFailure(e) => match e.entry() {
                Some(entry) => format!("Could not pack {entry} into the XAPK file."),
                None => "Could not finish the XAPK file.".to_string(),
            },
            Self::ReadFailure { label, .. } => format!("Could not read {label}."),
            Self::Sink(_) => "Could not write the XAPK file.".to_string(),
        }
    }
}
