//! User-supplied input files.
//!
//! A candidate is an opaque blob plus the label it was supplied under. The
//! label only ever appears in messages; identity comes from the digest.

use std::path::PathBuf;

use bytes::Bytes;
use thiserror::Error;

/// Why a candidate could not be loaded.
#[derive(Error, Debug)]
pub enum CandidateError {
    /// Reading the file failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The blob is larger than the configured limit.
    #[error("file is {size} bytes, limit is {limit}")]
    TooLarge {
        /// Actual size in bytes.
        size: u64,
        /// Configured limit in bytes.
        limit: u64,
    },
}

// Where a candidate's bytes come from.
#[derive(Debug, Clone)]
enum CandidateSource {
    /// A file on disk, read when the candidate is loaded.
    Path(PathBuf),
    /// Bytes already in memory.
    Memory(Bytes),
}

/// One input blob and the label it was supplied under.
#[derive(Debug, Clone)]
pub struct CandidateFile {
    label: String,
    source: CandidateSource,
}

impl CandidateFile {
    /// A file on disk, labelled with its file name.
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let label = path
            .file_name()
            .map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().into_owned());
        Self {
            label,
            source: CandidateSource::Path(path),
        }
    }

    /// An in-memory blob with an explicit label.
    pub fn from_bytes(label: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        Self {
            label: label.into(),
            source: CandidateSource::Memory(bytes.into()),
        }
    }

    /// Label used in messages: the file name, or the label given to
    /// [`from_bytes`](Self::from_bytes).
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Read the whole blob.
    ///
    /// # Errors
    ///
    /// Returns [`CandidateError::TooLarge`] if the blob exceeds `max_size`
    /// (checked before reading a file), or the underlying I/O error.
    pub async fn load(&self, max_size: Option<u64>) -> Result<Bytes, CandidateError> {
        match &self.source {
            CandidateSource::Path(path) => {
                check_size(tokio::fs::metadata(path).await?.len(), max_size)?;
                Ok(Bytes::from(tokio::fs::read(path).await?))
            }
            CandidateSource::Memory(bytes) => {
                check_size(bytes.len() as u64, max_size)?;
                Ok(bytes.clone())
            }
        }
    }
}

fn check_size(size: u64, limit: Option<u64>) -> Result<(), CandidateError> {
    match limit {
        Some(limit) if size > limit => Err(CandidateError::TooLarge { size, limit }),
        _ => Ok(()),
    }
}
