//! Reading an assembled container back and checking it against its manifest.

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;
use xapk_schema::{ContentDigest, Manifest};

use crate::hash::ContentHasher;

/// Why a container could not be read at all.
#[derive(Error, Debug)]
pub enum VerifyError {
    /// Opening or reading the file failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The file is not a ZIP archive.
    #[error("{path} is not a readable container: {source}")]
    Archive {
        /// Container path.
        path: PathBuf,
        /// What the ZIP reader reported.
        #[source]
        source: zip::result::ZipError,
    },
}

/// One entry as found in the container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerEntry {
    /// Entry name.
    pub name: String,
    /// Bytes actually read.
    pub size: u64,
    /// Whether the entry is uncompressed.
    pub stored: bool,
    /// Digest of the entry's contents.
    pub digest: ContentDigest,
}

/// What a container holds and everything wrong with it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VerifyReport {
    /// Entries in container order.
    pub entries: Vec<ContainerEntry>,
    /// One message per problem found.
    pub problems: Vec<String>,
}

impl VerifyReport {
    /// True when no problem was found.
    pub fn is_valid(&self) -> bool {
        self.problems.is_empty()
    }
}

/// Check the container at `path` against `manifest`.
///
/// The first entry must be the base package with the base digest, every other
/// entry must be a manifest split under its canonical name with that split's
/// digest, no name may repeat, and nothing may be compressed. Problems are
/// collected rather than returned as errors.
///
/// # Errors
///
/// Returns an error only if the file cannot be opened or is not a ZIP archive.
pub async fn verify_container<H: ContentHasher + 'static>(
    path: &Path,
    manifest: &Manifest,
    hasher: Arc<H>,
) -> Result<VerifyReport, VerifyError> {
    let path = path.to_path_buf();
    let manifest = manifest.clone();
    tokio::task::spawn_blocking(move || verify_blocking(&path, &manifest, hasher.as_ref()))
        .await
        .map_err(|e| VerifyError::Io(std::io::Error::other(e)))?
}

fn verify_blocking(
    path: &Path,
    manifest: &Manifest,
    hasher: &dyn ContentHasher,
) -> Result<VerifyReport, VerifyError> {
    let archive_error = |source| VerifyError::Archive {
        path: path.to_path_buf(),
        source,
    };
    let mut archive = zip::ZipArchive::new(File::open(path)?).map_err(archive_error)?;

    let mut report = VerifyReport::default();
    for i in 0..archive.len() {
        let mut file = archive.by_index(i).map_err(archive_error)?;
        // Sizes come from the archive itself, so the buffer grows with what is read.
        let mut data = Vec::new();
        file.read_to_end(&mut data)?;
        report.entries.push(ContainerEntry {
            name: file.name().to_string(),
            size: data.len() as u64,
            stored: file.compression() == zip::CompressionMethod::Stored,
            digest: hasher.digest(&data),
        });
    }

    report.problems = check_entries(&report.entries, manifest);
    Ok(report)
}

fn check_entries(entries: &[ContainerEntry], manifest: &Manifest) -> Vec<String> {
    let mut problems = Vec::new();
    let base_name = manifest.base_entry_name();

    match entries.first() {
        None => problems.push("container is empty".to_string()),
        Some(first) if first.name != base_name => problems.push(format!(
            "first entry is `{}`, expected `{base_name}`",
            first.name
        )),
        Some(first) if first.digest != manifest.base_digest => problems.push(format!(
            "`{base_name}` digest is {}, expected {}",
            first.digest, manifest.base_digest
        )),
        Some(_) => {}
    }

    let mut seen = std::collections::HashSet::new();
    for (i, entry) in entries.iter().enumerate() {
        if !entry.stored {
            problems.push(format!("`{}` is compressed", entry.name));
        }
        if !seen.insert(entry.name.as_str()) {
            problems.push(format!("`{}` appears more than once", entry.name));
            continue;
        }
        if i == 0 && entry.name == base_name {
            continue;
        }

        let expected = manifest
            .split_entries
            .iter()
            .find(|split| split.canonical_name() == entry.name);
        match expected {
            None => problems.push(format!("`{}` is not a split of this bundle", entry.name)),
            Some(split) if split.digest != entry.digest => problems.push(format!(
                "`{}` digest is {}, expected {}",
                entry.name, entry.digest, split.digest
            )),
            Some(_) => {}
        }
    }

    problems
}
