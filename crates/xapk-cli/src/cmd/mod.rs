//! Subcommand implementations

pub mod assemble;
pub mod hash;
pub mod inspect;
pub mod verify;

use anyhow::{Context, Result};
use std::path::Path;
use xapk_schema::{Manifest, RawManifest};

/// Read a manifest file without validating it.
pub fn read_manifest(path: &Path) -> Result<RawManifest> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read manifest {}", path.display()))?;
    RawManifest::from_json(&json)
        .with_context(|| format!("Manifest {} is not valid JSON", path.display()))
}

/// Read and validate a manifest file.
pub fn load_manifest(path: &Path) -> Result<Manifest> {
    read_manifest(path)?
        .validate()
        .with_context(|| format!("Manifest {} is incomplete", path.display()))
}
