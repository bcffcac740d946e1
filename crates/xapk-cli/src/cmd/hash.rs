//! Hash command

use std::path::PathBuf;

use anyhow::{Context, Result};
use xapk_core::{Md5Hasher, digest_file};

/// Print `<md5>  <file>` for each file, like `md5sum`.
pub fn hash(files: &[PathBuf]) -> Result<()> {
    for file in files {
        let digest = digest_file(&Md5Hasher, file)
            .with_context(|| format!("Failed to read {}", file.display()))?;
        println!("{digest}  {}", file.display());
    }
    Ok(())
}
