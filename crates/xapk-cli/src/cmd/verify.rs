//! Verify command

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use crossterm::style::Stylize;
use xapk_core::{Md5Hasher, verify_container};

use crate::ui::{Output, format_size};

/// Read a container back and check every entry against the manifest.
pub async fn verify(container: &Path, manifest_path: &Path, quiet: bool) -> Result<()> {
    let manifest = super::load_manifest(manifest_path)?;
    let output = Output::new(quiet);

    let report = verify_container(container, &manifest, Arc::new(Md5Hasher))
        .await
        .with_context(|| format!("Failed to read {}", container.display()))?;

    if !quiet {
        for entry in &report.entries {
            let method = if entry.stored { "stored" } else { "compressed" };
            println!(
                "  {:<28}{:>10}  {}  {}",
                entry.name,
                format_size(entry.size),
                method.dark_grey(),
                entry.digest.as_str().dark_grey()
            );
        }
        println!();
    }

    if !report.is_valid() {
        for problem in &report.problems {
            output.error(problem);
        }
        bail!(
            "{} problem(s) found in {}",
            report.problems.len(),
            container.display()
        );
    }

    output.success(&format!(
        "{} matches {} {}",
        container.display(),
        manifest.package_id,
        manifest.version_code
    ));
    Ok(())
}
