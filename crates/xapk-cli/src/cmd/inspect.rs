//! Inspect command

use std::path::Path;

use anyhow::Result;
use crossterm::style::Stylize;

use crate::ui::format_size;

/// Show the container a manifest describes.
pub fn inspect(path: &Path) -> Result<()> {
    let manifest = super::load_manifest(path)?;
    let lw = 10;

    println!();
    println!(
        "  {} {}",
        manifest.package_id.as_str().white().bold(),
        manifest.version_code.to_string().as_str().dark_grey()
    );
    println!();
    println!("  {:<lw$}{}", "output", manifest.output_file_name());
    println!(
        "  {:<lw$}{}  {}",
        "base",
        manifest.base_entry_name(),
        manifest.base_digest.as_str().dark_grey()
    );

    for entry in &manifest.split_entries {
        println!(
            "  {:<lw$}{}  {}  {}",
            "split",
            entry.canonical_name(),
            entry.digest.as_str().dark_grey(),
            format_size(entry.byte_size).as_str().dark_grey()
        );
    }

    println!();
    println!(
        "  {} split(s), {} expected",
        manifest.split_entries.len(),
        format_size(manifest.expected_split_bytes())
    );
    Ok(())
}
