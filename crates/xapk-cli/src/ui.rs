//! Terminal output

use crossterm::style::Stylize;
use xapk_core::{AssemblyError, AssemblyOutcome, AssemblyState, Reporter};

/// Prints assembly progress to stdout and warnings to stderr.
#[derive(Debug, Clone, Copy, Default)]
pub struct Output {
    quiet: bool,
}

impl Output {
    pub fn new(quiet: bool) -> Self {
        Self { quiet }
    }

    pub fn info(&self, msg: &str) {
        if !self.quiet {
            println!("  {msg}");
        }
    }

    pub fn success(&self, msg: &str) {
        if !self.quiet {
            println!("  {} {msg}", "✓".green());
        }
    }

    pub fn warn(&self, msg: &str) {
        eprintln!("  {} {msg}", "warning:".yellow().bold());
    }

    pub fn error(&self, msg: &str) {
        eprintln!("  {} {msg}", "error:".red().bold());
    }
}

impl Reporter for Output {
    fn phase(&self, state: AssemblyState) {
        tracing::trace!("phase: {state}");
    }

    fn hashing(&self, label: &str, size: u64) {
        if !self.quiet {
            println!(
                "  {} {label} {}",
                "hash".dark_grey(),
                format_size(size).as_str().dark_grey()
            );
        }
    }

    fn matched(&self, label: &str, entry_name: &str) {
        if !self.quiet && label != entry_name {
            println!("  {} {label} -> {entry_name}", "match".dark_grey());
        }
    }

    fn framed(&self, entry_name: &str, size: u64) {
        self.success(&format!("{entry_name} {}", format_size(size).as_str().dark_grey()));
    }

    fn warning(&self, msg: &str) {
        self.warn(msg);
    }

    fn finished(&self, outcome: &AssemblyOutcome) {
        if !self.quiet {
            println!();
            println!(
                "  {} {} ({} entries, {})",
                "Assembled".green().bold(),
                outcome.file_name.as_str().bold(),
                outcome.entries.len(),
                format_size(outcome.bytes_written)
            );
        }
    }

    fn failed(&self, error: &AssemblyError) {
        tracing::debug!("assembly failed: {error}");
    }
}

/// Human readable byte count.
pub fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    let mut size = bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes} B")
    } else {
        format!("{size:.1} {}", UNITS[unit])
    }
}
