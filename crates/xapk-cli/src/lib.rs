//! xapk - split APK assembler
#![allow(missing_docs)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::doc_markdown)]
//!
//! Combines a base APK and its split APKs into one `.xapk` container after
//! checking every file against the manifest published for that app version.
//!
//! # Architecture
//!
//! - **Digest identity**: files are recognised by MD5 only; names on disk are
//!   just labels for messages.
//! - **Forward-only output**: the container is streamed entry by entry into a
//!   `.part` file that is renamed into place on success and removed on failure.
//!
//! # Container Layout
//!
//! ```text
//! com.example.app-7.xapk
//! ├── com.example.app.apk   # base, always first
//! ├── config.en.apk         # splits, in the order given
//! └── config.xxhdpi.apk
//! ```

pub mod cmd;
pub mod ui;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "xapk")]
#[command(author, version, about = "xapk - assemble split APKs into a single container")]
pub struct Cli {
    /// Verify and stream everything but do not write the container
    #[arg(long, global = true)]
    pub dry_run: bool,

    /// Log each assembly step (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Assemble a base APK and its splits into an .xapk container
    Assemble {
        /// Manifest JSON returned by the lookup service
        #[arg(short, long)]
        manifest: PathBuf,
        /// The base APK
        #[arg(short, long)]
        base: Option<PathBuf>,
        /// Split APKs, packed in the order given
        splits: Vec<PathBuf>,
        /// Directory the container is written to
        #[arg(short, long, env = "XAPK_OUTPUT_DIR", default_value = ".")]
        output_dir: PathBuf,
        /// Reject any input file larger than this many bytes
        #[arg(long, env = "XAPK_MAX_SIZE")]
        max_size: Option<u64>,
    },
    /// Print the MD5 digest of files (for writing manifests)
    Hash {
        /// Files to hash
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Validate a manifest and show what the container will hold
    Inspect {
        /// Manifest JSON
        #[arg(short, long)]
        manifest: PathBuf,
    },
    /// Check an assembled container against its manifest
    Verify {
        /// The .xapk file
        container: PathBuf,
        /// Manifest JSON
        #[arg(short, long)]
        manifest: PathBuf,
    },
}
