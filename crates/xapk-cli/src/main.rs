//! xapk - split APK assembler CLI

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use xapk_cli::cmd;
use xapk_cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // RUST_LOG wins; --verbose only changes the fallback.
    let fallback = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback)),
        )
        .with_writer(std::io::stderr)
        .init();

    let dry_run = cli.dry_run;
    let quiet = cli.quiet;

    match cli.command {
        Commands::Assemble {
            manifest,
            base,
            splits,
            output_dir,
            max_size,
        } => {
            let request = cmd::assemble::AssembleRequest {
                manifest,
                base,
                splits,
                output_dir,
                max_size,
            };
            cmd::assemble::assemble(&request, dry_run, quiet).await
        }
        Commands::Hash { files } => cmd::hash::hash(&files),
        Commands::Inspect { manifest } => cmd::inspect::inspect(&manifest),
        Commands::Verify {
            container,
            manifest,
        } => cmd::verify::verify(&container, &manifest, quiet).await,
    }
}
