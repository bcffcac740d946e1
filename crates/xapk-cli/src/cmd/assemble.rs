//! Assemble command

use std::path::PathBuf;

use anyhow::{Result, bail};
use xapk_core::io::{DiscardSinkFactory, FileSinkFactory, SinkFactory};
use xapk_core::{AssemblyOptions, AssemblyOutcome, AssemblySession, CandidateFile};
use xapk_schema::RawManifest;

use crate::ui::Output;

/// Inputs of one `xapk assemble` run.
#[derive(Debug, Clone)]
pub struct AssembleRequest {
    pub manifest: PathBuf,
    pub base: Option<PathBuf>,
    pub splits: Vec<PathBuf>,
    pub output_dir: PathBuf,
    pub max_size: Option<u64>,
}

/// Build `{package_id}-{version_code}.xapk` in the output directory.
pub async fn assemble(request: &AssembleRequest, dry_run: bool, quiet: bool) -> Result<()> {
    let manifest = super::read_manifest(&request.manifest)?;
    let output = Output::new(quiet);

    let base = request.base.as_ref().map(CandidateFile::from_path);
    let splits = request
        .splits
        .iter()
        .map(CandidateFile::from_path)
        .collect::<Vec<_>>();
    let options = AssemblyOptions {
        max_candidate_size: request.max_size,
        ..AssemblyOptions::default()
    };

    let outcome = if dry_run {
        run(manifest, DiscardSinkFactory, output, options, base, splits).await?
    } else {
        let factory = FileSinkFactory::new(&request.output_dir);
        run(manifest, factory, output, options, base, splits).await?
    };

    if dry_run {
        output.info(&format!(
            "Dry run: {} was verified but not written",
            outcome.file_name
        ));
    } else {
        output.info(&format!(
            "Wrote {}",
            request.output_dir.join(&outcome.file_name).display()
        ));
    }
    Ok(())
}

async fn run<F: SinkFactory>(
    manifest: RawManifest,
    factory: F,
    output: Output,
    options: AssemblyOptions,
    base: Option<CandidateFile>,
    splits: Vec<CandidateFile>,
) -> Result<AssemblyOutcome> {
    let session = AssemblySession::new(manifest, factory)
        .with_reporter(output)
        .with_options(options);

    match session.run(base, splits).await {
        Ok(outcome) => Ok(outcome),
        Err(e) => {
            tracing::debug!("{e:?}");
            output.error(&e.to_string());
            bail!("{}", e.user_message())
        }
    }
}
