//! Split-APK assembly session
//!
//! Drives one run from manifest validation to a finished container:
//!
//! ```text
//! Idle -> ValidatingManifest -> HashingBase -> MatchingBase -> Framing
//!      -> (HashingSplits -> MatchingSplits -> Framing)* -> Finishing -> Succeeded
//! ```
//!
//! Any failure ends in `Aborted`. Candidates are processed strictly one after
//! another and only one payload is held at a time: each is read, hashed,
//! matched and framed before the next is read. Every chunk write is awaited,
//! so the sink sets the pace.

use std::fmt;
use std::sync::Arc;

use bytes::Bytes;
use xapk_schema::{ContentDigest, Manifest, RawManifest};

use crate::candidate::{CandidateError, CandidateFile};
use crate::error::AssemblyError;
use crate::hash::{ContentHasher, Md5Hasher};
use crate::io::archive::{ArchiveSummary, ArchiveWriter, DEFAULT_CHUNK_SIZE};
use crate::io::sink::{OutputSink, SinkError, SinkFactory};
use crate::matcher::{MatchResult, NameLedger, classify, match_base};
use crate::reporter::{NullReporter, Reporter};

/// States of an assembly session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssemblyState {
    /// Created, not yet run.
    Idle,
    /// Checking the manifest for required fields.
    ValidatingManifest,
    /// Reading and digesting the base candidate.
    HashingBase,
    /// Comparing the base digest with the manifest.
    MatchingBase,
    /// Reading and digesting a split candidate.
    HashingSplits,
    /// Resolving a split digest to its manifest entry.
    MatchingSplits,
    /// Streaming an entry into the sink.
    Framing,
    /// Writing the trailer and closing the sink.
    Finishing,
    /// The container is complete.
    Succeeded,
    /// The run failed and the output was discarded.
    Aborted,
}

impl AssemblyState {
    /// Whether the session may move from `self` to `next`.
    pub fn can_advance_to(self, next: Self) -> bool {
        use AssemblyState::{
            Aborted, Finishing, Framing, HashingBase, HashingSplits, Idle, MatchingBase,
            MatchingSplits, Succeeded, ValidatingManifest,
        };

        match (self, next) {
            (Succeeded | Aborted, _) => false,
            (_, Aborted) => true,
            (Idle, ValidatingManifest)
            | (ValidatingManifest, HashingBase)
            | (HashingBase, MatchingBase)
            | (MatchingBase | MatchingSplits, Framing)
            | (Framing, HashingSplits | Finishing)
            | (HashingSplits, MatchingSplits)
            | (Finishing, Succeeded) => true,
            _ => false,
        }
    }
}

impl fmt::Display for AssemblyState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Idle => "idle",
            Self::ValidatingManifest => "validating manifest",
            Self::HashingBase => "hashing base",
            Self::MatchingBase => "matching base",
            Self::HashingSplits => "hashing splits",
            Self::MatchingSplits => "matching splits",
            Self::Framing => "framing",
            Self::Finishing => "finishing",
            Self::Succeeded => "succeeded",
            Self::Aborted => "aborted",
        };
        f.write_str(s)
    }
}

/// Tunables for a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AssemblyOptions {
    /// Largest candidate accepted, checked before its bytes are loaded.
    pub max_candidate_size: Option<u64>,
    /// Size of the payload slices handed to the sink.
    pub chunk_size: usize,
}

impl Default for AssemblyOptions {
    fn default() -> Self {
        Self {
            max_candidate_size: None,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

/// A finished container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssemblyOutcome {
    /// File name the sink was opened with (`{package_id}-{version_code}.xapk`).
    pub file_name: String,
    /// Entry names in container order, base first.
    pub entries: Vec<String>,
    /// Size of the container.
    pub bytes_written: u64,
}

/// One single-use assembly run.
///
/// ```ignore
/// let outcome = AssemblySession::new(manifest, FileSinkFactory::new(out_dir))
///     .with_reporter(reporter)
///     .run(Some(base), splits)
///     .await?;
/// ```
pub struct AssemblySession<F, H = Md5Hasher, R = NullReporter> {
    manifest: RawManifest,
    factory: F,
    hasher: Arc<H>,
    reporter: R,
    options: AssemblyOptions,
    ledger: NameLedger,
    state: AssemblyState,
}

impl<F, H, R> fmt::Debug for AssemblySession<F, H, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AssemblySession")
            .field("manifest", &self.manifest)
            .field("options", &self.options)
            .field("ledger", &self.ledger)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl<F: SinkFactory> AssemblySession<F> {
    /// A session using MD5, no reporter and default options.
    pub fn new(manifest: RawManifest, factory: F) -> Self {
        Self {
            manifest,
            factory,
            hasher: Arc::new(Md5Hasher),
            reporter: NullReporter,
            options: AssemblyOptions::default(),
            ledger: NameLedger::new(),
            state: AssemblyState::Idle,
        }
    }
}

impl<F, H, R> AssemblySession<F, H, R>
where
    F: SinkFactory,
    H: ContentHasher + 'static,
    R: Reporter,
{
    /// Replace the content hasher.
    pub fn with_hasher<H2: ContentHasher + 'static>(self, hasher: H2) -> AssemblySession<F, H2, R> {
        AssemblySession {
            manifest: self.manifest,
            factory: self.factory,
            hasher: Arc::new(hasher),
            reporter: self.reporter,
            options: self.options,
            ledger: self.ledger,
            state: self.state,
        }
    }

    /// Replace the progress reporter.
    pub fn with_reporter<R2: Reporter>(self, reporter: R2) -> AssemblySession<F, H, R2> {
        AssemblySession {
            manifest: self.manifest,
            factory: self.factory,
            hasher: self.hasher,
            reporter,
            options: self.options,
            ledger: self.ledger,
            state: self.state,
        }
    }

    /// Replace the tunables.
    pub fn with_options(mut self, options: AssemblyOptions) -> Self {
        self.options = options;
        self
    }

    /// Verify `base` and `splits` against the manifest and stream them into a
    /// single container. Splits are processed in the order given; the first
    /// failure ends the run and discards any partial output.
    ///
    /// # Errors
    ///
    /// Returns the [`AssemblyError`] that ended the run. If the output was
    /// opened, it has been aborted before this returns.
    pub async fn run(
        mut self,
        base: Option<CandidateFile>,
        splits: Vec<CandidateFile>,
    ) -> Result<AssemblyOutcome, AssemblyError> {
        let result = self.execute(base, &splits).await;
        match &result {
            Ok(outcome) => {
                self.transition(AssemblyState::Succeeded);
                tracing::info!(
                    "Assembled {} ({} entries, {} bytes)",
                    outcome.file_name,
                    outcome.entries.len(),
                    outcome.bytes_written
                );
                self.reporter.finished(outcome);
            }
            Err(error) => {
                self.transition(AssemblyState::Aborted);
                tracing::debug!("Assembly failed: {error}");
                self.reporter.failed(error);
            }
        }
        result
    }

    async fn execute(
        &mut self,
        base: Option<CandidateFile>,
        splits: &[CandidateFile],
    ) -> Result<AssemblyOutcome, AssemblyError> {
        self.transition(AssemblyState::ValidatingManifest);
        let manifest = self.manifest.validate()?;
        let base = base.ok_or(AssemblyError::BaseFileMissing)?;

        let file_name = manifest.output_file_name();
        let mut sink = self.factory.open(&file_name).await?;

        let result = match self.stream(&manifest, &base, splits, &mut sink).await {
            Ok(summary) => finalize(&mut sink, summary).await,
            Err(error) => Err(error),
        };

        match result {
            Ok(summary) => Ok(AssemblyOutcome {
                file_name,
                entries: summary.entries,
                bytes_written: summary.bytes_written,
            }),
            Err(error) => {
                if let Err(abort_error) = sink.abort().await {
                    tracing::warn!("Failed to discard partial {file_name}: {abort_error}");
                }
                Err(error)
            }
        }
    }

    async fn stream<S: OutputSink>(
        &mut self,
        manifest: &Manifest,
        base: &CandidateFile,
        splits: &[CandidateFile],
        sink: &mut S,
    ) -> Result<ArchiveSummary, AssemblyError> {
        let mut writer = ArchiveWriter::open(self.options.chunk_size);

        self.transition(AssemblyState::HashingBase);
        let (payload, digest) = self.load_and_hash(base).await?;

        self.transition(AssemblyState::MatchingBase);
        if !match_base(&digest, manifest) {
            return Err(AssemblyError::ChecksumMismatch {
                label: base.label().to_string(),
                expected: manifest.base_digest.clone(),
                actual: digest,
            });
        }
        let base_name = manifest.base_entry_name();
        self.reporter.matched(base.label(), &base_name);

        if splits.is_empty() {
            return Err(AssemblyError::SplitFilesMissing);
        }

        self.transition(AssemblyState::Framing);
        self.ledger.claim(&base_name);
        self.frame(&mut writer, &base_name, payload, sink).await?;

        for candidate in splits {
            self.transition(AssemblyState::HashingSplits);
            let (payload, digest) = self.load_and_hash(candidate).await?;

            self.transition(AssemblyState::MatchingSplits);
            let entry = match classify(&digest, manifest) {
                MatchResult::Split(entry) => entry,
                MatchResult::Base => {
                    return Err(AssemblyError::DuplicateSplit {
                        label: candidate.label().to_string(),
                        name: base_name,
                    });
                }
                MatchResult::Unmatched => {
                    return Err(AssemblyError::SplitIdentifyFailure {
                        label: candidate.label().to_string(),
                        digest,
                    });
                }
            };

            let name = entry.canonical_name();
            if !self.ledger.claim(name) {
                return Err(AssemblyError::DuplicateSplit {
                    label: candidate.label().to_string(),
                    name: name.to_string(),
                });
            }
            if payload.len() as u64 != entry.byte_size {
                let msg = format!(
                    "{} is {} bytes, manifest lists {} for {name}",
                    candidate.label(),
                    payload.len(),
                    entry.byte_size
                );
                tracing::warn!("{msg}");
                self.reporter.warning(&msg);
            }
            self.reporter.matched(candidate.label(), name);

            self.transition(AssemblyState::Framing);
            self.frame(&mut writer, name, payload, sink).await?;
        }

        self.transition(AssemblyState::Finishing);
        let trailer = writer.finish()?;
        sink.write(trailer.bytes).await?;
        Ok(trailer.summary)
    }

    async fn load_and_hash(
        &self,
        candidate: &CandidateFile,
    ) -> Result<(Bytes, ContentDigest), AssemblyError> {
        let read_failure = |source: CandidateError| AssemblyError::ReadFailure {
            label: candidate.label().to_string(),
            source,
        };

        let payload = candidate
            .load(self.options.max_candidate_size)
            .await
            .map_err(read_failure)?;
        self.reporter.hashing(candidate.label(), payload.len() as u64);

        let hasher = Arc::clone(&self.hasher);
        let bytes = payload.clone();
        let digest = tokio::task::spawn_blocking(move || hasher.digest(&bytes))
            .await
            .map_err(|e| read_failure(CandidateError::Io(std::io::Error::other(e))))?;

        tracing::debug!("{} ({} bytes) digests to {digest}", candidate.label(), payload.len());
        Ok((payload, digest))
    }

    async fn frame<S: OutputSink>(
        &self,
        writer: &mut ArchiveWriter,
        name: &str,
        payload: Bytes,
        sink: &mut S,
    ) -> Result<(), AssemblyError> {
        let size = payload.len() as u64;
        for chunk in writer.add_entry(name, payload)? {
            sink.write(chunk).await?;
        }
        self.reporter.framed(name, size);
        Ok(())
    }

    fn transition(&mut self, next: AssemblyState) {
        debug_assert!(
            self.state.can_advance_to(next),
            "invalid transition {} -> {next}",
            self.state
        );
        tracing::debug!("Assembly: {} -> {next}", self.state);
        self.state = next;
        self.reporter.phase(next);
    }
}

/// Check that the sink took every framed byte, then close it.
async fn finalize<S: OutputSink>(
    sink: &mut S,
    summary: ArchiveSummary,
) -> Result<ArchiveSummary, AssemblyError> {
    let accepted = sink.bytes_written();
    if accepted != summary.bytes_written {
        return Err(SinkError::ShortWrite {
            expected: summary.bytes_written,
            accepted,
        }
        .into());
    }
    sink.close().await?;
    Ok(summary)
}
