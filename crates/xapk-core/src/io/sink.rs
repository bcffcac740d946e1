//! Destinations for the container byte stream.
//!
//! A sink is opened for one suggested file name, receives chunks in order and
//! ends in exactly one of two ways: `close` (output is finalised) or `abort`
//! (any partial output is discarded).

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};

use super::archive::DEFAULT_CHUNK_SIZE;

/// Suffix of the in-progress file next to the final output.
pub const PARTIAL_SUFFIX: &str = ".part";

/// Output failures.
#[derive(Error, Debug)]
pub enum SinkError {
    /// The destination failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The sink was already closed or aborted.
    #[error("output already closed or aborted")]
    Finalized,

    /// The sink accepted fewer bytes than were framed.
    #[error("output accepted {accepted} of {expected} bytes")]
    ShortWrite {
        /// Bytes framed by the archive writer.
        expected: u64,
        /// Bytes the sink reports as written.
        accepted: u64,
    },
}

/// Receives the container stream.
///
/// `write` returns once the chunk has been accepted by the destination, so a
/// caller that awaits each write never queues more than one chunk.
#[async_trait]
pub trait OutputSink: Send {
    /// Persist the next chunk of the stream.
    async fn write(&mut self, chunk: Bytes) -> Result<(), SinkError>;

    /// Finalise the output. Only valid once, after the last chunk.
    async fn close(&mut self) -> Result<(), SinkError>;

    /// Discard everything written so far and release the destination.
    async fn abort(&mut self) -> Result<(), SinkError>;

    /// Bytes accepted so far.
    fn bytes_written(&self) -> u64;
}

/// Opens sinks bound to a suggested file name.
#[async_trait]
pub trait SinkFactory: Send + Sync {
    /// The sink this factory opens.
    type Sink: OutputSink;

    /// Open a sink for `file_name`.
    async fn open(&self, file_name: &str) -> Result<Self::Sink, SinkError>;
}

/// Writes the stream to `<dir>/<name>.part` and renames it to `<dir>/<name>`
/// on close, so a finished file only ever appears complete.
#[derive(Debug)]
pub struct FileSink {
    file: Option<BufWriter<File>>,
    partial_path: PathBuf,
    final_path: PathBuf,
    written: u64,
    closed: bool,
}

impl FileSink {
    /// Create the partial file for `file_name` inside `dir`.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the directory or file cannot be created.
    pub async fn create(dir: &Path, file_name: &str) -> Result<Self, SinkError> {
        tokio::fs::create_dir_all(dir).await?;
        let final_path = dir.join(file_name);
        let partial_path = dir.join(format!("{file_name}{PARTIAL_SUFFIX}"));
        let file = File::create(&partial_path).await?;
        tracing::debug!("Opened output {}", partial_path.display());

        Ok(Self {
            file: Some(BufWriter::with_capacity(DEFAULT_CHUNK_SIZE, file)),
            partial_path,
            final_path,
            written: 0,
            closed: false,
        })
    }
}

#[async_trait]
impl OutputSink for FileSink {
    async fn write(&mut self, chunk: Bytes) -> Result<(), SinkError> {
        let file = self.file.as_mut().ok_or(SinkError::Finalized)?;
        file.write_all(&chunk).await?;
        self.written += chunk.len() as u64;
        Ok(())
    }

    async fn close(&mut self) -> Result<(), SinkError> {
        let mut file = self.file.take().ok_or(SinkError::Finalized)?;
        let result = async {
            file.flush().await?;
            file.get_ref().sync_all().await?;
            drop(file);
            tokio::fs::rename(&self.partial_path, &self.final_path).await
        }
        .await;

        if let Err(e) = result {
            tokio::fs::remove_file(&self.partial_path).await.ok();
            return Err(e.into());
        }
        tracing::debug!(
            "Closed output {} ({} bytes)",
            self.final_path.display(),
            self.written
        );
        self.closed = true;
        Ok(())
    }

    async fn abort(&mut self) -> Result<(), SinkError> {
        // A failed close has already released the file; only a finished
        // output is off limits.
        if self.closed {
            return Err(SinkError::Finalized);
        }
        drop(self.file.take());
        match tokio::fs::remove_file(&self.partial_path).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        tracing::debug!("Aborted output {}", self.partial_path.display());
        Ok(())
    }

    fn bytes_written(&self) -> u64 {
        self.written
    }
}

impl Drop for FileSink {
    fn drop(&mut self) {
        // Neither closed nor aborted: never leave a partial file behind.
        if self.file.take().is_some() {
            std::fs::remove_file(&self.partial_path).ok();
        }
    }
}

/// Opens [`FileSink`]s in a fixed output directory.
#[derive(Debug, Clone)]
pub struct FileSinkFactory {
    dir: PathBuf,
}

impl FileSinkFactory {
    /// Write outputs into `dir`, creating it on first use.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

#[async_trait]
impl SinkFactory for FileSinkFactory {
    type Sink = FileSink;

    async fn open(&self, file_name: &str) -> Result<FileSink, SinkError> {
        FileSink::create(&self.dir, file_name).await
    }
}

/// Counts bytes and keeps nothing. Used for verification-only runs.
#[derive(Debug, Default)]
pub struct DiscardSink {
    written: u64,
    finalized: bool,
}

#[async_trait]
impl OutputSink for DiscardSink {
    async fn write(&mut self, chunk: Bytes) -> Result<(), SinkError> {
        if self.finalized {
            return Err(SinkError::Finalized);
        }
        self.written += chunk.len() as u64;
        Ok(())
    }

    async fn close(&mut self) -> Result<(), SinkError> {
        self.finish()
    }

    async fn abort(&mut self) -> Result<(), SinkError> {
        self.finish()
    }

    fn bytes_written(&self) -> u64 {
        self.written
    }
}

impl DiscardSink {
    fn finish(&mut self) -> Result<(), SinkError> {
        if self.finalized {
            return Err(SinkError::Finalized);
        }
        self.finalized = true;
        Ok(())
    }
}

/// Opens [`DiscardSink`]s.
#[derive(Debug, Clone, Copy, Default)]
pub struct DiscardSinkFactory;

#[async_trait]
impl SinkFactory for DiscardSinkFactory {
    type Sink = DiscardSink;

    async fn open(&self, _file_name: &str) -> Result<DiscardSink, SinkError> {
        Ok(DiscardSink::default())
    }
}
