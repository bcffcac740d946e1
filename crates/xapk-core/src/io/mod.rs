//! IO modules - container framing and output destinations

pub mod archive;
pub mod sink;

pub use archive::{ArchiveError, ArchiveSummary, ArchiveTrailer, ArchiveWriter, EntryFrames};
pub use sink::{
    DiscardSink, DiscardSinkFactory, FileSink, FileSinkFactory, OutputSink, SinkError,
    SinkFactory,
};
