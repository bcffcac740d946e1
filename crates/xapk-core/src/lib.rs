//! Core library for xapk: digest matching, archive framing and output sinks.
//!
//! An [`AssemblySession`] validates a manifest, identifies each candidate by
//! content digest and streams a store-mode ZIP container into an
//! [`io::OutputSink`]. Any failure after the sink is opened aborts it, so a
//! run either leaves a complete container or nothing.
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]

pub mod assemble;
pub mod candidate;
pub mod error;
pub mod hash;
pub mod io;
pub mod matcher;
pub mod verify;

pub mod reporter;

pub use assemble::{AssemblyOptions, AssemblyOutcome, AssemblySession, AssemblyState};
pub use candidate::{CandidateError, CandidateFile};
pub use error::AssemblyError;
pub use hash::{ContentHasher, Md5Hasher, digest_file, md5_digest};
pub use reporter::{NullReporter, Reporter};
pub use verify::{ContainerEntry, VerifyError, VerifyReport, verify_container};
