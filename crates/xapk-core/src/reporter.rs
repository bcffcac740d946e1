//! Reporter trait for dependency injection
//!
//! This trait allows the assembly session to report progress and status
//! without being coupled to a specific terminal or GUI implementation.

use crate::assemble::{AssemblyOutcome, AssemblyState};
use crate::error::AssemblyError;

/// Receives progress events from an [`AssemblySession`](crate::AssemblySession).
pub trait Reporter: Send + Sync {
    /// The session moved to a new state.
    fn phase(&self, state: AssemblyState);

    /// A candidate has been read and is being hashed.
    fn hashing(&self, label: &str, size: u64);

    /// A candidate was identified as the given archive entry.
    fn matched(&self, label: &str, entry_name: &str);

    /// An entry has been fully written to the output.
    fn framed(&self, entry_name: &str, size: u64);

    /// A non-fatal anomaly.
    fn warning(&self, msg: &str);

    /// The container was finalised.
    fn finished(&self, outcome: &AssemblyOutcome);

    /// The run failed; the output has already been aborted.
    fn failed(&self, error: &AssemblyError);
}

impl<T: Reporter + ?Sized> Reporter for std::sync::Arc<T> {
    fn phase(&self, state: AssemblyState) {
        (**self).phase(state);
    }
    fn hashing(&self, label: &str, size: u64) {
        (**self).hashing(label, size);
    }
    fn matched(&self, label: &str, entry_name: &str) {
        (**self).matched(label, entry_name);
    }
    fn framed(&self, entry_name: &str, size: u64) {
        (**self).framed(entry_name, size);
    }
    fn warning(&self, msg: &str) {
        (**self).warning(msg);
    }
    fn finished(&self, outcome: &AssemblyOutcome) {
        (**self).finished(outcome);
    }
    fn failed(&self, error: &AssemblyError) {
        (**self).failed(error);
    }
}

/// A no-op reporter for silent operations (e.g., verification, testing).
#[derive(Debug, Clone, Copy, Default)]
pub struct NullReporter;

impl Reporter for NullReporter {
    fn phase(&self, _: AssemblyState) {}
    fn hashing(&self, _: &str, _: u64) {}
    fn matched(&self, _: &str, _: &str) {}
    fn framed(&self, _: &str, _: u64) {}
    fn warning(&self, _: &str) {}
    fn finished(&self, _: &AssemblyOutcome) {}
    fn failed(&self, _: &AssemblyError) {}
}
