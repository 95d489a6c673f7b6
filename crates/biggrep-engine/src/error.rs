//! Engine-level error types: everything that can go wrong driving the
//! processor/dispatcher pipeline and its collaborator subprocesses.

use std::io;

/// Failure modes surfaced while running a search.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// A collaborator binary (`bgparse`, `bgverify`, `yara`) could not be
    /// spawned at all (not on `PATH`, permission denied, etc).
    #[error("failed to launch {program}: {source}")]
    Spawn {
        /// The collaborator binary that failed to start.
        program: &'static str,
        /// Underlying OS error.
        #[source]
        source: io::Error,
    },
    /// Writing candidate paths to a verifying collaborator's stdin failed.
    #[error("failed writing to {program} stdin: {source}")]
    WriteStdin {
        /// The collaborator binary whose stdin pipe broke.
        program: &'static str,
        /// Underlying OS error.
        #[source]
        source: io::Error,
    },
    /// The dispatcher thread died unexpectedly.
    #[error("the job dispatcher thread failed")]
    DispatcherDied,
    /// The user-supplied candidate limit was reached before verification
    /// could finish draining the search queue.
    #[error("candidate limit reached ({count} candidates, {percent_done:.2}% of indexes searched)")]
    CandidateLimitReached {
        /// Candidates collected before the limit was enforced.
        count: usize,
        /// Fraction of index files searched at the time of the cutoff.
        percent_done: f64,
    },
    /// The user interrupted the search (`SIGINT`).
    #[error("interrupted")]
    Interrupted,
}
