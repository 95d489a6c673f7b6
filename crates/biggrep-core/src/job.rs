//! Immutable job and result records passed between the dispatcher, job
//! manager, and processors.
//!
//! Per the "never mutate a job after construction" design note, every stage
//! of the pipeline consumes one job record and produces a new one rather
//! than mutating shared state in place.

use std::path::PathBuf;
use std::time::Duration;

use crate::candidate::Candidate;
use crate::term::SearchTerm;

/// A request to run a collaborator search pass over a single `.bgi` index.
#[derive(Debug, Clone)]
pub struct SearchJob {
    /// Canonical hex terms being searched for.
    pub terms: Vec<SearchTerm>,
    /// The `.bgi` index to search.
    pub index_path: PathBuf,
}

impl SearchJob {
    /// Construct a new search job.
    pub fn new(terms: Vec<SearchTerm>, index_path: PathBuf) -> SearchJob {
        SearchJob { terms, index_path }
    }
}

/// A request to confirm a search pass's candidates against the underlying
/// files via a verifying collaborator (`bgverify` or YARA rules).
#[derive(Debug, Clone)]
pub struct VerifyJob {
    /// Canonical hex terms being confirmed.
    pub terms: Vec<SearchTerm>,
    /// Candidate files surfaced by the preceding search pass.
    pub candidates: Vec<Candidate>,
}

impl VerifyJob {
    /// Construct a new verify job.
    pub fn new(terms: Vec<SearchTerm>, candidates: Vec<Candidate>) -> VerifyJob {
        VerifyJob { terms, candidates }
    }
}

/// Which stage produced a [`ResultJob`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultState {
    /// Produced by a search pass; candidates are unverified.
    SearchDone,
    /// Produced by a verify pass; candidates are confirmed matches.
    VerifyDone,
    /// A search hit that skipped verification (verification disabled, or
    /// the candidate limit was already reached) and is final as-is.
    Complete,
}

/// The outcome of a completed search or verify job, as handed back to the
/// job manager for filtering and reporting.
#[derive(Debug, Clone)]
pub struct ResultJob {
    /// Which stage produced this result.
    pub state: ResultState,
    /// The terms that were searched or verified.
    pub terms: Vec<SearchTerm>,
    /// Matching candidates, in collaborator output order.
    pub candidates: Vec<Candidate>,
    /// Wall-clock time the collaborator process spent producing this
    /// result.
    pub duration: Duration,
    /// For a verify result, the batch size that was checked (which may be
    /// larger than `candidates.len()` when some failed to verify).
    pub checked: usize,
}

impl ResultJob {
    /// Construct a new result record. `checked` defaults to
    /// `candidates.len()`; use [`with_checked`](Self::with_checked) to
    /// override it for a verify batch where some candidates didn't verify.
    pub fn new(
        state: ResultState,
        terms: Vec<SearchTerm>,
        candidates: Vec<Candidate>,
        duration: Duration,
    ) -> ResultJob {
        let checked = candidates.len();
        ResultJob {
            state,
            terms,
            candidates,
            duration,
            checked,
        }
    }

    /// Override the checked-batch-size counter.
    pub fn with_checked(mut self, checked: usize) -> ResultJob {
        self.checked = checked;
        self
    }

    /// Number of candidates checked in this batch (for a verify result,
    /// this is the batch size; for a search result, the candidate count).
    pub fn count(&self) -> usize {
        self.checked
    }
}
