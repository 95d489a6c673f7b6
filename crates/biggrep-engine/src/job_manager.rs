//! Routes search and verify jobs between the dispatcher and the collection
//! of candidates a search has accumulated so far.
//!
//! This is the Rust counterpart of `BgSearchJobManager`: it owns the two
//! pending-job queues, applies metadata filtering to search results before
//! deciding whether a candidate needs verification, and accumulates
//! finished results for the orchestrator to report.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use biggrep_core::{evaluate, Candidate, FilterPredicate, ResultJob, ResultState, SearchJob, VerifyJob};

use crate::processor::{Job, ProcessorKind};

struct Inner {
    search_jobs: VecDeque<SearchJob>,
    verify_jobs: VecDeque<VerifyJob>,
    completed_jobs: VecDeque<ResultJob>,
    candidate_count: usize,
    candidate_limit: usize,
    candidate_limit_reached: bool,
    verified_count: usize,
    verify_checked_count: usize,
    searched_count: usize,
    filter_criteria: Vec<FilterPredicate>,
    verify: bool,
    working: bool,
    search_duration: Duration,
    verify_duration: Duration,
    verify_passes: usize,
}

/// Tracks in-flight and completed work for a single search run.
pub struct JobManager {
    inner: Mutex<Inner>,
}

impl JobManager {
    /// Construct a job manager. `candidate_limit` of `0` disables the
    /// limit; `verify` controls whether search hits are routed to a
    /// verify pass or reported directly.
    pub fn new(candidate_limit: usize, filter_criteria: Vec<FilterPredicate>, verify: bool) -> JobManager {
        JobManager {
            inner: Mutex::new(Inner {
                search_jobs: VecDeque::new(),
                verify_jobs: VecDeque::new(),
                completed_jobs: VecDeque::new(),
                candidate_count: 0,
                candidate_limit,
                candidate_limit_reached: false,
                verified_count: 0,
                verify_checked_count: 0,
                searched_count: 0,
                filter_criteria,
                verify,
                working: false,
                search_duration: Duration::default(),
                verify_duration: Duration::default(),
                verify_passes: 0,
            }),
        }
    }

    /// Queue a search job for one `.bgi` index.
    pub fn add_search_job(&self, job: SearchJob) {
        self.inner.lock().expect("job manager lock poisoned").search_jobs.push_back(job);
    }

    /// Pull the next job suited to `kind`, if any is queued.
    pub fn get_job(&self, kind: ProcessorKind) -> Option<Job> {
        let mut inner = self.inner.lock().expect("job manager lock poisoned");
        match kind {
            ProcessorKind::Search => inner.search_jobs.pop_front().map(Job::Search),
            ProcessorKind::Verify => inner.verify_jobs.pop_front().map(Job::Verify),
        }
    }

    /// Absorb a finished search or verify result, applying metadata
    /// filtering and routing candidates onward to verification or to the
    /// completed queue.
    pub fn put_job(&self, job: ResultJob) {
        let mut inner = self.inner.lock().expect("job manager lock poisoned");
        inner.working = true;
        match job.state {
            ResultState::SearchDone => {
                inner.search_duration += job.duration;
                inner.searched_count += 1;
                if inner.candidate_limit > 0 && inner.candidate_count > inner.candidate_limit {
                    inner.candidate_limit_reached = true;
                }

                let terms = job.terms.clone();
                let verify = inner.verify;
                let limit_reached = inner.candidate_limit_reached;
                let filter_criteria = inner.filter_criteria.clone();

                for candidate in job.candidates {
                    let verdict = evaluate(&filter_criteria, &candidate.metadata());
                    if !verdict.passed {
                        continue;
                    }
                    let candidate = annotate_missing_keys(candidate, &verdict.missing_keys);
                    if verify && !limit_reached {
                        inner
                            .verify_jobs
                            .push_back(VerifyJob::new(terms.clone(), vec![candidate]));
                    } else {
                        inner.completed_jobs.push_back(ResultJob::new(
                            ResultState::Complete,
                            terms.clone(),
                            vec![candidate],
                            Duration::default(),
                        ));
                    }
                    inner.candidate_count += 1;
                }
            }
            ResultState::VerifyDone => {
                if job.count() > 0 {
                    inner.verified_count += job.candidates.len();
                    inner.verify_checked_count += job.count();
                    inner.verify_duration += job.duration;
                    inner.verify_passes += 1;
                    inner.completed_jobs.push_back(job);
                } else {
                    inner.verify_checked_count += job.count();
                }
            }
            ResultState::Complete => {
                inner.completed_jobs.push_back(job);
            }
        }
        inner.working = false;
    }

    /// Pull one finished, filtered result off the completed queue.
    pub fn get_completed_job(&self) -> Option<ResultJob> {
        self.inner.lock().expect("job manager lock poisoned").completed_jobs.pop_front()
    }

    /// A coarse snapshot of progress, used for throttling decisions and the
    /// status line.
    pub fn snapshot(&self) -> JobManagerSnapshot {
        let inner = self.inner.lock().expect("job manager lock poisoned");
        JobManagerSnapshot {
            working: inner.working,
            pending_search_jobs: inner.search_jobs.len(),
            pending_verify_jobs: inner.verify_jobs.len(),
            completed_jobs: inner.completed_jobs.len(),
            candidate_count: inner.candidate_count,
            candidate_limit_reached: inner.candidate_limit_reached,
            searched_count: inner.searched_count,
            verify_checked_count: inner.verify_checked_count,
            verified_count: inner.verified_count,
            search_duration: inner.search_duration,
            verify_duration: inner.verify_duration,
        }
    }
}

fn annotate_missing_keys(candidate: Candidate, missing_keys: &[String]) -> Candidate {
    if missing_keys.is_empty() {
        return candidate;
    }
    let sanitized: Vec<String> = missing_keys
        .iter()
        .map(|k| k.replace([';', ','], "_"))
        .collect();
    let mut raw_metadata = candidate.raw_metadata;
    raw_metadata.push_str(",FILTER_MISSING_METADATA=");
    raw_metadata.push_str(&sanitized.join(";"));
    Candidate {
        file_path: candidate.file_path,
        raw_metadata,
    }
}

/// Point-in-time counters read by the orchestrator loop and status line.
#[derive(Debug, Clone, Copy)]
pub struct JobManagerSnapshot {
    /// Whether a `put_job` call is currently in progress.
    pub working: bool,
    /// Search jobs still queued.
    pub pending_search_jobs: usize,
    /// Verify jobs still queued.
    pub pending_verify_jobs: usize,
    /// Completed results waiting to be reported.
    pub completed_jobs: usize,
    /// Total candidates accepted by metadata filtering.
    pub candidate_count: usize,
    /// Whether the candidate limit has been exceeded.
    pub candidate_limit_reached: bool,
    /// Number of `.bgi` indexes searched so far.
    pub searched_count: usize,
    /// Number of candidates verification has examined so far.
    pub verify_checked_count: usize,
    /// Number of candidates that verified successfully.
    pub verified_count: usize,
    /// Cumulative wall-clock time spent in search passes.
    pub search_duration: Duration,
    /// Cumulative wall-clock time spent in verify passes.
    pub verify_duration: Duration,
}
