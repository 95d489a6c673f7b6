//! Top-level `search()` entry point: wires up the job manager, dispatcher,
//! and processor pool, then drives the main reporting/throttling loop.
//!
//! This is the Rust counterpart of `bgsearch.search()`. Rather than a tight
//! `while` loop that sleeps whenever nothing is ready, every iteration here
//! costs one lock acquisition against the job manager; the sleep only
//! happens when that snapshot shows no forward progress, matching the
//! original's `time.sleep(1)` idle case without block-polling the CPU.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use biggrep_core::{Candidate, FilterPredicate, SearchJob, SearchTerm};

use crate::dispatcher::Dispatcher;
use crate::error::EngineError;
use crate::job_manager::JobManager;
use crate::search_processor::SearchProcessor;
use crate::verify_processor::{VerifyProcessor, YaraVerifyProcessor};

const IDLE_SLEEP: Duration = Duration::from_millis(50);

/// How search hits should be confirmed before being reported.
#[derive(Clone)]
pub enum Verifier {
    /// Skip verification; report every `bgparse` hit as-is.
    None,
    /// Confirm hits with `bgverify`.
    Native {
        /// Path to the `bgverify` binary.
        bgverify_path: String,
    },
    /// Confirm hits against a YARA rules file.
    Yara {
        /// Path to the `yara` binary.
        yara_path: String,
        /// Path to the compiled or source rules file.
        rules_file: String,
    },
}

/// Configuration for one [`search`] run.
pub struct SearchConfig {
    /// Terms to search for, already normalized to canonical hex.
    pub terms: Vec<SearchTerm>,
    /// `.bgi` index files to search, in dispatch order.
    pub index_files: Vec<PathBuf>,
    /// How to confirm search hits.
    pub verifier: Verifier,
    /// Metadata predicates applied to every candidate before it is either
    /// verified or reported.
    pub filter_criteria: Vec<FilterPredicate>,
    /// Max number of filtered candidates to accept before aborting.
    /// `0` disables the limit.
    pub candidate_limit: usize,
    /// Number of processor engine threads to run per stage.
    pub num_procs: usize,
    /// Path to the `bgparse` binary.
    pub bgparse_path: String,
    /// Candidate backlog size (verify queue depth) above which search
    /// engines are paused in favor of verify engines. `0` disables
    /// throttling.
    pub throttle_at: usize,
    /// Pass `-d` through to `bgparse`.
    pub debug_collaborators: bool,
}

/// Per-candidate callback invoked as results are confirmed, in the order
/// they finish (not the order jobs were submitted).
pub type ResultCallback<'a> = dyn FnMut(&Candidate) + 'a;

/// Per-tick callback invoked with a progress snapshot, used to drive a
/// status line.
pub type StatusCallback<'a> = dyn FnMut(SearchStatus) + 'a;

/// A point-in-time progress snapshot handed to the status callback.
#[derive(Debug, Clone, Copy)]
pub struct SearchStatus {
    /// Total `.bgi` files this run is searching.
    pub total_index_files: usize,
    /// `.bgi` files not yet searched.
    pub pending_index_files: usize,
    /// Candidates accepted by metadata filtering so far.
    pub candidate_count: usize,
    /// Candidates verification has examined so far.
    pub verify_checked_count: usize,
    /// Candidates that verified successfully so far.
    pub verified_count: usize,
}

/// Run a search to completion, invoking `on_result` for every confirmed
/// candidate and `on_status` once per polling tick.
///
/// Returns `Ok(())` on a clean finish, or an [`EngineError`] describing why
/// the run was cut short (candidate limit, dispatcher death, interrupt).
pub fn search(
    config: SearchConfig,
    mut on_result: impl FnMut(&Candidate),
    mut on_status: impl FnMut(SearchStatus),
) -> Result<(), EngineError> {
    let verify = !matches!(config.verifier, Verifier::None);
    let limit = if verify { config.candidate_limit } else { 0 };
    let job_manager = Arc::new(JobManager::new(limit, config.filter_criteria, verify));

    for index_file in &config.index_files {
        job_manager.add_search_job(SearchJob::new(config.terms.clone(), index_file.clone()));
    }
    let total_jobs = config.index_files.len();

    let dispatcher = Dispatcher::new(Arc::clone(&job_manager));
    let num_procs = config.num_procs.max(1);

    let bgparse_path = config.bgparse_path.clone();
    let debug_collaborators = config.debug_collaborators;
    let mut search_indices = Vec::with_capacity(num_procs);
    for _ in 0..num_procs {
        let bgparse_path = bgparse_path.clone();
        let idx = dispatcher.add_processor(move || {
            Box::new(SearchProcessor::new(bgparse_path.clone(), debug_collaborators))
        });
        search_indices.push(idx);
    }

    let mut verify_indices = Vec::new();
    if verify {
        for _ in 0..num_procs {
            let idx = match &config.verifier {
                Verifier::Native { bgverify_path } => {
                    let bgverify_path = bgverify_path.clone();
                    dispatcher.add_processor(move || Box::new(VerifyProcessor::new(bgverify_path.clone())))
                }
                Verifier::Yara { yara_path, rules_file } => {
                    let yara_path = yara_path.clone();
                    let rules_file = rules_file.clone();
                    dispatcher.add_processor(move || {
                        Box::new(YaraVerifyProcessor::new(yara_path.clone(), rules_file.clone()))
                    })
                }
                Verifier::None => unreachable!("verify engines only added when a verifier is set"),
            };
            dispatcher.pause(idx);
            verify_indices.push(idx);
        }
    }

    // With more than one search engine, keep one idle until the first
    // verify engine is needed, so a lone search-only run doesn't starve a
    // single-core host; mirrors the original's initial pause/resume split.
    if num_procs > 1 {
        dispatcher.pause(search_indices[0]);
        if let Some(&first_verifier) = verify_indices.first() {
            dispatcher.resume(first_verifier);
        }
    }

    let dispatcher_thread = dispatcher.start();

    let mut enabled_verifiers = 1usize;
    let mut parsing_halted = false;
    let mut outcome: Result<(), EngineError> = Ok(());

    loop {
        if crate::signal::interrupted() {
            tracing::error!("interrupted, shutting down");
            outcome = Err(EngineError::Interrupted);
            break;
        }

        while let Some(result) = job_manager.get_completed_job() {
            for candidate in &result.candidates {
                on_result(candidate);
            }
        }

        let snapshot = job_manager.snapshot();
        on_status(SearchStatus {
            total_index_files: total_jobs,
            pending_index_files: snapshot.pending_search_jobs,
            candidate_count: snapshot.candidate_count,
            verify_checked_count: snapshot.verify_checked_count,
            verified_count: snapshot.verified_count,
        });

        if snapshot.candidate_limit_reached {
            let percent_done = if total_jobs == 0 {
                100.0
            } else {
                100.0 * (total_jobs - snapshot.pending_search_jobs) as f64 / total_jobs as f64
            };
            outcome = Err(EngineError::CandidateLimitReached {
                count: snapshot.candidate_count,
                percent_done,
            });
            break;
        }

        if dispatcher_thread.is_finished() {
            // The driver thread only exits on its own when `stop()` has
            // been called, which doesn't happen until after this loop, so
            // reaching this point means it died unexpectedly (panicked).
            outcome = Err(EngineError::DispatcherDied);
            break;
        }

        if verify {
            let backlog = snapshot
                .candidate_count
                .saturating_sub(snapshot.verify_checked_count);
            throttle(
                &dispatcher,
                &search_indices,
                &verify_indices,
                config.throttle_at,
                backlog,
                snapshot.pending_search_jobs,
                num_procs,
                &mut parsing_halted,
                &mut enabled_verifiers,
            );
        }

        let done = snapshot.searched_count == total_jobs
            && snapshot.pending_verify_jobs == 0
            && !snapshot.working
            && (!verify || snapshot.candidate_count == snapshot.verify_checked_count);
        if done {
            break;
        }

        std::thread::sleep(IDLE_SLEEP);
    }

    dispatcher.stop();
    let _ = dispatcher_thread.join();

    // Final drain: a result may have landed between the last completed-job
    // poll and the dispatcher actually stopping.
    while let Some(result) = job_manager.get_completed_job() {
        for candidate in &result.candidates {
            on_result(candidate);
        }
    }

    outcome
}

#[allow(clippy::too_many_arguments)]
fn throttle(
    dispatcher: &Dispatcher,
    search_indices: &[usize],
    verify_indices: &[usize],
    throttle_at: usize,
    backlog: usize,
    pending_search_jobs: usize,
    num_procs: usize,
    parsing_halted: &mut bool,
    enabled_verifiers: &mut usize,
) {
    if *parsing_halted {
        if backlog < throttle_at.saturating_sub(500) {
            *parsing_halted = false;
            for &idx in verify_indices {
                dispatcher.pause(idx);
            }
            for &idx in search_indices {
                dispatcher.resume(idx);
            }
            if let Some(&first) = verify_indices.first() {
                dispatcher.resume(first);
            }
        }
        return;
    }

    if throttle_at > 0 && backlog > throttle_at {
        *parsing_halted = true;
        for &idx in search_indices {
            dispatcher.pause(idx);
        }
        for &idx in verify_indices {
            dispatcher.resume(idx);
        }
        return;
    }

    let target_verifiers = num_procs.saturating_sub(pending_search_jobs);
    if target_verifiers > *enabled_verifiers {
        for &idx in verify_indices.iter().take(target_verifiers) {
            dispatcher.resume(idx);
        }
        *enabled_verifiers = target_verifiers;
    }
}
