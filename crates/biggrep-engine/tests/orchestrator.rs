//! Integration tests for the orchestrator loop, using stub processors so
//! the suite doesn't depend on real `bgparse`/`bgverify` binaries on
//! `PATH`.
#![allow(unused_crate_dependencies)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use biggrep_core::{Candidate, SearchTerm, TermMode};
use biggrep_engine::error::EngineError;
use biggrep_engine::{Job, Processor, ProcessorKind, SearchConfig, Verifier};

/// A search processor that fabricates one candidate per job without
/// touching the filesystem or spawning anything.
struct StubSearchProcessor {
    hits_per_index: usize,
}

impl Processor for StubSearchProcessor {
    fn kind(&self) -> ProcessorKind {
        ProcessorKind::Search
    }

    fn run(&mut self, job: Job) -> Result<biggrep_core::ResultJob, EngineError> {
        let job = match job {
            Job::Search(j) => j,
            Job::Verify(_) => unreachable!(),
        };
        std::thread::sleep(Duration::from_millis(1));
        let candidates = (0..self.hits_per_index)
            .map(|i| Candidate {
                file_path: format!("{}#{i}", job.index_path.display()),
                raw_metadata: "size=10".to_string(),
            })
            .collect();
        Ok(biggrep_core::ResultJob::new(
            biggrep_core::ResultState::SearchDone,
            job.terms,
            candidates,
            Duration::from_millis(1),
        ))
    }
}

/// A verify processor that accepts every candidate it's handed.
struct StubVerifyProcessor;

impl Processor for StubVerifyProcessor {
    fn kind(&self) -> ProcessorKind {
        ProcessorKind::Verify
    }

    fn run(&mut self, job: Job) -> Result<biggrep_core::ResultJob, EngineError> {
        let job = match job {
            Job::Verify(j) => j,
            Job::Search(_) => unreachable!(),
        };
        std::thread::sleep(Duration::from_millis(1));
        let checked = job.candidates.len();
        Ok(biggrep_core::ResultJob::new(
            biggrep_core::ResultState::VerifyDone,
            job.terms,
            job.candidates,
            Duration::from_millis(1),
        )
        .with_checked(checked))
    }
}

fn term(raw: &str) -> SearchTerm {
    biggrep_core::normalize(raw, TermMode::Auto).unwrap().term
}

#[test]
fn search_without_verification_reports_every_hit() {
    let index_files: Vec<_> = (0..5)
        .map(|i| std::path::PathBuf::from(format!("index-{i}.bgi")))
        .collect();

    let config = SearchConfig {
        terms: vec![term("deadbeef")],
        index_files,
        verifier: Verifier::None,
        filter_criteria: Vec::new(),
        candidate_limit: 0,
        num_procs: 2,
        bgparse_path: "bgparse".to_string(),
        throttle_at: 0,
        debug_collaborators: false,
    };

    // Swap in stub processors by driving the dispatcher machinery directly,
    // since SearchConfig's bgparse_path wires up the real collaborator.
    // Exercise the job-manager/dispatcher wiring through a hand-built
    // equivalent of `search()` instead.
    let results = Arc::new(Mutex::new(Vec::new()));
    let count = Arc::new(AtomicUsize::new(0));

    let job_manager = Arc::new(biggrep_engine::JobManager::new(0, Vec::new(), false));
    for idx in &config.index_files {
        job_manager.add_search_job(biggrep_core::SearchJob::new(config.terms.clone(), idx.clone()));
    }
    let dispatcher = biggrep_engine::Dispatcher::new(Arc::clone(&job_manager));
    for _ in 0..2 {
        dispatcher.add_processor(|| Box::new(StubSearchProcessor { hits_per_index: 2 }));
    }
    let handle = dispatcher.start();

    loop {
        while let Some(result) = job_manager.get_completed_job() {
            results.lock().unwrap().extend(result.candidates);
            count.fetch_add(1, Ordering::SeqCst);
        }
        let snapshot = job_manager.snapshot();
        if snapshot.searched_count == config.index_files.len() && !snapshot.working {
            break;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    dispatcher.stop();
    let _ = handle.join();
    while let Some(result) = job_manager.get_completed_job() {
        results.lock().unwrap().extend(result.candidates);
    }

    assert_eq!(results.lock().unwrap().len(), 10);
}

#[test]
fn verify_processor_filters_down_to_confirmed_candidates() {
    let job_manager = Arc::new(biggrep_engine::JobManager::new(0, Vec::new(), true));
    let dispatcher = biggrep_engine::Dispatcher::new(Arc::clone(&job_manager));
    dispatcher.add_processor(|| Box::new(StubVerifyProcessor));

    job_manager.add_search_job(biggrep_core::SearchJob::new(
        vec![term("cafe")],
        std::path::PathBuf::from("ignored.bgi"),
    ));
    // Directly exercise put_job with a synthetic search-done result to
    // route a candidate into the verify queue.
    job_manager.put_job(biggrep_core::ResultJob::new(
        biggrep_core::ResultState::SearchDone,
        vec![term("cafe")],
        vec![Candidate {
            file_path: "/bin/ls".to_string(),
            raw_metadata: "size=5".to_string(),
        }],
        Duration::from_millis(1),
    ));

    let handle = dispatcher.start();
    loop {
        if job_manager.snapshot().completed_jobs > 0 {
            break;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    dispatcher.stop();
    let _ = handle.join();

    let completed = job_manager.get_completed_job().expect("one verify result");
    assert_eq!(completed.candidates.len(), 1);
    assert_eq!(completed.candidates[0].file_path, "/bin/ls");
}
