//! A processor engine is one OS thread that repeatedly pulls a job out of
//! its single pending-job slot, runs a collaborator subprocess, and deposits
//! the result for the dispatcher to collect.
//!
//! This mirrors the original `jobdispatch.Processor` / `ProcessorEngine`
//! pair: a processor never holds more than one job at a time, and the
//! engine thread that drives it can be paused (to throttle search vs.
//! verify work) without being torn down.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

use biggrep_core::{ResultJob, SearchJob, VerifyJob};

const POLL_INTERVAL: Duration = Duration::from_millis(10);
const PAUSE_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// A unit of work handed to a processor. Both search and verify jobs flow
/// through the same dispatcher/job-manager plumbing.
#[derive(Debug, Clone)]
pub enum Job {
    /// Run a search pass against one `.bgi` index.
    Search(SearchJob),
    /// Confirm a batch of candidates against their source files.
    Verify(VerifyJob),
}

/// Which kind of job a processor consumes; used by the job manager to route
/// work to the right queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessorKind {
    /// Consumes [`Job::Search`] jobs.
    Search,
    /// Consumes [`Job::Verify`] jobs.
    Verify,
}

/// Does the actual collaborator-subprocess work for one job.
///
/// Implementations are expected to be cheap to construct so a dead engine
/// thread can be replaced by spawning a fresh processor of the same kind.
pub trait Processor: Send + 'static {
    /// Which job queue this processor should be fed from.
    fn kind(&self) -> ProcessorKind;

    /// Run the collaborator subprocess for `job` and produce a result.
    ///
    /// Returning `Err` kills this engine thread; the dispatcher's watchdog
    /// will notice and spawn a replacement.
    fn run(&mut self, job: Job) -> Result<ResultJob, crate::error::EngineError>;
}

struct Shared {
    pending: Mutex<Option<Job>>,
    done: Mutex<Vec<ResultJob>>,
    live: AtomicBool,
    paused: AtomicBool,
    alive: AtomicBool,
}

/// A running processor engine thread plus the handle the dispatcher uses to
/// feed it work and collect results.
pub struct ProcessorHandle {
    shared: Arc<Shared>,
    kind: ProcessorKind,
    join: Option<JoinHandle<()>>,
}

impl ProcessorHandle {
    /// Spawn a new engine thread driving `processor`.
    pub fn spawn(processor: Box<dyn Processor>) -> ProcessorHandle {
        let kind = processor.kind();
        let shared = Arc::new(Shared {
            pending: Mutex::new(None),
            done: Mutex::new(Vec::new()),
            live: AtomicBool::new(true),
            paused: AtomicBool::new(false),
            alive: AtomicBool::new(true),
        });
        let thread_shared = Arc::clone(&shared);
        let join = std::thread::spawn(move || run_engine_loop(thread_shared, processor));
        ProcessorHandle {
            shared,
            kind,
            join: Some(join),
        }
    }

    /// Which job kind this processor consumes.
    pub fn kind(&self) -> ProcessorKind {
        self.kind
    }

    /// Whether the processor's pending-job slot is empty.
    pub fn needs_job(&self) -> bool {
        self.shared.pending.lock().expect("pending lock poisoned").is_none()
    }

    /// Hand the processor a job to work on. Callers must check
    /// [`needs_job`](Self::needs_job) first; a job placed on top of a
    /// pending one is silently dropped.
    pub fn add_job(&self, job: Job) {
        *self.shared.pending.lock().expect("pending lock poisoned") = Some(job);
    }

    /// Drain every result the processor has finished since the last call.
    pub fn take_results(&self) -> Vec<ResultJob> {
        std::mem::take(&mut self.shared.done.lock().expect("done lock poisoned"))
    }

    /// Whether the engine thread is still running (hasn't exited or
    /// panicked).
    pub fn is_alive(&self) -> bool {
        self.shared.alive.load(Ordering::SeqCst)
    }

    /// Stop pulling new jobs, but let any in-flight collaborator subprocess
    /// finish.
    pub fn stop(&self) {
        self.shared.live.store(false, Ordering::SeqCst);
    }

    /// Halt the engine thread between jobs without killing it, used to
    /// throttle search vs. verify throughput.
    pub fn pause(&self) {
        self.shared.paused.store(true, Ordering::SeqCst);
    }

    /// Resume a paused engine thread.
    pub fn resume(&self) {
        self.shared.paused.store(false, Ordering::SeqCst);
    }

    /// Block until the engine thread has exited.
    pub fn join(&mut self) {
        if let Some(join) = self.join.take() {
            let _ = join.join();
        }
    }
}

fn run_engine_loop(shared: Arc<Shared>, mut processor: Box<dyn Processor>) {
    tracing::debug!(kind = ?processor.kind(), "starting processor engine thread");
    while shared.live.load(Ordering::SeqCst) {
        if shared.paused.load(Ordering::SeqCst) {
            std::thread::sleep(PAUSE_POLL_INTERVAL);
            continue;
        }
        let job = shared.pending.lock().expect("pending lock poisoned").take();
        match job {
            Some(job) => match processor.run(job) {
                Ok(result) => shared.done.lock().expect("done lock poisoned").push(result),
                Err(err) => {
                    tracing::error!(error = %err, "processor failed, engine thread exiting");
                    shared.alive.store(false, Ordering::SeqCst);
                    return;
                }
            },
            None => std::thread::sleep(POLL_INTERVAL),
        }
    }
    shared.alive.store(false, Ordering::SeqCst);
    tracing::debug!("processor engine thread stopping");
}
