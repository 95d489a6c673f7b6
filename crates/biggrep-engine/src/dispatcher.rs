//! Drives a pool of processor engines: hands out jobs, collects results,
//! and restarts any engine thread that dies mid-run.
//!
//! This is the Rust counterpart of `JobDispatcher`: a background thread
//! that, once per tick, walks every processor engine, gives it a job if it
//! is idle, collects anything it finished, and replaces it if its thread
//! has died. The orchestrator talks to the same pool (to pause/resume
//! groups of engines for throttling) through the shared handle below.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

use crate::job_manager::JobManager;
use crate::processor::{Processor, ProcessorHandle, ProcessorKind};

const DISPATCH_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Spawns a fresh processor, used both for the initial pool and to replace
/// an engine the watchdog finds dead.
pub type ProcessorFactory = Arc<dyn Fn() -> Box<dyn Processor> + Send + Sync>;

struct Entry {
    handle: ProcessorHandle,
    factory: ProcessorFactory,
}

/// Owns the pool of processor engines and the background thread that keeps
/// them fed.
#[derive(Clone)]
pub struct Dispatcher {
    job_manager: Arc<JobManager>,
    entries: Arc<Mutex<Vec<Entry>>>,
    live: Arc<AtomicBool>,
}

impl Dispatcher {
    /// Create a dispatcher bound to `job_manager`. No engines are running
    /// yet; call [`add_processor`](Self::add_processor) to populate the
    /// pool before [`start`](Self::start).
    pub fn new(job_manager: Arc<JobManager>) -> Dispatcher {
        Dispatcher {
            job_manager,
            entries: Arc::new(Mutex::new(Vec::new())),
            live: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Spawn a new engine for `factory()` and register it with the pool.
    /// Returns the engine's index, used with [`pause`](Self::pause) and
    /// [`resume`](Self::resume).
    pub fn add_processor<F>(&self, factory: F) -> usize
    where
        F: Fn() -> Box<dyn Processor> + Send + Sync + 'static,
    {
        let factory: ProcessorFactory = Arc::new(factory);
        let handle = ProcessorHandle::spawn(factory());
        let mut entries = self.entries.lock().expect("dispatcher entries poisoned");
        entries.push(Entry { handle, factory });
        entries.len() - 1
    }

    /// Pause the engine at `index`.
    pub fn pause(&self, index: usize) {
        self.entries.lock().expect("dispatcher entries poisoned")[index]
            .handle
            .pause();
    }

    /// Resume the engine at `index`.
    pub fn resume(&self, index: usize) {
        self.entries.lock().expect("dispatcher entries poisoned")[index]
            .handle
            .resume();
    }

    /// How many processors of `kind` are registered in the pool.
    pub fn kind_count(&self, kind: ProcessorKind) -> usize {
        self.entries
            .lock()
            .expect("dispatcher entries poisoned")
            .iter()
            .filter(|e| e.handle.kind() == kind)
            .count()
    }

    /// Start the background driver thread.
    pub fn start(&self) -> JoinHandle<()> {
        let job_manager = Arc::clone(&self.job_manager);
        let entries = Arc::clone(&self.entries);
        let live = Arc::clone(&self.live);
        std::thread::spawn(move || {
            tracing::debug!("starting job dispatcher");
            while live.load(Ordering::SeqCst) {
                let dispatched_any = {
                    let mut entries = entries.lock().expect("dispatcher entries poisoned");
                    tick(&mut entries, &job_manager)
                };
                if !dispatched_any {
                    std::thread::sleep(DISPATCH_POLL_INTERVAL);
                }
            }
            // Asked to stop: let every engine finish its current job, then
            // keep draining results until they've all exited.
            {
                let entries = entries.lock().expect("dispatcher entries poisoned");
                for entry in entries.iter() {
                    entry.handle.stop();
                }
            }
            loop {
                let mut all_stopped = true;
                let mut entries = entries.lock().expect("dispatcher entries poisoned");
                for entry in entries.iter() {
                    for result in entry.handle.take_results() {
                        job_manager.put_job(result);
                    }
                    if entry.handle.is_alive() {
                        all_stopped = false;
                    }
                }
                drop(entries);
                if all_stopped {
                    break;
                }
                std::thread::sleep(DISPATCH_POLL_INTERVAL);
            }
            tracing::debug!("job dispatcher stopped");
        })
    }

    /// Ask the driver thread to stop accepting new jobs and drain what's
    /// in flight.
    pub fn stop(&self) {
        self.live.store(false, Ordering::SeqCst);
    }
}

fn tick(entries: &mut [Entry], job_manager: &JobManager) -> bool {
    let mut dispatched_any = false;
    for entry in entries.iter_mut() {
        if entry.handle.needs_job() && entry.handle.is_alive() {
            if let Some(job) = job_manager.get_job(entry.handle.kind()) {
                entry.handle.add_job(job);
                dispatched_any = true;
            }
        }
        for result in entry.handle.take_results() {
            job_manager.put_job(result);
        }
        if !entry.handle.is_alive() {
            tracing::error!(kind = ?entry.handle.kind(), "a processor thread failed, restarting");
            entry.handle = ProcessorHandle::spawn((entry.factory)());
        }
    }
    dispatched_any
}
