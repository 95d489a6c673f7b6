//! [`Processor`] implementation that runs `bgparse` against one `.bgi`
//! index per job.

use biggrep_core::{ResultJob, ResultState};

use crate::collaborator::run_search;
use crate::error::EngineError;
use crate::processor::{Job, Processor, ProcessorKind};

/// Runs `bgparse` jobs.
pub struct SearchProcessor {
    bgparse_path: String,
    debug_collaborators: bool,
}

impl SearchProcessor {
    /// Construct a processor that invokes `bgparse_path` for every job.
    pub fn new(bgparse_path: impl Into<String>, debug_collaborators: bool) -> SearchProcessor {
        SearchProcessor {
            bgparse_path: bgparse_path.into(),
            debug_collaborators,
        }
    }
}

impl Processor for SearchProcessor {
    fn kind(&self) -> ProcessorKind {
        ProcessorKind::Search
    }

    fn run(&mut self, job: Job) -> Result<ResultJob, EngineError> {
        let job = match job {
            Job::Search(j) => j,
            Job::Verify(_) => unreachable!("search processor given a verify job"),
        };
        let (candidates, duration) = run_search(
            &self.bgparse_path,
            &job.terms,
            &job.index_path,
            self.debug_collaborators,
        )?;
        Ok(ResultJob::new(
            ResultState::SearchDone,
            job.terms,
            candidates,
            duration,
        ))
    }
}
