//! [`Processor`] implementations that confirm search candidates, either
//! against `bgverify` directly or through a YARA rules file.

use biggrep_core::{ResultJob, ResultState};

use crate::collaborator::{run_verify, run_yara_verify};
use crate::error::EngineError;
use crate::processor::{Job, Processor, ProcessorKind};

/// Runs `bgverify` jobs.
pub struct VerifyProcessor {
    bgverify_path: String,
}

impl VerifyProcessor {
    /// Construct a processor that invokes `bgverify_path` for every job.
    pub fn new(bgverify_path: impl Into<String>) -> VerifyProcessor {
        VerifyProcessor {
            bgverify_path: bgverify_path.into(),
        }
    }
}

impl Processor for VerifyProcessor {
    fn kind(&self) -> ProcessorKind {
        ProcessorKind::Verify
    }

    fn run(&mut self, job: Job) -> Result<ResultJob, EngineError> {
        let job = match job {
            Job::Verify(j) => j,
            Job::Search(_) => unreachable!("verify processor given a search job"),
        };
        let batch_size = job.candidates.len();
        let (_, verified, duration) = run_verify(&self.bgverify_path, &job.terms, &job.candidates)?;
        Ok(ResultJob::new(ResultState::VerifyDone, job.terms, verified, duration).with_checked(batch_size))
    }
}

/// Runs verification against a YARA rules file instead of `bgverify`.
pub struct YaraVerifyProcessor {
    yara_path: String,
    rules_file: String,
}

impl YaraVerifyProcessor {
    /// Construct a processor that runs `yara_path rules_file <candidates>`
    /// for every job.
    pub fn new(yara_path: impl Into<String>, rules_file: impl Into<String>) -> YaraVerifyProcessor {
        YaraVerifyProcessor {
            yara_path: yara_path.into(),
            rules_file: rules_file.into(),
        }
    }
}

impl Processor for YaraVerifyProcessor {
    fn kind(&self) -> ProcessorKind {
        ProcessorKind::Verify
    }

    fn run(&mut self, job: Job) -> Result<ResultJob, EngineError> {
        let job = match job {
            Job::Verify(j) => j,
            Job::Search(_) => unreachable!("verify processor given a search job"),
        };
        let batch_size = job.candidates.len();
        let (_, verified, duration) =
            run_yara_verify(&self.yara_path, &self.rules_file, &job.candidates)?;
        Ok(ResultJob::new(ResultState::VerifyDone, job.terms, verified, duration).with_checked(batch_size))
    }
}
