#![forbid(unsafe_code)]

//! Data model and term/filter logic shared by the `biggrep` search pipeline.
//!
//! This crate has no knowledge of threads, subprocesses, or CLI parsing; it
//! is the pure, synchronous core that `biggrep-engine` drives.

pub mod candidate;
pub mod error;
pub mod filter;
pub mod job;
pub mod term;

pub use candidate::{Candidate, MetadataMap, MetadataValue};
pub use error::{FilterError, TermError};
pub use filter::{evaluate, FilterOp, FilterPredicate, FilterVerdict};
pub use job::{ResultJob, ResultState, SearchJob, VerifyJob};
pub use term::{normalize, Normalized, SearchTerm, TermMode};
