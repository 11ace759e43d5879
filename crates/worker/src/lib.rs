//! Out-of-process execution of conversion jobs.
//!
//! - [`JobRunner`] spawns the conversion engine as a child process, feeds
//!   its output to a [`LogSink`], and enforces a deadline.
//! - [`LogSink`] turns engine log lines into progress events.
//! - [`ScratchSpace`] hands out per-request scratch directories and reaps
//!   ones left behind.

pub mod engine;
pub mod runner;
pub mod scratch;
pub mod sink;

pub use engine::EngineConfig;
pub use runner::{JobError, JobRunner};
pub use scratch::{JobScratch, ScratchSpace};
pub use sink::LogSink;
