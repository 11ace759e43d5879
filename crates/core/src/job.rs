//! The per-request conversion job record.

use std::fmt;
use std::path::PathBuf;

use uuid::Uuid;

/// Identity of a job on the progress channel.
///
/// Derived from the uploaded filename alone, so two concurrent uploads with
/// the same name share one identity on the channel. Use
/// [`Job::request_id`] to tell them apart in logs.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct JobId(String);

impl JobId {
    pub fn from_filename(filename: &str) -> Self {
        Self(filename.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    Pending,
    Succeeded,
    Failed,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Pending)
    }
}

/// One conversion attempt: where the input lives, where the engine must
/// write its output, and how it ended.
#[derive(Debug, Clone)]
pub struct Job {
    pub id: JobId,
    /// Request-scoped correlation id, for logs only.
    pub request_id: Uuid,
    pub input_path: PathBuf,
    pub output_path: PathBuf,
    pub status: JobStatus,
}

impl Job {
    pub fn new(filename: &str, input_path: PathBuf, output_path: PathBuf) -> Self {
        Self {
            id: JobId::from_filename(filename),
            request_id: Uuid::new_v4(),
            input_path,
            output_path,
            status: JobStatus::Pending,
        }
    }

    pub fn mark_succeeded(&mut self) {
        self.status = JobStatus::Succeeded;
    }

    pub fn mark_failed(&mut self) {
        self.status = JobStatus::Failed;
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
