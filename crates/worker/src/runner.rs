//! Runs one conversion job in a child process.
//!
//! The engine is a separate OS process: if it crashes, leaks memory or
//! hangs, only that process is lost. The calling task awaits the process
//! until it exits or the deadline passes, at which point it is killed.
//!
//! On Unix the engine leads its own process group, so the helpers it starts
//! (OCR and rasterizer processes, worker pools) are killed along with it.

use std::collections::VecDeque;
use std::process::Stdio;
use std::time::{Duration, Instant};

use pdfrelay_core::job::Job;
use pdfrelay_core::options::ConversionOptions;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Child;
use tokio::sync::mpsc;

use crate::engine::EngineConfig;
use crate::sink::LogSink;

/// Default upper bound on a single conversion.
pub const DEFAULT_MAX_DURATION: Duration = Duration::from_secs(3600);

/// Number of trailing engine lines kept for failure diagnostics.
const DIAGNOSTIC_TAIL_LINES: usize = 20;

#[derive(Debug, thiserror::Error)]
pub enum JobError {
    #[error("failed to start conversion engine: {0}")]
    Spawn(std::io::Error),

    /// The engine crashed, exited non-zero, or produced no output file.
    /// `exit_code` is `None` when the process was killed by a signal.
    #[error("conversion failed (exit code {exit_code:?}): {diagnostics}")]
    ConversionFailed {
        exit_code: Option<i32>,
        diagnostics: String,
    },

    #[error("conversion timed out after {elapsed_ms}ms")]
    TimedOut { elapsed_ms: u64 },

    #[error("I/O error while running conversion: {0}")]
    Io(#[from] std::io::Error),
}

/// Launches the conversion engine for a job and waits for it.
#[derive(Debug, Clone)]
pub struct JobRunner {
    engine: EngineConfig,
    max_duration: Duration,
}

impl JobRunner {
    pub fn new(engine: EngineConfig, max_duration: Duration) -> Self {
        Self {
            engine,
            max_duration,
        }
    }

    /// Run `job` to completion, feeding every engine output line to `sink`.
    ///
    /// Updates `job.status` to reflect the outcome.
    pub async fn run(
        &self,
        job: &mut Job,
        sink: &LogSink,
        options: &ConversionOptions,
    ) -> Result<(), JobError> {
        let result = self.execute(job, sink, options).await;
        match &result {
            Ok(()) => job.mark_succeeded(),
            Err(e) => {
                tracing::error!(
                    filename = %job.id,
                    request_id = %job.request_id,
                    error = %e,
                    "Conversion job failed",
                );
                job.mark_failed();
            }
        }
        result
    }

    async fn execute(
        &self,
        job: &Job,
        sink: &LogSink,
        options: &ConversionOptions,
    ) -> Result<(), JobError> {
        let mut cmd = self
            .engine
            .command(options, &job.input_path, &job.output_path);
        // `kill_on_drop(true)` ensures the engine dies with the request if
        // the future is dropped (deadline, client disconnect, shutdown).
        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        #[cfg(unix)]
        cmd.process_group(0);

        let start = Instant::now();
        let mut child = cmd.spawn().map_err(JobError::Spawn)?;
        // Dropped on every return path, including cancellation of this future.
        let group = ProcessGroup::of(&child);

        tracing::info!(
            filename = %job.id,
            request_id = %job.request_id,
            pid = child.id(),
            "Conversion engine started",
        );

        // Both streams feed one queue; each stream keeps its own order.
        let (tx, mut rx) = mpsc::unbounded_channel::<String>();
        if let Some(stdout) = child.stdout.take() {
            tokio::spawn(forward_lines(stdout, tx.clone()));
        }
        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(forward_lines(stderr, tx.clone()));
        }
        drop(tx);

        let mut tail: VecDeque<String> = VecDeque::with_capacity(DIAGNOSTIC_TAIL_LINES);

        let drive = async {
            while let Some(line) = rx.recv().await {
                sink.on_line(&line).await;
                if tail.len() == DIAGNOSTIC_TAIL_LINES {
                    tail.pop_front();
                }
                tail.push_back(line);
            }
            child.wait().await
        };

        let status = match tokio::time::timeout(self.max_duration, drive).await {
            Ok(status) => status?,
            Err(_elapsed) => {
                let elapsed_ms = start.elapsed().as_millis() as u64;
                group.kill();
                if let Err(e) = child.kill().await {
                    tracing::warn!(filename = %job.id, error = %e, "Failed to kill timed-out engine");
                }
                return Err(JobError::TimedOut { elapsed_ms });
            }
        };

        let elapsed_ms = start.elapsed().as_millis() as u64;

        if !status.success() {
            return Err(JobError::ConversionFailed {
                exit_code: status.code(),
                diagnostics: join_tail(&tail),
            });
        }

        if !tokio::fs::try_exists(&job.output_path).await? {
            return Err(JobError::ConversionFailed {
                exit_code: status.code(),
                diagnostics: "engine exited successfully but wrote no output file".to_string(),
            });
        }

        tracing::info!(
            filename = %job.id,
            request_id = %job.request_id,
            elapsed_ms,
            "Conversion engine finished",
        );
        Ok(())
    }
}

/// The engine's process group; every member is sent `SIGKILL` on drop.
///
/// Members still running after a normal exit are orphaned helpers and are
/// killed as well.
struct ProcessGroup {
    pgid: Option<u32>,
}

impl ProcessGroup {
    fn of(child: &Child) -> Self {
        Self { pgid: child.id() }
    }

    #[cfg(unix)]
    fn kill(&self) {
        let Some(pgid) = self.pgid.and_then(|id| libc::pid_t::try_from(id).ok()) else {
            return;
        };
        // Safety: kill(2) takes no pointers; a negative pid addresses the group.
        let ret = unsafe { libc::kill(-pgid, libc::SIGKILL) };
        if ret != 0 {
            let err = std::io::Error::last_os_error();
            if err.raw_os_error() != Some(libc::ESRCH) {
                tracing::warn!(pgid, error = %err, "Failed to kill engine process group");
            }
        }
    }

    #[cfg(not(unix))]
    fn kill(&self) {}
}

impl Drop for ProcessGroup {
    fn drop(&mut self) {
        self.kill();
    }
}

/// Read `reader` line by line into `tx` until EOF.
///
/// Invalid UTF-8 is replaced rather than aborting the stream.
async fn forward_lines<R: AsyncRead + Unpin>(reader: R, tx: mpsc::UnboundedSender<String>) {
    let mut segments = BufReader::new(reader).split(b'\n');
    loop {
        match segments.next_segment().await {
            Ok(Some(bytes)) => {
                let line = String::from_utf8_lossy(&bytes);
                if tx.send(line.trim_end_matches('\r').to_string()).is_err() {
                    break;
                }
            }
            Ok(None) => break,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read engine output");
                break;
            }
        }
    }
}

fn join_tail(tail: &VecDeque<String>) -> String {
    tail.iter().map(String::as_str).collect::<Vec<_>>().join("\n")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
