//! Per-request orchestration of one conversion.
//!
//! A request moves through `RECEIVED -> VALIDATED -> SCRATCH_ALLOCATED ->
//! RUNNING -> {SUCCEEDED, FAILED} -> RESPONDED`. Validation has no side
//! effects: nothing touches the disk or the engine until the upload and its
//! options have been accepted. Once validated, exactly one terminal progress
//! event is published for the filename, whatever the outcome.
//!
//! The conversion itself runs on its own task. A client that disconnects
//! drops only the wait for the response; the job still runs to completion
//! or failure, releases its scratch space and publishes its terminal event.

use std::sync::Arc;

use axum::body::Bytes;
use pdfrelay_core::error::CoreError;
use pdfrelay_core::job::Job;
use pdfrelay_core::options::ConversionOptions;
use pdfrelay_core::upload;
use pdfrelay_events::ProgressPublisher;
use pdfrelay_worker::{JobRunner, JobScratch, LogSink, ScratchSpace};

use crate::error::{AppError, AppResult};
use crate::state::AppState;

/// The parts of a multipart upload the service cares about.
#[derive(Debug, Default)]
pub struct ConversionRequest {
    /// The `file` part, if present.
    pub file: Option<UploadedFile>,
    /// The `params` part, if present.
    pub params: Option<String>,
}

#[derive(Debug)]
pub struct UploadedFile {
    /// Client-supplied filename; empty when the part carried none.
    pub filename: String,
    pub bytes: Bytes,
}

/// The converted document, returned to the client under its original name.
#[derive(Debug)]
pub struct ConvertedFile {
    pub filename: String,
    pub bytes: Vec<u8>,
}

/// A request that passed validation.
#[derive(Debug)]
pub struct ValidatedRequest {
    pub filename: String,
    pub bytes: Bytes,
    pub options: ConversionOptions,
}

/// Drives one request from upload to response.
#[derive(Clone)]
pub struct RequestOrchestrator {
    publisher: Arc<ProgressPublisher>,
    runner: Arc<JobRunner>,
    scratch: Arc<ScratchSpace>,
}

impl RequestOrchestrator {
    pub fn new(state: &AppState) -> Self {
        Self {
            publisher: Arc::clone(&state.publisher),
            runner: Arc::clone(&state.runner),
            scratch: Arc::clone(&state.scratch),
        }
    }

    /// Validate and convert one upload.
    pub async fn handle(&self, request: ConversionRequest) -> AppResult<ConvertedFile> {
        let validated = validate(request)?;
        self.process(validated).await
    }

    /// Convert a validated upload on a detached task and wait for it.
    pub async fn process(&self, request: ValidatedRequest) -> AppResult<ConvertedFile> {
        let filename = request.filename.clone();
        let task = tokio::spawn(self.clone().complete(request));

        match task.await {
            Ok(result) => result,
            Err(e) => {
                // The task died before reaching its own terminal publish.
                self.publisher.publish_terminal(&filename).await;
                Err(AppError::InternalError(format!("Conversion task failed: {e}")))
            }
        }
    }

    /// Convert, then announce the job's end.
    async fn complete(self, request: ValidatedRequest) -> AppResult<ConvertedFile> {
        let result = self.convert(&request).await;
        self.publisher.publish_terminal(&request.filename).await;

        result.map(|bytes| ConvertedFile {
            filename: request.filename,
            bytes,
        })
    }

    async fn convert(&self, request: &ValidatedRequest) -> AppResult<Vec<u8>> {
        let scratch = self
            .scratch
            .allocate()
            .map_err(|e| AppError::InternalError(format!("Failed to allocate scratch space: {e}")))?;

        let result = self.run_in(&scratch, request).await;
        scratch.release();
        result
    }

    async fn run_in(&self, scratch: &JobScratch, request: &ValidatedRequest) -> AppResult<Vec<u8>> {
        let input_path = scratch.upload_dir().join(&request.filename);
        let output_path = scratch.download_dir().join(&request.filename);

        tokio::fs::write(&input_path, &request.bytes)
            .await
            .map_err(|e| AppError::InternalError(format!("Failed to save upload: {e}")))?;

        let mut job = Job::new(&request.filename, input_path, output_path);
        let sink = LogSink::new(&request.filename, Arc::clone(&self.publisher));

        tracing::info!(
            filename = %job.id,
            request_id = %job.request_id,
            args = ?request.options.args(),
            bytes = request.bytes.len(),
            "Starting conversion",
        );

        self.runner.run(&mut job, &sink, &request.options).await?;

        tokio::fs::read(&job.output_path)
            .await
            .map_err(|e| AppError::InternalError(format!("Failed to read converted file: {e}")))
    }
}

/// Check the upload and parse its options without side effects.
///
/// Order matters: a missing file is reported before a bad filename, and
/// both before any problem with `params`.
pub fn validate(request: ConversionRequest) -> Result<ValidatedRequest, CoreError> {
    let file = request
        .file
        .ok_or_else(|| CoreError::Validation("Missing file".into()))?;

    upload::validate_filename(&file.filename)?;
    let options = ConversionOptions::parse(request.params.as_deref().unwrap_or_default())?;

    Ok(ValidatedRequest {
        filename: file.filename,
        bytes: file.bytes,
        options,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
