//! Workflow controller: upload, generate, download, reset.
//!
//! One controller instance owns the whole upload/generate/poll/download
//! flow and the single "current media" slot. The slot holds the uploaded
//! source URL until a job completes, at which point it is overwritten with
//! the result URL so that a later download targets the generated media.

use crate::config::ServiceConfig;
use crate::download::{DownloadOutcome, DownloadResolver};
use crate::error::{PipelineError, Result};
use crate::job::JobId;
use crate::poll::{poll_until_terminal, CancelToken, PollOptions, TokioSleeper};
use crate::service::{EffectsService, UploadedAsset};
use std::path::Path;

/// UI-facing workflow state; exactly one is active at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkflowState {
    Idle,
    Uploading,
    Ready,
    Submitting,
    Processing,
    Complete,
    Error,
}

/// Orchestrates one upload/generate/download flow against a service.
pub struct WorkflowController {
    service: Box<dyn EffectsService>,
    poll: PollOptions,
    state: WorkflowState,
    current_media: Option<UploadedAsset>,
    active_job: Option<JobId>,
}

impl WorkflowController {
    pub fn new(service: Box<dyn EffectsService>, config: &ServiceConfig) -> Self {
        Self {
            service,
            poll: PollOptions::from(config),
            state: WorkflowState::Idle,
            current_media: None,
            active_job: None,
        }
    }

    pub fn state(&self) -> WorkflowState {
        self.state
    }

    /// Current working media: the upload until a job completes, the result
    /// afterwards.
    pub fn current_media(&self) -> Option<&UploadedAsset> {
        self.current_media.as_ref()
    }

    pub fn active_job(&self) -> Option<&JobId> {
        self.active_job.as_ref()
    }

    /// Adopt an already-uploaded media URL as the current media, skipping
    /// the upload step.
    pub fn adopt_media(&mut self, url: impl Into<String>) {
        self.current_media = Some(UploadedAsset { url: url.into() });
        self.state = WorkflowState::Ready;
    }

    /// Upload a newly chosen file, replacing any previous media.
    pub async fn select_file(&mut self, path: &Path) -> Result<UploadedAsset> {
        self.state = WorkflowState::Uploading;
        match self.service.upload(path).await {
            Ok(asset) => {
                self.current_media = Some(asset.clone());
                self.state = WorkflowState::Ready;
                Ok(asset)
            }
            Err(e) => {
                log::error!("upload failed: {e}");
                self.state = WorkflowState::Error;
                Err(e)
            }
        }
    }

    /// Submit a generation job for the current media and poll it to a
    /// terminal state, returning the result URL.
    ///
    /// Errors with [`PipelineError::NoSource`] when nothing has been
    /// uploaded, and with [`PipelineError::Busy`] when a job is already in
    /// flight; a second request is rejected rather than queued.
    pub async fn generate(
        &mut self,
        cancel: &CancelToken,
        progress: impl FnMut(u32) + Send,
    ) -> Result<String> {
        if matches!(
            self.state,
            WorkflowState::Submitting | WorkflowState::Processing
        ) {
            return Err(PipelineError::Busy);
        }
        let source = self
            .current_media
            .clone()
            .ok_or(PipelineError::NoSource)?;

        self.state = WorkflowState::Submitting;
        let outcome = self.run_generation(&source.url, cancel, progress).await;
        self.active_job = None;

        match outcome {
            Ok(result_url) => {
                // The media slot now points at the result, so a download
                // targets the generated media.
                self.current_media = Some(UploadedAsset {
                    url: result_url.clone(),
                });
                self.state = WorkflowState::Complete;
                Ok(result_url)
            }
            Err(e) => {
                log::error!("generation failed: {e}");
                self.state = WorkflowState::Error;
                Err(e)
            }
        }
    }

    async fn run_generation(
        &mut self,
        media_url: &str,
        cancel: &CancelToken,
        progress: impl FnMut(u32) + Send,
    ) -> Result<String> {
        let submitted = self.service.submit(media_url).await?;
        self.active_job = Some(submitted.job_id.clone());
        self.state = WorkflowState::Processing;

        let terminal = poll_until_terminal(
            self.service.as_ref(),
            &submitted.job_id,
            self.poll,
            &TokioSleeper,
            cancel,
            progress,
        )
        .await?;

        terminal.result_url()
    }

    /// Download the current media through the resolver fallback chain.
    pub async fn download(&self, out_dir: &Path) -> Result<DownloadOutcome> {
        let media = self.current_media.as_ref().ok_or(PipelineError::NoSource)?;
        let resolver = DownloadResolver::new(out_dir.to_path_buf());
        Ok(resolver.resolve(self.service.as_ref(), &media.url).await)
    }

    /// Return to the initial state, clearing media and any job reference.
    pub fn reset(&mut self) {
        self.current_media = None;
        self.active_job = None;
        self.state = WorkflowState::Idle;
    }
}
