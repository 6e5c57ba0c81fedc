//! Client for a hosted media-effects generation service.
//!
//! Covers the full workflow the service expects of a client: upload a
//! source file to object storage via a write-capability URL, submit a
//! generation job naming an effect, poll the job status endpoint to a
//! terminal state, and download the result through a resilient fallback
//! chain. [`WorkflowController`] drives the whole flow; the individual
//! pieces are usable on their own.

pub mod config;
pub mod download;
pub mod error;
pub mod http;
pub mod ident;
pub mod job;
pub mod poll;
pub mod service;
pub mod workflow;

pub use config::{EffectMode, ServiceConfig};
pub use download::{media_is_video, DownloadOutcome, DownloadResolver};
pub use error::{PipelineError, Result};
pub use http::StudioClient;
pub use job::{classify, JobId, JobStatusResponse, StatusClass, SubmittedJob};
pub use poll::{poll_until_terminal, CancelToken, PollOptions, Sleeper, TokioSleeper};
pub use service::{EffectsService, FetchedBody, UploadedAsset};
pub use workflow::{WorkflowController, WorkflowState};
