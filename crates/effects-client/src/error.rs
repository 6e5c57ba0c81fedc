//! Error taxonomy for the upload / generate / download pipeline.

use thiserror::Error;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, PipelineError>;

#[derive(Debug, Error)]
pub enum PipelineError {
    /// Transport failure or non-success HTTP status.
    #[error("network error: {0}")]
    Network(String),

    /// The generation backend reported a terminal failure for the job.
    #[error("generation job failed: {0}")]
    JobFailed(String),

    /// The polling budget was exhausted before the job reached a terminal
    /// status.
    #[error("job timed out after {attempts} status checks")]
    Timeout { attempts: u32 },

    /// A response was parseable but missing a field we require.
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// The caller signalled the cancellation token.
    #[error("operation cancelled")]
    Cancelled,

    /// Generation requested with no uploaded media in the workflow.
    #[error("no uploaded media to generate from")]
    NoSource,

    /// Generation requested while a previous job is still in flight.
    #[error("a generation job is already in flight")]
    Busy,

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl From<reqwest::Error> for PipelineError {
    fn from(err: reqwest::Error) -> Self {
        PipelineError::Network(err.to_string())
    }
}

impl PipelineError {
    /// Build a `Network` error from a non-success HTTP response, surfacing
    /// the status text the way the service reports it.
    pub fn from_status(context: &str, status: reqwest::StatusCode) -> Self {
        PipelineError::Network(format!("{context}: {status}"))
    }
}
