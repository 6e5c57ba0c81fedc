//! Service abstraction over the remote effects backend.
//!
//! One trait covers the four remote concerns the workflow needs: object
//! upload, job submission, status reads and result-byte fetches. The
//! production implementation is [`crate::http::StudioClient`]; tests script
//! their own.

use crate::error::Result;
use crate::job::{JobId, JobStatusResponse, SubmittedJob};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// A successfully uploaded source file, addressed by its derived read URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadedAsset {
    pub url: String,
}

/// Raw bytes fetched from a result URL, with the declared content type if
/// the server sent one.
#[derive(Debug, Clone)]
pub struct FetchedBody {
    pub bytes: Vec<u8>,
    pub content_type: Option<String>,
}

/// Remote effects service operations.
#[async_trait::async_trait]
pub trait EffectsService: Send + Sync {
    /// Upload a local file and return its derived read URL.
    async fn upload(&self, path: &Path) -> Result<UploadedAsset>;

    /// Submit a generation job for an uploaded media URL.
    async fn submit(&self, media_url: &str) -> Result<SubmittedJob>;

    /// Read the current status of a job.
    async fn job_status(&self, job_id: &JobId) -> Result<JobStatusResponse>;

    /// Fetch result bytes through the server-side download proxy.
    async fn fetch_proxy(&self, url: &str) -> Result<FetchedBody>;

    /// Fetch result bytes directly from the original URL (cache-busted).
    async fn fetch_direct(&self, url: &str) -> Result<FetchedBody>;
}
