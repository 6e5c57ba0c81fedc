//! Production `EffectsService` backed by the remote HTTP API.

use crate::config::{EffectMode, ServiceConfig};
use crate::error::{PipelineError, Result};
use crate::ident::file_token;
use crate::job::{JobId, JobStatusResponse, SubmittedJob};
use crate::service::{EffectsService, FetchedBody, UploadedAsset};
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use std::path::Path;

/// HTTP client for the effects generation service.
pub struct StudioClient {
    config: ServiceConfig,
    client: reqwest::Client,
}

impl StudioClient {
    /// Create a new client over the given configuration.
    pub fn new(config: ServiceConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    /// Request a write-capability URL for the chosen object name.
    async fn upload_target(&self, file_name: &str) -> Result<String> {
        let response = self
            .client
            .get(format!("{}/get-emd-upload-url", self.config.api_base))
            .query(&[("fileName", file_name)])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(PipelineError::from_status(
                "Failed to get signed URL",
                response.status(),
            ));
        }

        Ok(response.text().await?)
    }

    /// Transfer raw bytes to a write-capability URL.
    async fn put_object(&self, target: &str, bytes: Vec<u8>, content_type: &str) -> Result<()> {
        let response = self
            .client
            .put(target)
            .header(CONTENT_TYPE, content_type)
            .body(bytes)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(PipelineError::from_status(
                "Failed to upload file",
                response.status(),
            ));
        }

        Ok(())
    }

    fn submit_body(&self, media_url: &str) -> serde_json::Value {
        match self.config.mode {
            EffectMode::Image => serde_json::json!({
                "model": self.config.mode.model(),
                "toolType": self.config.mode.model(),
                "effectId": self.config.effect_id,
                "imageUrl": media_url,
                "userId": self.config.user_id,
                "removeWatermark": self.config.remove_watermark,
                "isPrivate": self.config.private,
            }),
            EffectMode::Video => serde_json::json!({
                "imageUrl": [media_url],
                "effectId": self.config.effect_id,
                "userId": self.config.user_id,
                "removeWatermark": self.config.remove_watermark,
                "model": self.config.mode.model(),
                "isPrivate": self.config.private,
            }),
        }
    }
}

#[async_trait::async_trait]
impl EffectsService for StudioClient {
    async fn upload(&self, path: &Path) -> Result<UploadedAsset> {
        let file_name = object_name(path);
        let target = self.upload_target(&file_name).await?;
        log::debug!("got upload target for {file_name}");

        let bytes = tokio::fs::read(path).await?;
        self.put_object(&target, bytes, content_type_for(&file_name))
            .await?;

        // The read URL is never returned by the server; it is derived from
        // the object name we chose. The naming scheme and the content host
        // must match the storage backend's layout exactly.
        let url = format!("{}/{}", self.config.content_base, file_name);
        log::info!("uploaded {} to {url}", path.display());
        Ok(UploadedAsset { url })
    }

    async fn submit(&self, media_url: &str) -> Result<SubmittedJob> {
        let response = self
            .client
            .post(self.config.gen_base())
            .header(ACCEPT, "application/json, text/plain, */*")
            .json(&self.submit_body(media_url))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(PipelineError::from_status(
                "Failed to submit job",
                response.status(),
            ));
        }

        let job: SubmittedJob = response.json().await?;
        log::info!("job {} submitted, status: {}", job.job_id, job.status);
        Ok(job)
    }

    async fn job_status(&self, job_id: &JobId) -> Result<JobStatusResponse> {
        let response = self
            .client
            .get(self.config.status_url(&job_id.0))
            .header(ACCEPT, "application/json, text/plain, */*")
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(PipelineError::from_status(
                "Failed to check status",
                response.status(),
            ));
        }

        Ok(response.json().await?)
    }

    async fn fetch_proxy(&self, url: &str) -> Result<FetchedBody> {
        let response = self
            .client
            .get(format!("{}/download-proxy", self.config.api_base))
            .query(&[("url", url)])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(PipelineError::from_status(
                "Proxy fetch failed",
                response.status(),
            ));
        }

        read_body(response).await
    }

    async fn fetch_direct(&self, url: &str) -> Result<FetchedBody> {
        let response = self.client.get(cache_busted(url)).send().await?;

        if !response.status().is_success() {
            return Err(PipelineError::from_status(
                "Direct fetch failed",
                response.status(),
            ));
        }

        read_body(response).await
    }
}

async fn read_body(response: reqwest::Response) -> Result<FetchedBody> {
    let content_type = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string());
    let bytes = response.bytes().await?.to_vec();
    Ok(FetchedBody {
        bytes,
        content_type,
    })
}

/// Derive the storage object name for a local file: a 21-character random
/// token plus the original extension, defaulting to `jpg`.
fn object_name(path: &Path) -> String {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .filter(|e| !e.is_empty())
        .unwrap_or("jpg");
    format!("{}.{}", file_token(21), extension)
}

/// Declared content type for an object name, by extension.
fn content_type_for(file_name: &str) -> &'static str {
    let extension = file_name.rsplit('.').next().unwrap_or("");
    match extension.to_ascii_lowercase().as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "webp" => "image/webp",
        "gif" => "image/gif",
        "mp4" => "video/mp4",
        "webm" => "video/webm",
        _ => "application/octet-stream",
    }
}

/// Append a cache-busting timestamp parameter to a URL.
fn cache_busted(url: &str) -> String {
    let separator = if url.contains('?') { '&' } else { '?' };
    format!(
        "{url}{separator}t={}",
        chrono::Utc::now().timestamp_millis()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_object_name_keeps_extension() {
        let name = object_name(&PathBuf::from("photo.PNG"));
        assert!(name.ends_with(".PNG"));
        assert_eq!(name.len(), 21 + ".PNG".len());
    }

    #[test]
    fn test_object_name_defaults_to_jpg() {
        let name = object_name(&PathBuf::from("photo"));
        assert!(name.ends_with(".jpg"));
    }

    #[test]
    fn test_content_type_for() {
        assert_eq!(content_type_for("a.jpg"), "image/jpeg");
        assert_eq!(content_type_for("a.JPEG"), "image/jpeg");
        assert_eq!(content_type_for("a.webp"), "image/webp");
        assert_eq!(content_type_for("a.mp4"), "video/mp4");
        assert_eq!(content_type_for("a.bin"), "application/octet-stream");
    }

    #[test]
    fn test_cache_busted_separator() {
        assert!(cache_busted("https://x/y.png").contains("?t="));
        assert!(cache_busted("https://x/y.png?w=1").contains("&t="));
    }

    #[test]
    fn test_submit_body_shapes() {
        let client = StudioClient::new(ServiceConfig::default());
        let body = client.submit_body("https://c/x.png");
        assert_eq!(body["model"], "image-effects");
        assert_eq!(body["imageUrl"], "https://c/x.png");
        assert_eq!(body["toolType"], "image-effects");

        let client = StudioClient::new(ServiceConfig::default().with_mode(EffectMode::Video));
        let body = client.submit_body("https://c/x.png");
        assert_eq!(body["model"], "video-effects");
        assert!(body["imageUrl"].is_array());
        assert!(body.get("toolType").is_none());
    }
}
