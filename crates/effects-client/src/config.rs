//! Service configuration for the effects generation backend.

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Which generation endpoint family the service should use.
///
/// The two families take slightly different submit bodies: the video
/// endpoint expects the source URL wrapped in an array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EffectMode {
    /// `image-gen` endpoints
    Image,
    /// `video-gen` endpoints
    Video,
}

impl EffectMode {
    /// Endpoint path segment for this mode.
    pub fn endpoint(&self) -> &'static str {
        match self {
            Self::Image => "image-gen",
            Self::Video => "video-gen",
        }
    }

    /// Model identifier sent in submit bodies.
    pub fn model(&self) -> &'static str {
        match self {
            Self::Image => "image-effects",
            Self::Video => "video-effects",
        }
    }
}

impl std::fmt::Display for EffectMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.endpoint())
    }
}

/// Connection and generation parameters for one workflow instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// API host for upload-url, generation and proxy endpoints.
    pub api_base: String,

    /// Content host serving uploaded objects.
    ///
    /// Read URLs are derived client-side as `{content_base}/{file_name}`;
    /// the storage backend never returns them. The naming scheme used at
    /// upload time and this base must match the backend's actual layout.
    pub content_base: String,

    /// Account identifier passed through to the API.
    pub user_id: String,

    /// Effect selector naming the transformation to apply.
    pub effect_id: String,

    /// Image or video generation.
    pub mode: EffectMode,

    /// Ask the backend to strip its watermark.
    pub remove_watermark: bool,

    /// Keep the generation out of public galleries.
    pub private: bool,

    /// Delay between job status checks.
    pub poll_interval: Duration,

    /// Maximum number of status checks before giving up.
    pub max_polls: u32,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            api_base: "https://api.chromastudio.ai".to_string(),
            content_base: "https://contents.maxstudio.ai".to_string(),
            user_id: "DObRu1vyStbUynoQmTcHBlhs55z2".to_string(),
            effect_id: "stencilMaker".to_string(),
            mode: EffectMode::Image,
            remove_watermark: true,
            private: true,
            poll_interval: Duration::from_millis(2000),
            max_polls: 60,
        }
    }
}

impl ServiceConfig {
    /// With API host
    pub fn with_api_base(mut self, base: impl Into<String>) -> Self {
        self.api_base = base.into();
        self
    }

    /// With content host
    pub fn with_content_base(mut self, base: impl Into<String>) -> Self {
        self.content_base = base.into();
        self
    }

    /// With account identifier
    pub fn with_user_id(mut self, id: impl Into<String>) -> Self {
        self.user_id = id.into();
        self
    }

    /// With effect selector
    pub fn with_effect(mut self, effect: impl Into<String>) -> Self {
        self.effect_id = effect.into();
        self
    }

    /// With generation mode
    pub fn with_mode(mut self, mode: EffectMode) -> Self {
        self.mode = mode;
        self
    }

    /// With polling cadence
    pub fn with_polling(mut self, interval: Duration, max_polls: u32) -> Self {
        self.poll_interval = interval;
        self.max_polls = max_polls;
        self
    }

    /// Base URL of the generation endpoint family for the active mode.
    pub fn gen_base(&self) -> String {
        format!("{}/{}", self.api_base, self.mode.endpoint())
    }

    /// Status URL for a job.
    pub fn status_url(&self, job_id: &str) -> String {
        format!("{}/{}/{}/status", self.gen_base(), self.user_id, job_id)
    }

    /// Save configuration to JSON
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Load configuration from JSON
    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ServiceConfig::default();
        assert_eq!(config.mode, EffectMode::Image);
        assert_eq!(config.max_polls, 60);
        assert_eq!(config.poll_interval, Duration::from_millis(2000));
        assert_eq!(config.gen_base(), "https://api.chromastudio.ai/image-gen");
    }

    #[test]
    fn test_builder() {
        let config = ServiceConfig::default()
            .with_api_base("http://localhost:9000")
            .with_user_id("user-1")
            .with_effect("oilPainting")
            .with_mode(EffectMode::Video);

        assert_eq!(config.gen_base(), "http://localhost:9000/video-gen");
        assert_eq!(
            config.status_url("job-7"),
            "http://localhost:9000/video-gen/user-1/job-7/status"
        );
        assert_eq!(config.effect_id, "oilPainting");
    }

    #[test]
    fn test_mode_display() {
        assert_eq!(EffectMode::Image.to_string(), "image-gen");
        assert_eq!(EffectMode::Video.to_string(), "video-gen");
    }

    #[test]
    fn test_save_load_roundtrip() {
        let path = std::env::temp_dir().join("effects-client-config-test.json");
        let config = ServiceConfig::default().with_user_id("roundtrip");
        config.save(&path).unwrap();
        let loaded = ServiceConfig::load(&path).unwrap();
        assert_eq!(loaded.user_id, "roundtrip");
        assert_eq!(loaded.max_polls, config.max_polls);
        let _ = std::fs::remove_file(&path);
    }
}
