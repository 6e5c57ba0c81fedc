//! Multi-strategy download of a result media URL.
//!
//! Strategies are tried in order, each only if the previous one failed:
//! server-side proxy fetch, direct fetch, a PNG re-encode for images, and
//! finally a hand-off of the bare URL to the caller. Every stage failure is
//! absorbed and logged; the chain as a whole cannot fail.

use crate::error::{PipelineError, Result};
use crate::ident::file_token;
use crate::service::EffectsService;
use std::io::Cursor;
use std::path::PathBuf;

/// What the resolver managed to do with the URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadOutcome {
    /// Bytes were saved locally.
    Saved { path: PathBuf },
    /// Nothing could be fetched; the caller should open the URL itself.
    Handoff { url: String },
}

/// Resolves a result URL to local bytes through the fallback chain.
pub struct DownloadResolver {
    out_dir: PathBuf,
}

impl DownloadResolver {
    pub fn new(out_dir: PathBuf) -> Self {
        Self { out_dir }
    }

    /// Run the strategy chain for `url`.
    pub async fn resolve(&self, service: &dyn EffectsService, url: &str) -> DownloadOutcome {
        match self.via_proxy(service, url).await {
            Ok(path) => return DownloadOutcome::Saved { path },
            Err(e) => log::warn!("proxy download failed, trying direct fetch: {e}"),
        }

        match self.via_direct(service, url).await {
            Ok(path) => return DownloadOutcome::Saved { path },
            Err(e) => log::warn!("direct fetch failed: {e}"),
        }

        // Re-encode only applies to images; a video URL skips straight to
        // the hand-off.
        if !media_is_video(url) {
            match self.via_reencode(service, url).await {
                Ok(path) => return DownloadOutcome::Saved { path },
                Err(e) => log::warn!("re-encode download failed: {e}"),
            }
        }

        DownloadOutcome::Handoff {
            url: url.to_string(),
        }
    }

    async fn via_proxy(&self, service: &dyn EffectsService, url: &str) -> Result<PathBuf> {
        let body = service.fetch_proxy(url).await?;
        let extension = infer_extension(body.content_type.as_deref(), url);
        self.save(&body.bytes, extension)
    }

    async fn via_direct(&self, service: &dyn EffectsService, url: &str) -> Result<PathBuf> {
        let body = service.fetch_direct(url).await?;
        self.save(&body.bytes, "png")
    }

    /// Reload the media and re-encode it as a real PNG.
    async fn via_reencode(&self, service: &dyn EffectsService, url: &str) -> Result<PathBuf> {
        let body = service.fetch_direct(url).await?;
        let decoded = image::load_from_memory(&body.bytes)
            .map_err(|e| PipelineError::MalformedResponse(format!("not a decodable image: {e}")))?;

        let mut png = Vec::new();
        decoded
            .write_to(&mut Cursor::new(&mut png), image::ImageFormat::Png)
            .map_err(|e| PipelineError::MalformedResponse(format!("png encode failed: {e}")))?;
        self.save(&png, "png")
    }

    fn save(&self, bytes: &[u8], extension: &str) -> Result<PathBuf> {
        std::fs::create_dir_all(&self.out_dir)?;
        let path = self
            .out_dir
            .join(format!("stencil_{}.{extension}", file_token(8)));
        std::fs::write(&path, bytes)?;
        log::info!("saved {} bytes to {}", bytes.len(), path.display());
        Ok(path)
    }
}

/// File extension for a fetched body: declared content type first, then the
/// URL suffix among {jpg, webp, mp4}, defaulting to `png`.
fn infer_extension(content_type: Option<&str>, url: &str) -> &'static str {
    let content_type = content_type.unwrap_or("");
    let url = url.to_ascii_lowercase();
    if content_type.contains("jpeg") || url.contains(".jpg") || url.contains(".jpeg") {
        "jpg"
    } else if content_type.contains("webp") || url.contains(".webp") {
        "webp"
    } else if content_type.contains("mp4") || url.contains(".mp4") {
        "mp4"
    } else {
        "png"
    }
}

/// Whether a result URL points at a video rather than an image.
pub fn media_is_video(url: &str) -> bool {
    let base = url.split('?').next().unwrap_or(url).to_ascii_lowercase();
    base.ends_with(".mp4") || base.ends_with(".webm")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::{JobId, JobStatusResponse, SubmittedJob};
    use crate::service::{FetchedBody, UploadedAsset};
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    #[test]
    fn test_infer_extension() {
        assert_eq!(infer_extension(Some("image/jpeg"), "https://c/x"), "jpg");
        assert_eq!(infer_extension(None, "https://c/x.JPG"), "jpg");
        assert_eq!(infer_extension(None, "https://c/x.jpeg?v=1"), "jpg");
        assert_eq!(infer_extension(Some("image/webp"), "https://c/x"), "webp");
        assert_eq!(infer_extension(Some("video/mp4"), "https://c/x"), "mp4");
        assert_eq!(infer_extension(None, "https://c/x.mp4"), "mp4");
        assert_eq!(infer_extension(Some("image/png"), "https://c/x"), "png");
        assert_eq!(infer_extension(None, "https://c/x.bin"), "png");
    }

    #[test]
    fn test_media_is_video() {
        assert!(media_is_video("https://c/out.mp4"));
        assert!(media_is_video("https://c/out.MP4?t=1"));
        assert!(media_is_video("https://c/out.webm"));
        assert!(!media_is_video("https://c/out.png"));
        assert!(!media_is_video("https://c/mp4-guide.png"));
    }

    /// Fetch-only service: proxy result is fixed, direct results replay a
    /// script. Upload/submit/status are never reached from the resolver.
    struct FetchScript {
        proxy: Result<FetchedBody>,
        direct: Mutex<VecDeque<Result<FetchedBody>>>,
        direct_calls: AtomicU32,
    }

    impl FetchScript {
        fn new(proxy: Result<FetchedBody>, direct: Vec<Result<FetchedBody>>) -> Self {
            Self {
                proxy,
                direct: Mutex::new(direct.into()),
                direct_calls: AtomicU32::new(0),
            }
        }
    }

    fn network(msg: &str) -> crate::error::PipelineError {
        crate::error::PipelineError::Network(msg.to_string())
    }

    fn clone_result(r: &Result<FetchedBody>) -> Result<FetchedBody> {
        match r {
            Ok(body) => Ok(body.clone()),
            Err(e) => Err(network(&e.to_string())),
        }
    }

    #[async_trait::async_trait]
    impl EffectsService for FetchScript {
        async fn upload(&self, _path: &std::path::Path) -> Result<UploadedAsset> {
            unreachable!("not used by download")
        }

        async fn submit(&self, _media_url: &str) -> Result<SubmittedJob> {
            unreachable!("not used by download")
        }

        async fn job_status(&self, _job_id: &JobId) -> Result<JobStatusResponse> {
            unreachable!("not used by download")
        }

        async fn fetch_proxy(&self, _url: &str) -> Result<FetchedBody> {
            clone_result(&self.proxy)
        }

        async fn fetch_direct(&self, _url: &str) -> Result<FetchedBody> {
            self.direct_calls.fetch_add(1, Ordering::SeqCst);
            self.direct
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(network("no more direct fetches")))
        }
    }

    fn test_dir(tag: &str) -> PathBuf {
        std::env::temp_dir().join(format!("effects-dl-{tag}-{}", file_token(8)))
    }

    fn body(bytes: &[u8], content_type: Option<&str>) -> FetchedBody {
        FetchedBody {
            bytes: bytes.to_vec(),
            content_type: content_type.map(|s| s.to_string()),
        }
    }

    fn tiny_png() -> Vec<u8> {
        let img = image::RgbImage::from_pixel(2, 2, image::Rgb([255, 0, 0]));
        let mut bytes = Vec::new();
        image::DynamicImage::ImageRgb8(img)
            .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
            .unwrap();
        bytes
    }

    #[tokio::test]
    async fn test_proxy_success_uses_declared_type() {
        let dir = test_dir("proxy");
        let service = FetchScript::new(Ok(body(b"bytes", Some("image/webp"))), vec![]);

        let outcome = DownloadResolver::new(dir.clone())
            .resolve(&service, "https://c/out")
            .await;

        match outcome {
            DownloadOutcome::Saved { path } => {
                assert_eq!(path.extension().unwrap(), "webp");
                assert_eq!(std::fs::read(&path).unwrap(), b"bytes");
            }
            other => panic!("expected Saved, got {other:?}"),
        }
        assert_eq!(service.direct_calls.load(Ordering::SeqCst), 0);
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn test_direct_fallback_saves_as_png() {
        let dir = test_dir("direct");
        let service = FetchScript::new(
            Err(network("proxy unreachable")),
            vec![Ok(body(b"raw", None))],
        );

        let outcome = DownloadResolver::new(dir.clone())
            .resolve(&service, "https://c/out.webp")
            .await;

        match outcome {
            DownloadOutcome::Saved { path } => {
                // Direct fetch saves as png unconditionally.
                assert_eq!(path.extension().unwrap(), "png");
            }
            other => panic!("expected Saved, got {other:?}"),
        }
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn test_reencode_fallback_produces_real_png() {
        let dir = test_dir("reencode");
        let service = FetchScript::new(
            Err(network("proxy unreachable")),
            vec![Err(network("direct blocked")), Ok(body(&tiny_png(), None))],
        );

        let outcome = DownloadResolver::new(dir.clone())
            .resolve(&service, "https://c/out.png")
            .await;

        match outcome {
            DownloadOutcome::Saved { path } => {
                let reloaded = image::open(&path).unwrap().to_rgb8();
                assert_eq!(reloaded.dimensions(), (2, 2));
            }
            other => panic!("expected Saved, got {other:?}"),
        }
        // One reload beyond the failed direct fetch.
        assert_eq!(service.direct_calls.load(Ordering::SeqCst), 2);
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn test_video_url_skips_reencode_and_hands_off() {
        let dir = test_dir("handoff");
        let service = FetchScript::new(Err(network("proxy down")), vec![Err(network("cdn down"))]);

        let outcome = DownloadResolver::new(dir.clone())
            .resolve(&service, "https://c/out.mp4")
            .await;

        assert_eq!(
            outcome,
            DownloadOutcome::Handoff {
                url: "https://c/out.mp4".to_string()
            }
        );
        assert_eq!(service.direct_calls.load(Ordering::SeqCst), 1);
        let _ = std::fs::remove_dir_all(&dir);
    }
}
