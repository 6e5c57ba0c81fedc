//! Generation job wire types and result extraction.

use crate::error::{PipelineError, Result};
use serde::{Deserialize, Serialize};

/// Generation job identifier
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct JobId(pub String);

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Response to a job submission.
#[derive(Debug, Clone, Deserialize)]
pub struct SubmittedJob {
    #[serde(rename = "jobId")]
    pub job_id: JobId,
    #[serde(default)]
    pub status: String,
}

/// One status-endpoint response.
///
/// `status` is kept as the raw server string: the set of in-progress values
/// is open-ended, and anything that is not terminal means "keep polling".
#[derive(Debug, Clone, Deserialize)]
pub struct JobStatusResponse {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub result: Option<serde_json::Value>,
    #[serde(default)]
    pub error: Option<String>,
}

/// Terminal classification of a status string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusClass {
    /// Job finished, result available
    Completed,
    /// Job finished, no result will come
    Failed,
    /// Anything else: queued, processing, unknown
    InProgress,
}

/// Classify a raw status string into a polling decision.
pub fn classify(status: &str) -> StatusClass {
    match status {
        "completed" => StatusClass::Completed,
        "failed" | "error" => StatusClass::Failed,
        _ => StatusClass::InProgress,
    }
}

impl JobStatusResponse {
    pub fn class(&self) -> StatusClass {
        classify(&self.status)
    }

    /// Reason string for a failed job, with a generic fallback.
    pub fn failure_reason(&self) -> String {
        self.error
            .clone()
            .unwrap_or_else(|| "Job processing failed".to_string())
    }

    /// Extract the result media URL from a terminal `completed` response.
    ///
    /// The `result` field may be a single object or a sequence; the first
    /// element of a sequence is used. The URL is read from `mediaUrl`,
    /// `video` or `image`, in that priority order.
    pub fn result_url(&self) -> Result<String> {
        let result = self
            .result
            .as_ref()
            .ok_or_else(|| PipelineError::MalformedResponse("missing result field".to_string()))?;

        let item = match result {
            serde_json::Value::Array(items) => items.first().ok_or_else(|| {
                PipelineError::MalformedResponse("empty result array".to_string())
            })?,
            other => other,
        };

        for key in ["mediaUrl", "video", "image"] {
            if let Some(url) = item.get(key).and_then(|v| v.as_str()) {
                return Ok(url.to_string());
            }
        }

        Err(PipelineError::MalformedResponse(
            "no media URL in result".to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn completed(result: serde_json::Value) -> JobStatusResponse {
        JobStatusResponse {
            status: "completed".to_string(),
            result: Some(result),
            error: None,
        }
    }

    #[test]
    fn test_classify() {
        assert_eq!(classify("completed"), StatusClass::Completed);
        assert_eq!(classify("failed"), StatusClass::Failed);
        assert_eq!(classify("error"), StatusClass::Failed);
        assert_eq!(classify("queued"), StatusClass::InProgress);
        assert_eq!(classify("processing"), StatusClass::InProgress);
        assert_eq!(classify("warming-up"), StatusClass::InProgress);
    }

    #[test]
    fn test_result_url_array_takes_first() {
        let response = completed(json!([{"mediaUrl": "a"}, {"mediaUrl": "b"}]));
        assert_eq!(response.result_url().unwrap(), "a");
    }

    #[test]
    fn test_result_url_field_priority() {
        let response = completed(json!({"image": "i", "video": "v", "mediaUrl": "m"}));
        assert_eq!(response.result_url().unwrap(), "m");

        let response = completed(json!({"image": "i", "video": "v"}));
        assert_eq!(response.result_url().unwrap(), "v");

        let response = completed(json!({"image": "c"}));
        assert_eq!(response.result_url().unwrap(), "c");
    }

    #[test]
    fn test_result_url_missing() {
        let response = completed(json!({}));
        assert!(matches!(
            response.result_url(),
            Err(PipelineError::MalformedResponse(_))
        ));

        let response = JobStatusResponse {
            status: "completed".to_string(),
            result: None,
            error: None,
        };
        assert!(matches!(
            response.result_url(),
            Err(PipelineError::MalformedResponse(_))
        ));
    }

    #[test]
    fn test_failure_reason() {
        let response = JobStatusResponse {
            status: "failed".to_string(),
            result: None,
            error: Some("X".to_string()),
        };
        assert_eq!(response.failure_reason(), "X");

        let response = JobStatusResponse {
            status: "error".to_string(),
            result: None,
            error: None,
        };
        assert_eq!(response.failure_reason(), "Job processing failed");
    }

    #[test]
    fn test_submitted_job_deserialize() {
        let job: SubmittedJob =
            serde_json::from_str(r#"{"jobId": "j-42", "status": "queued"}"#).unwrap();
        assert_eq!(job.job_id, JobId("j-42".to_string()));
        assert_eq!(job.status, "queued");
    }
}
