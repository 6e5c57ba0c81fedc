//! Bounded status polling for generation jobs.
//!
//! One status request per attempt at a fixed interval, up to a maximum
//! attempt budget. The sleep is injectable so tests can run the loop
//! deterministically, and a cancellation token lets the caller abort a
//! poll that is still in flight.

use crate::config::ServiceConfig;
use crate::error::{PipelineError, Result};
use crate::job::{JobId, JobStatusResponse, StatusClass};
use crate::service::EffectsService;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Suspension point between poll attempts.
#[async_trait::async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, interval: Duration);
}

/// Default wall-clock sleeper.
pub struct TokioSleeper;

#[async_trait::async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, interval: Duration) {
        tokio::time::sleep(interval).await;
    }
}

/// Caller-signallable abort for a polling loop.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// Polling cadence and budget.
#[derive(Debug, Clone, Copy)]
pub struct PollOptions {
    pub interval: Duration,
    pub max_polls: u32,
}

impl From<&ServiceConfig> for PollOptions {
    fn from(config: &ServiceConfig) -> Self {
        Self {
            interval: config.poll_interval,
            max_polls: config.max_polls,
        }
    }
}

/// Poll a job until it reaches a terminal status.
///
/// `completed` returns the payload immediately; `failed`/`error` raises
/// [`PipelineError::JobFailed`] with the server reason. Any other status
/// counts as still in progress: `progress` is invoked with the attempt
/// number and the loop sleeps one interval before the next request.
/// Exhausting the budget raises [`PipelineError::Timeout`]. An HTTP failure
/// during polling is not retried; it propagates immediately.
pub async fn poll_until_terminal(
    service: &dyn EffectsService,
    job_id: &JobId,
    opts: PollOptions,
    sleeper: &dyn Sleeper,
    cancel: &CancelToken,
    mut progress: impl FnMut(u32) + Send,
) -> Result<JobStatusResponse> {
    for attempt in 1..=opts.max_polls {
        if cancel.is_cancelled() {
            return Err(PipelineError::Cancelled);
        }

        let response = service.job_status(job_id).await?;
        log::debug!("poll {attempt} for job {job_id}: {}", response.status);

        match response.class() {
            StatusClass::Completed => return Ok(response),
            StatusClass::Failed => {
                return Err(PipelineError::JobFailed(response.failure_reason()))
            }
            StatusClass::InProgress => {
                progress(attempt);
                sleeper.sleep(opts.interval).await;
            }
        }
    }

    Err(PipelineError::Timeout {
        attempts: opts.max_polls,
    })
}
