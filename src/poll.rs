//! Submit a try-on job and wait for it to settle.
//!
//! One call does validation, encoding, a single create-job request and then a
//! bounded, strictly sequential status poll. Network errors while polling are
//! swallowed and count as a used attempt; transport timeouts end the loop.

use std::time::Duration;

use crate::error::{JobError, ServiceError};
use crate::ports::{Artifact, JobService, JobSnapshot, JobStatus};
use crate::request::TryOnRequest;

/// Default delay before each status poll.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(2000);

/// Default number of status polls before giving up.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 60;

/// Polling policy for [`submit_and_await`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollOptions {
    /// Delay before each status poll.
    pub interval: Duration,
    /// Maximum number of status polls.
    pub max_attempts: u32,
}

impl Default for PollOptions {
    fn default() -> Self {
        Self { interval: DEFAULT_POLL_INTERVAL, max_attempts: DEFAULT_MAX_ATTEMPTS }
    }
}

impl PollOptions {
    /// Total time spent sleeping if every attempt is used.
    #[must_use]
    pub fn budget(&self) -> Duration {
        self.interval * self.max_attempts
    }
}

/// Submit `request` to `jobs` and wait until the job succeeds, fails or the
/// poll budget runs out.
///
/// # Errors
///
/// Returns exactly one [`JobError`] kind when no artifact is produced; see
/// the variant docs for when each applies.
pub async fn submit_and_await(
    jobs: &dyn JobService,
    request: &TryOnRequest,
    options: &PollOptions,
) -> Result<Artifact, JobError> {
    request.validate()?;
    let payload = request.encode()?;

    log::info!(
        "submitting {} garment(s) to {:?} (category: {})",
        payload.clothing_images.len(),
        payload.variant,
        payload.category
    );
    let created = jobs.create_job(&payload).await.map_err(JobError::Submission)?;

    if created.status == JobStatus::Succeeded {
        if let Some(artifact) = created.output.clone().and_then(|o| o.into_artifact()) {
            log::info!("job settled in the create response");
            return Ok(artifact);
        }
    }

    let Some(id) = created.id.clone().filter(|id| !id.is_empty()) else {
        if created.status.is_terminal() {
            return settle(created);
        }
        return Err(JobError::Submission(ServiceError::Decode(format!(
            "create response has status '{}' but no job id",
            created.status
        ))));
    };
    log::info!(
        "job {id} created ({}), polling every {:?} for up to {:?}",
        created.status,
        options.interval,
        options.budget()
    );

    await_job(jobs, &id, options).await
}

/// Poll an existing job until it settles or the budget runs out.
///
/// # Errors
///
/// [`JobError::JobFailed`] on a failed job,
/// [`JobError::Aborted`] when a poll times out at the transport, and
/// [`JobError::JobTimeout`] when all attempts are used.
pub async fn await_job(
    jobs: &dyn JobService,
    id: &str,
    options: &PollOptions,
) -> Result<Artifact, JobError> {
    let mut last_error = None;

    for attempt in 1..=options.max_attempts {
        tokio::time::sleep(options.interval).await;

        match jobs.get_job(id).await {
            Ok(snapshot) => {
                log::debug!(
                    "job {id}: poll {attempt}/{}: {}",
                    options.max_attempts,
                    snapshot.status
                );
                if snapshot.status.is_terminal() {
                    return settle(snapshot);
                }
            }
            Err(ServiceError::Timeout(msg)) => {
                log::warn!("job {id}: poll {attempt} timed out, giving up");
                return Err(JobError::Aborted(msg));
            }
            Err(e) => {
                log::warn!("job {id}: poll {attempt}/{} failed: {e}", options.max_attempts);
                last_error = Some(e.to_string());
            }
        }
    }

    log::info!("job {id}: no result after {} polls", options.max_attempts);
    Err(JobError::JobTimeout { attempts: options.max_attempts, last_error })
}

/// Turn a terminal snapshot into the call's outcome.
fn settle(snapshot: JobSnapshot) -> Result<Artifact, JobError> {
    match snapshot.status {
        JobStatus::Succeeded => snapshot.output.and_then(|o| o.into_artifact()).ok_or_else(|| {
            JobError::JobFailed("job succeeded but returned no output".into())
        }),
        _ => Err(JobError::JobFailed(snapshot.error.unwrap_or_else(|| "Unknown error".into()))),
    }
}
