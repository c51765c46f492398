//! Replaying adapter for the `JobService` port.

use std::sync::{Arc, Mutex};

use super::{next_output, replay_result};
use crate::cassette::replayer::CassetteReplayer;
use crate::ports::job_service::{JobFuture, JobService, SubmissionPayload};

/// Serves recorded job service results from a cassette.
pub struct ReplayingJobService {
    replayer: Arc<Mutex<CassetteReplayer>>,
}

impl ReplayingJobService {
    /// Create a replaying service backed by the given replayer.
    #[must_use]
    pub fn new(replayer: Arc<Mutex<CassetteReplayer>>) -> Self {
        Self { replayer }
    }
}

impl JobService for ReplayingJobService {
    fn create_job(&self, _payload: &SubmissionPayload) -> JobFuture<'_> {
        let output = next_output(&self.replayer, "job_service", "create_job");
        Box::pin(async move { replay_result(output) })
    }

    fn get_job(&self, _id: &str) -> JobFuture<'_> {
        let output = next_output(&self.replayer, "job_service", "get_job");
        Box::pin(async move { replay_result(output) })
    }
}
