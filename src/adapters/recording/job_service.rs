//! Recording adapter for the `JobService` port.

use std::sync::{Arc, Mutex};

use serde::Serialize;

use super::record_result;
use crate::cassette::recorder::CassetteRecorder;
use crate::model::ModelVariant;
use crate::ports::job_service::{JobFuture, JobService, SubmissionPayload};

/// What a cassette keeps of a submission. Images are reduced to their sizes.
#[derive(Debug, Serialize)]
pub struct SubmissionSummary {
    /// Model the job was routed to.
    pub variant: ModelVariant,
    /// UI category.
    pub category: String,
    /// Garment display names, in order.
    pub garments: Vec<String>,
    /// Length of the encoded subject image.
    pub person_image_len: usize,
    /// Lengths of the encoded garment images.
    pub garment_image_lens: Vec<usize>,
}

impl From<&SubmissionPayload> for SubmissionSummary {
    fn from(payload: &SubmissionPayload) -> Self {
        Self {
            variant: payload.variant,
            category: payload.category.clone(),
            garments: payload.clothing_images.iter().map(|g| g.name.clone()).collect(),
            person_image_len: payload.person_image.len(),
            garment_image_lens: payload.clothing_images.iter().map(|g| g.image.len()).collect(),
        }
    }
}

/// Records job service interactions while delegating to an inner implementation.
pub struct RecordingJobService {
    inner: Box<dyn JobService>,
    recorder: Arc<Mutex<CassetteRecorder>>,
}

impl RecordingJobService {
    /// Creates a new recording service wrapping the given implementation.
    #[must_use]
    pub fn new(inner: Box<dyn JobService>, recorder: Arc<Mutex<CassetteRecorder>>) -> Self {
        Self { inner, recorder }
    }
}

impl JobService for RecordingJobService {
    fn create_job(&self, payload: &SubmissionPayload) -> JobFuture<'_> {
        let summary = SubmissionSummary::from(payload);
        let call = self.inner.create_job(payload);
        Box::pin(async move {
            let result = call.await;
            record_result(&self.recorder, "job_service", "create_job", &summary, &result);
            result
        })
    }

    fn get_job(&self, id: &str) -> JobFuture<'_> {
        let input = serde_json::json!({ "id": id });
        let call = self.inner.get_job(id);
        Box::pin(async move {
            let result = call.await;
            record_result(&self.recorder, "job_service", "get_job", &input, &result);
            result
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ServiceError;
    use crate::ports::{EncodedGarment, JobSnapshot, JobStatus};

    struct FixedJobs;

    impl JobService for FixedJobs {
        fn create_job(&self, _payload: &SubmissionPayload) -> JobFuture<'_> {
            Box::pin(async { Ok(JobSnapshot::pending("p-1", JobStatus::Starting)) })
        }

        fn get_job(&self, _id: &str) -> JobFuture<'_> {
            Box::pin(async { Err(ServiceError::Transport("connection reset".into())) })
        }
    }

    #[tokio::test]
    async fn records_summary_and_typed_errors() {
        let path = std::env::temp_dir().join("fitloop_recording_adapter.cassette.yaml");
        let recorder = Arc::new(Mutex::new(CassetteRecorder::new(&path, "rec", "abc")));
        let jobs = RecordingJobService::new(Box::new(FixedJobs), Arc::clone(&recorder));

        let payload = SubmissionPayload {
            variant: ModelVariant::NanoBananaPro,
            person_image: "data:image/png;base64,AAAA".into(),
            clothing_images: vec![EncodedGarment {
                name: "Tee".into(),
                image: "data:image/png;base64,BB".into(),
            }],
            category: "shirts".into(),
        };
        jobs.create_job(&payload).await.unwrap();
        assert!(jobs.get_job("p-1").await.is_err());
        drop(jobs);

        let recorder = Arc::try_unwrap(recorder).unwrap().into_inner().unwrap();
        assert_eq!(recorder.len(), 2);
        recorder.finish().unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("nano-banana-pro"));
        assert!(content.contains("person_image_len: 26"));
        assert!(!content.contains("base64,AAAA"));
        assert!(content.contains("Transport: connection reset"));

        let _ = std::fs::remove_file(&path);
    }
}
