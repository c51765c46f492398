//! Job service port for asynchronous try-on jobs.

use std::fmt;
use std::future::Future;
use std::pin::Pin;

use serde::{Deserialize, Serialize};

use crate::error::ServiceError;
use crate::model::ModelVariant;

/// One encoded garment ready for transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncodedGarment {
    /// Display name of the garment.
    pub name: String,
    /// The garment image as a `data:` URI.
    pub image: String,
}

/// An encoded try-on submission.
#[derive(Debug, Clone)]
pub struct SubmissionPayload {
    /// Model the job is routed to.
    pub variant: ModelVariant,
    /// The subject photo as a `data:` URI.
    pub person_image: String,
    /// Garments to put on the subject, in order.
    pub clothing_images: Vec<EncodedGarment>,
    /// UI category, used for garment class and prompt selection.
    pub category: String,
}

/// Lifecycle status of a remote job.
///
/// Unrecognized statuses are kept verbatim and treated as non-terminal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum JobStatus {
    /// Queued, not yet running.
    Starting,
    /// Running.
    Processing,
    /// Finished with output.
    Succeeded,
    /// Finished with an error.
    Failed,
    /// Any status this client does not know about.
    Other(String),
}

impl JobStatus {
    /// Whether the job will not change any more.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed)
    }

    fn as_str(&self) -> &str {
        match self {
            Self::Starting => "starting",
            Self::Processing => "processing",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
            Self::Other(s) => s,
        }
    }
}

impl From<String> for JobStatus {
    fn from(s: String) -> Self {
        match s.as_str() {
            "starting" => Self::Starting,
            "processing" => Self::Processing,
            "succeeded" => Self::Succeeded,
            "failed" => Self::Failed,
            _ => Self::Other(s),
        }
    }
}

impl From<JobStatus> for String {
    fn from(status: JobStatus) -> Self {
        status.as_str().to_string()
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Output of a succeeded job: a single URL or a list of URLs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum JobOutput {
    /// A single artifact URL.
    One(String),
    /// Several artifact URLs.
    Many(Vec<String>),
}

/// The generated result of a succeeded job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifact {
    /// Artifact URLs (`http(s)` or `data:`), never empty.
    pub urls: Vec<String>,
}

impl Artifact {
    /// The first artifact URL.
    #[cfg(test)]
    #[must_use]
    pub fn primary(&self) -> &str {
        &self.urls[0]
    }
}

impl JobOutput {
    /// Convert into an [`Artifact`], or `None` if there are no URLs.
    #[must_use]
    pub fn into_artifact(self) -> Option<Artifact> {
        let urls: Vec<String> = match self {
            Self::One(url) => vec![url],
            Self::Many(urls) => urls,
        };
        let urls: Vec<String> = urls.into_iter().filter(|u| !u.trim().is_empty()).collect();
        (!urls.is_empty()).then_some(Artifact { urls })
    }
}

/// A point-in-time view of a remote job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobSnapshot {
    /// Remote job identifier. Absent on some synchronous responses.
    #[serde(default, alias = "predictionId", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Current status.
    pub status: JobStatus,
    /// Present once the job has succeeded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<JobOutput>,
    /// Present once the job has failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl JobSnapshot {
    /// A snapshot with only an id and a status.
    #[cfg(test)]
    #[must_use]
    pub fn pending(id: impl Into<String>, status: JobStatus) -> Self {
        Self { id: Some(id.into()), status, output: None, error: None }
    }
}

/// Boxed future type returned by [`JobService`] methods.
pub type JobFuture<'a> = Pin<Box<dyn Future<Output = Result<JobSnapshot, ServiceError>> + Send + 'a>>;

/// Creates and inspects remote try-on jobs.
pub trait JobService: Send + Sync {
    /// Create a job for the given payload.
    fn create_job(&self, payload: &SubmissionPayload) -> JobFuture<'_>;

    /// Fetch the current state of a job.
    fn get_job(&self, id: &str) -> JobFuture<'_>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_parsing_keeps_unknown_values() {
        assert_eq!(JobStatus::from("starting".to_string()), JobStatus::Starting);
        assert_eq!(JobStatus::from("canceled".to_string()), JobStatus::Other("canceled".into()));
        assert!(!JobStatus::from("canceled".to_string()).is_terminal());
        assert_eq!(JobStatus::from("queued".to_string()), JobStatus::Other("queued".into()));
        assert!(!JobStatus::Other("queued".into()).is_terminal());
        assert!(JobStatus::Failed.is_terminal());
        assert!(!JobStatus::Processing.is_terminal());
    }

    #[test]
    fn snapshot_accepts_replicate_prediction() {
        let json = r#"{
            "id": "ufawqhfynnddngldkgtslldrkq",
            "model": "cuuupid/idm-vton",
            "status": "succeeded",
            "output": "https://replicate.delivery/out.jpg",
            "error": null,
            "metrics": {"predict_time": 12.3}
        }"#;
        let snapshot: JobSnapshot = serde_json::from_str(json).unwrap();
        assert_eq!(snapshot.id.as_deref(), Some("ufawqhfynnddngldkgtslldrkq"));
        assert_eq!(snapshot.status, JobStatus::Succeeded);
        assert_eq!(snapshot.output, Some(JobOutput::One("https://replicate.delivery/out.jpg".into())));
        assert!(snapshot.error.is_none());
    }

    #[test]
    fn snapshot_accepts_prediction_id_alias() {
        let snapshot: JobSnapshot =
            serde_json::from_str(r#"{"predictionId": "abc", "status": "starting"}"#).unwrap();
        assert_eq!(snapshot.id.as_deref(), Some("abc"));
        assert_eq!(snapshot.status, JobStatus::Starting);
    }

    #[test]
    fn snapshot_serializes_status_as_plain_string() {
        let json = serde_json::to_value(JobSnapshot::pending("x", JobStatus::Processing)).unwrap();
        assert_eq!(json, serde_json::json!({"id": "x", "status": "processing"}));
    }

    #[test]
    fn output_list_becomes_artifact() {
        let output: JobOutput = serde_json::from_str(r#"["a.png", "", "b.png"]"#).unwrap();
        let artifact = output.into_artifact().unwrap();
        assert_eq!(artifact.urls, vec!["a.png", "b.png"]);
        assert_eq!(artifact.primary(), "a.png");
    }

    #[test]
    fn empty_output_has_no_artifact() {
        assert!(JobOutput::Many(Vec::new()).into_artifact().is_none());
        assert!(JobOutput::One(String::new()).into_artifact().is_none());
    }
}
