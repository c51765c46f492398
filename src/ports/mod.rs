//! Port traits defining external boundaries.
//!
//! Each trait represents a boundary between the application core and an
//! external system. Implementations live in `src/adapters/`.

pub mod job_service;

pub use job_service::{
    Artifact, EncodedGarment, JobService, JobSnapshot, JobStatus, SubmissionPayload,
};
