//! Try-on requests and their validation.

use crate::encode::{to_data_uri, ImageSource};
use crate::error::JobError;
use crate::model::ModelVariant;
use crate::ports::{EncodedGarment, SubmissionPayload};

/// A garment image with its display name.
#[derive(Debug, Clone)]
pub struct Garment {
    /// Display name; falls back to the category when blank.
    pub name: String,
    /// The garment image.
    pub image: ImageSource,
}

/// Everything needed to submit one try-on job.
#[derive(Debug, Clone)]
pub struct TryOnRequest {
    /// The photo of the person.
    pub subject: ImageSource,
    /// Garments to try on, at least one.
    pub garments: Vec<Garment>,
    /// UI category (e.g. `shirts`).
    pub category: String,
    /// Model the job is routed to.
    pub variant: ModelVariant,
    /// Downscale images whose longer side exceeds this before sending.
    pub max_dimension: Option<u32>,
}

impl TryOnRequest {
    /// Check the request before anything is encoded or sent.
    ///
    /// # Errors
    ///
    /// Returns [`JobError::InvalidRequest`] for an empty subject image, an
    /// empty garment list, an empty garment image, or more garments than the
    /// model accepts.
    pub fn validate(&self) -> Result<(), JobError> {
        if self.subject.is_empty() {
            return Err(JobError::InvalidRequest("subject image is empty".into()));
        }
        if self.garments.is_empty() {
            return Err(JobError::InvalidRequest("at least one garment image is required".into()));
        }
        if let Some(pos) = self.garments.iter().position(|g| g.image.is_empty()) {
            return Err(JobError::InvalidRequest(format!("garment #{} image is empty", pos + 1)));
        }
        if let Some(max) = self.variant.max_garments() {
            if self.garments.len() > max {
                return Err(JobError::InvalidRequest(format!(
                    "{:?} accepts at most {max} garment(s), got {}",
                    self.variant,
                    self.garments.len()
                )));
            }
        }
        Ok(())
    }

    /// Encode all images into a transport payload.
    ///
    /// # Errors
    ///
    /// Returns [`JobError::Encoding`] naming the first image that could not
    /// be encoded.
    pub fn encode(&self) -> Result<SubmissionPayload, JobError> {
        log::debug!(
            "encoding subject ({} bytes) and {} garment(s) ({} bytes)",
            self.subject.len(),
            self.garments.len(),
            self.garments.iter().map(|g| g.image.len()).sum::<usize>()
        );
        let person_image = to_data_uri(&self.subject, self.max_dimension)
            .map_err(|e| JobError::Encoding(format!("subject image: {e}")))?;

        let clothing_images = self
            .garments
            .iter()
            .map(|garment| {
                let name = if garment.name.trim().is_empty() {
                    self.category.clone()
                } else {
                    garment.name.clone()
                };
                to_data_uri(&garment.image, self.max_dimension)
                    .map(|image| EncodedGarment { name: name.clone(), image })
                    .map_err(|e| JobError::Encoding(format!("garment '{name}': {e}")))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(SubmissionPayload {
            variant: self.variant,
            person_image,
            clothing_images,
            category: self.category.clone(),
        })
    }
}
