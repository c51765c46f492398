//! Live adapter for the Replicate predictions API.

use std::time::Duration;

use reqwest::{Client, RequestBuilder};
use serde_json::json;

use super::proxy::read_json;
use crate::category::{garment_class, garment_description};
use crate::model::{ModelVariant, IDM_VTON_VERSION, NANO_BANANA_PRO_MODEL};
use crate::ports::job_service::{JobFuture, JobService, SubmissionPayload};

/// Public Replicate API root.
pub const REPLICATE_API_BASE: &str = "https://api.replicate.com/v1";

/// Job service that calls Replicate directly with an API key.
pub struct ReplicateJobService {
    client: Client,
    base_url: String,
    api_key: String,
}

impl ReplicateJobService {
    /// Create a Replicate client rooted at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(
        base_url: &str,
        api_key: String,
        request_timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(request_timeout).build()?;
        Ok(Self { client, base_url: base_url.trim_end_matches('/').to_string(), api_key })
    }

    fn authorized(&self, builder: RequestBuilder) -> RequestBuilder {
        builder.header("Authorization", format!("Token {}", self.api_key))
    }
}

impl JobService for ReplicateJobService {
    fn create_job(&self, payload: &SubmissionPayload) -> JobFuture<'_> {
        let builder = match payload.variant {
            ModelVariant::IdmVton => {
                let garment = payload.clothing_images.first().map(|g| g.image.as_str());
                let body = json!({
                    "version": IDM_VTON_VERSION,
                    "input": {
                        "garm_img": garment.unwrap_or_default(),
                        "human_img": payload.person_image,
                        "garment_des": garment_description(&payload.category),
                        "category": garment_class(&payload.category).as_str(),
                        "is_checked": true,
                        "is_checked_crop": true,
                        "denoise_steps": 30,
                        "seed": 42,
                    }
                });
                self.client.post(format!("{}/predictions", self.base_url)).json(&body)
            }
            ModelVariant::NanoBananaPro => {
                let names: Vec<&str> =
                    payload.clothing_images.iter().map(|g| g.name.as_str()).collect();
                let mut images = vec![payload.person_image.clone()];
                images.extend(payload.clothing_images.iter().map(|g| g.image.clone()));
                let body = json!({
                    "input": {
                        "prompt": try_on_prompt(&names, &payload.category),
                        "image_input": images,
                        "output_format": "jpg",
                    }
                });
                self.client
                    .post(format!("{}/models/{NANO_BANANA_PRO_MODEL}/predictions", self.base_url))
                    .header("Prefer", "wait")
                    .json(&body)
            }
        };
        let builder = self.authorized(builder);

        Box::pin(async move {
            let response = builder.send().await?;
            read_json(response).await
        })
    }

    fn get_job(&self, id: &str) -> JobFuture<'_> {
        let builder = self.authorized(self.client.get(format!("{}/predictions/{id}", self.base_url)));
        Box::pin(async move {
            let response = builder.send().await?;
            read_json(response).await
        })
    }
}

/// Prompt for prompt-driven models: the first image is the person, the rest are garments.
#[must_use]
pub fn try_on_prompt(garment_names: &[&str], category: &str) -> String {
    let class = garment_class(category).as_str().replace('_', " ");
    format!(
        "Dress the person in the first image in the garments shown in the following {} \
         image(s): {}. Treat them as {class} clothing. Preserve each garment's exact colors, \
         patterns, logos and fit. Keep the person's face, body, pose and the background unchanged. \
         Photorealistic result.",
        garment_names.len(),
        garment_names.join(", ")
    )
}
