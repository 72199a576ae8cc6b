//! Animation fallback chain.
//!
//! Given a base image and prompt, attempts image-to-video submission across
//! an ordered list of candidate models. Provider model availability
//! fluctuates, so unavailability of one candidate must never block trying
//! the others; the chain succeeds as soon as any candidate accepts the job.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::classify::{classify, ClassifiedError, ErrorKind};
use super::client::{ProviderClient, ProviderError};
use super::types::{AspectRatio, JobHandle};

/// Known provider payload shapes for image-to-video models.
///
/// Each model family expects its own field names and tuning parameters;
/// the template picks the right shape for a candidate's slug.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PayloadTemplate {
    CogVideo,
    LtxVideo,
    Kling,
    LumaDream,
}

/// One entry of the animation fallback chain: a provider model endpoint and
/// the payload shape it expects. Static configuration, not runtime state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelCandidate {
    pub slug: String,
    pub payload: PayloadTemplate,
}

impl ModelCandidate {
    /// Build the provider-specific JSON payload for this candidate.
    ///
    /// `image_base64` is raw base64 without a data-URI prefix; the payload
    /// adds the prefix where the model expects one.
    pub fn build_payload(
        &self,
        prompt: &str,
        image_base64: &str,
        aspect_ratio: AspectRatio,
    ) -> Value {
        let image_uri = format!("data:image/png;base64,{}", image_base64);
        match self.payload {
            PayloadTemplate::CogVideo => json!({
                "prompt": prompt,
                "image_url": image_uri,
                "num_frames": 49,
                "guidance_scale": 6,
            }),
            PayloadTemplate::LtxVideo => json!({
                "prompt": prompt,
                "image_url": image_uri,
                "aspect_ratio": aspect_ratio.as_str(),
            }),
            PayloadTemplate::Kling => json!({
                "prompt": prompt,
                "image": image_uri,
                "duration": 5,
            }),
            PayloadTemplate::LumaDream => json!({
                "prompt": prompt,
                "image_url": image_uri,
            }),
        }
    }
}

/// Default candidate list in trial order. Overridable via configuration.
pub fn default_candidates() -> Vec<ModelCandidate> {
    vec![
        ModelCandidate {
            slug: "THUDM/CogVideoX-5b".to_string(),
            payload: PayloadTemplate::CogVideo,
        },
        ModelCandidate {
            slug: "lightricks/ltx-video".to_string(),
            payload: PayloadTemplate::LtxVideo,
        },
        ModelCandidate {
            slug: "kling-v1".to_string(),
            payload: PayloadTemplate::Kling,
        },
        ModelCandidate {
            slug: "luma-dream-machine".to_string(),
            payload: PayloadTemplate::LumaDream,
        },
    ]
}

/// Every candidate was tried (or the list was empty) without obtaining a
/// job handle. `last_error` holds the most recent failure that was not a
/// plain model-unavailable skip.
#[derive(Debug)]
pub struct ChainExhausted {
    pub last_error: Option<ClassifiedError>,
}

/// Run the animation fallback chain.
///
/// Candidates are tried strictly in order. A submission classified as
/// [`ErrorKind::ModelUnavailable`] is skipped without being recorded; any
/// other failure is retained as `last_error` but still advances to the next
/// candidate. The first [`JobHandle`] wins.
pub async fn run_chain(
    client: &ProviderClient,
    candidates: &[ModelCandidate],
    prompt: &str,
    image_base64: &str,
    aspect_ratio: AspectRatio,
) -> Result<JobHandle, ChainExhausted> {
    let mut last_error: Option<ClassifiedError> = None;

    for candidate in candidates {
        log::info!("Attempting animation with {}", candidate.slug);
        let payload = candidate.build_payload(prompt, image_base64, aspect_ratio);

        match client.submit(&candidate.slug, &payload).await {
            Ok(handle) => return Ok(handle),
            Err(ProviderError { status, message }) => {
                let classified = classify(status, &message);
                if classified.kind == ErrorKind::ModelUnavailable {
                    log::info!("{} unavailable, trying next candidate", candidate.slug);
                } else {
                    log::warn!("{} failed: {}", candidate.slug, classified.user_message);
                    last_error = Some(classified);
                }
            }
        }
    }

    Err(ChainExhausted { last_error })
}
