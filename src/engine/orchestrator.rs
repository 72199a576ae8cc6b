//! Generation orchestrator: the engine's top-level entry point.
//!
//! Routes a request to the standard or pro flow, applies duration-dependent
//! prompt augmentation, runs the synthesis and animation fallback chains,
//! and returns a single normalized result or a classified failure. Each
//! invocation is self-contained; nothing is shared across calls.

use serde_json::json;
use tokio_util::sync::CancellationToken;

use super::animation::{run_chain, ChainExhausted, ModelCandidate};
use super::classify::{classify, ClassifiedError};
use super::client::ProviderClient;
use super::managed::{
    ManagedClient, PRO_FAST_MODEL, PRO_HD_POLL_INTERVAL, PRO_POLL_INTERVAL, PRO_QUALITY_MODEL,
};
use super::poller::{poll, PollSettings};
use super::synthesis::ImageSynthesizer;
use super::types::{
    AssetKind, GenerationRequest, GenerationResult, JobHandle, Resolution, Tier,
};

/// Substitute prompt when only an image was supplied (standard flow).
const DEFAULT_STANDARD_PROMPT: &str = "Cinematic animation, slow motion, high quality, 4k detail";

/// Substitute prompt when only an image was supplied (pro flow).
const DEFAULT_PRO_PROMPT: &str = "Cinematic animation, high quality";

/// Motion hint appended to standard prompts for long durations.
const MOTION_HINT: &str = ", slow motion, long duration, seamless loop";

/// Narrative-extension hint for pro generations of 60 seconds or more.
const PRO_HINT_60: &str = ". (Create a seamless looping video sequence, extremely slow motion, extending the visual narrative to a full 60 seconds)";

/// Narrative-extension hint for pro generations of 30 seconds or more.
const PRO_HINT_30: &str = ". (Slow motion, extended take, seamless loop)";

/// Pro generations above this duration use the quality model.
const PRO_FAST_MODEL_MAX_SECS: u32 = 10;

/// Top-level generation pipeline.
pub struct Orchestrator {
    provider: ProviderClient,
    synthesizer: ImageSynthesizer,
    candidates: Vec<ModelCandidate>,
    managed: Option<ManagedClient>,
    poll_settings: PollSettings,
}

impl Orchestrator {
    /// Create an orchestrator with the default candidate list and standard
    /// poll settings. The managed client for the pro flow is optional and
    /// attached via [`Orchestrator::with_managed`].
    pub fn new(provider: ProviderClient, synthesizer: ImageSynthesizer) -> Self {
        Orchestrator {
            provider,
            synthesizer,
            candidates: super::animation::default_candidates(),
            managed: None,
            poll_settings: PollSettings::default(),
        }
    }

    /// Replace the animation candidate list.
    pub fn with_candidates(mut self, candidates: Vec<ModelCandidate>) -> Self {
        self.candidates = candidates;
        self
    }

    /// Attach an authenticated managed client, enabling the pro flow.
    pub fn with_managed(mut self, managed: ManagedClient) -> Self {
        self.managed = Some(managed);
        self
    }

    /// Override the job poller settings.
    pub fn with_poll_settings(mut self, settings: PollSettings) -> Self {
        self.poll_settings = settings;
        self
    }

    /// Access the underlying provider client, e.g. for asset downloads.
    pub fn provider(&self) -> &ProviderClient {
        &self.provider
    }

    /// Run one generation request to completion.
    ///
    /// Returns a normalized [`GenerationResult`] or a [`ClassifiedError`];
    /// no raw provider error ever crosses this boundary.
    pub async fn generate(
        &self,
        request: &GenerationRequest,
        cancel: &CancellationToken,
    ) -> Result<GenerationResult, ClassifiedError> {
        match request.tier {
            Tier::Standard => self.generate_standard(request, cancel).await,
            Tier::Pro => self.generate_pro(request, cancel).await,
        }
    }

    /// Standard (free) flow: ensure a base image exists, try the animation
    /// chain, degrade to the still image when animation is unobtainable.
    async fn generate_standard(
        &self,
        request: &GenerationRequest,
        cancel: &CancellationToken,
    ) -> Result<GenerationResult, ClassifiedError> {
        log::info!(
            "Starting standard generation (duration {}s)",
            request.duration_secs
        );

        let mut prompt = request.prompt.clone();
        if prompt.is_empty() && request.reference_image.is_some() {
            prompt = DEFAULT_STANDARD_PROMPT.to_string();
        }
        if request.duration_secs >= 30 {
            prompt.push_str(MOTION_HINT);
        }

        let base_image = match &request.reference_image {
            Some(image) => image.clone(),
            None => {
                log::info!("No base image; synthesizing one");
                let (width, height) = request.aspect_ratio.dimensions();
                self.synthesizer
                    .synthesize(&prompt, width, height)
                    .await
                    .ok_or_else(ClassifiedError::synthesis_unavailable)?
            }
        };

        match run_chain(
            &self.provider,
            &self.candidates,
            &prompt,
            &base_image,
            request.aspect_ratio,
        )
        .await
        {
            Ok(handle) => {
                let kind = match handle {
                    JobHandle::Immediate { .. } => AssetKind::Image,
                    JobHandle::Deferred { .. } => AssetKind::Video,
                };
                let asset_uri =
                    poll(&self.provider, &handle, self.poll_settings, cancel).await?;
                Ok(GenerationResult { asset_uri, kind })
            }
            Err(ChainExhausted { last_error }) => {
                // Graceful degradation: a still image is a success, not an
                // error. The retained chain error is logged for diagnosis.
                if let Some(error) = last_error {
                    log::warn!("Animation chain exhausted: {}", error.user_message);
                }
                log::info!("Animation unavailable; returning static image");
                Ok(GenerationResult {
                    asset_uri: format!("data:image/jpeg;base64,{}", base_image),
                    kind: AssetKind::Image,
                })
            }
        }
    }

    /// Pro (managed) flow: submit a long-running operation and poll it via
    /// the provider's native primitive, then download the asset.
    async fn generate_pro(
        &self,
        request: &GenerationRequest,
        cancel: &CancellationToken,
    ) -> Result<GenerationResult, ClassifiedError> {
        // Precondition: checked before any network activity.
        let managed = self
            .managed
            .as_ref()
            .ok_or_else(ClassifiedError::missing_client)?;

        log::info!(
            "Starting pro generation (duration {}s)",
            request.duration_secs
        );

        let mut prompt = request.prompt.clone();
        if prompt.is_empty() && request.reference_image.is_some() {
            prompt = DEFAULT_PRO_PROMPT.to_string();
        }
        if request.duration_secs >= 60 {
            prompt.push_str(PRO_HINT_60);
        } else if request.duration_secs >= 30 {
            prompt.push_str(PRO_HINT_30);
        }

        // 1080p HD export always runs on the quality model and polls at a
        // slower cadence; 720p picks the model by duration.
        let hd = request.resolution == Resolution::Hd1080;
        let model = if hd || request.duration_secs > PRO_FAST_MODEL_MAX_SECS {
            PRO_QUALITY_MODEL
        } else {
            PRO_FAST_MODEL
        };
        let poll_interval = if hd {
            PRO_HD_POLL_INTERVAL
        } else {
            PRO_POLL_INTERVAL
        };

        let mut payload = json!({
            "prompt": prompt,
            "config": {
                "numberOfVideos": 1,
                "resolution": request.resolution.as_str(),
                "aspectRatio": request.aspect_ratio.as_str(),
            }
        });
        if let Some(image) = &request.reference_image {
            payload["image"] = json!({
                "imageBytes": image,
                "mimeType": "image/png",
            });
        }

        let operation = managed
            .start_video_operation(model, &payload)
            .await
            .map_err(|e| classify(e.status, &e.message))?;

        let operation = managed
            .await_operation(operation, poll_interval, cancel)
            .await?;

        let video_uri = operation
            .video_uri()
            .ok_or_else(ClassifiedError::empty_completion)?
            .to_string();

        let dest = managed.video_output_path(&operation.name);
        log::info!("Downloading pro video to {:?}", dest);
        let path = managed
            .download_asset(&video_uri, &dest)
            .await
            .map_err(|e| classify(e.status, &e.message))?;

        Ok(GenerationResult {
            asset_uri: path.display().to_string(),
            kind: AssetKind::Video,
        })
    }
}
