//! Image synthesis fallback chain.
//!
//! Produces a base still image from a text prompt using a free keyless
//! image provider. Three strategies are tried in strict order, each a full
//! prompt-to-image request that differs only in model quality and prompt
//! truncation length; long or complex prompts are the usual rejection
//! cause, so each fallback shortens the prompt further.

use std::time::Duration;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};
use rand::Rng;

/// Default base URL for the keyless image synthesis provider.
pub const SYNTHESIS_BASE_URL: &str = "https://image.pollinations.ai";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// One rung of the fallback ladder.
struct Strategy {
    /// Model name query parameter; `None` lets the provider pick its default.
    model: Option<&'static str>,
    /// Prompt truncation limit in characters; `None` keeps the full prompt.
    max_prompt_chars: Option<usize>,
}

/// Strategies in trial order: quality first, then fast with a shortened
/// prompt, then the provider default with a minimal prompt.
const STRATEGIES: [Strategy; 3] = [
    Strategy {
        model: Some("flux"),
        max_prompt_chars: None,
    },
    Strategy {
        model: Some("turbo"),
        max_prompt_chars: Some(200),
    },
    Strategy {
        model: None,
        max_prompt_chars: Some(50),
    },
];

/// Client for the keyless text-to-image provider.
pub struct ImageSynthesizer {
    base_url: String,
    http_client: reqwest::Client,
}

impl ImageSynthesizer {
    /// Create a synthesizer against the default provider.
    pub fn new() -> Result<Self, reqwest::Error> {
        Self::with_base_url(SYNTHESIS_BASE_URL.to_string())
    }

    /// Create a synthesizer with a custom base URL.
    ///
    /// Useful for testing against a mock server.
    pub fn with_base_url(base_url: String) -> Result<Self, reqwest::Error> {
        let http_client = reqwest::Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .connect_timeout(DEFAULT_CONNECT_TIMEOUT)
            .build()?;

        Ok(Self {
            base_url,
            http_client,
        })
    }

    /// Get the base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Produce a base image for `prompt`, returned as base64 without a
    /// data-URI prefix.
    ///
    /// Tries each strategy in order; any failure (network, non-2xx, wrong
    /// content type) advances to the next one and the first success wins.
    /// Returns `None` only when every strategy failed; the caller decides
    /// how to surface that.
    pub async fn synthesize(&self, prompt: &str, width: u32, height: u32) -> Option<String> {
        let seed: u32 = rand::thread_rng().gen_range(0..1_000_000);

        for (index, strategy) in STRATEGIES.iter().enumerate() {
            let effective_prompt = match strategy.max_prompt_chars {
                Some(limit) => truncate_prompt(prompt, limit),
                None => prompt,
            };
            let url = self.build_url(effective_prompt, width, height, seed, strategy.model);
            log::info!("Fetching base image (strategy {}): {}", index + 1, url);

            match self.fetch_image(&url).await {
                Ok(image) => return Some(image),
                Err(reason) => {
                    log::warn!("Synthesis strategy {} failed: {}", index + 1, reason);
                }
            }
        }

        log::warn!("All image synthesis strategies failed");
        None
    }

    fn build_url(
        &self,
        prompt: &str,
        width: u32,
        height: u32,
        seed: u32,
        model: Option<&str>,
    ) -> String {
        let encoded = utf8_percent_encode(prompt, NON_ALPHANUMERIC);
        let model_param = model
            .map(|m| format!("&model={}", m))
            .unwrap_or_default();
        format!(
            "{}/prompt/{}?width={}&height={}&seed={}{}&nologo=true",
            self.base_url, encoded, width, height, seed, model_param
        )
    }

    /// Fetch one image, validating that the response actually is an image.
    async fn fetch_image(&self, url: &str) -> Result<String, String> {
        let response = self
            .http_client
            .get(url)
            .send()
            .await
            .map_err(|e| e.to_string())?;

        if !response.status().is_success() {
            return Err(format!("status {}", response.status()));
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        if !content_type.starts_with("image/") {
            return Err(format!("invalid content type: {}", content_type));
        }

        let bytes = response.bytes().await.map_err(|e| e.to_string())?;
        if bytes.is_empty() {
            return Err("empty image body".to_string());
        }

        Ok(BASE64.encode(&bytes))
    }
}

/// Truncate a prompt to at most `max_chars` characters, respecting UTF-8
/// character boundaries.
fn truncate_prompt(prompt: &str, max_chars: usize) -> &str {
    match prompt.char_indices().nth(max_chars) {
        Some((index, _)) => &prompt[..index],
        None => prompt,
    }
}
