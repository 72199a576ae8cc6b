//! ProviderClient - low-level communication with the paid generation provider.
//!
//! One outbound call per method, no retries and no error interpretation;
//! failures surface as raw [`ProviderError`]s for the classifier.

use std::time::Duration;

use serde_json::Value;

use super::types::{JobHandle, PollOutcome};

/// The environment variable name for the provider API key.
pub const PROVIDER_API_KEY_ENV: &str = "SEGMIND_API_KEY";

/// Default base URL for the provider API.
pub const PROVIDER_API_BASE_URL: &str = "https://api.segmind.com/v1";

/// Default timeout for HTTP requests (30 seconds).
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default connection timeout (10 seconds).
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Raw, unclassified provider failure.
///
/// `status` is `None` when the failure happened before an HTTP response
/// arrived (connect error, timeout, malformed body). Interpretation is the
/// classifier's job, not this layer's.
#[derive(Debug, Clone, thiserror::Error)]
#[error("provider request failed (status {status:?}): {message}")]
pub struct ProviderError {
    pub status: Option<u16>,
    pub message: String,
}

impl ProviderError {
    pub(crate) fn transport(error: &reqwest::Error) -> Self {
        ProviderError {
            status: None,
            message: error.to_string(),
        }
    }
}

/// Client for submitting and polling jobs at the paid generation provider.
pub struct ProviderClient {
    api_key: String,
    base_url: String,
    http_client: reqwest::Client,
}

impl ProviderClient {
    /// Create a new ProviderClient with an explicit API key and the default
    /// base URL.
    pub fn new(api_key: String) -> Result<Self, ProviderError> {
        Self::with_base_url(api_key, PROVIDER_API_BASE_URL.to_string())
    }

    /// Create a new ProviderClient with a custom base URL.
    ///
    /// Useful for testing against a mock server.
    pub fn with_base_url(api_key: String, base_url: String) -> Result<Self, ProviderError> {
        let http_client = reqwest::Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .connect_timeout(DEFAULT_CONNECT_TIMEOUT)
            .build()
            .map_err(|e| ProviderError::transport(&e))?;

        Ok(Self {
            api_key,
            base_url,
            http_client,
        })
    }

    /// Get the base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Submit a generation job to a provider model endpoint.
    ///
    /// Sends `POST {base_url}/{model_slug}` with the given JSON payload.
    /// Providers answer either with a queued job id (`id`, `job_id` or
    /// `request_id`) or with a synchronous inline image; the two cases map
    /// to the [`JobHandle`] variants.
    ///
    /// # Errors
    ///
    /// Returns a raw [`ProviderError`] carrying the HTTP status and the
    /// response body (the `error`/`message` JSON field when present, raw
    /// text otherwise). No interpretation happens here.
    pub async fn submit(
        &self,
        model_slug: &str,
        payload: &Value,
    ) -> Result<JobHandle, ProviderError> {
        let url = format!("{}/{}", self.base_url, model_slug);
        log::info!("Submitting job to provider model: {}", model_slug);

        let response = self
            .http_client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("Content-Type", "application/json")
            .json(payload)
            .send()
            .await
            .map_err(|e| ProviderError::transport(&e))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let raw = response.text().await.unwrap_or_default();
            let message = extract_error_message(&raw);
            log::warn!("Provider error ({}) for {}: {}", status, model_slug, message);
            return Err(ProviderError {
                status: Some(status),
                message,
            });
        }

        let data: Value = response
            .json()
            .await
            .map_err(|e| ProviderError::transport(&e))?;

        if let Some(image) = data.get("image").and_then(Value::as_str) {
            return Ok(JobHandle::Immediate {
                asset_uri: format!("data:image/jpeg;base64,{}", image),
            });
        }

        let job_id = ["id", "job_id", "request_id"]
            .iter()
            .find_map(|field| data.get(field).and_then(Value::as_str));

        match job_id {
            Some(id) => Ok(JobHandle::Deferred { id: id.to_string() }),
            None => Err(ProviderError {
                status: None,
                message: "No job id returned from provider".to_string(),
            }),
        }
    }

    /// Query the status of a deferred job once.
    ///
    /// Sends `GET {base_url}/jobs/{job_id}`. Unknown status strings are
    /// treated as still pending; terminal states map to
    /// [`PollOutcome::Completed`] / [`PollOutcome::Failed`].
    pub async fn poll_once(&self, job_id: &str) -> Result<PollOutcome, ProviderError> {
        let url = format!("{}/jobs/{}", self.base_url, job_id);

        let response = self
            .http_client
            .get(&url)
            .header("x-api-key", &self.api_key)
            .send()
            .await
            .map_err(|e| ProviderError::transport(&e))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_default();
            return Err(ProviderError {
                status: Some(status),
                message,
            });
        }

        let data: Value = response
            .json()
            .await
            .map_err(|e| ProviderError::transport(&e))?;

        let status = data
            .get("status")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_uppercase();

        match status.as_str() {
            "COMPLETED" => Ok(PollOutcome::Completed {
                output: data.get("output").cloned().unwrap_or(Value::Null),
            }),
            "FAILED" | "ERROR" => Ok(PollOutcome::Failed {
                error: data
                    .get("error")
                    .and_then(Value::as_str)
                    .map(str::to_string),
            }),
            _ => Ok(PollOutcome::Pending),
        }
    }

    /// Download a generated asset.
    pub async fn fetch_asset(&self, url: &str) -> Result<Vec<u8>, ProviderError> {
        let response = self
            .http_client
            .get(url)
            .send()
            .await
            .map_err(|e| ProviderError::transport(&e))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_default();
            return Err(ProviderError {
                status: Some(status),
                message,
            });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| ProviderError::transport(&e))?;
        Ok(bytes.to_vec())
    }
}

/// Pull a human-readable message out of an error body.
///
/// Providers wrap messages in `{"error": ...}` or `{"message": ...}`; plain
/// text bodies pass through unchanged.
fn extract_error_message(raw: &str) -> String {
    if let Ok(json) = serde_json::from_str::<Value>(raw) {
        for field in ["error", "message"] {
            if let Some(text) = json.get(field).and_then(Value::as_str) {
                return text.to_string();
            }
        }
    }
    raw.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_error_message_prefers_error_field() {
        let raw = r#"{"error": "Model information not found", "message": "other"}"#;
        assert_eq!(extract_error_message(raw), "Model information not found");
    }

    #[test]
    fn test_extract_error_message_falls_back_to_message_field() {
        let raw = r#"{"message": "Insufficient credits"}"#;
        assert_eq!(extract_error_message(raw), "Insufficient credits");
    }

    #[test]
    fn test_extract_error_message_passes_plain_text_through() {
        assert_eq!(extract_error_message("502 Bad Gateway"), "502 Bad Gateway");
        assert_eq!(extract_error_message(""), "");
    }

    #[test]
    fn test_provider_error_display() {
        let error = ProviderError {
            status: Some(404),
            message: "Not Found".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "provider request failed (status Some(404)): Not Found"
        );
    }

    #[test]
    fn test_with_base_url_creates_client() {
        let client =
            ProviderClient::with_base_url("test-key".to_string(), "https://custom.api".to_string())
                .unwrap();
        assert_eq!(client.base_url(), "https://custom.api");
    }
}
