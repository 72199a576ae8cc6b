//! ManagedClient - authenticated client for the pro generation provider.
//!
//! The pro tier uses the provider's own long-running-operation primitive
//! instead of the generic job poller: submit an operation, re-fetch it until
//! `done`, then download the produced asset.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use serde_json::{json, Value};
use tokio::io::AsyncWriteExt;
use tokio_util::sync::CancellationToken;

use super::classify::{classify, ClassifiedError};
use super::client::ProviderError;

/// The environment variable name for the managed provider API key.
pub const MANAGED_API_KEY_ENV: &str = "GEMINI_API_KEY";

/// Default base URL for the managed provider API.
pub const MANAGED_API_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Quality model used for longer pro generations.
pub const PRO_QUALITY_MODEL: &str = "veo-3.1-generate-preview";

/// Fast model used for short pro generations.
pub const PRO_FAST_MODEL: &str = "veo-3.1-fast-generate-preview";

/// Polling interval for managed operations (5 seconds).
pub const PRO_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Polling interval for 1080p HD export operations (10 seconds).
pub const PRO_HD_POLL_INTERVAL: Duration = Duration::from_secs(10);

/// Maximum operation polls before giving up (~5 minutes total wait).
pub const PRO_MAX_POLLS: u32 = 60;

/// Cheap text model used for the connection validation probe.
const VALIDATION_MODEL: &str = "gemini-2.5-flash";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// A long-running operation at the managed provider.
#[derive(Debug, Clone, Deserialize)]
pub struct Operation {
    /// Operation resource name, used to re-fetch status.
    pub name: String,
    #[serde(default)]
    pub done: bool,
    #[serde(default)]
    pub error: Option<OperationError>,
    /// Result payload once the operation completed.
    #[serde(default)]
    pub response: Option<Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OperationError {
    #[serde(default)]
    pub code: Option<i64>,
    #[serde(default)]
    pub message: String,
}

impl Operation {
    /// Extract the generated video URI from a completed operation.
    pub fn video_uri(&self) -> Option<&str> {
        self.response
            .as_ref()?
            .get("generatedVideos")?
            .get(0)?
            .get("video")?
            .get("uri")?
            .as_str()
    }
}

/// Health of the managed provider connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    Active,
    Issue,
    Offline,
}

/// Result of a connection validation probe, suitable for direct display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionDiagnostics {
    pub status: ConnectionStatus,
    pub label: String,
    pub details: String,
    pub action: Option<String>,
}

impl ConnectionDiagnostics {
    fn issue(label: &str, details: &str, action: &str) -> Self {
        ConnectionDiagnostics {
            status: ConnectionStatus::Issue,
            label: label.to_string(),
            details: details.to_string(),
            action: Some(action.to_string()),
        }
    }

    /// Diagnostics for the no-key-configured case; no probe is possible.
    pub fn offline() -> Self {
        ConnectionDiagnostics {
            status: ConnectionStatus::Offline,
            label: "No API key".to_string(),
            details: "No managed provider API key is configured.".to_string(),
            action: Some(format!(
                "Set {} or [managed].api_key to begin.",
                MANAGED_API_KEY_ENV
            )),
        }
    }
}

/// Authenticated client for the managed (pro) video provider.
pub struct ManagedClient {
    api_key: String,
    base_url: String,
    http_client: reqwest::Client,
}

impl ManagedClient {
    /// Create a new ManagedClient with an explicit API key.
    pub fn new(api_key: String) -> Result<Self, ProviderError> {
        Self::with_base_url(api_key, MANAGED_API_BASE_URL.to_string())
    }

    /// Create a new ManagedClient with a custom base URL.
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

    /// Start a long-running video generation operation.
    pub async fn start_video_operation(
        &self,
        model: &str,
        payload: &Value,
    ) -> Result<Operation, ProviderError> {
        let url = format!("{}/models/{}:predictLongRunning", self.base_url, model);
        log::info!("Starting managed operation on model {}", model);

        let response = self
            .http_client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .header("Content-Type", "application/json")
            .json(payload)
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

        response
            .json()
            .await
            .map_err(|e| ProviderError::transport(&e))
    }

    /// Re-fetch a long-running operation by resource name.
    pub async fn get_operation(&self, name: &str) -> Result<Operation, ProviderError> {
        let url = format!("{}/{}", self.base_url, name);

        let response = self
            .http_client
            .get(&url)
            .header("x-goog-api-key", &self.api_key)
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

        response
            .json()
            .await
            .map_err(|e| ProviderError::transport(&e))
    }

    /// Poll an operation until it reports `done`, with a bounded wait.
    ///
    /// `interval` is [`PRO_POLL_INTERVAL`] for 720p generations and
    /// [`PRO_HD_POLL_INTERVAL`] for 1080p HD exports.
    ///
    /// # Errors
    ///
    /// Provider failures are classified; operation-level errors map through
    /// the classifier as well. Exhausting the bound yields `TimedOut`,
    /// cancellation yields `Cancelled`.
    pub async fn await_operation(
        &self,
        mut operation: Operation,
        interval: Duration,
        cancel: &CancellationToken,
    ) -> Result<Operation, ClassifiedError> {
        let mut polls = 0u32;

        while !operation.done {
            if polls >= PRO_MAX_POLLS {
                log::error!(
                    "Managed operation {} did not finish within {} polls",
                    operation.name,
                    PRO_MAX_POLLS
                );
                return Err(ClassifiedError::timed_out());
            }
            polls += 1;

            tokio::select! {
                _ = cancel.cancelled() => {
                    log::info!("Managed operation {} cancelled", operation.name);
                    return Err(ClassifiedError::cancelled());
                }
                _ = tokio::time::sleep(interval) => {}
            }

            operation = self
                .get_operation(&operation.name)
                .await
                .map_err(|e| classify(e.status, &e.message))?;
        }

        if let Some(error) = &operation.error {
            log::error!(
                "Managed operation {} failed: {} (code {:?})",
                operation.name,
                error.message,
                error.code
            );
            return Err(classify(None, &error.message));
        }

        Ok(operation)
    }

    /// Probe the provider with a minimal text generation to verify that the
    /// key has billing and API access before an expensive video run.
    ///
    /// Never fails: every outcome maps to a [`ConnectionDiagnostics`] with a
    /// displayable label, details, and suggested action.
    pub async fn validate_connection(&self) -> ConnectionDiagnostics {
        let url = format!(
            "{}/models/{}:generateContent",
            self.base_url, VALIDATION_MODEL
        );
        let payload = json!({"contents": [{"parts": [{"text": "ping"}]}]});

        let response = match self
            .http_client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .header("Content-Type", "application/json")
            .json(&payload)
            .send()
            .await
        {
            Ok(response) => response,
            Err(error) => {
                log::warn!("Connection probe failed before a response: {}", error);
                return ConnectionDiagnostics::issue(
                    "Network error",
                    "Cannot reach the provider.",
                    "Check your internet connection.",
                );
            }
        };

        if response.status().is_success() {
            return ConnectionDiagnostics {
                status: ConnectionStatus::Active,
                label: "Systems operational".to_string(),
                details: "Billing enabled and video access confirmed.".to_string(),
                action: Some("Ready to generate.".to_string()),
            };
        }

        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default().to_lowercase();
        log::warn!("Connection probe rejected ({}): {}", status, body);

        if body.contains("billing") {
            return ConnectionDiagnostics::issue(
                "Billing disabled",
                "The configured project has no billing account.",
                "Enable billing in the provider console.",
            );
        }
        if status == 403 || body.contains("permission") {
            return ConnectionDiagnostics::issue(
                "Permission denied",
                "The key lacks generative API access.",
                "Use a different key or enable the API.",
            );
        }
        if status == 429 || body.contains("quota") {
            return ConnectionDiagnostics::issue(
                "Quota exceeded",
                "Rate limit reached for this key.",
                "Wait a moment or increase quotas.",
            );
        }

        ConnectionDiagnostics::issue(
            "Connection failed",
            "Unknown error during validation.",
            "Try again.",
        )
    }

    /// Download a generated asset to disk, streaming the body.
    ///
    /// The provider's asset URIs require the API key as a query parameter.
    ///
    /// # Errors
    ///
    /// Returns a raw [`ProviderError`] on request or IO failure.
    pub async fn download_asset(&self, uri: &str, dest: &Path) -> Result<PathBuf, ProviderError> {
        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| ProviderError {
                    status: None,
                    message: format!("failed to create {}: {}", parent.display(), e),
                })?;
        }

        let separator = if uri.contains('?') { '&' } else { '?' };
        let keyed_uri = format!("{}{}key={}", uri, separator, self.api_key);

        let response = self
            .http_client
            .get(&keyed_uri)
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

        let mut file = tokio::fs::File::create(dest)
            .await
            .map_err(|e| ProviderError {
                status: None,
                message: format!("failed to create {}: {}", dest.display(), e),
            })?;
        let mut stream = response.bytes_stream();

        use futures_util::StreamExt;
        while let Some(chunk_result) = stream.next().await {
            let chunk = chunk_result.map_err(|e| ProviderError::transport(&e))?;
            file.write_all(&chunk).await.map_err(|e| ProviderError {
                status: None,
                message: format!("failed to write {}: {}", dest.display(), e),
            })?;
        }

        file.flush().await.map_err(|e| ProviderError {
            status: None,
            message: format!("failed to flush {}: {}", dest.display(), e),
        })?;

        Ok(dest.to_path_buf())
    }

    /// Unique download path for an operation's video.
    pub fn video_output_path(&self, operation_name: &str) -> PathBuf {
        let file_stem = operation_name
            .rsplit('/')
            .next()
            .unwrap_or(operation_name);
        std::env::temp_dir()
            .join("clipgen")
            .join("videos")
            .join(format!("{}.mp4", file_stem))
    }
}
