//! Job poller: converts an asynchronous job handle into a completed asset
//! by repeated status queries with a fixed interval and bounded attempts.

use std::time::Duration;

use serde_json::Value;
use tokio_util::sync::CancellationToken;

use super::classify::ClassifiedError;
use super::client::ProviderClient;
use super::types::{JobHandle, PollOutcome};

/// Poll interval for standard-tier jobs (2.5 seconds).
pub const STANDARD_POLL_INTERVAL: Duration = Duration::from_millis(2500);

/// Maximum poll attempts for standard-tier jobs (~5 minutes total wait).
pub const STANDARD_MAX_ATTEMPTS: u32 = 120;

/// Interval and attempt bound for one polling run.
#[derive(Debug, Clone, Copy)]
pub struct PollSettings {
    pub interval: Duration,
    pub max_attempts: u32,
}

impl Default for PollSettings {
    fn default() -> Self {
        PollSettings {
            interval: STANDARD_POLL_INTERVAL,
            max_attempts: STANDARD_MAX_ATTEMPTS,
        }
    }
}

type ExtractionRule = fn(&Value) -> Option<String>;

/// Ordered extraction rules for the completed-job output payload.
///
/// Provider responses shape-shift; the asset reference may be a bare
/// string, the first element of an array, a nested well-known field, or the
/// first string value of an arbitrary object. First non-empty match wins.
const EXTRACTION_RULES: &[(&str, ExtractionRule)] = &[
    ("direct string", |output| {
        output.as_str().map(str::to_string)
    }),
    ("first array element", |output| {
        output
            .as_array()
            .and_then(|items| items.first())
            .and_then(Value::as_str)
            .map(str::to_string)
    }),
    ("video_url field", |output| {
        output
            .get("video_url")
            .and_then(Value::as_str)
            .map(str::to_string)
    }),
    ("image_url field", |output| {
        output
            .get("image_url")
            .and_then(Value::as_str)
            .map(str::to_string)
    }),
    ("video field", |output| {
        output
            .get("video")
            .and_then(Value::as_str)
            .map(str::to_string)
    }),
    ("first object value", |output| {
        output
            .as_object()
            .and_then(|map| map.values().find_map(Value::as_str))
            .map(str::to_string)
    }),
];

/// Extract the asset reference from a completed-job output payload.
pub fn extract_asset_uri(output: &Value) -> Option<String> {
    EXTRACTION_RULES.iter().find_map(|(name, rule)| {
        let found = rule(output).filter(|uri| !uri.is_empty());
        if found.is_some() {
            log::debug!("Asset reference matched rule: {}", name);
        }
        found
    })
}

/// Poll a job handle to completion.
///
/// An [`JobHandle::Immediate`] handle returns its payload without any
/// network call. A deferred handle is polled up to `settings.max_attempts`
/// times, sleeping `settings.interval` before each query. Transport and
/// HTTP failures during a poll are treated as transient blips: they are
/// logged, swallowed, and still count toward the attempt budget. A terminal
/// `FAILED` status aborts immediately.
///
/// # Errors
///
/// Returns `ProcessingFailed` when the provider reports terminal failure,
/// `TimedOut` when attempts are exhausted, and `Cancelled` when the
/// cancellation token fires during a wait.
pub async fn poll(
    client: &ProviderClient,
    handle: &JobHandle,
    settings: PollSettings,
    cancel: &CancellationToken,
) -> Result<String, ClassifiedError> {
    let job_id = match handle {
        JobHandle::Immediate { asset_uri } => return Ok(asset_uri.clone()),
        JobHandle::Deferred { id } => id,
    };

    for attempt in 1..=settings.max_attempts {
        tokio::select! {
            _ = cancel.cancelled() => {
                log::info!("Polling cancelled for job {}", job_id);
                return Err(ClassifiedError::cancelled());
            }
            _ = tokio::time::sleep(settings.interval) => {}
        }

        match client.poll_once(job_id).await {
            Ok(PollOutcome::Completed { output }) => {
                if let Some(asset_uri) = extract_asset_uri(&output) {
                    log::info!("Job {} completed after {} attempts", job_id, attempt);
                    return Ok(asset_uri);
                }
                // Completed without a usable reference; keep polling.
                log::debug!("Job {} completed without an asset reference yet", job_id);
            }
            Ok(PollOutcome::Failed { error }) => {
                log::error!(
                    "Job {} failed: {}",
                    job_id,
                    error.as_deref().unwrap_or("unknown error")
                );
                return Err(ClassifiedError::processing_failed());
            }
            Ok(PollOutcome::Pending) => {
                log::debug!("Job {} pending (attempt {})", job_id, attempt);
            }
            Err(error) => {
                // Transient blip; counts toward the attempt budget.
                log::warn!("Poll attempt {} for {} skipped: {}", attempt, job_id, error);
            }
        }
    }

    log::error!(
        "Job {} did not complete within {} attempts",
        job_id,
        settings.max_attempts
    );
    Err(ClassifiedError::timed_out())
}
