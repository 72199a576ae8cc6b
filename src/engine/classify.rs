//! Error classification for raw provider failures.
//!
//! Providers report errors as an HTTP status plus free-text message. This
//! module maps every such pair into a closed set of actionable error kinds
//! with fixed user-facing messages. The mapping is total: any input yields
//! exactly one kind, and classification never fails.

/// Closed set of actionable failure kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Prompt rejected by content/safety filters.
    SafetyBlocked,
    /// Provider rejected the generation settings (resolution, dimensions, ...).
    InvalidConfiguration,
    /// Credits or quota exhausted.
    QuotaExhausted,
    /// Requested model does not exist or is currently unavailable.
    ModelUnavailable,
    /// Too many requests.
    RateLimited,
    /// Provider-side overload (5xx).
    ServiceOverloaded,
    /// Transport-level failure before any HTTP response.
    NetworkFailure,
    /// Job reached a terminal failed status.
    ProcessingFailed,
    /// Polling attempts exhausted without completion.
    TimedOut,
    /// Required client configuration is absent; nothing was attempted.
    ConfigurationMissing,
    /// Caller cancelled the generation.
    Cancelled,
    /// None of the above matched.
    Unclassified,
}

/// A provider failure translated into a user-actionable error.
///
/// This is the only error shape that leaves the engine.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{user_message}")]
pub struct ClassifiedError {
    pub kind: ErrorKind,
    pub user_message: String,
    pub suggested_action: Option<String>,
}

impl ClassifiedError {
    fn new(kind: ErrorKind, user_message: impl Into<String>, action: Option<&str>) -> Self {
        ClassifiedError {
            kind,
            user_message: user_message.into(),
            suggested_action: action.map(str::to_string),
        }
    }

    /// Poll reported a terminal failed status.
    pub fn processing_failed() -> Self {
        ClassifiedError::new(
            ErrorKind::ProcessingFailed,
            "AI processing failed.",
            Some("Try simplifying your description."),
        )
    }

    /// Poll attempts exhausted without completion.
    pub fn timed_out() -> Self {
        ClassifiedError::new(
            ErrorKind::TimedOut,
            "Generation timed out. The server is busy.",
            Some("Try again later."),
        )
    }

    /// Caller cancelled the request.
    pub fn cancelled() -> Self {
        ClassifiedError::new(ErrorKind::Cancelled, "Generation was cancelled.", None)
    }

    /// Pro flow invoked without an authenticated managed client.
    pub fn missing_client() -> Self {
        ClassifiedError::new(
            ErrorKind::ConfigurationMissing,
            "Pro generation requires a connected account with billing enabled.",
            Some("Connect an API key or switch to the standard tier."),
        )
    }

    /// Every image synthesis strategy failed; no base image available.
    pub fn synthesis_unavailable() -> Self {
        ClassifiedError::new(
            ErrorKind::ServiceOverloaded,
            "Visual generation service is busy.",
            Some("Please try again in a moment."),
        )
    }

    /// Generation completed but the provider returned no usable asset.
    pub fn empty_completion() -> Self {
        ClassifiedError::new(
            ErrorKind::ProcessingFailed,
            "Generation completed but no video was returned.",
            Some("Try a different prompt."),
        )
    }
}

/// Keywords indicating a content/safety rejection.
const SAFETY_KEYWORDS: &[&str] = &["nsfw", "content", "safety", "banned"];

/// Keywords indicating rejected generation settings.
const CONFIG_KEYWORDS: &[&str] = &["dimension", "resolution", "invalid_argument"];

/// Keywords indicating exhausted credits or quota.
const QUOTA_KEYWORDS: &[&str] = &[
    "insufficient credits",
    "credit",
    "quota",
    "resource_exhausted",
    "billing",
];

/// Keywords indicating a missing or retired model.
const NOT_FOUND_KEYWORDS: &[&str] = &["not found", "no such model"];

/// Keywords indicating a transport-level failure.
const NETWORK_KEYWORDS: &[&str] = &[
    "connection",
    "network",
    "dns",
    "error sending request",
    "fetch",
];

fn contains_any(haystack: &str, keywords: &[&str]) -> bool {
    keywords.iter().any(|keyword| haystack.contains(keyword))
}

/// Classify a raw provider failure into a [`ClassifiedError`].
///
/// `status` is the HTTP status of the response, or `None` for failures that
/// happened before a response arrived (connect errors, timeouts). Matching
/// is case-insensitive substring matching with the HTTP status as primary
/// discriminant and message text as refinement; safety violations take
/// precedence over everything else.
pub fn classify(status: Option<u16>, raw_message: &str) -> ClassifiedError {
    let lower = raw_message.to_lowercase();

    if contains_any(&lower, SAFETY_KEYWORDS) {
        return ClassifiedError::new(
            ErrorKind::SafetyBlocked,
            "Your prompt contains restricted content.",
            Some("Please modify the prompt and try again."),
        );
    }

    if contains_any(&lower, CONFIG_KEYWORDS) {
        return ClassifiedError::new(
            ErrorKind::InvalidConfiguration,
            "The model rejected these generation settings.",
            Some("Check the resolution and duration settings."),
        );
    }

    if status == Some(402) || contains_any(&lower, QUOTA_KEYWORDS) {
        return ClassifiedError::new(
            ErrorKind::QuotaExhausted,
            "Daily limit reached: free credits exhausted.",
            Some("Wait 24 hours or upgrade."),
        );
    }

    if status == Some(404) || contains_any(&lower, NOT_FOUND_KEYWORDS) {
        return ClassifiedError::new(
            ErrorKind::ModelUnavailable,
            "The selected model is currently unavailable.",
            Some("Try again later."),
        );
    }

    if status == Some(429) {
        return ClassifiedError::new(
            ErrorKind::RateLimited,
            "System busy: too many requests.",
            Some("Please wait a minute before retrying."),
        );
    }

    if status.is_some_and(|code| code >= 500) {
        return ClassifiedError::new(
            ErrorKind::ServiceOverloaded,
            "The AI service is experiencing high traffic.",
            Some("Please try again in 30 seconds."),
        );
    }

    if status.is_none() && contains_any(&lower, NETWORK_KEYWORDS) {
        return ClassifiedError::new(
            ErrorKind::NetworkFailure,
            "Network connection lost.",
            Some("Please check your internet connection."),
        );
    }

    // 400 with no recognizable refinement: some malformed request input.
    if status == Some(400) {
        return ClassifiedError::new(
            ErrorKind::InvalidConfiguration,
            "The provider rejected the request configuration.",
            Some("Check your prompt and settings."),
        );
    }

    let mut message = String::from("Generation failed");
    if !raw_message.is_empty() {
        let snippet: String = raw_message.chars().take(100).collect();
        message.push_str(": ");
        message.push_str(&snippet);
    } else {
        message.push('.');
    }
    ClassifiedError::new(ErrorKind::Unclassified, message, Some("Please try again."))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_safety_keywords_classify_as_safety_blocked() {
        for message in ["NSFW detected", "restricted CONTENT", "safety filter", "banned prompt"] {
            assert_eq!(classify(Some(400), message).kind, ErrorKind::SafetyBlocked);
        }
    }

    #[test]
    fn test_safety_takes_precedence_over_quota() {
        let error = classify(None, "nsfw prompt also exceeded quota");
        assert_eq!(error.kind, ErrorKind::SafetyBlocked);
    }

    #[test]
    fn test_safety_takes_precedence_over_status() {
        // A 402 with safety text is still a safety block.
        let error = classify(Some(402), "blocked for nsfw content");
        assert_eq!(error.kind, ErrorKind::SafetyBlocked);
    }

    #[test]
    fn test_invalid_configuration_from_dimension_text() {
        assert_eq!(
            classify(Some(400), "invalid dimension for this model").kind,
            ErrorKind::InvalidConfiguration
        );
        assert_eq!(
            classify(Some(400), "unsupported resolution").kind,
            ErrorKind::InvalidConfiguration
        );
        assert_eq!(
            classify(None, "invalid_argument: bad config").kind,
            ErrorKind::InvalidConfiguration
        );
    }

    #[test]
    fn test_bare_400_is_invalid_configuration() {
        assert_eq!(
            classify(Some(400), "some opaque validation text").kind,
            ErrorKind::InvalidConfiguration
        );
    }

    #[test]
    fn test_quota_from_status_and_text() {
        assert_eq!(classify(Some(402), "").kind, ErrorKind::QuotaExhausted);
        assert_eq!(
            classify(Some(200), "Insufficient credits").kind,
            ErrorKind::QuotaExhausted
        );
        assert_eq!(
            classify(None, "RESOURCE_EXHAUSTED: rate quota").kind,
            ErrorKind::QuotaExhausted
        );
    }

    #[test]
    fn test_model_unavailable_from_status_and_text() {
        assert_eq!(classify(Some(404), "").kind, ErrorKind::ModelUnavailable);
        assert_eq!(
            classify(None, "Model information not found").kind,
            ErrorKind::ModelUnavailable
        );
    }

    #[test]
    fn test_rate_limited() {
        assert_eq!(classify(Some(429), "slow down").kind, ErrorKind::RateLimited);
    }

    #[test]
    fn test_service_overloaded_for_5xx() {
        for code in [500, 502, 503, 504, 599] {
            assert_eq!(
                classify(Some(code), "upstream exploded").kind,
                ErrorKind::ServiceOverloaded
            );
        }
    }

    #[test]
    fn test_network_failure_requires_no_status() {
        assert_eq!(
            classify(None, "error sending request: connection refused").kind,
            ErrorKind::NetworkFailure
        );
        // With a status, the same text is not a transport failure.
        assert_eq!(
            classify(Some(503), "connection pool exhausted upstream").kind,
            ErrorKind::ServiceOverloaded
        );
    }

    #[test]
    fn test_unclassified_fallback_includes_snippet() {
        let error = classify(Some(418), "i am a teapot");
        assert_eq!(error.kind, ErrorKind::Unclassified);
        assert!(error.user_message.contains("i am a teapot"));
    }

    #[test]
    fn test_unclassified_snippet_is_bounded() {
        let long = "x".repeat(500);
        let error = classify(None, &long);
        assert_eq!(error.kind, ErrorKind::Unclassified);
        assert!(error.user_message.len() < 150);
    }

    #[test]
    fn test_totality_over_status_grid() {
        // Every combination yields exactly one kind and never panics.
        let statuses = [
            None,
            Some(0),
            Some(200),
            Some(400),
            Some(402),
            Some(404),
            Some(429),
            Some(500),
            Some(999),
        ];
        let messages = ["", "nsfw", "quota", "not found", "???", "\u{1F4A5} unicode"];
        for status in statuses {
            for message in messages {
                let _ = classify(status, message);
            }
        }
    }

    #[test]
    fn test_fixed_messages_carry_actions() {
        let error = classify(Some(429), "");
        assert!(error.suggested_action.is_some());
        let error = classify(Some(500), "");
        assert!(error.suggested_action.is_some());
    }

    #[test]
    fn test_helper_constructors() {
        assert_eq!(ClassifiedError::timed_out().kind, ErrorKind::TimedOut);
        assert_eq!(
            ClassifiedError::processing_failed().kind,
            ErrorKind::ProcessingFailed
        );
        assert_eq!(ClassifiedError::cancelled().kind, ErrorKind::Cancelled);
        assert_eq!(
            ClassifiedError::missing_client().kind,
            ErrorKind::ConfigurationMissing
        );
        assert_eq!(
            ClassifiedError::synthesis_unavailable().kind,
            ErrorKind::ServiceOverloaded
        );
    }

    #[test]
    fn test_display_uses_user_message() {
        let error = ClassifiedError::timed_out();
        assert_eq!(error.to_string(), "Generation timed out. The server is busy.");
    }
}
