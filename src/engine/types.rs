//! Core request/result types for the generation engine.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Output aspect ratio for generated assets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AspectRatio {
    /// Landscape, 16:9.
    #[serde(rename = "16:9")]
    Landscape,
    /// Portrait, 9:16.
    #[serde(rename = "9:16")]
    Portrait,
}

impl AspectRatio {
    /// Pixel dimensions used for base image synthesis.
    pub fn dimensions(&self) -> (u32, u32) {
        match self {
            AspectRatio::Landscape => (1024, 576),
            AspectRatio::Portrait => (576, 1024),
        }
    }

    /// Wire representation expected by provider payloads.
    pub fn as_str(&self) -> &'static str {
        match self {
            AspectRatio::Landscape => "16:9",
            AspectRatio::Portrait => "9:16",
        }
    }
}

impl fmt::Display for AspectRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AspectRatio {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "16:9" => Ok(AspectRatio::Landscape),
            "9:16" => Ok(AspectRatio::Portrait),
            other => Err(format!(
                "Unknown aspect ratio '{}'. Use 16:9 or 9:16",
                other
            )),
        }
    }
}

/// Output resolution for pro generations.
///
/// HD export always runs on the quality model and polls at a slower
/// interval; the standard tier ignores this field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Resolution {
    #[default]
    #[serde(rename = "720p")]
    Hd720,
    #[serde(rename = "1080p")]
    Hd1080,
}

impl Resolution {
    /// Wire representation expected by the managed provider.
    pub fn as_str(&self) -> &'static str {
        match self {
            Resolution::Hd720 => "720p",
            Resolution::Hd1080 => "1080p",
        }
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Resolution {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "720p" => Ok(Resolution::Hd720),
            "1080p" => Ok(Resolution::Hd1080),
            other => Err(format!(
                "Unknown resolution '{}'. Use 720p or 1080p",
                other
            )),
        }
    }
}

/// Generation mode: standard (free, best-effort) or pro (paid, managed).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Standard,
    Pro,
}

impl FromStr for Tier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "standard" => Ok(Tier::Standard),
            "pro" => Ok(Tier::Pro),
            other => Err(format!("Unknown tier '{}'. Use standard or pro", other)),
        }
    }
}

/// A single video generation request.
///
/// Callers must provide a non-empty prompt or a reference image (or both).
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    /// Text prompt describing the desired video.
    pub prompt: String,
    /// Output aspect ratio.
    pub aspect_ratio: AspectRatio,
    /// Optional base image for image-to-video, base64 without a data-URI prefix.
    pub reference_image: Option<String>,
    /// Requested duration in seconds; drives prompt augmentation and model choice.
    pub duration_secs: u32,
    /// Standard or pro generation flow.
    pub tier: Tier,
    /// Pro output resolution; 1080p forces the quality model (HD export).
    pub resolution: Resolution,
}

/// Kind of asset a generation produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetKind {
    Video,
    Image,
}

/// Normalized output of a successful generation.
///
/// Owned by the caller; the engine retains nothing after returning it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationResult {
    /// Remote URL, local path, or data URI of the generated asset.
    pub asset_uri: String,
    pub kind: AssetKind,
}

/// Opaque reference to a submitted unit of generation work.
///
/// Providers either queue a job (returning an id to poll) or answer with an
/// inline image. The two cases are distinct variants so callers never have
/// to sniff string prefixes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobHandle {
    /// A remote job that must be polled to completion.
    Deferred { id: String },
    /// A synchronously returned asset; no polling required.
    Immediate { asset_uri: String },
}

/// Result of a single status query against a deferred job.
#[derive(Debug, Clone, PartialEq)]
pub enum PollOutcome {
    /// Job is queued or still processing.
    Pending,
    /// Job finished; `output` is the provider's raw result payload.
    Completed { output: serde_json::Value },
    /// Job terminally failed on the provider side.
    Failed { error: Option<String> },
}
