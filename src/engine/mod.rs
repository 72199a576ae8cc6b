//! AI video generation orchestration engine.
//!
//! Takes a generation request, routes it to the standard (free) or pro
//! (managed) provider chain, synthesizes a base image when none is given,
//! attempts image-to-video animation across candidate models, polls jobs
//! with bounded attempts, and returns one normalized result or a classified
//! failure.

mod animation;
mod classify;
mod client;
mod managed;
mod orchestrator;
mod poller;
mod synthesis;
mod types;

pub use animation::{
    default_candidates, run_chain, ChainExhausted, ModelCandidate, PayloadTemplate,
};
pub use classify::{classify, ClassifiedError, ErrorKind};
pub use client::{ProviderClient, ProviderError, PROVIDER_API_BASE_URL, PROVIDER_API_KEY_ENV};
pub use managed::{
    ConnectionDiagnostics, ConnectionStatus, ManagedClient, Operation, OperationError,
    MANAGED_API_BASE_URL, MANAGED_API_KEY_ENV, PRO_FAST_MODEL, PRO_HD_POLL_INTERVAL,
    PRO_MAX_POLLS, PRO_POLL_INTERVAL, PRO_QUALITY_MODEL,
};
pub use orchestrator::Orchestrator;
pub use poller::{
    extract_asset_uri, poll, PollSettings, STANDARD_MAX_ATTEMPTS, STANDARD_POLL_INTERVAL,
};
pub use synthesis::{ImageSynthesizer, SYNTHESIS_BASE_URL};
pub use types::{
    AspectRatio, AssetKind, GenerationRequest, GenerationResult, JobHandle, PollOutcome,
    Resolution, Tier,
};
