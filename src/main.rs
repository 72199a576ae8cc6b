use std::path::{Path, PathBuf};
use std::time::Duration;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use clap::Parser;
use tokio_util::sync::CancellationToken;

use clipgen::config::Config;
use clipgen::engine::{
    AspectRatio, AssetKind, ConnectionDiagnostics, ConnectionStatus, GenerationRequest,
    GenerationResult, ImageSynthesizer, ManagedClient, Orchestrator, PollSettings, ProviderClient,
    Resolution, Tier, MANAGED_API_KEY_ENV, PROVIDER_API_KEY_ENV,
};

/// Generate an AI video (or image fallback) from a text prompt.
#[derive(Parser, Debug)]
#[command(name = "clipgen", version, about)]
struct Args {
    /// Text prompt describing the video to generate.
    prompt: Option<String>,

    /// Output aspect ratio (16:9 or 9:16).
    #[arg(long, default_value = "16:9")]
    aspect: AspectRatio,

    /// Target duration in seconds.
    #[arg(long, default_value_t = 15)]
    duration: u32,

    /// Generation tier (standard or pro).
    #[arg(long, default_value = "standard")]
    tier: Tier,

    /// Pro output resolution (720p or 1080p). 1080p is the HD export path.
    #[arg(long, default_value = "720p")]
    resolution: Resolution,

    /// Reference image for image-to-video (PNG/JPEG file).
    #[arg(long)]
    image: Option<PathBuf>,

    /// Download the generated asset to this path.
    #[arg(long)]
    out: Option<PathBuf>,

    /// Custom config file path.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Probe the managed provider connection and exit.
    #[arg(long)]
    validate: bool,
}

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();
    let args = Args::parse();

    if let Err(message) = run(args).await {
        eprintln!("Error: {}", message);
        std::process::exit(1);
    }
}

async fn run(args: Args) -> Result<(), String> {
    let config = Config::load(args.config.as_deref()).map_err(|e| e.to_string())?;

    if args.validate {
        return validate_connection(&config).await;
    }

    let prompt = args.prompt.clone().unwrap_or_default();
    if prompt.is_empty() && args.image.is_none() {
        return Err("Provide a prompt, a reference image, or both".to_string());
    }

    let reference_image = match &args.image {
        Some(path) => {
            let bytes = std::fs::read(path)
                .map_err(|e| format!("Failed to read image '{}': {}", path.display(), e))?;
            Some(BASE64.encode(bytes))
        }
        None => None,
    };

    let request = GenerationRequest {
        prompt,
        aspect_ratio: args.aspect,
        reference_image,
        duration_secs: args.duration,
        tier: args.tier,
        resolution: args.resolution,
    };

    let orchestrator = build_orchestrator(&config).map_err(|e| e.to_string())?;

    // Ctrl-C abandons the generation deterministically.
    let cancel = CancellationToken::new();
    let signal_token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            log::info!("Interrupt received; cancelling generation");
            signal_token.cancel();
        }
    });

    let result = orchestrator
        .generate(&request, &cancel)
        .await
        .map_err(|error| match &error.suggested_action {
            Some(action) => format!("{} {}", error.user_message, action),
            None => error.user_message.clone(),
        })?;

    match result.kind {
        AssetKind::Video => println!("Generated video: {}", result.asset_uri),
        AssetKind::Image => println!("Generated image (video unavailable): {}", result.asset_uri),
    }

    if let Some(out) = &args.out {
        save_asset(&orchestrator, &result, out).await?;
        println!("Saved to: {}", out.display());
    }

    Ok(())
}

/// Run the managed connection probe and report the diagnostics.
async fn validate_connection(config: &Config) -> Result<(), String> {
    let managed_key = config
        .managed
        .api_key
        .clone()
        .or_else(|| std::env::var(MANAGED_API_KEY_ENV).ok());

    let diagnostics = match managed_key {
        None => ConnectionDiagnostics::offline(),
        Some(key) => {
            let managed = match &config.managed.base_url {
                Some(base_url) => ManagedClient::with_base_url(key, base_url.clone()),
                None => ManagedClient::new(key),
            }
            .map_err(|e| e.to_string())?;
            managed.validate_connection().await
        }
    };

    println!("{}: {}", diagnostics.label, diagnostics.details);
    if let Some(action) = &diagnostics.action {
        println!("{}", action);
    }

    match diagnostics.status {
        ConnectionStatus::Active => Ok(()),
        _ => Err("Connection validation failed".to_string()),
    }
}

/// Build the orchestrator from config and environment.
fn build_orchestrator(config: &Config) -> Result<Orchestrator, String> {
    let provider_key = config
        .provider
        .api_key
        .clone()
        .or_else(|| std::env::var(PROVIDER_API_KEY_ENV).ok())
        .ok_or_else(|| {
            format!(
                "No provider API key configured. Set {} or [provider].api_key",
                PROVIDER_API_KEY_ENV
            )
        })?;

    let provider = match &config.provider.base_url {
        Some(base_url) => ProviderClient::with_base_url(provider_key, base_url.clone()),
        None => ProviderClient::new(provider_key),
    }
    .map_err(|e| e.to_string())?;

    let synthesizer = match &config.synthesis.base_url {
        Some(base_url) => ImageSynthesizer::with_base_url(base_url.clone()),
        None => ImageSynthesizer::new(),
    }
    .map_err(|e| e.to_string())?;

    let mut orchestrator = Orchestrator::new(provider, synthesizer);

    if let Some(models) = &config.animation.models {
        orchestrator = orchestrator.with_candidates(models.clone());
    }

    let mut poll_settings = PollSettings::default();
    if let Some(interval_ms) = config.polling.interval_ms {
        poll_settings.interval = Duration::from_millis(interval_ms);
    }
    if let Some(max_attempts) = config.polling.max_attempts {
        poll_settings.max_attempts = max_attempts;
    }
    orchestrator = orchestrator.with_poll_settings(poll_settings);

    // Pro flow is available only when a managed key is present.
    let managed_key = config
        .managed
        .api_key
        .clone()
        .or_else(|| std::env::var(MANAGED_API_KEY_ENV).ok());
    if let Some(key) = managed_key {
        let managed = match &config.managed.base_url {
            Some(base_url) => ManagedClient::with_base_url(key, base_url.clone()),
            None => ManagedClient::new(key),
        }
        .map_err(|e| e.to_string())?;
        orchestrator = orchestrator.with_managed(managed);
    }

    Ok(orchestrator)
}

/// Persist a generation result to a local file.
///
/// Data URIs are decoded inline, local paths copied, and remote URLs
/// downloaded through the orchestrator's provider client.
async fn save_asset(
    orchestrator: &Orchestrator,
    result: &GenerationResult,
    out: &Path,
) -> Result<(), String> {
    if let Some(encoded) = result.asset_uri.strip_prefix("data:") {
        let payload = encoded
            .split_once(',')
            .map(|(_, data)| data)
            .ok_or_else(|| "Malformed data URI in result".to_string())?;
        let bytes = BASE64
            .decode(payload)
            .map_err(|e| format!("Failed to decode asset: {}", e))?;
        std::fs::write(out, bytes)
            .map_err(|e| format!("Failed to write '{}': {}", out.display(), e))?;
        return Ok(());
    }

    let local = Path::new(&result.asset_uri);
    if local.exists() {
        std::fs::copy(local, out)
            .map_err(|e| format!("Failed to copy to '{}': {}", out.display(), e))?;
        return Ok(());
    }

    let bytes = orchestrator
        .provider()
        .fetch_asset(&result.asset_uri)
        .await
        .map_err(|e| format!("Failed to download asset: {}", e))?;
    std::fs::write(out, bytes)
        .map_err(|e| format!("Failed to write '{}': {}", out.display(), e))?;
    Ok(())
}
