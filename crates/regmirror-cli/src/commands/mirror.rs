//! Mirror command: pull, tag and push a batch of images into the local registry.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Args;
use regmirror_mirror::{BatchResult, MirrorConfig, MirrorOrchestrator};
use regmirror_registry::{CredentialStore, EngineClient, EngineConfig, DEFAULT_ENGINE_URL};

use super::{parse_images, OutputFormat, RegistryArgs};

/// Arguments for the mirror command.
#[derive(Args, Debug)]
pub struct MirrorArgs {
    /// Images to mirror (comma-separated registry/repository:tag references)
    #[arg(required = true, value_delimiter = ',')]
    pub images: Vec<String>,

    #[command(flatten)]
    pub registry: RegistryArgs,

    /// Container engine API endpoint (http://, https:// or tcp://)
    #[arg(long, env = "DOCKER_HOST", default_value = DEFAULT_ENGINE_URL)]
    pub engine_url: String,

    /// Engine API version, e.g. 1.41
    #[arg(long, env = "DOCKER_API_VERSION")]
    pub api_version: Option<String>,

    /// JSON file mapping registry hosts to {"username", "password"}
    #[arg(long, env = "REGMIRROR_AUTH_FILE")]
    pub auth_file: Option<PathBuf>,

    /// Per-request timeout in seconds
    #[arg(long, default_value = "1800")]
    pub timeout: u64,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub output: OutputFormat,
}

/// Execute the mirror command.
pub async fn execute(args: MirrorArgs) -> Result<()> {
    let images = parse_images(&args.images)?;
    let config = MirrorConfig::builder()
        .local_registry(args.registry.local_registry.clone())
        .registries(args.registry.load_registry_map()?)
        .build();

    let client = EngineClient::new(engine_config(&args)?)
        .with_context(|| format!("Failed to create engine client for {}", args.engine_url))?;
    tracing::debug!(engine = %client.base_url(), "using container engine");
    if !images.is_empty() {
        client
            .ping()
            .await
            .with_context(|| format!("Container engine at {} is not reachable", args.engine_url))?;
    }

    let orchestrator = MirrorOrchestrator::new(config, Arc::new(client))
        .context("Invalid mirror configuration")?;

    if args.output == OutputFormat::Text {
        print_header(images.len(), &orchestrator);
    }

    let result = orchestrator.mirror_all(images).await;

    match args.output {
        OutputFormat::Json => print_json_output(&result)?,
        OutputFormat::Text => print_text_output(&result),
    }

    result.into_result()?;
    Ok(())
}

fn engine_config(args: &MirrorArgs) -> Result<EngineConfig> {
    let credentials = match &args.auth_file {
        Some(path) => CredentialStore::from_file(path)
            .with_context(|| format!("Failed to load credentials from {}", path.display()))?,
        None => CredentialStore::new(),
    };

    let mut config = EngineConfig::new(&args.engine_url)
        .with_timeout(Duration::from_secs(args.timeout))
        .with_credentials(credentials);
    if let Some(version) = &args.api_version {
        config = config.with_api_version(version);
    }
    Ok(config)
}

fn print_header(count: usize, orchestrator: &MirrorOrchestrator) {
    println!("🚀 Mirroring {count} images...");
    println!("   Local registry: {}", orchestrator.config().local_registry);
    if orchestrator.resolver().redirects() {
        println!("   Registry map:");
        for (upstream, replacement) in orchestrator.config().registries.iter() {
            println!("     {upstream} → {replacement}");
        }
    }
}

fn print_json_output(result: &BatchResult) -> Result<()> {
    let json = serde_json::to_string_pretty(result)?;
    println!("{json}");
    Ok(())
}

fn print_text_output(result: &BatchResult) {
    println!("\n📊 Mirror Results:");
    println!("   Run ID: {}", result.run_id);
    println!(
        "   ✅ Mirrored: {} / {}",
        result.succeeded(),
        result.outcomes.len()
    );
    if !result.failed.is_empty() {
        println!("   ❌ Failed: {}", result.failed.len());
    }

    if !result.outcomes.is_empty() {
        println!("\n   Image Details:");
        for outcome in &result.outcomes {
            if outcome.success {
                println!("   ✅ {} → {}", outcome.image, outcome.push);
            } else {
                println!(
                    "   ❌ {} ({} attempts) - {}",
                    outcome.image,
                    outcome.attempts,
                    outcome.error.as_deref().unwrap_or("unknown error")
                );
            }
        }
    }

    if result.is_success() {
        println!(
            "\n✅ Images downloaded successfully in {:.1}s",
            result.elapsed.as_secs_f64()
        );
    }
}
