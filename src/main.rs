//! Tonegen CLI - Offline Tone Renderer
//!
//! Command-line interface for the tonegen export pipeline.

use anyhow::Context;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use tonegen::cli::commands;
use tonegen::cli::{Cli, Commands};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    info!("Tonegen v{}", env!("CARGO_PKG_VERSION"));

    let config = commands::load_config(cli.config.as_deref())
        .with_context(|| "failed to load export settings")?;

    match cli.command {
        Commands::Render {
            request,
            output,
            name,
            seed,
            fingerprint,
        } => {
            let mut config = config;
            if seed.is_some() {
                config.noise_seed = seed;
            }
            config.embed_fingerprint |= fingerprint;
            commands::render(&request, config, &output, &name)
                .await
                .map_err(|e| anyhow::anyhow!("{}", e.friendly_message()))
                .with_context(|| "render failed")?;
        }
        Commands::Plan { request } => commands::plan(&request, config)?,
        Commands::Effects => commands::list_effects()?,
        Commands::Inspect { path } => commands::inspect(&path)
            .with_context(|| format!("failed to inspect {}", path.display()))?,
    }

    Ok(())
}
