//! Soundscape CLI - Procedural Ambient Noise
//!
//! Command-line interface for rendering and playing soundscapes.

use anyhow::Context;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use soundscape::cli::commands::{self, RenderOptions};
use soundscape::cli::{Cli, Commands};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "info" };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into()))
        .try_init();

    info!("Soundscape v{}", env!("CARGO_PKG_VERSION"));

    let config = commands::load_engine_config(cli.config.as_deref())
        .context("failed to load engine config")?;

    match cli.command {
        Some(cmd) => handle_command(cmd, config),
        None => {
            println!("Soundscape v{}", env!("CARGO_PKG_VERSION"));
            println!("Use --help for available commands");
            Ok(())
        }
    }
}

fn handle_command(cmd: Commands, config: soundscape::EngineConfig) -> anyhow::Result<()> {
    match cmd {
        Commands::Render {
            output,
            duration,
            fade_after,
            fade_secs,
            bit_depth,
            seed,
            tracks,
        } => {
            let tracks = commands::resolve_tracks(&tracks)?;
            let config = match seed {
                Some(seed) => config.with_seed(seed),
                None => config,
            };
            let options = RenderOptions {
                duration_secs: duration,
                fade_after_secs: fade_after,
                fade_secs,
                bit_depth,
            };
            commands::render(&output, config, &tracks, &options)
                .with_context(|| format!("failed to render {}", output.display()))?;
        }
        Commands::Play {
            fade_minutes,
            tracks,
        } => {
            let tracks = commands::resolve_tracks(&tracks)?;
            if let Err(e) = commands::play(config, &tracks, fade_minutes) {
                for hint in e.recovery_suggestions() {
                    eprintln!("  hint: {}", hint);
                }
                return Err(e).context("playback failed");
            }
        }
        Commands::Tracks { tracks } => {
            let tracks = commands::resolve_tracks(&tracks)?;
            commands::print_tracks(&tracks)?;
        }
    }
    Ok(())
}
