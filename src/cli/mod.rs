//! CLI Module
//!
//! Command-line interface for the soundscape synth.

pub mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::config::{TrackConfig, DEFAULT_FADE_MINUTES};
use crate::dsp::NoiseKind;

/// Soundscape - procedural ambient noise with sleep fade-out
#[derive(Parser, Debug)]
#[command(name = "soundscape")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Engine settings (JSON); defaults are used when absent
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Where the track list comes from
#[derive(clap::Args, Debug, Clone, Default)]
pub struct TrackArgs {
    /// Track list file (JSON array of {id, kind, volume, enabled})
    #[arg(short, long, conflicts_with = "track")]
    pub tracks: Option<PathBuf>,

    /// Inline track as KIND[=VOLUME], e.g. `rain=0.5`; repeatable
    #[arg(long, value_parser = parse_track_spec)]
    pub track: Vec<TrackConfig>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Render the soundscape to a WAV file
    #[command(name = "render")]
    Render {
        /// Output WAV path
        #[arg(short, long)]
        output: PathBuf,

        /// Length of the render in seconds
        #[arg(short, long, default_value_t = 30.0)]
        duration: f64,

        /// Start a fade-out after this many seconds
        #[arg(long)]
        fade_after: Option<f64>,

        /// Fade-out length in seconds
        #[arg(long, default_value_t = 10.0)]
        fade_secs: f64,

        /// Bit depth: 16, 24 or 32 (float)
        #[arg(long, default_value_t = 16)]
        bit_depth: u16,

        /// Noise seed for a reproducible file
        #[arg(long)]
        seed: Option<u64>,

        #[command(flatten)]
        tracks: TrackArgs,
    },

    /// Play on the default output device
    #[command(name = "play")]
    Play {
        /// Fade out over this many minutes, then exit
        #[arg(short, long, default_value_t = DEFAULT_FADE_MINUTES)]
        fade_minutes: f64,

        #[command(flatten)]
        tracks: TrackArgs,
    },

    /// Print a track list as JSON (the default soundscape unless given one)
    #[command(name = "tracks")]
    Tracks {
        #[command(flatten)]
        tracks: TrackArgs,
    },
}

/// Parse `KIND[=VOLUME]` into an enabled track
pub fn parse_track_spec(spec: &str) -> Result<TrackConfig, String> {
    let (kind, volume) = match spec.split_once('=') {
        Some((kind, volume)) => {
            let volume: f32 = volume
                .trim()
                .parse()
                .map_err(|_| format!("invalid volume in '{}'", spec))?;
            (kind, volume)
        }
        None => (spec, 1.0),
    };
    let kind: NoiseKind = kind.trim().parse()?;
    Ok(TrackConfig::new(kind, volume, true).titled(kind.display_name()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_track_spec() {
        let track = parse_track_spec("rain=0.5").unwrap();
        assert_eq!(track.kind, NoiseKind::Rain);
        assert_eq!(track.volume, 0.5);
        assert!(track.enabled);

        let track = parse_track_spec("fireplace").unwrap();
        assert_eq!(track.volume, 1.0);
    }

    #[test]
    fn test_play_defaults_to_half_hour_fade() {
        let cli = Cli::try_parse_from(["soundscape", "play"]).unwrap();
        match cli.command {
            Some(Commands::Play { fade_minutes, .. }) => assert_eq!(fade_minutes, 30.0),
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_parse_track_spec_rejects_garbage() {
        assert!(parse_track_spec("thunder=0.5").is_err());
        assert!(parse_track_spec("rain=loud").is_err());
    }

    #[test]
    fn test_cli_parses_render() {
        let cli = Cli::try_parse_from([
            "soundscape",
            "render",
            "-o",
            "out.wav",
            "--track",
            "pinkNoise=0.7",
            "--track",
            "rain",
            "--fade-after",
            "5",
        ])
        .unwrap();

        match cli.command {
            Some(Commands::Render {
                tracks, fade_after, ..
            }) => {
                assert_eq!(tracks.track.len(), 2);
                assert_eq!(fade_after, Some(5.0));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }
}
