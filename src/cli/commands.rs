//! CLI Command Implementations
//!
//! Implements the actual logic for each CLI command.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use crate::cli::TrackArgs;
use crate::config::{ensure_audible, load_tracks, EngineConfig, TrackConfig};
use crate::engine::{ManualScheduler, SoundscapeEngine, WavExporter, WavFormat};
use crate::error::{Result, SoundscapeError};

/// Engine settings from `path`, or defaults
pub fn load_engine_config(path: Option<&Path>) -> Result<EngineConfig> {
    match path {
        Some(path) => EngineConfig::load(path),
        None => Ok(EngineConfig::default()),
    }
}

/// Resolve the track list and make sure something will be heard
pub fn resolve_tracks(args: &TrackArgs) -> Result<Vec<TrackConfig>> {
    let mut tracks = match (&args.tracks, args.track.is_empty()) {
        (Some(path), _) => load_tracks(path)?,
        (None, false) => args.track.clone(),
        (None, true) => TrackConfig::default_soundscape(),
    };
    if let Some(id) = ensure_audible(&mut tracks) {
        info!("No track enabled, enabling {}", id);
    }
    Ok(tracks)
}

/// Options for an offline render
#[derive(Debug, Clone)]
pub struct RenderOptions {
    pub duration_secs: f64,
    pub fade_after_secs: Option<f64>,
    pub fade_secs: f64,
    pub bit_depth: u16,
}

/// Render the soundscape to a WAV file
///
/// The fade timer runs on simulated time advanced one block at a time, so the
/// file is identical for a given seed. Rendering ends early once a fade stops
/// playback. Returns the number of frames written.
pub fn render(
    path: &Path,
    config: EngineConfig,
    tracks: &[TrackConfig],
    options: &RenderOptions,
) -> Result<u64> {
    if !options.duration_secs.is_finite() || options.duration_secs <= 0.0 {
        return Err(SoundscapeError::InvalidParameter {
            name: "duration",
            reason: format!("{} seconds is not a positive duration", options.duration_secs),
        });
    }

    let sample_rate = config.sample_rate;
    let block_frames = config.block_frames;
    let format = WavFormat::new(sample_rate, config.channels, options.bit_depth);
    let total_frames = (options.duration_secs * sample_rate as f64).round() as u64;
    let fade_at = options
        .fade_after_secs
        .map(|secs| (secs.max(0.0) * sample_rate as f64).round() as u64);

    let scheduler = Arc::new(ManualScheduler::new());
    let (engine, tap) = SoundscapeEngine::offline(config, scheduler.clone())?;
    engine.configure_tracks(tracks);

    let mut exporter = WavExporter::create(path, format)?;
    engine.start()?;
    info!(
        "Rendering {:.1}s to {} ({} track(s) enabled)",
        options.duration_secs,
        path.display(),
        engine.snapshot().enabled_count()
    );

    let mut block = vec![0.0f32; block_frames * tap.channels()];
    let mut rendered = 0u64;
    let mut fade_requested = false;

    while rendered < total_frames && engine.status().is_playing {
        if let Some(at) = fade_at {
            if !fade_requested && rendered >= at {
                engine.fade_out_secs(options.fade_secs)?;
                fade_requested = true;
            }
        }

        let frames = block_frames.min((total_frames - rendered) as usize);
        let out = &mut block[..frames * tap.channels()];
        tap.render_into(out);
        exporter.write_block(out)?;
        rendered += frames as u64;

        scheduler.advance(Duration::from_secs_f64(frames as f64 / sample_rate as f64));
    }

    engine.stop();
    let frames = exporter.finalize()?;
    if frames < total_frames {
        info!("Fade finished early after {} frames", frames);
    }
    println!(
        "Rendered {:.2}s to {}",
        frames as f64 / sample_rate as f64,
        path.display()
    );
    Ok(frames)
}

/// Play on the default device until the fade-out stops playback
#[cfg(feature = "cpal")]
pub fn play(config: EngineConfig, tracks: &[TrackConfig], fade_minutes: f64) -> Result<()> {
    use crate::engine::EngineEvent;

    let engine = SoundscapeEngine::with_default_device(config)?;
    engine.configure_tracks(tracks);
    let events = engine.subscribe();
    engine.start()?;

    engine.fade_out_secs(fade_minutes * 60.0)?;
    println!("{}", engine.status().summary(true));

    for event in events.iter() {
        match event {
            EngineEvent::StatusChanged(status) if !status.is_playing => break,
            EngineEvent::StartFailed { reason } => {
                return Err(SoundscapeError::OutputUnavailable { reason });
            }
            EngineEvent::Interrupted => warn!("Playback interrupted"),
            _ => {}
        }
    }
    Ok(())
}

#[cfg(not(feature = "cpal"))]
pub fn play(_config: EngineConfig, _tracks: &[TrackConfig], _fade_minutes: f64) -> Result<()> {
    warn!("Device playback requested without device support");
    Err(SoundscapeError::output_unavailable(
        "built without the `cpal` feature; use `render` instead",
    ))
}

/// Print a track list as pretty JSON
pub fn print_tracks(tracks: &[TrackConfig]) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(tracks)?);
    Ok(())
}
