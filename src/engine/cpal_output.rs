//! Default-device output via cpal
//!
//! A cpal `Stream` cannot move between threads on every platform, so streams
//! live on a dedicated output thread. The engine talks to it over a command
//! channel; activation waits for the thread to report whether the stream
//! actually started.

use std::thread::{self, JoinHandle};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleFormat, Stream, StreamConfig};
use crossbeam_channel::{bounded, unbounded, Receiver, Sender};
use tracing::{debug, error, info};

use crate::dsp::Mixer;
use crate::engine::output::AudioOutput;
use crate::error::{Result, SoundscapeError};

enum OutputCommand {
    Activate {
        mixer: Mixer,
        reply: Sender<Result<String>>,
    },
    Deactivate,
    Shutdown,
}

/// Output on the host's default device
pub struct CpalOutput {
    commands: Sender<OutputCommand>,
    worker: Option<JoinHandle<()>>,
    active: bool,
    device_name: Option<String>,
}

impl CpalOutput {
    /// Spawn the output thread; no device is opened until activation
    pub fn new() -> Result<Self> {
        let (tx, rx) = unbounded();
        let worker = thread::Builder::new()
            .name("soundscape-output".to_string())
            .spawn(move || run_output_thread(rx))?;
        Ok(Self {
            commands: tx,
            worker: Some(worker),
            active: false,
            device_name: None,
        })
    }
}

impl AudioOutput for CpalOutput {
    fn activate(&mut self, mixer: Mixer) -> Result<()> {
        let (reply_tx, reply_rx) = bounded(1);
        self.commands
            .send(OutputCommand::Activate {
                mixer,
                reply: reply_tx,
            })
            .map_err(|_| SoundscapeError::output_unavailable("output thread has exited"))?;

        let name = reply_rx
            .recv()
            .map_err(|_| SoundscapeError::output_unavailable("output thread has exited"))??;
        self.device_name = Some(name);
        self.active = true;
        Ok(())
    }

    fn deactivate(&mut self) {
        if self.active {
            let _ = self.commands.send(OutputCommand::Deactivate);
            self.active = false;
        }
    }

    fn is_active(&self) -> bool {
        self.active
    }

    fn describe(&self) -> String {
        match &self.device_name {
            Some(name) => format!("cpal output '{}'", name),
            None => "cpal default output".to_string(),
        }
    }
}

impl Drop for CpalOutput {
    fn drop(&mut self) {
        let _ = self.commands.send(OutputCommand::Shutdown);
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

fn run_output_thread(commands: Receiver<OutputCommand>) {
    let mut stream: Option<Stream> = None;

    for command in commands.iter() {
        match command {
            OutputCommand::Activate { mixer, reply } => {
                // Old stream stops when dropped
                stream = None;
                let result = match open_stream(mixer) {
                    Ok((opened, name)) => {
                        stream = Some(opened);
                        Ok(name)
                    }
                    Err(e) => Err(e),
                };
                let _ = reply.send(result);
            }
            OutputCommand::Deactivate => {
                if stream.take().is_some() {
                    debug!("Output stream closed");
                }
            }
            OutputCommand::Shutdown => break,
        }
    }
}

/// Open and start an f32 stream on the default device
fn open_stream(mut mixer: Mixer) -> Result<(Stream, String)> {
    let host = cpal::default_host();
    let device = host
        .default_output_device()
        .ok_or_else(|| SoundscapeError::output_unavailable("no default output device"))?;
    let device_name = device.name().unwrap_or_else(|_| "Unknown".to_string());

    let supported = device
        .default_output_config()
        .map_err(SoundscapeError::output_unavailable)?;
    if supported.sample_format() != SampleFormat::F32 {
        return Err(SoundscapeError::output_unavailable(format!(
            "device '{}' wants {:?} samples, only f32 is supported",
            device_name,
            supported.sample_format()
        )));
    }

    let config: StreamConfig = supported.into();
    let channels = config.channels as usize;

    let stream = device
        .build_output_stream(
            &config,
            move |data: &mut [f32], _info: &cpal::OutputCallbackInfo| {
                mixer.render(data, channels);
            },
            move |err| {
                error!("Output stream error: {}", err);
            },
            None,
        )
        .map_err(SoundscapeError::output_unavailable)?;
    stream.play().map_err(SoundscapeError::output_unavailable)?;

    info!(
        "Output stream started on '{}' ({} ch, {} Hz)",
        device_name, config.channels, config.sample_rate.0
    );
    Ok((stream, device_name))
}
