//! WAV export for offline renders
//!
//! Rendered blocks are interleaved f32 in [-1, 1]; they are written as
//! 16- or 24-bit PCM or 32-bit float. Blocks are streamed to disk so long
//! renders (a 30 minute fade) never sit in memory.

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use hound::{SampleFormat, WavReader, WavSpec, WavWriter};

use crate::error::{Result, SoundscapeError};

/// Output file format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WavFormat {
    pub sample_rate: u32,
    pub channels: u16,
    /// Bit depth: 16, 24, or 32 (float)
    pub bit_depth: u16,
}

impl Default for WavFormat {
    fn default() -> Self {
        WavFormat {
            sample_rate: 44100,
            channels: 2,
            bit_depth: 16,
        }
    }
}

impl WavFormat {
    pub fn new(sample_rate: u32, channels: u16, bit_depth: u16) -> Self {
        WavFormat {
            sample_rate,
            channels,
            bit_depth,
        }
    }

    fn spec(&self) -> Result<WavSpec> {
        let sample_format = match self.bit_depth {
            16 | 24 => SampleFormat::Int,
            32 => SampleFormat::Float,
            other => {
                return Err(SoundscapeError::InvalidParameter {
                    name: "bit_depth",
                    reason: format!("{}-bit audio (only 16, 24, 32 supported)", other),
                })
            }
        };
        if self.channels == 0 {
            return Err(SoundscapeError::InvalidParameter {
                name: "channels",
                reason: "at least one channel is required".to_string(),
            });
        }
        Ok(WavSpec {
            channels: self.channels,
            sample_rate: self.sample_rate,
            bits_per_sample: self.bit_depth,
            sample_format,
        })
    }
}

/// Streaming WAV writer fed with interleaved blocks
pub struct WavExporter {
    writer: WavWriter<BufWriter<File>>,
    format: WavFormat,
    samples_written: u64,
}

impl WavExporter {
    /// Create (or truncate) `path`
    pub fn create(path: &Path, format: WavFormat) -> Result<Self> {
        let writer = WavWriter::create(path, format.spec()?)?;
        Ok(Self {
            writer,
            format,
            samples_written: 0,
        })
    }

    /// Append one interleaved block
    pub fn write_block(&mut self, block: &[f32]) -> Result<()> {
        match self.format.bit_depth {
            16 => {
                for &sample in block {
                    let scaled = (sample * 32767.0).clamp(-32768.0, 32767.0) as i16;
                    self.writer.write_sample(scaled)?;
                }
            }
            24 => {
                for &sample in block {
                    // 24-bit stored as i32 in hound
                    let scaled = (sample * 8388607.0).clamp(-8388608.0, 8388607.0) as i32;
                    self.writer.write_sample(scaled)?;
                }
            }
            _ => {
                for &sample in block {
                    self.writer.write_sample(sample)?;
                }
            }
        }
        self.samples_written += block.len() as u64;
        Ok(())
    }

    /// Frames written so far
    pub fn frames_written(&self) -> u64 {
        self.samples_written / self.format.channels as u64
    }

    /// Flush the header and close the file; returns frames written
    pub fn finalize(self) -> Result<u64> {
        let frames = self.frames_written();
        self.writer.finalize()?;
        Ok(frames)
    }
}

/// Write a whole interleaved buffer in one go
pub fn export_wav(samples: &[f32], path: &Path, format: WavFormat) -> Result<u64> {
    let mut exporter = WavExporter::create(path, format)?;
    exporter.write_block(samples)?;
    exporter.finalize()
}

/// Read a WAV file back as interleaved f32
pub fn read_wav(path: &Path) -> Result<(WavFormat, Vec<f32>)> {
    let reader = WavReader::open(path)?;
    let spec = reader.spec();
    let format = WavFormat::new(spec.sample_rate, spec.channels, spec.bits_per_sample);

    let samples = match spec.sample_format {
        SampleFormat::Float => reader.into_samples::<f32>().collect::<std::result::Result<Vec<_>, _>>()?,
        SampleFormat::Int => {
            let max = (1i64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .into_samples::<i32>()
                .map(|s| s.map(|v| v as f32 / max))
                .collect::<std::result::Result<Vec<_>, _>>()?
        }
    };
    Ok((format, samples))
}

// ============================================================================
// Unit Tests
// ============================================================================
