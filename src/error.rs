//! Error handling for the soundscape engine
//!
//! Only lifecycle and configuration operations can fail. Synthesis and mixing
//! are infallible, and stale track references are ignored rather than reported.

use thiserror::Error;

/// Result type alias for soundscape operations
pub type Result<T> = std::result::Result<T, SoundscapeError>;

/// Main error type for soundscape operations
#[derive(Error, Debug)]
pub enum SoundscapeError {
    // Output Errors
    #[error("Audio output unavailable: {reason}")]
    OutputUnavailable { reason: String },

    // Parameter Errors
    #[error("Invalid parameter '{name}': {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    #[error("Invalid configuration: {reason}")]
    Config { reason: String },

    // I/O Errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("WAV error: {0}")]
    Wav(#[from] hound::Error),

    // Serialization Errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl SoundscapeError {
    /// Build an `OutputUnavailable` error from anything printable
    pub fn output_unavailable(reason: impl ToString) -> Self {
        SoundscapeError::OutputUnavailable {
            reason: reason.to_string(),
        }
    }

    /// Get the error code for this error type
    pub fn error_code(&self) -> &'static str {
        match self {
            SoundscapeError::OutputUnavailable { .. } => "OUTPUT_UNAVAILABLE",
            SoundscapeError::InvalidParameter { .. } => "INVALID_PARAMETER",
            SoundscapeError::Config { .. } => "CONFIG_ERROR",
            SoundscapeError::Io(_) => "IO_ERROR",
            SoundscapeError::Wav(_) => "WAV_ERROR",
            SoundscapeError::Serialization(_) => "SERIALIZATION_ERROR",
        }
    }

    /// Check if this error is recoverable
    ///
    /// A recoverable error leaves the engine idle and usable; the caller may retry.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            SoundscapeError::OutputUnavailable { .. } | SoundscapeError::InvalidParameter { .. }
        )
    }

    /// Get recovery suggestions for this error
    pub fn recovery_suggestions(&self) -> Vec<&'static str> {
        match self {
            SoundscapeError::OutputUnavailable { .. } => vec![
                "Check that an output device is connected",
                "Close other applications holding the device exclusively",
                "Try starting playback again",
            ],
            SoundscapeError::InvalidParameter { .. } => vec![
                "Fade durations must be finite and non-negative",
                "WAV exports support 16, 24 or 32 bit depth",
            ],
            SoundscapeError::Config { .. } => vec![
                "Check the sample rate, channel count and block size",
                "Remove the config file to fall back to defaults",
            ],
            SoundscapeError::Serialization(_) => vec![
                "Track lists are JSON arrays of {id, kind, volume, enabled}",
                "Valid kinds: pinkNoise, rain, fireplace",
            ],
            _ => vec![],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        let err = SoundscapeError::output_unavailable("device busy");
        assert_eq!(err.error_code(), "OUTPUT_UNAVAILABLE");
        assert_eq!(err.to_string(), "Audio output unavailable: device busy");
    }

    #[test]
    fn test_recovery_suggestions() {
        let err = SoundscapeError::output_unavailable("denied");
        assert!(!err.recovery_suggestions().is_empty());
        assert!(err.is_recoverable());

        let err = SoundscapeError::Config {
            reason: "zero channels".to_string(),
        };
        assert!(!err.is_recoverable());
    }

    #[test]
    fn test_io_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: SoundscapeError = io.into();
        assert_eq!(err.error_code(), "IO_ERROR");
    }
}
