//! Error handling for tonegen
//!
//! Every error carries a stable code, a recoverability flag and recovery
//! suggestions so the export front-end can raise a single, actionable notice.

use thiserror::Error;

/// Result type alias for tonegen operations
pub type Result<T> = std::result::Result<T, ToneError>;

/// Main error type for tonegen operations
#[derive(Error, Debug)]
pub enum ToneError {
    // Invalid Input Errors
    #[error("No enabled channels: at least one oscillator must be enabled")]
    NoEnabledChannels,

    #[error("Duration {duration_secs:.1}s is outside the allowed range {min_secs:.0}..={max_secs:.0}s")]
    DurationOutOfRange {
        duration_secs: f64,
        min_secs: f64,
        max_secs: f64,
    },

    #[error("Sample rate {sample_rate} Hz is not supported")]
    SampleRateOutOfRange { sample_rate: u32 },

    #[error("Too many channels: {count} (maximum {max})")]
    TooManyChannels { count: usize, max: usize },

    #[error("Invalid channel {id}: {reason}")]
    InvalidChannel { id: u32, reason: String },

    #[error("Unknown effect: {effect_id}")]
    UnknownEffect { effect_id: String },

    #[error("Effect '{effect_id}' value {value} is outside {min}..={max}")]
    EffectOutOfRange {
        effect_id: String,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("Invalid configuration: {reason}")]
    InvalidConfig { reason: String },

    // Encoding Errors
    #[error("Channel buffers have mismatched lengths: {lengths:?}")]
    BufferLengthMismatch { lengths: Vec<usize> },

    #[error("Unsupported channel count: {count} (only mono/stereo supported)")]
    UnsupportedChannelCount { count: usize },

    #[error("Encoding produced no audio data for part {part}")]
    EmptyOutput { part: usize },

    #[error("WAV encoding failed: {reason}")]
    Encode { reason: String },

    #[error("Invalid WAV data: {reason}")]
    InvalidWav { reason: String },

    // Render Errors
    #[error("Render failed in slice {slice_index}: {reason}")]
    RenderFailed { slice_index: usize, reason: String },

    #[error("Export timed out after {limit_secs:.0}s")]
    Timeout { duration_secs: f64, limit_secs: f64 },

    #[error("Export cancelled")]
    Cancelled,

    // Packaging Errors
    #[error("Archive packaging failed: {reason}")]
    Archive { reason: String },

    // Collaborator Errors
    #[error("{collaborator} failed: {reason}")]
    Collaborator {
        collaborator: &'static str,
        reason: String,
    },

    // Fingerprint Errors
    #[error("Buffer too short for fingerprint: {available} samples, {required} required")]
    FingerprintCapacity { available: usize, required: usize },

    // I/O Errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // Serialization Errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ToneError {
    /// Get the error code for this error type
    pub fn error_code(&self) -> &'static str {
        match self {
            ToneError::NoEnabledChannels => "NO_ENABLED_CHANNELS",
            ToneError::DurationOutOfRange { .. } => "DURATION_OUT_OF_RANGE",
            ToneError::SampleRateOutOfRange { .. } => "SAMPLE_RATE_OUT_OF_RANGE",
            ToneError::TooManyChannels { .. } => "TOO_MANY_CHANNELS",
            ToneError::InvalidChannel { .. } => "INVALID_CHANNEL",
            ToneError::UnknownEffect { .. } => "UNKNOWN_EFFECT",
            ToneError::EffectOutOfRange { .. } => "EFFECT_OUT_OF_RANGE",
            ToneError::InvalidConfig { .. } => "INVALID_CONFIG",
            ToneError::BufferLengthMismatch { .. } => "BUFFER_LENGTH_MISMATCH",
            ToneError::UnsupportedChannelCount { .. } => "UNSUPPORTED_CHANNEL_COUNT",
            ToneError::EmptyOutput { .. } => "EMPTY_OUTPUT",
            ToneError::Encode { .. } => "ENCODE_ERROR",
            ToneError::InvalidWav { .. } => "INVALID_WAV",
            ToneError::RenderFailed { .. } => "RENDER_FAILED",
            ToneError::Timeout { .. } => "TIMEOUT",
            ToneError::Cancelled => "CANCELLED",
            ToneError::Archive { .. } => "ARCHIVE_ERROR",
            ToneError::Collaborator { .. } => "COLLABORATOR_ERROR",
            ToneError::FingerprintCapacity { .. } => "FINGERPRINT_CAPACITY",
            ToneError::Io(_) => "IO_ERROR",
            ToneError::Serialization(_) => "SERIALIZATION_ERROR",
        }
    }

    /// Check if this error is an input problem rejected before rendering
    pub fn is_invalid_input(&self) -> bool {
        matches!(
            self,
            ToneError::NoEnabledChannels
                | ToneError::DurationOutOfRange { .. }
                | ToneError::SampleRateOutOfRange { .. }
                | ToneError::TooManyChannels { .. }
                | ToneError::InvalidChannel { .. }
                | ToneError::UnknownEffect { .. }
                | ToneError::EffectOutOfRange { .. }
                | ToneError::InvalidConfig { .. }
        )
    }

    /// Check if this error is recoverable by the user retrying with changes
    pub fn is_recoverable(&self) -> bool {
        match self {
            ToneError::Timeout { .. } => true,
            ToneError::Cancelled => true,
            ToneError::RenderFailed { .. } => true,
            ToneError::Collaborator { .. } => true,
            e => e.is_invalid_input(),
        }
    }

    /// Get recovery suggestions for this error
    pub fn recovery_suggestions(&self) -> Vec<&'static str> {
        match self {
            ToneError::NoEnabledChannels => vec![
                "Enable at least one frequency channel",
                "Check that the channel list is not empty",
            ],
            ToneError::DurationOutOfRange { .. } => vec![
                "Choose a duration between 30 seconds and 12 hours",
            ],
            ToneError::EffectOutOfRange { .. } | ToneError::UnknownEffect { .. } => vec![
                "Reset the effect to its default value",
                "Run 'tonegen effects' to list valid effect ranges",
            ],
            ToneError::RenderFailed { .. } => vec![
                "Restart the export",
                "Disable recently enabled effects and try again",
            ],
            ToneError::Timeout { .. } => vec![
                "Try a shorter duration",
                "Export in several shorter sessions",
            ],
            ToneError::Archive { .. } => vec![
                "Download the parts individually",
            ],
            ToneError::Io(_) => vec![
                "Check that the output location is writable",
                "Free up disk space",
            ],
            _ => vec![],
        }
    }

    /// Get a user-friendly message for this error
    pub fn friendly_message(&self) -> String {
        match self {
            ToneError::NoEnabledChannels => {
                "There is nothing to render yet. Turn on at least one frequency channel.".to_string()
            }
            ToneError::RenderFailed { slice_index, .. } => {
                format!(
                    "Rendering stopped at segment {}. No file was produced, please restart the export.",
                    slice_index + 1
                )
            }
            ToneError::Timeout { duration_secs, .. } => {
                format!(
                    "The {:.0}-second export took too long and was stopped. Try a shorter duration.",
                    duration_secs
                )
            }
            ToneError::Cancelled => "The export was cancelled.".to_string(),
            _ => self.to_string(),
        }
    }
}
