//! Data model
//!
//! Channels, the effect catalog and the render request an export consumes.

pub mod channel;
pub mod effect;
pub mod request;

pub use channel::{validate_channels, FrequencyChannel, Waveform, MAX_CHANNELS};
pub use effect::{AudioEffect, EffectClass, EffectKind, EffectSet, EffectSpec};
pub use request::{
    frames_for, validate_sample_rate, RenderRequest, DEFAULT_SAMPLE_RATE, MAX_DURATION_SECS,
    MIN_DURATION_SECS,
};
