//! Tonegen - Offline Tone and Soundscape Rendering
//!
//! Tonegen turns a declarative description of oscillator channels and effect
//! settings into long (up to 12 hour) gapless stereo WAV output.
//!
//! # Architecture
//!
//! The export pipeline is layered:
//! - Graph: oscillator voices feeding an ordered chain of stages
//! - Engine: chunked offline rendering, one fresh graph per window
//! - Export: large slices encoded as WAV parts, packaged as one file, an
//!   archive, or separate parts
//! - Codec: WAV encoding and the provenance fingerprint

pub mod cli;
pub mod codec;
pub mod config;
pub mod dsp;
pub mod engine;
pub mod error;
pub mod export;
pub mod graph;
pub mod model;

pub use error::{Result, ToneError};
