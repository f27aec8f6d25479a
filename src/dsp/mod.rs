//! DSP stages
//!
//! Oscillator voices feed an ordered chain of stages. Every stage implements
//! the `Effect` trait and processes a whole window in place.

mod chain;
mod delay;
mod effect;
mod modulation;
mod noise;
mod oscillator;
mod reverb;
mod shepard;
mod spatial;

pub use chain::{EffectChain, EffectPosition};
pub use delay::PingPongDelay;
pub use effect::Effect;
pub use modulation::{
    gate, AmplitudeModulator, Glitch, IsochronicPulse, MixGain, RingModulator, Stutter, Tremolo,
};
pub use noise::NoiseMix;
pub use oscillator::{OscillatorBank, Voice};
pub use reverb::Reverb;
pub use shepard::ShepardTone;
pub use spatial::{pan_frame, AutoPanner, Chorus, Phaser, StereoPanner};

/// Headroom applied to the summed voices before spatial stages
pub const MIX_GAIN: f32 = 0.5;
