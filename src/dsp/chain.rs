//! Effect Chain management
//!
//! Stages are always processed in `EffectPosition` order, whatever order
//! they were added in:
//! 1. Source stages (binaural detune lives in the voices, shepard glide is added here)
//! 2. Modulation (ring, AM, isochronic, tremolo, stutter, glitch)
//! 3. Mix gain (fixed 0.5 headroom)
//! 4. Spatial (pan, 360 pan, chorus, phaser, ping-pong delay, reverb)
//! 5. Noise (always last)
//!
//! Order changes the waveform, so it is fixed here rather than left to
//! callers; every window of an export gets the same traversal.

use super::Effect;
use crate::engine::{RenderClock, StereoBuffer};
use crate::model::EffectKind;

/// Processing order of graph stages
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum EffectPosition {
    Voices = 0,
    ShepardTone = 1,
    RingMod = 2,
    AmplitudeMod = 3,
    Isochronic = 4,
    Tremolo = 5,
    Stutter = 6,
    Glitch = 7,
    MixGain = 8,
    StereoPan = 9,
    Pan360 = 10,
    Chorus = 11,
    Phaser = 12,
    PingPongDelay = 13,
    Reverb = 14,
    Noise = 15,
}

impl EffectPosition {
    /// Position of a stage; fixed stages without a catalog entry sit at the mix gain
    pub fn for_stage(kind: Option<EffectKind>) -> Self {
        match kind {
            None => EffectPosition::MixGain,
            Some(EffectKind::BinauralBeat) => EffectPosition::Voices,
            Some(EffectKind::ShepardTone) => EffectPosition::ShepardTone,
            Some(EffectKind::RingMod) => EffectPosition::RingMod,
            Some(EffectKind::AmplitudeMod) => EffectPosition::AmplitudeMod,
            Some(EffectKind::Isochronic) => EffectPosition::Isochronic,
            Some(EffectKind::Tremolo) => EffectPosition::Tremolo,
            Some(EffectKind::Stutter) => EffectPosition::Stutter,
            Some(EffectKind::Glitch) => EffectPosition::Glitch,
            Some(EffectKind::StereoPan) => EffectPosition::StereoPan,
            Some(EffectKind::Pan360) => EffectPosition::Pan360,
            Some(EffectKind::Chorus) => EffectPosition::Chorus,
            Some(EffectKind::Phaser) => EffectPosition::Phaser,
            Some(EffectKind::PingPongDelay) => EffectPosition::PingPongDelay,
            Some(EffectKind::Reverb) => EffectPosition::Reverb,
            Some(EffectKind::Noise) => EffectPosition::Noise,
        }
    }
}

/// Ordered stages of one graph
pub struct EffectChain {
    effects: Vec<Box<dyn Effect>>,
    sample_rate: u32,
}

impl EffectChain {
    /// Create a new empty effect chain
    pub fn new(sample_rate: u32) -> Self {
        Self {
            effects: Vec::new(),
            sample_rate,
        }
    }

    /// Add a stage at its fixed position, after any stage sharing that position
    pub fn add(&mut self, mut effect: Box<dyn Effect>) {
        effect.prepare(self.sample_rate);
        let position = self.insertion_index(EffectPosition::for_stage(effect.kind()));
        self.effects.insert(position, effect);
    }

    /// Reset all stages
    pub fn reset(&mut self) {
        for effect in &mut self.effects {
            effect.reset();
        }
    }

    /// Process the entire chain
    pub fn process(&mut self, buffer: &mut StereoBuffer, clock: &RenderClock) {
        for effect in &mut self.effects {
            effect.process(buffer, clock);
        }
    }

    /// Get the number of stages in the chain
    pub fn len(&self) -> usize {
        self.effects.len()
    }

    /// Check if the chain is empty
    pub fn is_empty(&self) -> bool {
        self.effects.is_empty()
    }

    /// Iterate over stages in processing order
    pub fn iter(&self) -> impl Iterator<Item = &dyn Effect> {
        self.effects.iter().map(|e| e.as_ref())
    }

    fn insertion_index(&self, position: EffectPosition) -> usize {
        self.effects
            .iter()
            .position(|e| EffectPosition::for_stage(e.kind()) > position)
            .unwrap_or(self.effects.len())
    }
}
