//! Tone graphs
//!
//! A graph is the oscillator bank plus the ordered stage chain for one
//! render window. Graphs are built fresh per window and never shared.

mod builder;

pub use builder::{GraphFactory, ToneGraphBuilder};

use crate::dsp::{Effect, EffectChain, OscillatorBank};
use crate::engine::{RenderClock, StereoBuffer};

/// Voices feeding an ordered chain of stages
pub struct ToneGraph {
    bank: OscillatorBank,
    chain: EffectChain,
}

impl ToneGraph {
    pub fn new(bank: OscillatorBank, chain: EffectChain) -> Self {
        Self { bank, chain }
    }

    /// Render one window into `output`, overwriting its contents
    pub fn render(&mut self, output: &mut StereoBuffer, clock: &RenderClock) {
        self.bank.render(output, clock);
        self.chain.process(output, clock);
    }

    pub fn bank(&self) -> &OscillatorBank {
        &self.bank
    }

    pub fn chain(&self) -> &EffectChain {
        &self.chain
    }

    /// Add a stage at its fixed position in the chain
    pub fn add_stage(&mut self, stage: Box<dyn Effect>) {
        self.chain.add(stage);
    }

    /// Display names of every stage in processing order
    pub fn stage_names(&self) -> Vec<String> {
        self.chain
            .iter()
            .map(|e| e.display_name().to_string())
            .collect()
    }
}
