//! Graph construction from channels and effect settings

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::trace;

use super::ToneGraph;
use crate::dsp::{
    AmplitudeModulator, AutoPanner, Chorus, Effect, EffectChain, Glitch, IsochronicPulse, MixGain,
    NoiseMix, OscillatorBank, Phaser, PingPongDelay, Reverb, RingModulator, ShepardTone,
    StereoPanner, Stutter, Tremolo, MIX_GAIN,
};
use crate::engine::OfflineContext;
use crate::error::{Result, ToneError};
use crate::model::channel::DEFAULT_FREQUENCY_HZ;
use crate::model::{EffectKind, EffectSet, FrequencyChannel};

/// Builds one graph per render window
///
/// The renderer is generic over this trait so alternative graphs can be
/// substituted without touching the windowing logic.
pub trait GraphFactory: Send + Sync {
    /// # Arguments
    /// * `ctx` - Window the graph will render into
    /// * `channels` - Oscillator channels; disabled ones are skipped
    /// * `effects` - Effect settings; disabled ones are never instantiated
    /// * `rng` - Random source for noise and glitch stages
    fn build(
        &self,
        ctx: &OfflineContext,
        channels: &[FrequencyChannel],
        effects: &EffectSet,
        rng: &mut StdRng,
    ) -> Result<ToneGraph>;
}

/// Standard graph: voices, catalog stages in fixed order, mix gain
#[derive(Debug, Clone, Copy, Default)]
pub struct ToneGraphBuilder;

impl ToneGraphBuilder {
    pub fn new() -> Self {
        Self
    }

    /// Instantiate the stage for one enabled catalog entry.
    ///
    /// Binaural beat has no stage; it detunes the voices instead.
    fn create_stage(
        kind: EffectKind,
        value: f64,
        shepard_base: f64,
        rng: &mut StdRng,
    ) -> Option<Box<dyn Effect>> {
        let stage: Box<dyn Effect> = match kind {
            EffectKind::BinauralBeat => return None,
            EffectKind::ShepardTone => Box::new(ShepardTone::new(value, shepard_base)),
            EffectKind::RingMod => Box::new(RingModulator::new(value)),
            EffectKind::AmplitudeMod => Box::new(AmplitudeModulator::new(value)),
            EffectKind::Isochronic => Box::new(IsochronicPulse::new(value)),
            EffectKind::Tremolo => Box::new(Tremolo::new(value)),
            EffectKind::Stutter => Box::new(Stutter::new(value)),
            EffectKind::Glitch => Box::new(Glitch::new(value, StdRng::seed_from_u64(rng.gen()))),
            EffectKind::StereoPan => Box::new(StereoPanner::new(value)),
            EffectKind::Pan360 => Box::new(AutoPanner::new(value)),
            EffectKind::Chorus => Box::new(Chorus::new(value)),
            EffectKind::Phaser => Box::new(Phaser::new(value)),
            EffectKind::PingPongDelay => Box::new(PingPongDelay::new(value)),
            EffectKind::Reverb => Box::new(Reverb::new(value)),
            EffectKind::Noise => Box::new(NoiseMix::new(value, StdRng::seed_from_u64(rng.gen()))),
        };
        Some(stage)
    }
}

/// Lowest enabled non-zero frequency, the centre of the shepard envelope
fn shepard_base(channels: &[FrequencyChannel]) -> f64 {
    channels
        .iter()
        .filter(|c| c.enabled && c.frequency > 0.0)
        .map(|c| c.frequency)
        .fold(None, |acc: Option<f64>, f| Some(acc.map_or(f, |a| a.min(f))))
        .unwrap_or(DEFAULT_FREQUENCY_HZ)
}

impl GraphFactory for ToneGraphBuilder {
    fn build(
        &self,
        ctx: &OfflineContext,
        channels: &[FrequencyChannel],
        effects: &EffectSet,
        rng: &mut StdRng,
    ) -> Result<ToneGraph> {
        let mut bank = OscillatorBank::new();
        for channel in channels.iter().filter(|c| c.enabled) {
            bank.add_voice(channel.frequency, channel.waveform);
        }
        if bank.is_empty() {
            return Err(ToneError::NoEnabledChannels);
        }

        let enabled = effects.enabled_kinds();
        let base = shepard_base(channels);

        let mut chain = EffectChain::new(ctx.sample_rate());
        chain.add(Box::new(MixGain::new(MIX_GAIN)));

        for (kind, value) in enabled {
            if kind == EffectKind::BinauralBeat {
                bank.detune_right(value);
                continue;
            }
            if let Some(stage) = Self::create_stage(kind, value, base, rng) {
                chain.add(stage);
            }
        }

        trace!(
            slice = ctx.slice_index(),
            voices = bank.len(),
            stages = chain.len(),
            "Built tone graph"
        );

        Ok(ToneGraph::new(bank, chain))
    }
}
