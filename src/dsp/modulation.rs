//! Modulation stages
//!
//! Each stage multiplies the summed voices by its own low-frequency source.
//! Periodic sources read their phase from the render clock; the glitch stage
//! draws from its own injected random source.

use std::f64::consts::TAU;

use rand::rngs::StdRng;
use rand::Rng;

use super::Effect;
use crate::engine::{RenderClock, StereoBuffer};
use crate::impl_effect_common;
use crate::model::EffectKind;

/// Fixed depth of the tremolo stage
const TREMOLO_DEPTH: f64 = 0.5;

/// Duty cycle of isochronic pulses
const ISOCHRONIC_DUTY: f64 = 0.5;

/// Duty cycle of the stutter gate
const STUTTER_DUTY: f64 = 0.75;

/// Edge ramp of gated stages, as a fraction of the cycle
const GATE_RAMP: f64 = 0.02;

/// Length of one glitch decision block in seconds
const GLITCH_BLOCK_SECS: f64 = 0.05;

/// Quantization levels of the glitch bit-crush event
const GLITCH_CRUSH_LEVELS: f32 = 8.0;

/// Trapezoid gate: ramps up over `ramp`, holds until `duty`, then silent
#[inline]
pub fn gate(phase: f64, duty: f64, ramp: f64) -> f64 {
    if phase < ramp {
        phase / ramp
    } else if phase < duty - ramp {
        1.0
    } else if phase < duty {
        (duty - phase) / ramp
    } else {
        0.0
    }
}

/// Apply a per-frame gain computed from the clock to both channels
fn apply_envelope<F>(buffer: &mut StereoBuffer, envelope: F)
where
    F: Fn(usize) -> f64,
{
    let (left, right) = buffer.stereo_mut();
    for (i, (l, r)) in left.iter_mut().zip(right.iter_mut()).enumerate() {
        let g = envelope(i) as f32;
        *l *= g;
        *r *= g;
    }
}

// ============================================================================
// Periodic modulators
// ============================================================================

/// Multiplies by a sine carrier
#[derive(Debug, Clone)]
pub struct RingModulator {
    carrier_hz: f64,
}

impl RingModulator {
    pub fn new(carrier_hz: f64) -> Self {
        Self { carrier_hz }
    }
}

impl Effect for RingModulator {
    impl_effect_common!(Some(EffectKind::RingMod), "Ring Modulation");

    fn process(&mut self, buffer: &mut StereoBuffer, clock: &RenderClock) {
        let f = self.carrier_hz;
        apply_envelope(buffer, |i| (TAU * clock.cycles(f, i)).sin());
    }

    fn prepare(&mut self, _sample_rate: u32) {}

    fn reset(&mut self) {}
}

/// Unipolar sine amplitude modulation (0..1)
#[derive(Debug, Clone)]
pub struct AmplitudeModulator {
    rate_hz: f64,
}

impl AmplitudeModulator {
    pub fn new(rate_hz: f64) -> Self {
        Self { rate_hz }
    }
}

impl Effect for AmplitudeModulator {
    impl_effect_common!(Some(EffectKind::AmplitudeMod), "Amplitude Modulation");

    fn process(&mut self, buffer: &mut StereoBuffer, clock: &RenderClock) {
        let f = self.rate_hz;
        apply_envelope(buffer, |i| 0.5 + 0.5 * (TAU * clock.cycles(f, i)).sin());
    }

    fn prepare(&mut self, _sample_rate: u32) {}

    fn reset(&mut self) {}
}

/// On/off pulses with soft edges
#[derive(Debug, Clone)]
pub struct IsochronicPulse {
    rate_hz: f64,
}

impl IsochronicPulse {
    pub fn new(rate_hz: f64) -> Self {
        Self { rate_hz }
    }
}

impl Effect for IsochronicPulse {
    impl_effect_common!(Some(EffectKind::Isochronic), "Isochronic Pulses");

    fn process(&mut self, buffer: &mut StereoBuffer, clock: &RenderClock) {
        let f = self.rate_hz;
        apply_envelope(buffer, |i| {
            gate(clock.cycles(f, i), ISOCHRONIC_DUTY, GATE_RAMP)
        });
    }

    fn prepare(&mut self, _sample_rate: u32) {}

    fn reset(&mut self) {}
}

/// Gentle gain wobble, unity at cycle start
#[derive(Debug, Clone)]
pub struct Tremolo {
    rate_hz: f64,
}

impl Tremolo {
    pub fn new(rate_hz: f64) -> Self {
        Self { rate_hz }
    }
}

impl Effect for Tremolo {
    impl_effect_common!(Some(EffectKind::Tremolo), "Tremolo");

    fn process(&mut self, buffer: &mut StereoBuffer, clock: &RenderClock) {
        let f = self.rate_hz;
        apply_envelope(buffer, |i| {
            1.0 - TREMOLO_DEPTH * (0.5 - 0.5 * (TAU * clock.cycles(f, i)).cos())
        });
    }

    fn prepare(&mut self, _sample_rate: u32) {}

    fn reset(&mut self) {}
}

/// Rhythmic hard-ish gate
#[derive(Debug, Clone)]
pub struct Stutter {
    rate_hz: f64,
}

impl Stutter {
    pub fn new(rate_hz: f64) -> Self {
        Self { rate_hz }
    }
}

impl Effect for Stutter {
    impl_effect_common!(Some(EffectKind::Stutter), "Stutter");

    fn process(&mut self, buffer: &mut StereoBuffer, clock: &RenderClock) {
        let f = self.rate_hz;
        apply_envelope(buffer, |i| gate(clock.cycles(f, i), STUTTER_DUTY, GATE_RAMP));
    }

    fn prepare(&mut self, _sample_rate: u32) {}

    fn reset(&mut self) {}
}

// ============================================================================
// Glitch
// ============================================================================

/// Random block events: drop-outs, repeats and bit-crush
pub struct Glitch {
    intensity: f64,
    rng: StdRng,
    block_frames: usize,
    previous: Vec<Vec<f32>>,
}

impl Glitch {
    pub fn new(intensity: f64, rng: StdRng) -> Self {
        Self {
            intensity,
            rng,
            block_frames: 1,
            previous: vec![Vec::new(), Vec::new()],
        }
    }
}

impl Effect for Glitch {
    impl_effect_common!(Some(EffectKind::Glitch), "Glitch");

    fn process(&mut self, buffer: &mut StereoBuffer, _clock: &RenderClock) {
        let probability = self.intensity * 0.5;
        let frames = buffer.num_frames();
        let mut start = 0;

        while start < frames {
            let end = (start + self.block_frames).min(frames);
            let roll: f64 = self.rng.gen();
            let event = self.rng.gen_range(0..3u8);

            for (ch, data) in buffer.samples.iter_mut().enumerate() {
                let block = &mut data[start..end];
                let original = block.to_vec();
                if roll < probability {
                    match event {
                        0 => block.fill(0.0),
                        1 if self.previous[ch].len() >= block.len() => {
                            block.copy_from_slice(&self.previous[ch][..block.len()]);
                        }
                        _ => {
                            for s in block.iter_mut() {
                                *s = (*s * GLITCH_CRUSH_LEVELS).round() / GLITCH_CRUSH_LEVELS;
                            }
                        }
                    }
                }
                self.previous[ch] = original;
            }

            start = end;
        }
    }

    fn prepare(&mut self, sample_rate: u32) {
        self.block_frames = ((GLITCH_BLOCK_SECS * sample_rate as f64) as usize).max(1);
    }

    fn reset(&mut self) {
        for prev in &mut self.previous {
            prev.clear();
        }
    }
}

// ============================================================================
// Mix gain
// ============================================================================

/// Fixed headroom applied to the summed voices
#[derive(Debug, Clone)]
pub struct MixGain {
    gain: f32,
}

impl MixGain {
    pub fn new(gain: f32) -> Self {
        Self { gain }
    }
}

impl Effect for MixGain {
    impl_effect_common!(None, "Mix Gain");

    fn process(&mut self, buffer: &mut StereoBuffer, _clock: &RenderClock) {
        buffer.apply_gain(self.gain);
    }

    fn prepare(&mut self, _sample_rate: u32) {}

    fn reset(&mut self) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use rand::SeedableRng;

    fn ones(frames: usize, sample_rate: u32) -> StereoBuffer {
        StereoBuffer::from_channels(vec![1.0; frames], vec![1.0; frames], sample_rate).unwrap()
    }

    #[test]
    fn test_gate_shape() {
        assert_eq!(gate(0.0, 0.5, 0.02), 0.0);
        assert_eq!(gate(0.25, 0.5, 0.02), 1.0);
        assert_eq!(gate(0.75, 0.5, 0.02), 0.0);
        assert_abs_diff_eq!(gate(0.01, 0.5, 0.02), 0.5, epsilon = 1e-12);
    }

    #[test]
    fn test_ring_mod_follows_carrier() {
        let mut buffer = ones(100, 1000);
        RingModulator::new(10.0).process(&mut buffer, &RenderClock::new(0, 1000));
        assert_abs_diff_eq!(buffer.left()[0], 0.0, epsilon = 1e-6);
        assert_abs_diff_eq!(buffer.left()[25], 1.0, epsilon = 1e-6);
        assert_abs_diff_eq!(buffer.left()[75], -1.0, epsilon = 1e-6);
    }

    #[test]
    fn test_tremolo_range() {
        let mut buffer = ones(1000, 1000);
        Tremolo::new(5.0).process(&mut buffer, &RenderClock::new(0, 1000));
        assert_abs_diff_eq!(buffer.left()[0], 1.0, epsilon = 1e-6);
        // half a cycle at 5 Hz is 100 frames
        assert_abs_diff_eq!(buffer.left()[100], 0.5, epsilon = 1e-6);
        assert!(buffer.left().iter().all(|&s| (0.5 - 1e-6..=1.0 + 1e-6).contains(&s)));
    }

    #[test]
    fn test_isochronic_silences_second_half() {
        let mut buffer = ones(1000, 1000);
        IsochronicPulse::new(1.0).process(&mut buffer, &RenderClock::new(0, 1000));
        assert_eq!(buffer.left()[250], 1.0);
        assert_eq!(buffer.left()[750], 0.0);
    }

    #[test]
    fn test_glitch_is_deterministic_for_seed() {
        let render = |seed: u64| {
            let mut glitch = Glitch::new(1.0, StdRng::seed_from_u64(seed));
            glitch.prepare(1000);
            let mut buffer = StereoBuffer::from_channels(
                (0..2000).map(|i| (i as f32 * 0.01).sin()).collect(),
                (0..2000).map(|i| (i as f32 * 0.02).sin()).collect(),
                1000,
            )
            .unwrap();
            glitch.process(&mut buffer, &RenderClock::new(0, 1000));
            buffer
        };
        assert_eq!(render(7), render(7));
        assert_ne!(render(7), render(8));
    }

    #[test]
    fn test_mix_gain_halves() {
        let mut buffer = ones(4, 1000);
        MixGain::new(0.5).process(&mut buffer, &RenderClock::new(0, 1000));
        assert_eq!(buffer.left(), &[0.5; 4]);
    }
}
