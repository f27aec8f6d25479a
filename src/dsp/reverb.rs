//! Reverb stage
//!
//! Implements the Freeverb algorithm:
//! - 8 parallel comb filters for early reflections
//! - 4 series allpass filters for diffusion
//! - Full stereo width, right channel offset by a fixed spread
//!
//! Only the wet level is exposed; room size and damping are fixed so the
//! tail sounds the same for every export.

use super::Effect;
use crate::engine::{RenderClock, StereoBuffer};
use crate::impl_effect_common;
use crate::model::EffectKind;

// ============================================================================
// Freeverb Constants
// ============================================================================

/// Reference sample rate for Freeverb delays
const REFERENCE_SAMPLE_RATE: f64 = 44100.0;

/// Comb filter delays at 44100 Hz (8 filters)
const COMB_DELAYS: [usize; 8] = [1116, 1188, 1277, 1356, 1422, 1491, 1557, 1617];

/// Allpass filter delays at 44100 Hz (4 filters)
const ALLPASS_DELAYS: [usize; 4] = [556, 441, 341, 225];

/// Stereo spread offset in samples (for right channel)
const STEREO_SPREAD: usize = 23;

/// Fixed gain for allpass filters
const ALLPASS_GAIN: f32 = 0.5;

/// Scale factor for room size parameter to feedback
const ROOM_SCALE: f32 = 0.28;

/// Offset for room size parameter to feedback
const ROOM_OFFSET: f32 = 0.7;

/// Scale factor for damping parameter
const DAMP_SCALE: f32 = 0.4;

/// Input attenuation ahead of the comb bank
const FIXED_GAIN: f32 = 0.015;

/// Wet level scaling
const WET_SCALE: f32 = 3.0;

const ROOM_SIZE: f32 = 0.7;
const DAMPING: f32 = 0.5;
const DRY_LEVEL: f32 = 1.0;

// ============================================================================
// Filter Components
// ============================================================================

/// Low-pass feedback comb filter
#[derive(Debug, Clone)]
struct CombFilter {
    buffer: Vec<f32>,
    write_pos: usize,
    /// Buffer size mask for wrapping
    mask: usize,
    delay: usize,
    filter_state: f32,
    feedback: f32,
    damp1: f32,
    damp2: f32,
}

impl CombFilter {
    fn new(delay: usize, feedback: f32, damping: f32) -> Self {
        let size = (delay + 1).next_power_of_two();
        Self {
            buffer: vec![0.0; size],
            write_pos: 0,
            mask: size - 1,
            delay,
            filter_state: 0.0,
            feedback,
            damp1: damping,
            damp2: 1.0 - damping,
        }
    }

    #[inline]
    fn process(&mut self, input: f32) -> f32 {
        let read_pos = (self.write_pos + self.mask + 1 - self.delay) & self.mask;
        let output = self.buffer[read_pos];

        // one-pole low-pass in the feedback path
        self.filter_state = output * self.damp2 + self.filter_state * self.damp1;
        self.buffer[self.write_pos] = input + self.filter_state * self.feedback;
        self.write_pos = (self.write_pos + 1) & self.mask;

        output
    }

    fn clear(&mut self) {
        self.buffer.fill(0.0);
        self.filter_state = 0.0;
        self.write_pos = 0;
    }
}

/// Schroeder allpass for diffusion
#[derive(Debug, Clone)]
struct AllpassFilter {
    buffer: Vec<f32>,
    write_pos: usize,
    mask: usize,
    delay: usize,
}

impl AllpassFilter {
    fn new(delay: usize) -> Self {
        let size = (delay + 1).next_power_of_two();
        Self {
            buffer: vec![0.0; size],
            write_pos: 0,
            mask: size - 1,
            delay,
        }
    }

    #[inline]
    fn process(&mut self, input: f32) -> f32 {
        let read_pos = (self.write_pos + self.mask + 1 - self.delay) & self.mask;
        let delayed = self.buffer[read_pos];
        let output = delayed - ALLPASS_GAIN * input;
        self.buffer[self.write_pos] = input + ALLPASS_GAIN * output;
        self.write_pos = (self.write_pos + 1) & self.mask;
        output
    }

    fn clear(&mut self) {
        self.buffer.fill(0.0);
        self.write_pos = 0;
    }
}

/// Comb bank and allpass chain for one ear
#[derive(Debug, Clone, Default)]
struct Tank {
    combs: Vec<CombFilter>,
    allpasses: Vec<AllpassFilter>,
}

impl Tank {
    fn new(sample_rate: u32, spread: usize) -> Self {
        let scale = sample_rate as f64 / REFERENCE_SAMPLE_RATE;
        let scaled = |d: usize| (((d + spread) as f64 * scale) as usize).max(1);

        let feedback = ROOM_SIZE * ROOM_SCALE + ROOM_OFFSET;
        let damping = DAMPING * DAMP_SCALE;

        Self {
            combs: COMB_DELAYS
                .iter()
                .map(|&d| CombFilter::new(scaled(d), feedback, damping))
                .collect(),
            allpasses: ALLPASS_DELAYS
                .iter()
                .map(|&d| AllpassFilter::new(scaled(d)))
                .collect(),
        }
    }

    #[inline]
    fn process(&mut self, input: f32) -> f32 {
        let mut output: f32 = self.combs.iter_mut().map(|c| c.process(input)).sum();
        for allpass in &mut self.allpasses {
            output = allpass.process(output);
        }
        output
    }

    fn clear(&mut self) {
        self.combs.iter_mut().for_each(CombFilter::clear);
        self.allpasses.iter_mut().for_each(AllpassFilter::clear);
    }
}

// ============================================================================
// Reverb Stage
// ============================================================================

/// Freeverb room with a configurable wet level (0-1)
#[derive(Debug, Clone)]
pub struct Reverb {
    wet_level: f32,
    left: Tank,
    right: Tank,
}

impl Reverb {
    pub fn new(wet_level: f64) -> Self {
        Self {
            wet_level: (wet_level as f32).clamp(0.0, 1.0),
            left: Tank::default(),
            right: Tank::default(),
        }
    }

    pub fn wet_level(&self) -> f32 {
        self.wet_level
    }
}

impl Effect for Reverb {
    impl_effect_common!(Some(EffectKind::Reverb), "Reverb");

    fn process(&mut self, buffer: &mut StereoBuffer, _clock: &RenderClock) {
        if self.left.combs.is_empty() {
            return;
        }
        // full width: no cross-feed between tanks
        let wet = self.wet_level * WET_SCALE;
        let (left, right) = buffer.stereo_mut();

        for (l, r) in left.iter_mut().zip(right.iter_mut()) {
            let input = (*l + *r) * FIXED_GAIN;
            let out_l = self.left.process(input);
            let out_r = self.right.process(input);
            *l = *l * DRY_LEVEL + out_l * wet;
            *r = *r * DRY_LEVEL + out_r * wet;
        }
    }

    fn prepare(&mut self, sample_rate: u32) {
        self.left = Tank::new(sample_rate, 0);
        self.right = Tank::new(sample_rate, STEREO_SPREAD);
    }

    fn reset(&mut self) {
        self.left.clear();
        self.right.clear();
    }
}
