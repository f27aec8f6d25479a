//! Shepard tone
//!
//! Six octave-spaced partials glide upward under a raised-cosine spectral
//! envelope, so the tone seems to rise forever. Glide position comes from
//! the render clock; partial phases are accumulated per window.

use std::f64::consts::TAU;

use super::Effect;
use crate::engine::{RenderClock, StereoBuffer};
use crate::impl_effect_common;
use crate::model::EffectKind;

/// Partials (and octaves spanned)
const PARTIALS: usize = 6;

/// Lowest partial sits this many octaves below the base frequency
const OCTAVES_BELOW_BASE: i32 = 3;

/// Per-partial gain so the sum stays near unity
const PARTIAL_GAIN: f64 = 1.0 / PARTIALS as f64;

/// Partials above this fraction of the sample rate are skipped
const NYQUIST_GUARD: f64 = 0.45;

/// Endless glissando added on top of the voices
#[derive(Debug, Clone)]
pub struct ShepardTone {
    /// Glide speed in octaves per second
    speed: f64,
    min_frequency: f64,
    sample_rate: f64,
    phases: [f64; PARTIALS],
}

impl ShepardTone {
    /// # Arguments
    /// * `speed` - Glide speed in octaves per second
    /// * `base_frequency` - Centre of the spectral envelope, usually the lowest voice
    pub fn new(speed: f64, base_frequency: f64) -> Self {
        Self {
            speed,
            min_frequency: base_frequency / 2f64.powi(OCTAVES_BELOW_BASE),
            sample_rate: 48000.0,
            phases: [0.0; PARTIALS],
        }
    }

    pub fn min_frequency(&self) -> f64 {
        self.min_frequency
    }

    /// Position in `[0, 1)` of partial `k` across the spanned octaves at time `t`
    #[inline]
    fn position(&self, k: usize, t: f64) -> f64 {
        let n = PARTIALS as f64;
        (k as f64 / n + self.speed * t / n).rem_euclid(1.0)
    }
}

impl Effect for ShepardTone {
    impl_effect_common!(Some(EffectKind::ShepardTone), "Shepard Tone");

    fn process(&mut self, buffer: &mut StereoBuffer, clock: &RenderClock) {
        let nyquist = self.sample_rate * NYQUIST_GUARD;
        let n = PARTIALS as f64;

        for i in 0..buffer.num_frames() {
            let t = clock.seconds(i);
            let mut sum = 0.0;
            for k in 0..PARTIALS {
                let x = self.position(k, t);
                let frequency = self.min_frequency * 2f64.powf(n * x);
                if frequency > nyquist {
                    continue;
                }
                let amplitude = 0.5 - 0.5 * (TAU * x).cos();
                sum += amplitude * (TAU * self.phases[k]).sin();
                self.phases[k] = (self.phases[k] + frequency / self.sample_rate).fract();
            }
            let sample = (sum * PARTIAL_GAIN) as f32;
            buffer.samples[0][i] += sample;
            buffer.samples[1][i] += sample;
        }
    }

    fn prepare(&mut self, sample_rate: u32) {
        self.sample_rate = sample_rate as f64;
        self.reset();
    }

    fn reset(&mut self) {
        self.phases = [0.0; PARTIALS];
    }
}
