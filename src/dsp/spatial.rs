//! Spatial stages: panning, chorus and phaser

use std::f64::consts::{FRAC_PI_2, PI, TAU};

use super::Effect;
use crate::engine::{RenderClock, StereoBuffer};
use crate::impl_effect_common;
use crate::model::EffectKind;

/// Fixed chorus base delay in milliseconds
const CHORUS_BASE_DELAY_MS: f64 = 15.0;

/// Largest chorus modulation depth in milliseconds
const CHORUS_MAX_DEPTH_MS: f64 = 20.0;

/// Chorus LFO rate in Hz
const CHORUS_LFO_HZ: f64 = 0.8;

/// Chorus wet/dry balance
const CHORUS_MIX: f32 = 0.5;

/// Number of first-order allpass stages in the phaser
const PHASER_STAGES: usize = 4;

/// Phaser sweep bounds in Hz
const PHASER_MIN_HZ: f64 = 300.0;
const PHASER_MAX_HZ: f64 = 3000.0;

/// Phaser feedback amount
const PHASER_FEEDBACK: f32 = 0.4;

/// Equal-power pan of a stereo frame, `position` in -1..=1.
///
/// Centre is unity; hard left folds the right channel into the left.
#[inline]
pub fn pan_frame(left: f32, right: f32, position: f64) -> (f32, f32) {
    let position = position.clamp(-1.0, 1.0);
    let x = if position <= 0.0 { position + 1.0 } else { position };
    let gain_l = (x * FRAC_PI_2).cos() as f32;
    let gain_r = (x * FRAC_PI_2).sin() as f32;
    if position <= 0.0 {
        (left + right * gain_l, right * gain_r)
    } else {
        (left * gain_l, right + left * gain_r)
    }
}

// ============================================================================
// Panners
// ============================================================================

/// Static stereo position
#[derive(Debug, Clone)]
pub struct StereoPanner {
    position: f64,
}

impl StereoPanner {
    pub fn new(position: f64) -> Self {
        Self { position }
    }
}

impl Effect for StereoPanner {
    impl_effect_common!(Some(EffectKind::StereoPan), "Stereo Pan");

    fn process(&mut self, buffer: &mut StereoBuffer, _clock: &RenderClock) {
        let (left, right) = buffer.stereo_mut();
        for (l, r) in left.iter_mut().zip(right.iter_mut()) {
            (*l, *r) = pan_frame(*l, *r, self.position);
        }
    }

    fn prepare(&mut self, _sample_rate: u32) {}

    fn reset(&mut self) {}
}

/// Position circling left-right at a fixed rate
#[derive(Debug, Clone)]
pub struct AutoPanner {
    rate_hz: f64,
}

impl AutoPanner {
    pub fn new(rate_hz: f64) -> Self {
        Self { rate_hz }
    }
}

impl Effect for AutoPanner {
    impl_effect_common!(Some(EffectKind::Pan360), "360 Pan");

    fn process(&mut self, buffer: &mut StereoBuffer, clock: &RenderClock) {
        let (left, right) = buffer.stereo_mut();
        for (i, (l, r)) in left.iter_mut().zip(right.iter_mut()).enumerate() {
            let position = (TAU * clock.cycles(self.rate_hz, i)).sin();
            (*l, *r) = pan_frame(*l, *r, position);
        }
    }

    fn prepare(&mut self, _sample_rate: u32) {}

    fn reset(&mut self) {}
}

// ============================================================================
// Chorus
// ============================================================================

/// Modulated short delay, LFOs a quarter cycle apart per ear
#[derive(Debug, Clone)]
pub struct Chorus {
    depth_ms: f64,
    sample_rate: f64,
    lines: [Vec<f32>; 2],
    write_pos: usize,
}

impl Chorus {
    pub fn new(depth_ms: f64) -> Self {
        Self {
            depth_ms: depth_ms.clamp(0.0, CHORUS_MAX_DEPTH_MS),
            sample_rate: 48000.0,
            lines: [Vec::new(), Vec::new()],
            write_pos: 0,
        }
    }

    /// Linear-interpolated read `delay` samples behind the write head
    #[inline]
    fn read(line: &[f32], write_pos: usize, delay: f64) -> f32 {
        let size = line.len();
        let whole = delay.floor() as usize;
        let frac = (delay - whole as f64) as f32;
        let a = line[(write_pos + size - whole) % size];
        let b = line[(write_pos + size - whole - 1) % size];
        a * (1.0 - frac) + b * frac
    }
}

impl Effect for Chorus {
    impl_effect_common!(Some(EffectKind::Chorus), "Chorus");

    fn process(&mut self, buffer: &mut StereoBuffer, clock: &RenderClock) {
        let size = self.lines[0].len();
        if size == 0 {
            return;
        }
        let ms_to_samples = self.sample_rate / 1000.0;

        for i in 0..buffer.num_frames() {
            let lfo = clock.cycles(CHORUS_LFO_HZ, i);
            for ch in 0..2 {
                let phase = lfo + ch as f64 * 0.25;
                let delay_ms =
                    CHORUS_BASE_DELAY_MS + self.depth_ms * (0.5 + 0.5 * (TAU * phase).sin());
                let dry = buffer.samples[ch][i];
                self.lines[ch][self.write_pos] = dry;
                let wet = Self::read(&self.lines[ch], self.write_pos, delay_ms * ms_to_samples);
                buffer.samples[ch][i] = dry * (1.0 - CHORUS_MIX) + wet * CHORUS_MIX;
            }
            self.write_pos = (self.write_pos + 1) % size;
        }
    }

    fn prepare(&mut self, sample_rate: u32) {
        self.sample_rate = sample_rate as f64;
        let max_ms = CHORUS_BASE_DELAY_MS + CHORUS_MAX_DEPTH_MS + 2.0;
        let size = (max_ms * self.sample_rate / 1000.0) as usize + 2;
        self.lines = [vec![0.0; size], vec![0.0; size]];
        self.write_pos = 0;
    }

    fn reset(&mut self) {
        for line in &mut self.lines {
            line.fill(0.0);
        }
        self.write_pos = 0;
    }
}

// ============================================================================
// Phaser
// ============================================================================

/// First-order allpass section
#[derive(Debug, Clone, Copy, Default)]
struct AllpassStage {
    x1: f32,
    y1: f32,
}

impl AllpassStage {
    #[inline]
    fn process(&mut self, input: f32, coeff: f32) -> f32 {
        let output = coeff * input + self.x1 - coeff * self.y1;
        self.x1 = input;
        self.y1 = output;
        output
    }
}

/// Four swept allpass stages with feedback, mixed with the dry signal
#[derive(Debug, Clone)]
pub struct Phaser {
    rate_hz: f64,
    sample_rate: f64,
    stages: [[AllpassStage; PHASER_STAGES]; 2],
    feedback: [f32; 2],
}

impl Phaser {
    pub fn new(rate_hz: f64) -> Self {
        Self {
            rate_hz,
            sample_rate: 48000.0,
            stages: [[AllpassStage::default(); PHASER_STAGES]; 2],
            feedback: [0.0; 2],
        }
    }

    fn coefficient(&self, cutoff_hz: f64) -> f32 {
        let cutoff = cutoff_hz.min(self.sample_rate * 0.45);
        let t = (PI * cutoff / self.sample_rate).tan();
        ((t - 1.0) / (t + 1.0)) as f32
    }
}

impl Effect for Phaser {
    impl_effect_common!(Some(EffectKind::Phaser), "Phaser");

    fn process(&mut self, buffer: &mut StereoBuffer, clock: &RenderClock) {
        let span = (PHASER_MAX_HZ / PHASER_MIN_HZ).log10();
        for i in 0..buffer.num_frames() {
            let sweep = 0.5 - 0.5 * (TAU * clock.cycles(self.rate_hz, i)).cos();
            let coeff = self.coefficient(PHASER_MIN_HZ * 10f64.powf(sweep * span));
            for ch in 0..2 {
                let dry = buffer.samples[ch][i];
                let mut wet = dry + self.feedback[ch] * PHASER_FEEDBACK;
                for stage in &mut self.stages[ch] {
                    wet = stage.process(wet, coeff);
                }
                self.feedback[ch] = wet;
                buffer.samples[ch][i] = 0.5 * (dry + wet);
            }
        }
    }

    fn prepare(&mut self, sample_rate: u32) {
        self.sample_rate = sample_rate as f64;
        self.reset();
    }

    fn reset(&mut self) {
        self.stages = [[AllpassStage::default(); PHASER_STAGES]; 2];
        self.feedback = [0.0; 2];
    }
}
