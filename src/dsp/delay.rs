//! Ping-pong delay
//!
//! Stereo delay whose feedback crosses between channels, with a one-pole
//! low-pass in the feedback path.

use std::f32::consts::PI;

use super::Effect;
use crate::engine::{RenderClock, StereoBuffer};
use crate::impl_effect_common;
use crate::model::EffectKind;

/// Feedback amount (kept below 1.0 so echoes always decay)
const FEEDBACK: f32 = 0.4;

/// Wet signal level
const WET_LEVEL: f32 = 0.35;

/// Dry signal level
const DRY_LEVEL: f32 = 1.0;

/// Low-pass cutoff on the feedback path in Hz
const FILTER_FREQ: f32 = 8000.0;

/// Stereo delay with cross-channel feedback
#[derive(Debug, Clone)]
pub struct PingPongDelay {
    /// Delay time in seconds (0.05-1.0)
    delay_secs: f32,
    /// Circular buffer for left channel
    buffer_l: Vec<f32>,
    /// Circular buffer for right channel
    buffer_r: Vec<f32>,
    /// Current write position in circular buffer
    write_pos: usize,
    sample_rate: f32,
    filter_state_l: f32,
    filter_state_r: f32,
}

impl PingPongDelay {
    /// Create a delay with the given time in seconds (clamped to 0.05-1.0)
    pub fn new(delay_secs: f64) -> Self {
        Self {
            delay_secs: (delay_secs as f32).clamp(0.05, 1.0),
            buffer_l: Vec::new(),
            buffer_r: Vec::new(),
            write_pos: 0,
            sample_rate: 48000.0,
            filter_state_l: 0.0,
            filter_state_r: 0.0,
        }
    }

    pub fn delay_secs(&self) -> f32 {
        self.delay_secs
    }

    /// Delay in samples
    fn delay_samples(&self) -> usize {
        ((self.delay_secs * self.sample_rate) as usize).max(1)
    }

    /// Buffer size: the delay plus 10ms of margin
    fn required_buffer_size(&self) -> usize {
        (((self.delay_secs + 0.01) * self.sample_rate) as usize).max(2)
    }

    /// One-pole lowpass coefficient: `1 - exp(-2*PI*fc/fs)`
    fn calc_filter_coeff(&self) -> f32 {
        let fc = FILTER_FREQ.min(self.sample_rate * 0.45);
        1.0 - (-2.0 * PI * fc / self.sample_rate).exp()
    }

    #[inline]
    fn apply_filter_inline(input: f32, state: &mut f32, coeff: f32) -> f32 {
        *state += coeff * (input - *state);
        *state
    }

    /// Read from circular buffer with wrapping
    #[inline]
    fn read_buffer(&self, buffer: &[f32], delay_samples: usize) -> f32 {
        let size = buffer.len();
        if size == 0 {
            return 0.0;
        }
        let read_pos = if self.write_pos >= delay_samples {
            self.write_pos - delay_samples
        } else {
            size - (delay_samples - self.write_pos)
        };
        buffer[read_pos % size]
    }
}

impl Effect for PingPongDelay {
    impl_effect_common!(Some(EffectKind::PingPongDelay), "Ping-Pong Delay");

    fn process(&mut self, buffer: &mut StereoBuffer, _clock: &RenderClock) {
        if self.buffer_l.is_empty() || buffer.is_empty() {
            return;
        }

        let delay_samples = self.delay_samples();
        let filter_coeff = self.calc_filter_coeff();
        let size = self.buffer_l.len();
        let (left, right) = buffer.stereo_mut();

        for (l, r) in left.iter_mut().zip(right.iter_mut()) {
            let input_l = *l;
            let input_r = *r;

            let delayed_l = self.read_buffer(&self.buffer_l, delay_samples);
            let delayed_r = self.read_buffer(&self.buffer_r, delay_samples);

            // Left feedback goes to right, right feedback goes to left
            let filtered_from_r = Self::apply_filter_inline(
                delayed_r * FEEDBACK,
                &mut self.filter_state_l,
                filter_coeff,
            );
            let filtered_from_l = Self::apply_filter_inline(
                delayed_l * FEEDBACK,
                &mut self.filter_state_r,
                filter_coeff,
            );

            // The mono sum feeds the left line; the right line is driven by feedback alone
            self.buffer_l[self.write_pos] = (input_l + input_r) * 0.5 + filtered_from_r;
            self.buffer_r[self.write_pos] = filtered_from_l;

            *l = input_l * DRY_LEVEL + delayed_l * WET_LEVEL;
            *r = input_r * DRY_LEVEL + delayed_r * WET_LEVEL;

            self.write_pos = (self.write_pos + 1) % size;
        }
    }

    fn prepare(&mut self, sample_rate: u32) {
        self.sample_rate = sample_rate as f32;
        let size = self.required_buffer_size();
        self.buffer_l = vec![0.0; size];
        self.buffer_r = vec![0.0; size];
        self.write_pos = 0;
    }

    fn reset(&mut self) {
        self.buffer_l.fill(0.0);
        self.buffer_r.fill(0.0);
        self.write_pos = 0;
        self.filter_state_l = 0.0;
        self.filter_state_r = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn impulse(frames: usize, sample_rate: u32) -> StereoBuffer {
        let mut left = vec![0.0; frames];
        left[0] = 1.0;
        StereoBuffer::from_channels(left, vec![0.0; frames], sample_rate).unwrap()
    }

    #[test]
    fn test_delay_time_clamp() {
        assert_eq!(PingPongDelay::new(0.0).delay_secs(), 0.05);
        assert_eq!(PingPongDelay::new(3.0).delay_secs(), 1.0);
    }

    #[test]
    fn test_delay_prepare_sizes_buffers() {
        let mut delay = PingPongDelay::new(0.1);
        delay.prepare(48000);
        let expected = ((0.11f32 * 48000.0) as usize).max(2);
        assert_eq!(delay.buffer_l.len(), expected);
        assert_eq!(delay.buffer_r.len(), expected);
    }

    #[test]
    fn test_echoes_alternate_sides() {
        let mut delay = PingPongDelay::new(0.1);
        delay.prepare(1000);
        let mut buffer = impulse(400, 1000);
        delay.process(&mut buffer, &RenderClock::new(0, 1000));

        // first echo in the left channel after 100 frames
        assert!(buffer.left()[100] > 0.1);
        assert!(buffer.right()[100].abs() < 1e-6);
        // second echo crosses to the right
        assert!(buffer.right()[200].abs() > 0.01);
        assert!(buffer.left()[200].abs() < 1e-6);
    }

    #[test]
    fn test_delay_reset() {
        let mut delay = PingPongDelay::new(0.1);
        delay.prepare(1000);
        delay.buffer_l.fill(0.5);
        delay.write_pos = 10;
        delay.filter_state_l = 0.3;
        delay.reset();
        assert!(delay.buffer_l.iter().all(|&x| x == 0.0));
        assert_eq!(delay.write_pos, 0);
        assert_eq!(delay.filter_state_l, 0.0);
    }

    #[test]
    fn test_unprepared_delay_is_passthrough() {
        let mut delay = PingPongDelay::new(0.1);
        let mut buffer = impulse(10, 1000);
        let original = buffer.clone();
        delay.process(&mut buffer, &RenderClock::new(0, 1000));
        assert_eq!(buffer, original);
    }
}
