//! Oscillator voices
//!
//! One voice per enabled channel. Phase is read from the render clock, never
//! accumulated, so a voice's output at a timeline frame does not depend on
//! where the window around it began.

use crate::engine::{RenderClock, StereoBuffer};
use crate::model::Waveform;

/// A single oscillator, optionally detuned in the right ear
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Voice {
    pub frequency: f64,
    pub right_frequency: f64,
    pub waveform: Waveform,
}

impl Voice {
    pub fn new(frequency: f64, waveform: Waveform) -> Self {
        Self {
            frequency,
            right_frequency: frequency,
            waveform,
        }
    }

    fn is_detuned(&self) -> bool {
        self.right_frequency != self.frequency
    }
}

/// Summing bank of voices; the source of every graph
#[derive(Debug, Clone, Default)]
pub struct OscillatorBank {
    voices: Vec<Voice>,
}

impl OscillatorBank {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_voice(&mut self, frequency: f64, waveform: Waveform) {
        self.voices.push(Voice::new(frequency, waveform));
    }

    /// Shift every voice's right-ear frequency up by `beat_hz` (binaural beat)
    pub fn detune_right(&mut self, beat_hz: f64) {
        for voice in &mut self.voices {
            voice.right_frequency = voice.frequency + beat_hz;
        }
    }

    pub fn voices(&self) -> &[Voice] {
        &self.voices
    }

    pub fn len(&self) -> usize {
        self.voices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.voices.is_empty()
    }

    /// Overwrite `buffer` with the unscaled sum of all voices
    pub fn render(&self, buffer: &mut StereoBuffer, clock: &RenderClock) {
        let (left, right) = buffer.stereo_mut();
        for (i, (l, r)) in left.iter_mut().zip(right.iter_mut()).enumerate() {
            let mut sum_l = 0.0;
            let mut sum_r = 0.0;
            for voice in &self.voices {
                let sample = voice.waveform.sample(clock.cycles(voice.frequency, i));
                sum_l += sample;
                sum_r += if voice.is_detuned() {
                    voice
                        .waveform
                        .sample(clock.cycles(voice.right_frequency, i))
                } else {
                    sample
                };
            }
            *l = sum_l as f32;
            *r = sum_r as f32;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_single_sine_voice() {
        let mut bank = OscillatorBank::new();
        bank.add_voice(1000.0, Waveform::Sine);
        let mut buffer = StereoBuffer::new(48, 48000);
        bank.render(&mut buffer, &RenderClock::new(0, 48000));

        assert_abs_diff_eq!(buffer.left()[0], 0.0, epsilon = 1e-6);
        // quarter period of 1 kHz at 48 kHz
        assert_abs_diff_eq!(buffer.left()[12], 1.0, epsilon = 1e-6);
        assert_eq!(buffer.left(), buffer.right());
    }

    #[test]
    fn test_voices_sum() {
        let mut bank = OscillatorBank::new();
        bank.add_voice(1000.0, Waveform::Sine);
        bank.add_voice(1000.0, Waveform::Sine);
        let mut buffer = StereoBuffer::new(48, 48000);
        bank.render(&mut buffer, &RenderClock::new(0, 48000));
        assert_abs_diff_eq!(buffer.left()[12], 2.0, epsilon = 1e-6);
    }

    #[test]
    fn test_binaural_detune_differs_per_ear() {
        let mut bank = OscillatorBank::new();
        bank.add_voice(200.0, Waveform::Sine);
        bank.detune_right(10.0);
        assert_eq!(bank.voices()[0].right_frequency, 210.0);

        let mut buffer = StereoBuffer::new(4800, 48000);
        bank.render(&mut buffer, &RenderClock::new(0, 48000));
        assert_ne!(buffer.left(), buffer.right());
    }

    #[test]
    fn test_windowed_render_matches_whole() {
        let mut bank = OscillatorBank::new();
        bank.add_voice(437.3, Waveform::Triangle);

        let mut whole = StereoBuffer::new(1000, 8000);
        bank.render(&mut whole, &RenderClock::new(0, 8000));

        let mut second_half = StereoBuffer::new(500, 8000);
        bank.render(&mut second_half, &RenderClock::new(500, 8000));

        assert_eq!(&whole.left()[500..], second_half.left());
    }
}
