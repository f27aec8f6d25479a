//! Background noise stage

use rand::rngs::StdRng;
use rand::Rng;

use super::Effect;
use crate::engine::{RenderClock, StereoBuffer};
use crate::impl_effect_common;
use crate::model::EffectKind;

/// Peak noise amplitude at level 1.0
const NOISE_SCALE: f32 = 0.25;

/// Adds independent white noise to each channel
pub struct NoiseMix {
    level: f32,
    rng: StdRng,
}

impl NoiseMix {
    /// `level` 0-1; the random source is owned so each window can be seeded
    pub fn new(level: f64, rng: StdRng) -> Self {
        Self {
            level: (level as f32).clamp(0.0, 1.0),
            rng,
        }
    }
}

impl Effect for NoiseMix {
    impl_effect_common!(Some(EffectKind::Noise), "Noise");

    fn process(&mut self, buffer: &mut StereoBuffer, _clock: &RenderClock) {
        let amplitude = self.level * NOISE_SCALE;
        if amplitude == 0.0 {
            return;
        }
        for channel in &mut buffer.samples {
            for sample in channel.iter_mut() {
                *sample += self.rng.gen_range(-1.0f32..1.0) * amplitude;
            }
        }
    }

    fn prepare(&mut self, _sample_rate: u32) {}

    fn reset(&mut self) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn test_noise_bounded_by_level() {
        let mut noise = NoiseMix::new(0.4, StdRng::seed_from_u64(1));
        let mut buffer = StereoBuffer::new(10_000, 1000);
        noise.process(&mut buffer, &RenderClock::new(0, 1000));
        assert!(buffer.peak() <= 0.1);
        assert!(buffer.peak() > 0.05);
        assert_ne!(buffer.left(), buffer.right());
    }

    #[test]
    fn test_noise_seeded_is_reproducible() {
        let render = || {
            let mut noise = NoiseMix::new(1.0, StdRng::seed_from_u64(42));
            let mut buffer = StereoBuffer::new(256, 1000);
            noise.process(&mut buffer, &RenderClock::new(0, 1000));
            buffer
        };
        assert_eq!(render(), render());
    }

    #[test]
    fn test_zero_level_is_silent() {
        let mut noise = NoiseMix::new(0.0, StdRng::seed_from_u64(3));
        let mut buffer = StereoBuffer::new(64, 1000);
        noise.process(&mut buffer, &RenderClock::new(0, 1000));
        assert_eq!(buffer.peak(), 0.0);
    }
}
