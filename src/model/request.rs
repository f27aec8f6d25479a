//! Render request: everything one export consumes

use serde::{Deserialize, Serialize};

use crate::error::{Result, ToneError};
use crate::model::channel::{validate_channels, FrequencyChannel};
use crate::model::effect::EffectSet;

/// Shortest exportable duration in seconds
pub const MIN_DURATION_SECS: f64 = 30.0;

/// Longest exportable duration in seconds (12 hours)
pub const MAX_DURATION_SECS: f64 = 12.0 * 60.0 * 60.0;

/// Default output sample rate
pub const DEFAULT_SAMPLE_RATE: u32 = 48000;

/// Lowest accepted sample rate
pub const MIN_SAMPLE_RATE: u32 = 1000;

/// Highest accepted sample rate
pub const MAX_SAMPLE_RATE: u32 = 192000;

fn default_sample_rate() -> u32 {
    DEFAULT_SAMPLE_RATE
}

/// One export's input, created when the export begins
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderRequest {
    pub duration_secs: f64,
    #[serde(alias = "frequencies")]
    pub channels: Vec<FrequencyChannel>,
    #[serde(default)]
    pub effects: EffectSet,
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,
}

impl RenderRequest {
    pub fn new(duration_secs: f64, channels: Vec<FrequencyChannel>, effects: EffectSet) -> Self {
        Self {
            duration_secs,
            channels,
            effects,
            sample_rate: DEFAULT_SAMPLE_RATE,
        }
    }

    pub fn with_sample_rate(mut self, sample_rate: u32) -> Self {
        self.sample_rate = sample_rate;
        self
    }

    /// Total frames the export produces: `round(duration * sample_rate)`
    pub fn total_frames(&self) -> u64 {
        frames_for(self.duration_secs, self.sample_rate)
    }

    /// Reject the request before any rendering begins
    pub fn validate(&self) -> Result<()> {
        if !self.duration_secs.is_finite()
            || self.duration_secs < MIN_DURATION_SECS
            || self.duration_secs > MAX_DURATION_SECS
        {
            return Err(ToneError::DurationOutOfRange {
                duration_secs: self.duration_secs,
                min_secs: MIN_DURATION_SECS,
                max_secs: MAX_DURATION_SECS,
            });
        }
        validate_sample_rate(self.sample_rate)?;
        validate_channels(&self.channels)?;
        self.effects.validate()
    }
}

/// Check a sample rate against the supported bounds
pub fn validate_sample_rate(sample_rate: u32) -> Result<()> {
    if !(MIN_SAMPLE_RATE..=MAX_SAMPLE_RATE).contains(&sample_rate) {
        return Err(ToneError::SampleRateOutOfRange { sample_rate });
    }
    Ok(())
}

/// Frames covering `secs` at `sample_rate`, rounded to nearest
pub fn frames_for(secs: f64, sample_rate: u32) -> u64 {
    (secs * sample_rate as f64).round().max(0.0) as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::effect::{AudioEffect, EffectKind};
    use test_case::test_case;

    fn request(duration: f64) -> RenderRequest {
        RenderRequest::new(
            duration,
            vec![FrequencyChannel::default_with_id(1)],
            EffectSet::new(),
        )
    }

    #[test_case(30.0 ; "minimum")]
    #[test_case(5000.0 ; "multi slice")]
    #[test_case(43200.0 ; "twelve hours")]
    fn test_valid_durations(duration: f64) {
        assert!(request(duration).validate().is_ok());
    }

    #[test_case(29.9 ; "too short")]
    #[test_case(43200.5 ; "too long")]
    #[test_case(f64::NAN ; "not a number")]
    fn test_invalid_durations(duration: f64) {
        assert!(matches!(
            request(duration).validate(),
            Err(ToneError::DurationOutOfRange { .. })
        ));
    }

    #[test]
    fn test_total_frames() {
        assert_eq!(request(30.0).total_frames(), 1_440_000);
        assert_eq!(request(30.5).with_sample_rate(44100).total_frames(), 1_345_050);
    }

    #[test]
    fn test_sample_rate_bounds() {
        assert!(request(30.0).with_sample_rate(500).validate().is_err());
        assert!(request(30.0).with_sample_rate(8000).validate().is_ok());
    }

    #[test]
    fn test_effect_out_of_range_rejected() {
        let mut req = request(60.0);
        let mut noise = AudioEffect::enabled(EffectKind::Noise, 0.5);
        noise.value = 3.0;
        req.effects.insert(noise);
        assert!(matches!(
            req.validate(),
            Err(ToneError::EffectOutOfRange { .. })
        ));
    }

    #[test]
    fn test_deserialize_with_frequencies_alias() {
        let json = r#"{
            "duration_secs": 30,
            "frequencies": [{"id": 1, "frequency": 432, "waveform": "sine", "enabled": true}],
            "effects": {}
        }"#;
        let req: RenderRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.sample_rate, DEFAULT_SAMPLE_RATE);
        assert_eq!(req.channels.len(), 1);
        assert!(req.validate().is_ok());
    }
}
