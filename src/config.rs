//! Export configuration
//!
//! Tunables for windowing, packaging, fingerprinting and timeouts. Every
//! field has a default; a JSON file may override any subset of them.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, ToneError};
use crate::model::{frames_for, validate_sample_rate, DEFAULT_SAMPLE_RATE, MAX_DURATION_SECS};

/// Render window length in seconds
pub const DEFAULT_SLICE_WINDOW_SECS: f64 = 120.0;

/// Large slice (one output part) length in seconds
pub const DEFAULT_LARGE_SLICE_SECS: f64 = 2400.0;

/// Largest archive the exporter will hand back as one file
pub const DEFAULT_ARCHIVE_SIZE_LIMIT_BYTES: u64 = 4_000_000_000;

/// Exports longer than this prefer a remote renderer when one is attached
pub const DEFAULT_SERVER_THRESHOLD_SECS: f64 = 3600.0;

/// How oscillator and LFO phase behaves at window boundaries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhaseMode {
    /// Phase follows the timeline frame; stateless stages are seamless
    #[default]
    Continuous,
    /// Every window starts at phase zero
    ResetPerSlice,
}

/// Export settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// Sample rate used when a request does not carry one
    pub sample_rate: u32,
    /// Fine render window in seconds
    pub slice_window_secs: f64,
    /// Coarse output part length in seconds
    pub large_slice_secs: f64,
    pub phase_mode: PhaseMode,
    /// Seed for noise and glitch stages; entropy when absent
    pub noise_seed: Option<u64>,
    /// Cooperative pause between windows (0 yields without sleeping)
    pub slice_yield_ms: u64,
    /// Cooperative pause between large slices
    pub large_slice_yield_ms: u64,
    /// Archives above this size fall back to separate parts
    pub archive_size_limit_bytes: u64,
    /// Embed a provenance fingerprint into every part
    pub embed_fingerprint: bool,
    pub server_threshold_secs: f64,
    pub min_timeout_secs: f64,
    pub max_timeout_secs: f64,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            sample_rate: DEFAULT_SAMPLE_RATE,
            slice_window_secs: DEFAULT_SLICE_WINDOW_SECS,
            large_slice_secs: DEFAULT_LARGE_SLICE_SECS,
            phase_mode: PhaseMode::default(),
            noise_seed: None,
            slice_yield_ms: 10,
            large_slice_yield_ms: 100,
            archive_size_limit_bytes: DEFAULT_ARCHIVE_SIZE_LIMIT_BYTES,
            embed_fingerprint: false,
            server_threshold_secs: DEFAULT_SERVER_THRESHOLD_SECS,
            min_timeout_secs: 30.0,
            max_timeout_secs: 45_000.0,
        }
    }
}

impl ExportConfig {
    /// Load from a JSON file; missing fields take their defaults
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Settings suited to tests: no cooperative sleeps, fixed seed
    pub fn for_tests() -> Self {
        Self {
            slice_yield_ms: 0,
            large_slice_yield_ms: 0,
            noise_seed: Some(0),
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        validate_sample_rate(self.sample_rate)?;
        if !(self.slice_window_secs.is_finite() && self.slice_window_secs > 0.0) {
            return Err(ToneError::InvalidConfig {
                reason: format!("slice window must be positive, got {}", self.slice_window_secs),
            });
        }
        if !(self.large_slice_secs.is_finite() && self.large_slice_secs > 0.0) {
            return Err(ToneError::InvalidConfig {
                reason: format!("large slice must be positive, got {}", self.large_slice_secs),
            });
        }
        if self.archive_size_limit_bytes == 0 {
            return Err(ToneError::InvalidConfig {
                reason: "archive size limit must be non-zero".to_string(),
            });
        }
        if !(self.min_timeout_secs > 0.0 && self.max_timeout_secs >= self.min_timeout_secs) {
            return Err(ToneError::InvalidConfig {
                reason: format!(
                    "timeout bounds {}..{} are not increasing",
                    self.min_timeout_secs, self.max_timeout_secs
                ),
            });
        }
        Ok(())
    }

    /// Fine window length in frames at `sample_rate`
    pub fn window_frames(&self, sample_rate: u32) -> u64 {
        frames_for(self.slice_window_secs, sample_rate).max(1)
    }

    /// Large slice length in frames at `sample_rate`
    pub fn large_slice_frames(&self, sample_rate: u32) -> u64 {
        frames_for(self.large_slice_secs, sample_rate).max(1)
    }

    /// Overall export time limit, linear in duration between the bounds
    pub fn timeout_secs(&self, duration_secs: f64) -> f64 {
        let per_second = (self.max_timeout_secs - self.min_timeout_secs) / MAX_DURATION_SECS;
        (self.min_timeout_secs + duration_secs.max(0.0) * per_second)
            .clamp(self.min_timeout_secs, self.max_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = ExportConfig::default();
        assert_eq!(config.phase_mode, PhaseMode::Continuous);
        assert_eq!(config.window_frames(48000), 5_760_000);
        assert_eq!(config.large_slice_frames(1000), 2_400_000);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_timeout_bounds() {
        let config = ExportConfig::default();
        assert_abs_diff_eq!(config.timeout_secs(0.0), 30.0);
        assert_abs_diff_eq!(config.timeout_secs(MAX_DURATION_SECS), 45_000.0, epsilon = 1e-6);
        assert!(config.timeout_secs(3600.0) > 30.0);
    }

    #[test]
    fn test_partial_json_overrides() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{ "slice_window_secs": 60, "phase_mode": "reset_per_slice", "noise_seed": 9 }}"#
        )
        .unwrap();

        let config = ExportConfig::from_json_file(file.path()).unwrap();
        assert_eq!(config.slice_window_secs, 60.0);
        assert_eq!(config.phase_mode, PhaseMode::ResetPerSlice);
        assert_eq!(config.noise_seed, Some(9));
        assert_eq!(config.large_slice_secs, DEFAULT_LARGE_SLICE_SECS);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = ExportConfig {
            slice_window_secs: 0.0,
            ..ExportConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ToneError::InvalidConfig { .. })
        ));

        let config = ExportConfig {
            sample_rate: 10,
            ..ExportConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ToneError::SampleRateOutOfRange { .. })
        ));
    }
}
