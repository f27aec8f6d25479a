//! Oscillator channel definitions

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Result, ToneError};

/// Maximum number of independent oscillator channels
pub const MAX_CHANNELS: usize = 8;

/// Highest frequency a channel may be set to
pub const MAX_FREQUENCY_HZ: f64 = 20000.0;

/// Frequency new channels start at
pub const DEFAULT_FREQUENCY_HZ: f64 = 432.0;

/// Oscillator waveform shape
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Waveform {
    #[default]
    Sine,
    Square,
    Sawtooth,
    Triangle,
}

impl Waveform {
    /// Evaluate the waveform at a normalized phase in `[0, 1)`.
    ///
    /// Every shape starts at zero (or its rising edge) at phase 0.
    #[inline]
    pub fn sample(self, phase: f64) -> f64 {
        match self {
            Waveform::Sine => (std::f64::consts::TAU * phase).sin(),
            Waveform::Square => {
                if phase < 0.5 {
                    1.0
                } else {
                    -1.0
                }
            }
            Waveform::Sawtooth => 2.0 * (phase + 0.5).fract() - 1.0,
            Waveform::Triangle => 1.0 - 4.0 * ((phase + 0.25).fract() - 0.5).abs(),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Waveform::Sine => "sine",
            Waveform::Square => "square",
            Waveform::Sawtooth => "sawtooth",
            Waveform::Triangle => "triangle",
        }
    }
}

impl fmt::Display for Waveform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Waveform {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sine" => Ok(Waveform::Sine),
            "square" => Ok(Waveform::Square),
            "sawtooth" | "saw" => Ok(Waveform::Sawtooth),
            "triangle" => Ok(Waveform::Triangle),
            other => Err(format!("unknown waveform '{}'", other)),
        }
    }
}

/// One independent oscillator summed into the output mix
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrequencyChannel {
    /// Channel number, unique within a request (1-based)
    pub id: u32,
    /// Oscillator frequency in Hz (0-20000)
    pub frequency: f64,
    /// Oscillator shape
    #[serde(default)]
    pub waveform: Waveform,
    /// Whether this channel contributes to the mix
    pub enabled: bool,
}

impl FrequencyChannel {
    /// Create an enabled channel
    pub fn new(id: u32, frequency: f64, waveform: Waveform) -> Self {
        Self {
            id,
            frequency,
            waveform,
            enabled: true,
        }
    }

    /// Session-start default: 432 Hz sine, enabled
    pub fn default_with_id(id: u32) -> Self {
        Self::new(id, DEFAULT_FREQUENCY_HZ, Waveform::Sine)
    }

    /// Disabled copy of this channel
    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    /// Check id and frequency bounds
    pub fn validate(&self) -> Result<()> {
        if self.id == 0 {
            return Err(ToneError::InvalidChannel {
                id: self.id,
                reason: "channel ids start at 1".to_string(),
            });
        }
        if !self.frequency.is_finite() || self.frequency < 0.0 || self.frequency > MAX_FREQUENCY_HZ
        {
            return Err(ToneError::InvalidChannel {
                id: self.id,
                reason: format!(
                    "frequency {} Hz is outside 0..={} Hz",
                    self.frequency, MAX_FREQUENCY_HZ
                ),
            });
        }
        Ok(())
    }
}

impl FromStr for FrequencyChannel {
    type Err = String;

    /// Parse `freq[:waveform]`, e.g. `432:sine`. The id is assigned by the caller.
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let mut parts = s.splitn(2, ':');
        let freq = parts
            .next()
            .unwrap_or_default()
            .trim()
            .parse::<f64>()
            .map_err(|e| format!("invalid frequency in '{}': {}", s, e))?;
        let waveform = match parts.next() {
            Some(w) => w.trim().parse()?,
            None => Waveform::Sine,
        };
        Ok(FrequencyChannel::new(0, freq, waveform))
    }
}

/// Validate a full channel list: count, unique ids, bounds, at least one enabled
pub fn validate_channels(channels: &[FrequencyChannel]) -> Result<()> {
    if channels.len() > MAX_CHANNELS {
        return Err(ToneError::TooManyChannels {
            count: channels.len(),
            max: MAX_CHANNELS,
        });
    }

    let mut seen = std::collections::HashSet::new();
    for channel in channels {
        channel.validate()?;
        if !seen.insert(channel.id) {
            return Err(ToneError::InvalidChannel {
                id: channel.id,
                reason: "duplicate channel id".to_string(),
            });
        }
    }

    if !channels.iter().any(|c| c.enabled) {
        return Err(ToneError::NoEnabledChannels);
    }

    Ok(())
}
