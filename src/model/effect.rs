//! Effect catalog and per-request effect settings

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Result, ToneError};

/// The fixed catalog of effects a request may enable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EffectKind {
    BinauralBeat,
    ShepardTone,
    RingMod,
    AmplitudeMod,
    Isochronic,
    Tremolo,
    Stutter,
    Glitch,
    StereoPan,
    Pan360,
    Chorus,
    Phaser,
    PingPongDelay,
    Reverb,
    Noise,
}

/// Broad stage an effect belongs to in the graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum EffectClass {
    /// Shapes or adds to the oscillator voices themselves
    Source,
    /// Multiplies the summed voices, before the mix gain
    Modulation,
    /// Places the mixed signal in the stereo field or in time
    Spatial,
    /// Generated noise mixed in last
    Noise,
}

/// Static description of one catalog entry
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EffectSpec {
    pub kind: EffectKind,
    pub label: &'static str,
    pub unit: &'static str,
    pub min: f64,
    pub max: f64,
    pub step: f64,
    pub default: f64,
}

impl EffectKind {
    /// All catalog entries in graph order
    pub const ALL: [EffectKind; 15] = [
        EffectKind::BinauralBeat,
        EffectKind::ShepardTone,
        EffectKind::RingMod,
        EffectKind::AmplitudeMod,
        EffectKind::Isochronic,
        EffectKind::Tremolo,
        EffectKind::Stutter,
        EffectKind::Glitch,
        EffectKind::StereoPan,
        EffectKind::Pan360,
        EffectKind::Chorus,
        EffectKind::Phaser,
        EffectKind::PingPongDelay,
        EffectKind::Reverb,
        EffectKind::Noise,
    ];

    /// Stable string key used in requests
    pub fn as_str(&self) -> &'static str {
        match self {
            EffectKind::BinauralBeat => "binaural_beat",
            EffectKind::ShepardTone => "shepard_tone",
            EffectKind::RingMod => "ring_mod",
            EffectKind::AmplitudeMod => "amplitude_mod",
            EffectKind::Isochronic => "isochronic",
            EffectKind::Tremolo => "tremolo",
            EffectKind::Stutter => "stutter",
            EffectKind::Glitch => "glitch",
            EffectKind::StereoPan => "stereo_pan",
            EffectKind::Pan360 => "pan_360",
            EffectKind::Chorus => "chorus",
            EffectKind::Phaser => "phaser",
            EffectKind::PingPongDelay => "ping_pong_delay",
            EffectKind::Reverb => "reverb",
            EffectKind::Noise => "noise",
        }
    }

    pub fn class(&self) -> EffectClass {
        match self {
            EffectKind::BinauralBeat | EffectKind::ShepardTone => EffectClass::Source,
            EffectKind::RingMod
            | EffectKind::AmplitudeMod
            | EffectKind::Isochronic
            | EffectKind::Tremolo
            | EffectKind::Stutter
            | EffectKind::Glitch => EffectClass::Modulation,
            EffectKind::StereoPan
            | EffectKind::Pan360
            | EffectKind::Chorus
            | EffectKind::Phaser
            | EffectKind::PingPongDelay
            | EffectKind::Reverb => EffectClass::Spatial,
            EffectKind::Noise => EffectClass::Noise,
        }
    }

    /// Catalog ranges and defaults
    pub fn spec(&self) -> EffectSpec {
        let (label, unit, min, max, step, default) = match self {
            EffectKind::BinauralBeat => ("Binaural Beat", "Hz", 0.5, 40.0, 0.5, 7.0),
            EffectKind::ShepardTone => ("Shepard Tone", "oct/s", 0.01, 1.0, 0.01, 0.1),
            EffectKind::RingMod => ("Ring Modulation", "Hz", 1.0, 1000.0, 1.0, 30.0),
            EffectKind::AmplitudeMod => ("Amplitude Modulation", "Hz", 0.1, 40.0, 0.1, 4.0),
            EffectKind::Isochronic => ("Isochronic Pulses", "Hz", 0.5, 40.0, 0.5, 10.0),
            EffectKind::Tremolo => ("Tremolo", "Hz", 0.5, 20.0, 0.5, 5.0),
            EffectKind::Stutter => ("Stutter", "Hz", 1.0, 32.0, 1.0, 8.0),
            EffectKind::Glitch => ("Glitch", "", 0.0, 1.0, 0.01, 0.3),
            EffectKind::StereoPan => ("Stereo Pan", "", -1.0, 1.0, 0.01, 0.0),
            EffectKind::Pan360 => ("360 Pan", "Hz", 0.01, 2.0, 0.01, 0.1),
            EffectKind::Chorus => ("Chorus", "ms", 0.0, 20.0, 0.5, 5.0),
            EffectKind::Phaser => ("Phaser", "Hz", 0.05, 5.0, 0.05, 0.5),
            EffectKind::PingPongDelay => ("Ping-Pong Delay", "s", 0.05, 1.0, 0.01, 0.3),
            EffectKind::Reverb => ("Reverb", "", 0.0, 1.0, 0.01, 0.3),
            EffectKind::Noise => ("Noise Mix", "", 0.0, 1.0, 0.01, 0.1),
        };
        EffectSpec {
            kind: *self,
            label,
            unit,
            min,
            max,
            step,
            default,
        }
    }
}

impl fmt::Display for EffectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EffectKind {
    type Err = ToneError;

    fn from_str(s: &str) -> Result<Self> {
        EffectKind::ALL
            .iter()
            .copied()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| ToneError::UnknownEffect {
                effect_id: s.to_string(),
            })
    }
}

/// User-facing effect setting
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioEffect {
    /// Catalog key, e.g. `reverb`
    pub id: String,
    pub enabled: bool,
    pub value: f64,
    pub min: f64,
    pub max: f64,
    pub step: f64,
}

impl AudioEffect {
    /// Disabled effect at its catalog default
    pub fn from_catalog(kind: EffectKind) -> Self {
        let spec = kind.spec();
        Self {
            id: kind.as_str().to_string(),
            enabled: false,
            value: spec.default,
            min: spec.min,
            max: spec.max,
            step: spec.step,
        }
    }

    /// Enabled effect at the given value
    pub fn enabled(kind: EffectKind, value: f64) -> Self {
        Self {
            enabled: true,
            value,
            ..Self::from_catalog(kind)
        }
    }

    /// Resolve the catalog entry for this effect's id
    pub fn kind(&self) -> Result<EffectKind> {
        self.id.parse()
    }

    /// Check `min <= value <= max` and that the id is in the catalog
    pub fn validate(&self) -> Result<()> {
        self.kind()?;
        if !self.value.is_finite() || self.value < self.min || self.value > self.max {
            return Err(ToneError::EffectOutOfRange {
                effect_id: self.id.clone(),
                value: self.value,
                min: self.min,
                max: self.max,
            });
        }
        Ok(())
    }
}

/// Effect settings keyed by id
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EffectSet {
    effects: BTreeMap<String, AudioEffect>,
}

impl EffectSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every catalog entry, all disabled, at default values
    pub fn catalog() -> Self {
        let mut set = Self::new();
        for kind in EffectKind::ALL {
            set.insert(AudioEffect::from_catalog(kind));
        }
        set
    }

    pub fn insert(&mut self, effect: AudioEffect) {
        self.effects.insert(effect.id.clone(), effect);
    }

    /// Enable `kind` at `value`, builder style
    pub fn with(mut self, kind: EffectKind, value: f64) -> Self {
        self.insert(AudioEffect::enabled(kind, value));
        self
    }

    pub fn get(&self, kind: EffectKind) -> Option<&AudioEffect> {
        self.effects.get(kind.as_str())
    }

    /// Value of `kind` if it is present and enabled
    pub fn enabled_value(&self, kind: EffectKind) -> Option<f64> {
        self.get(kind).filter(|e| e.enabled).map(|e| e.value)
    }

    pub fn len(&self) -> usize {
        self.effects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.effects.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &AudioEffect> {
        self.effects.values()
    }

    /// Enabled effects with their resolved kinds, in catalog (graph) order.
    ///
    /// Entries with unknown ids are skipped; `validate` rejects them first.
    pub fn enabled_kinds(&self) -> Vec<(EffectKind, f64)> {
        let mut kinds: Vec<(EffectKind, f64)> = self
            .effects
            .values()
            .filter(|e| e.enabled)
            .filter_map(|e| e.kind().ok().map(|k| (k, e.value)))
            .collect();
        kinds.sort_by_key(|(k, _)| *k);
        kinds
    }

    /// Validate keys and every entry's range
    pub fn validate(&self) -> Result<()> {
        for (key, effect) in &self.effects {
            if key != &effect.id {
                return Err(ToneError::UnknownEffect {
                    effect_id: key.clone(),
                });
            }
            effect.validate()?;
        }
        Ok(())
    }
}

impl FromIterator<AudioEffect> for EffectSet {
    fn from_iter<I: IntoIterator<Item = AudioEffect>>(iter: I) -> Self {
        let mut set = EffectSet::new();
        for effect in iter {
            set.insert(effect);
        }
        set
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_defaults_within_range() {
        for kind in EffectKind::ALL {
            let spec = kind.spec();
            assert!(spec.min <= spec.default && spec.default <= spec.max, "{}", kind);
            assert!(spec.step > 0.0);
        }
        assert_eq!(EffectSet::catalog().len(), 15);
        assert!(EffectSet::catalog().enabled_kinds().is_empty());
    }

    #[test]
    fn test_kind_round_trip_through_str() {
        for kind in EffectKind::ALL {
            assert_eq!(kind.as_str().parse::<EffectKind>().unwrap(), kind);
        }
        assert!("flanger".parse::<EffectKind>().is_err());
    }

    #[test]
    fn test_out_of_range_rejected() {
        let mut effect = AudioEffect::enabled(EffectKind::Reverb, 0.5);
        assert!(effect.validate().is_ok());
        effect.value = 1.5;
        assert!(matches!(
            effect.validate(),
            Err(ToneError::EffectOutOfRange { .. })
        ));
    }

    #[test]
    fn test_enabled_kinds_in_graph_order() {
        let set = EffectSet::new()
            .with(EffectKind::Noise, 0.2)
            .with(EffectKind::RingMod, 40.0)
            .with(EffectKind::Reverb, 0.4);
        let kinds: Vec<_> = set.enabled_kinds().into_iter().map(|(k, _)| k).collect();
        assert_eq!(
            kinds,
            vec![EffectKind::RingMod, EffectKind::Reverb, EffectKind::Noise]
        );
    }

    #[test]
    fn test_serde_uses_id_keys() {
        let set = EffectSet::new().with(EffectKind::Tremolo, 5.0);
        let json = serde_json::to_value(&set).unwrap();
        assert_eq!(json["tremolo"]["enabled"], true);
        let back: EffectSet = serde_json::from_value(json).unwrap();
        assert_eq!(back, set);
    }

    #[test]
    fn test_mismatched_key_rejected() {
        let json = serde_json::json!({
            "reverb": { "id": "noise", "enabled": true, "value": 0.1,
                        "min": 0.0, "max": 1.0, "step": 0.01 }
        });
        let set: EffectSet = serde_json::from_value(json).unwrap();
        assert!(set.validate().is_err());
    }
}
