//! CLI Module
//!
//! Command-line interface for offline tone rendering.

pub mod commands;

use std::path::PathBuf;
use std::str::FromStr;

use clap::{Args, Parser, Subcommand};

use crate::model::{EffectKind, FrequencyChannel};

/// Tonegen - offline tone and soundscape renderer
#[derive(Parser, Debug)]
#[command(name = "tonegen")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Export settings file (JSON)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Render a request to WAV (single file, archive, or parts)
    Render {
        #[command(flatten)]
        request: RequestArgs,

        /// Output directory
        #[arg(short, long, default_value = ".")]
        output: PathBuf,

        /// Base file name
        #[arg(long, default_value = "tonegen")]
        name: String,

        /// Seed noise and glitch stages for a reproducible render
        #[arg(long)]
        seed: Option<u64>,

        /// Embed a provenance fingerprint into every part
        #[arg(long)]
        fingerprint: bool,
    },

    /// Show how a request would be sliced, without rendering
    Plan {
        #[command(flatten)]
        request: RequestArgs,
    },

    /// List the effect catalog
    Effects,

    /// Describe a WAV file and look for a fingerprint
    Inspect {
        /// WAV file to read
        path: PathBuf,
    },
}

/// Request given inline or as a JSON file
#[derive(Args, Debug, Clone)]
pub struct RequestArgs {
    /// Request file (JSON); inline options are ignored when given
    #[arg(short, long)]
    pub request: Option<PathBuf>,

    /// Duration in seconds
    #[arg(short, long, default_value_t = 60.0)]
    pub duration: f64,

    /// Oscillator as `freq[:waveform]`; repeat for more channels
    #[arg(long = "channel", value_name = "FREQ[:WAVEFORM]")]
    pub channels: Vec<FrequencyChannel>,

    /// Enabled effect as `id=value`; repeat for more effects
    #[arg(short, long = "effect", value_name = "ID=VALUE")]
    pub effects: Vec<EffectArg>,

    /// Output sample rate in Hz
    #[arg(short, long)]
    pub sample_rate: Option<u32>,
}

/// `id=value` pair naming a catalog effect
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EffectArg {
    pub kind: EffectKind,
    pub value: f64,
}

impl FromStr for EffectArg {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let (id, value) = s
            .split_once('=')
            .ok_or_else(|| format!("expected ID=VALUE, got '{}'", s))?;
        let kind: EffectKind = id.trim().parse().map_err(|e| format!("{}", e))?;
        let value = value
            .trim()
            .parse::<f64>()
            .map_err(|e| format!("invalid value for {}: {}", id, e))?;
        Ok(Self { kind, value })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_effect_arg_parse() {
        let arg: EffectArg = "reverb=0.4".parse().unwrap();
        assert_eq!(arg.kind, EffectKind::Reverb);
        assert_eq!(arg.value, 0.4);
        assert!("reverb".parse::<EffectArg>().is_err());
        assert!("warp=1".parse::<EffectArg>().is_err());
    }

    #[test]
    fn test_render_args() {
        let cli = Cli::parse_from([
            "tonegen",
            "render",
            "--duration",
            "30",
            "--channel",
            "432:sine",
            "--channel",
            "216",
            "--effect",
            "tremolo=5",
            "--seed",
            "7",
        ]);
        match cli.command {
            Commands::Render { request, seed, .. } => {
                assert_eq!(request.duration, 30.0);
                assert_eq!(request.channels.len(), 2);
                assert_eq!(request.effects[0].kind, EffectKind::Tremolo);
                assert_eq!(seed, Some(7));
            }
            other => panic!("unexpected command {:?}", other),
        }
    }
}
