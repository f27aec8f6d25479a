//! CLI Command Implementations
//!
//! Implements the actual logic for each CLI command.

use std::fs;
use std::path::Path;

use tracing::info;

use super::RequestArgs;
use crate::codec::{decode_wav, extract};
use crate::config::ExportConfig;
use crate::engine::{plan_span, CancellationToken, StereoBuffer};
use crate::error::{Result, ToneError};
use crate::export::{
    Delivery, ExportOrchestrator, ExportStrategy, LoggingObserver, SlicedExporter,
};
use crate::model::{AudioEffect, EffectKind, EffectSet, FrequencyChannel, RenderRequest};

/// Load the export settings, falling back to defaults
pub fn load_config(path: Option<&Path>) -> Result<ExportConfig> {
    match path {
        Some(path) => {
            info!("Loading config: {}", path.display());
            ExportConfig::from_json_file(path)
        }
        None => Ok(ExportConfig::default()),
    }
}

/// Build the request from a file or from inline options
pub fn build_request(args: &RequestArgs, config: &ExportConfig) -> Result<RenderRequest> {
    if let Some(path) = &args.request {
        info!("Loading request: {}", path.display());
        let content = fs::read_to_string(path)?;
        return Ok(serde_json::from_str(&content)?);
    }

    let mut channels: Vec<FrequencyChannel> = args.channels.clone();
    if channels.is_empty() {
        channels.push(FrequencyChannel::default_with_id(1));
    }
    for (i, channel) in channels.iter_mut().enumerate() {
        channel.id = i as u32 + 1;
    }

    let mut effects = EffectSet::new();
    for arg in &args.effects {
        effects.insert(AudioEffect::enabled(arg.kind, arg.value));
    }

    Ok(RenderRequest::new(args.duration, channels, effects)
        .with_sample_rate(args.sample_rate.unwrap_or(config.sample_rate)))
}

/// Render a request and write the artifact.
pub async fn render(
    args: &RequestArgs,
    config: ExportConfig,
    output: &Path,
    name: &str,
) -> Result<()> {
    let request = build_request(args, &config)?;
    info!(
        "Rendering {:.0}s at {} Hz to {}",
        request.duration_secs,
        request.sample_rate,
        output.display()
    );

    let orchestrator = ExportOrchestrator::new(config);
    let outcome = orchestrator
        .run(&request, &mut LoggingObserver::default(), &CancellationToken::new())
        .await?;

    match &outcome.delivery {
        Delivery::Artifact(artifact) => {
            for path in artifact.write_to(output, name)? {
                println!("Wrote {}", path.display());
            }
        }
        Delivery::File(path) => println!("Wrote {}", path.display()),
    }
    if let Some(fp) = &outcome.fingerprint {
        println!("Fingerprint: {} ({})", fp.signature, fp.id);
    }

    Ok(())
}

/// Print the large slices and render windows a request would use.
pub fn plan(args: &RequestArgs, config: ExportConfig) -> Result<()> {
    let request = build_request(args, &config)?;
    request.validate()?;

    let sample_rate = request.sample_rate;
    let window = config.window_frames(sample_rate);
    let exporter = SlicedExporter::new(config);
    let orchestrator = ExportOrchestrator::new(exporter.config().clone());
    let slices = exporter.plan(&request);

    println!(
        "{:.0}s at {} Hz: {} frames, {} part(s)",
        request.duration_secs,
        sample_rate,
        request.total_frames(),
        slices.len()
    );
    println!("{:-<60}", "");
    for slice in &slices {
        let windows = plan_span(slice.start_frame, slice.frame_count, window).len();
        println!(
            "part{:02}  start {:>8.1}s  length {:>7.1}s  {} window(s)",
            slice.index + 1,
            slice.start_secs(sample_rate),
            slice.duration_secs(sample_rate),
            windows
        );
    }
    println!("{:-<60}", "");

    let strategy = orchestrator.select_strategy(&request);
    let timeout = orchestrator.timeout_for(&request);
    println!("Strategy: {}", strategy);
    println!("Timeout: {:.0}s", timeout.as_secs_f64());
    if strategy != ExportStrategy::Local {
        println!("(only local exports are available from the command line)");
    }

    Ok(())
}

/// Print the effect catalog.
pub fn list_effects() -> Result<()> {
    println!(
        "{:<16} {:<12} {:>8} {:>8} {:>6} {:>8}  {}",
        "ID", "CLASS", "MIN", "MAX", "STEP", "DEFAULT", "VALUE"
    );
    println!("{:-<80}", "");
    for kind in EffectKind::ALL {
        let spec = kind.spec();
        println!(
            "{:<16} {:<12} {:>8} {:>8} {:>6} {:>8}  {} ({})",
            kind.as_str(),
            format!("{:?}", kind.class()).to_lowercase(),
            spec.min,
            spec.max,
            spec.step,
            spec.default,
            spec.label,
            spec.unit
        );
    }
    Ok(())
}

/// Describe a WAV file.
pub fn inspect(path: &Path) -> Result<()> {
    info!("Inspecting: {}", path.display());

    let bytes = fs::read(path)?;
    let decoded = decode_wav(&bytes)?;

    println!("File: {}", path.display());
    println!("Sample rate: {} Hz", decoded.sample_rate);
    println!("Channels: {}", decoded.num_channels());
    println!("Bits per sample: {}", decoded.bits_per_sample);
    println!(
        "Duration: {:.3}s ({} frames)",
        decoded.duration_secs(),
        decoded.num_frames()
    );

    if decoded.num_channels() == 2 {
        let mut channels = decoded.channels;
        let right = channels.pop().unwrap_or_default();
        let left = channels.pop().unwrap_or_default();
        let buffer = StereoBuffer::from_channels(left, right, decoded.sample_rate)?;
        println!("Peak: {:.4}", buffer.peak());
        println!(
            "RMS: {:.1} dB / {:.1} dB",
            buffer.rms_db(0),
            buffer.rms_db(1)
        );
        match extract(&buffer) {
            Some(fp) => println!("Fingerprint: {} ({}, v{})", fp.signature, fp.id, fp.version),
            None => println!("Fingerprint: none found"),
        }
    } else if decoded.num_channels() != 1 {
        return Err(ToneError::UnsupportedChannelCount {
            count: decoded.num_channels(),
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::encode_wav;
    use crate::model::Waveform;

    fn args() -> RequestArgs {
        RequestArgs {
            request: None,
            duration: 45.0,
            channels: vec![
                FrequencyChannel::new(0, 200.0, Waveform::Sine),
                FrequencyChannel::new(0, 300.0, Waveform::Square),
            ],
            effects: vec![super::super::EffectArg {
                kind: EffectKind::Noise,
                value: 0.2,
            }],
            sample_rate: None,
        }
    }

    #[test]
    fn test_build_request_assigns_ids() {
        let request = build_request(&args(), &ExportConfig::default()).unwrap();
        let ids: Vec<u32> = request.channels.iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![1, 2]);
        assert_eq!(request.sample_rate, 48000);
        assert_eq!(request.effects.enabled_value(EffectKind::Noise), Some(0.2));
        assert!(request.validate().is_ok());
    }

    #[test]
    fn test_build_request_default_channel() {
        let mut a = args();
        a.channels.clear();
        let request = build_request(&a, &ExportConfig::default()).unwrap();
        assert_eq!(request.channels.len(), 1);
        assert_eq!(request.channels[0].frequency, 432.0);
    }

    #[test]
    fn test_build_request_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("request.json");
        fs::write(
            &path,
            r#"{"duration_secs": 60, "frequencies": [{"id": 1, "frequency": 528, "waveform": "triangle", "enabled": true}]}"#,
        )
        .unwrap();
        let mut a = args();
        a.request = Some(path);
        let request = build_request(&a, &ExportConfig::default()).unwrap();
        assert_eq!(request.channels[0].waveform, Waveform::Triangle);
        assert_eq!(request.sample_rate, 48000);
    }

    #[test]
    fn test_inspect_wav() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tone.wav");
        fs::write(&path, encode_wav(&[vec![0.5; 100], vec![-0.5; 100]], 8000).unwrap()).unwrap();
        assert!(inspect(&path).is_ok());
    }
}
