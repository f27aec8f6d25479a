//! Sliced export
//!
//! Long exports are split into large slices (40 minutes by default). Each
//! large slice is rendered by the chunked renderer, encoded as its own WAV
//! part, and the parts are assembled into a single file, an archive, or a
//! list of separate files.

use std::path::PathBuf;
use std::time::Duration;

use tracing::{debug, info, warn};

use super::archive::{estimated_archive_size, package_parts};
use super::collaborators::{DesktopExportBridge, DesktopJob};
use super::observer::{ExportObserver, ProgressTracker};
use super::ExportArtifact;
use crate::codec::fingerprint::{embed, AudioFingerprint};
use crate::codec::wav::{encode_pcm16, encode_wav, BYTES_PER_SAMPLE, WAV_HEADER_LEN};
use crate::config::ExportConfig;
use crate::engine::{plan_slices, CancellationToken, ChunkedRenderer, Slice, StereoBuffer};
use crate::error::{Result, ToneError};
use crate::graph::{GraphFactory, ToneGraphBuilder};
use crate::model::RenderRequest;

/// Artifact plus the fingerprint embedded into it, if any
#[derive(Debug, Clone, PartialEq)]
pub struct ExportResult {
    pub artifact: ExportArtifact,
    pub fingerprint: Option<AudioFingerprint>,
}

/// Large-slice exporter over the chunked renderer
pub struct SlicedExporter<F: GraphFactory = ToneGraphBuilder> {
    renderer: ChunkedRenderer<F>,
}

impl SlicedExporter<ToneGraphBuilder> {
    pub fn new(config: ExportConfig) -> Self {
        Self {
            renderer: ChunkedRenderer::new(config),
        }
    }
}

impl<F: GraphFactory> SlicedExporter<F> {
    pub fn with_renderer(renderer: ChunkedRenderer<F>) -> Self {
        Self { renderer }
    }

    pub fn config(&self) -> &ExportConfig {
        self.renderer.config()
    }

    /// Large slices the request is split into
    pub fn plan(&self, request: &RenderRequest) -> Vec<Slice> {
        let large = self.config().large_slice_frames(request.sample_rate);
        plan_slices(request.total_frames(), large)
    }

    /// Render, encode and package a request
    ///
    /// # Returns
    /// `Single` for one large slice; otherwise `Archive`, or `Parts` when
    /// packaging fails, comes back empty, or exceeds the archive size limit.
    ///
    /// # Errors
    /// Validation errors before any rendering; otherwise the first render,
    /// encode or cancellation error. Nothing partial is returned.
    pub async fn export(
        &self,
        request: &RenderRequest,
        observer: &mut dyn ExportObserver,
        cancel: &CancellationToken,
    ) -> Result<ExportResult> {
        request.validate()?;
        self.config().validate()?;

        let slices = self.plan(request);
        let total = slices.len();
        let fingerprint = self
            .config()
            .embed_fingerprint
            .then(|| AudioFingerprint::generate(&describe(request)));

        info!(
            duration_secs = request.duration_secs,
            sample_rate = request.sample_rate,
            parts = total,
            fingerprint = fingerprint.is_some(),
            "Starting sliced export"
        );

        let mut tracker = ProgressTracker::new();
        let mut parts = Vec::with_capacity(total);
        let mut marked_parts = 0;

        for slice in &slices {
            let mut buffer = self
                .render_slice(request, slice, total, &mut tracker, observer, cancel)
                .await?;

            if let Some(fp) = &fingerprint {
                match embed(&mut buffer, fp) {
                    Ok(()) => marked_parts += 1,
                    Err(e) => {
                        warn!(part = slice.index + 1, error = %e, "Fingerprint not embedded")
                    }
                }
            }

            let bytes = encode_wav(&buffer.samples, request.sample_rate)?;
            drop(buffer);
            if bytes.len() <= WAV_HEADER_LEN {
                return Err(ToneError::EmptyOutput {
                    part: slice.index + 1,
                });
            }

            observer.on_slice_complete(slice.index + 1, total, &bytes);
            debug!(part = slice.index + 1, total, bytes = bytes.len(), "Part encoded");
            parts.push(bytes);

            if slice.index + 1 < total {
                self.cooperative_yield().await;
            }
        }

        let artifact = self.assemble(parts);
        tracker.finish(observer);

        // A fingerprint no part carries is never reported
        let fingerprint = fingerprint.filter(|_| marked_parts > 0);

        info!(
            kind = artifact.kind(),
            files = artifact.file_count(),
            bytes = artifact.total_bytes(),
            "Export complete"
        );

        Ok(ExportResult {
            artifact,
            fingerprint,
        })
    }

    /// Render the same slices as headerless PCM chunks into a desktop bridge
    ///
    /// # Returns
    /// The path the bridge reports from `finish`
    pub async fn stream_pcm(
        &self,
        request: &RenderRequest,
        bridge: &dyn DesktopExportBridge,
        observer: &mut dyn ExportObserver,
        cancel: &CancellationToken,
    ) -> Result<PathBuf> {
        request.validate()?;
        self.config().validate()?;

        let slices = self.plan(request);
        let total = slices.len();
        bridge.begin(&DesktopJob {
            duration_secs: request.duration_secs,
            sample_rate: request.sample_rate,
            channels: 2,
            bits_per_sample: (BYTES_PER_SAMPLE * 8) as u16,
            total_frames: request.total_frames(),
            chunks: total,
        })?;

        let mut tracker = ProgressTracker::new();
        for slice in &slices {
            let buffer = self
                .render_slice(request, slice, total, &mut tracker, observer, cancel)
                .await?;
            let pcm = encode_pcm16(&buffer.samples)?;
            if pcm.is_empty() {
                return Err(ToneError::EmptyOutput {
                    part: slice.index + 1,
                });
            }
            bridge.push_chunk(slice.index, &pcm)?;
            observer.on_slice_complete(slice.index + 1, total, &pcm);

            if slice.index + 1 < total {
                self.cooperative_yield().await;
            }
        }

        let path = bridge.finish()?;
        tracker.finish(observer);
        info!(path = %path.display(), "Desktop export complete");
        Ok(path)
    }

    async fn render_slice(
        &self,
        request: &RenderRequest,
        slice: &Slice,
        total: usize,
        tracker: &mut ProgressTracker,
        observer: &mut dyn ExportObserver,
        cancel: &CancellationToken,
    ) -> Result<StereoBuffer> {
        cancel.check()?;
        debug!(
            part = slice.index + 1,
            total,
            start_secs = slice.start_secs(request.sample_rate),
            duration_secs = slice.duration_secs(request.sample_rate),
            "Rendering part"
        );

        let completed = slice.index as f64;
        let mut on_inner =
            |inner: f64| tracker.update(&mut *observer, (completed * 100.0 + inner) / total as f64);

        self.renderer
            .render_span(
                slice.start_frame,
                slice.frame_count,
                &request.channels,
                &request.effects,
                request.sample_rate,
                &mut on_inner,
                cancel,
            )
            .await
    }

    fn assemble(&self, parts: Vec<Vec<u8>>) -> ExportArtifact {
        assemble_with(parts, self.config().archive_size_limit_bytes, package_parts)
    }

    async fn cooperative_yield(&self) {
        let millis = self.config().large_slice_yield_ms;
        if millis == 0 {
            tokio::task::yield_now().await;
        } else {
            tokio::time::sleep(Duration::from_millis(millis)).await;
        }
    }
}

/// Choose the artifact for encoded parts, packaging with `package`
///
/// Parts whose archive would exceed `limit` are returned separately without
/// ever being packaged.
fn assemble_with<P>(mut parts: Vec<Vec<u8>>, limit: u64, package: P) -> ExportArtifact
where
    P: FnOnce(&[Vec<u8>]) -> Result<Vec<u8>>,
{
    if parts.len() == 1 {
        if let Some(single) = parts.pop() {
            return ExportArtifact::Single(single);
        }
    }

    let estimate = estimated_archive_size(&parts);
    if estimate > limit {
        warn!(
            estimate,
            limit, "Archive would exceed size limit, returning separate parts"
        );
        return ExportArtifact::Parts(parts);
    }

    match package(&parts) {
        Ok(archive) if !archive.is_empty() && archive.len() as u64 <= limit => {
            ExportArtifact::Archive(archive)
        }
        Ok(archive) => {
            warn!(
                bytes = archive.len(),
                limit, "Archive empty or over size limit, returning separate parts"
            );
            ExportArtifact::Parts(parts)
        }
        Err(e) => {
            warn!(error = %e, "Archive packaging failed, returning separate parts");
            ExportArtifact::Parts(parts)
        }
    }
}

/// Short description of a request, mixed into the fingerprint signature
fn describe(request: &RenderRequest) -> String {
    let channels: Vec<String> = request
        .channels
        .iter()
        .filter(|c| c.enabled)
        .map(|c| format!("{}@{}", c.waveform, c.frequency))
        .collect();
    let effects: Vec<&'static str> = request
        .effects
        .enabled_kinds()
        .iter()
        .map(|(kind, _)| kind.as_str())
        .collect();
    format!(
        "{}s {}Hz [{}] [{}]",
        request.duration_secs,
        request.sample_rate,
        channels.join(","),
        effects.join(",")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::NoopObserver;
    use crate::model::{EffectSet, FrequencyChannel, Waveform};

    fn request(duration_secs: f64) -> RenderRequest {
        RenderRequest::new(
            duration_secs,
            vec![FrequencyChannel::new(1, 100.0, Waveform::Sine)],
            EffectSet::new(),
        )
        .with_sample_rate(1000)
    }

    #[test]
    fn test_plan_uses_large_slices() {
        let exporter = SlicedExporter::new(ExportConfig::for_tests());
        let plan = exporter.plan(&request(5000.0));
        let secs: Vec<f64> = plan.iter().map(|s| s.duration_secs(1000)).collect();
        assert_eq!(secs, vec![2400.0, 2400.0, 200.0]);
    }

    #[test]
    fn test_assemble_over_limit_falls_back_to_parts() {
        let config = ExportConfig {
            archive_size_limit_bytes: 10,
            ..ExportConfig::for_tests()
        };
        let exporter = SlicedExporter::new(config);
        let artifact = exporter.assemble(vec![vec![1; 64], vec![2; 64]]);
        assert_eq!(artifact, ExportArtifact::Parts(vec![vec![1; 64], vec![2; 64]]));
    }

    #[test]
    fn test_over_limit_parts_never_packaged() {
        let parts = vec![vec![1; 64], vec![2; 64]];
        let artifact = assemble_with(parts.clone(), 200, |_| -> Result<Vec<u8>> {
            panic!("oversized parts must not be packaged")
        });
        assert_eq!(artifact, ExportArtifact::Parts(parts));
    }

    #[test]
    fn test_within_limit_parts_packaged() {
        let parts = vec![vec![1; 64], vec![2; 64]];
        let mut calls = 0;
        let artifact = assemble_with(parts, u64::MAX, |p| {
            calls += 1;
            package_parts(p)
        });
        assert_eq!(calls, 1);
        assert_eq!(artifact.kind(), "archive");
    }

    #[test]
    fn test_packaging_failure_falls_back_to_parts() {
        let parts = vec![vec![1; 4], vec![2; 4]];
        let artifact = assemble_with(parts.clone(), u64::MAX, |_| {
            Err(ToneError::Archive {
                reason: "disk full".to_string(),
            })
        });
        assert_eq!(artifact, ExportArtifact::Parts(parts));
    }

    #[tokio::test]
    async fn test_fingerprint_kept_when_some_part_marked() {
        // 10 s parts carry the mark; the trailing 50-frame part cannot
        let config = ExportConfig {
            large_slice_secs: 10.0,
            embed_fingerprint: true,
            ..ExportConfig::for_tests()
        };
        let result = SlicedExporter::new(config)
            .export(&request(30.05), &mut NoopObserver, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(result.artifact.file_count(), 1);
        assert!(result.fingerprint.is_some());
    }

    #[tokio::test]
    async fn test_fingerprint_dropped_when_no_part_marked() {
        // 100-frame parts are all too short to hold the record
        let config = ExportConfig {
            large_slice_secs: 0.1,
            embed_fingerprint: true,
            ..ExportConfig::for_tests()
        };
        let result = SlicedExporter::new(config)
            .export(&request(30.0), &mut NoopObserver, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(result.artifact.kind(), "archive");
        assert!(result.fingerprint.is_none());
    }

    #[test]
    fn test_assemble_single() {
        let exporter = SlicedExporter::new(ExportConfig::for_tests());
        assert_eq!(
            exporter.assemble(vec![vec![9; 8]]),
            ExportArtifact::Single(vec![9; 8])
        );
    }

    #[tokio::test]
    async fn test_invalid_request_rejected_before_render() {
        let exporter = SlicedExporter::new(ExportConfig::for_tests());
        let result = exporter
            .export(&request(5.0), &mut NoopObserver, &CancellationToken::new())
            .await;
        assert!(matches!(result, Err(ToneError::DurationOutOfRange { .. })));
    }

    #[tokio::test]
    async fn test_single_part_export() {
        let exporter = SlicedExporter::new(ExportConfig::for_tests());
        let result = exporter
            .export(&request(30.0), &mut NoopObserver, &CancellationToken::new())
            .await
            .unwrap();
        match result.artifact {
            ExportArtifact::Single(bytes) => assert_eq!(bytes.len(), WAV_HEADER_LEN + 30 * 1000 * 4),
            other => panic!("expected single file, got {}", other.kind()),
        }
        assert!(result.fingerprint.is_none());
    }

    #[test]
    fn test_describe_lists_enabled_only() {
        let mut req = request(60.0);
        req.channels
            .push(FrequencyChannel::new(2, 300.0, Waveform::Square).disabled());
        assert_eq!(describe(&req), "60s 1000Hz [sine@100] []");
    }
}
