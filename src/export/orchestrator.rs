//! Export orchestration
//!
//! Picks a delivery strategy, bounds the whole export with a timeout that
//! grows with duration, and raises exactly one notice per run.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::{error, info, warn};

use super::collaborators::{DesktopExportBridge, RemoteRenderService};
use super::observer::ExportObserver;
use super::sliced::SlicedExporter;
use super::ExportArtifact;
use crate::codec::fingerprint::{AudioFingerprint, FingerprintStore};
use crate::config::ExportConfig;
use crate::engine::CancellationToken;
use crate::error::{Result, ToneError};
use crate::graph::{GraphFactory, ToneGraphBuilder};
use crate::model::RenderRequest;

/// Where an export is produced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportStrategy {
    /// Sliced rendering in this process
    Local,
    /// Handed to a remote renderer
    Server,
    /// Streamed into the native desktop writer
    Desktop,
}

impl fmt::Display for ExportStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ExportStrategy::Local => "local",
            ExportStrategy::Server => "server",
            ExportStrategy::Desktop => "desktop",
        };
        write!(f, "{}", name)
    }
}

/// What the user receives
#[derive(Debug, Clone, PartialEq)]
pub enum Delivery {
    Artifact(ExportArtifact),
    /// Written by the desktop writer
    File(PathBuf),
}

/// Successful export
#[derive(Debug, Clone, PartialEq)]
pub struct ExportOutcome {
    pub strategy: ExportStrategy,
    pub delivery: Delivery,
    pub fingerprint: Option<AudioFingerprint>,
}

/// The single message raised at the end of every run
#[derive(Debug, Clone, PartialEq)]
pub enum ExportNotice {
    Completed {
        strategy: ExportStrategy,
        summary: String,
    },
    Failed {
        code: &'static str,
        message: String,
        suggestions: Vec<&'static str>,
    },
}

impl ExportNotice {
    fn from_error(error: &ToneError) -> Self {
        ExportNotice::Failed {
            code: error.error_code(),
            message: error.friendly_message(),
            suggestions: error.recovery_suggestions(),
        }
    }
}

/// User-facing notification sink
pub trait Notifier: Send + Sync {
    fn notify(&self, notice: &ExportNotice);
}

/// Writes notices to the log
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, notice: &ExportNotice) {
        match notice {
            ExportNotice::Completed { strategy, summary } => {
                info!(%strategy, "{}", summary);
            }
            ExportNotice::Failed {
                code,
                message,
                suggestions,
            } => {
                error!(code, suggestions = ?suggestions, "{}", message);
            }
        }
    }
}

/// Runs exports end to end
pub struct ExportOrchestrator<F: GraphFactory = ToneGraphBuilder> {
    exporter: SlicedExporter<F>,
    desktop: Option<Arc<dyn DesktopExportBridge>>,
    remote: Option<Arc<dyn RemoteRenderService>>,
    fingerprints: Option<Arc<dyn FingerprintStore>>,
    notifier: Arc<dyn Notifier>,
}

impl ExportOrchestrator<ToneGraphBuilder> {
    pub fn new(config: ExportConfig) -> Self {
        Self::with_exporter(SlicedExporter::new(config))
    }
}

impl<F: GraphFactory> ExportOrchestrator<F> {
    pub fn with_exporter(exporter: SlicedExporter<F>) -> Self {
        Self {
            exporter,
            desktop: None,
            remote: None,
            fingerprints: None,
            notifier: Arc::new(TracingNotifier),
        }
    }

    pub fn with_desktop_bridge(mut self, bridge: Arc<dyn DesktopExportBridge>) -> Self {
        self.desktop = Some(bridge);
        self
    }

    pub fn with_remote(mut self, remote: Arc<dyn RemoteRenderService>) -> Self {
        self.remote = Some(remote);
        self
    }

    /// Register embedded fingerprints here after a successful export
    pub fn with_fingerprint_store(mut self, store: Arc<dyn FingerprintStore>) -> Self {
        self.fingerprints = Some(store);
        self
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn config(&self) -> &ExportConfig {
        self.exporter.config()
    }

    /// Desktop when a bridge is attached; server for long exports when a
    /// remote renderer is attached; local otherwise
    pub fn select_strategy(&self, request: &RenderRequest) -> ExportStrategy {
        if self.desktop.is_some() {
            ExportStrategy::Desktop
        } else if self.remote.is_some()
            && request.duration_secs > self.config().server_threshold_secs
        {
            ExportStrategy::Server
        } else {
            ExportStrategy::Local
        }
    }

    /// Wall-clock limit for exporting `request`
    pub fn timeout_for(&self, request: &RenderRequest) -> Duration {
        Duration::from_secs_f64(self.config().timeout_secs(request.duration_secs))
    }

    /// Run one export and notify exactly once, whatever the outcome
    pub async fn run(
        &self,
        request: &RenderRequest,
        observer: &mut dyn ExportObserver,
        cancel: &CancellationToken,
    ) -> Result<ExportOutcome> {
        let result = self.execute(request, observer, cancel).await;

        let notice = match &result {
            Ok(outcome) => ExportNotice::Completed {
                strategy: outcome.strategy,
                summary: summarize(outcome),
            },
            Err(e) => ExportNotice::from_error(e),
        };
        self.notifier.notify(&notice);

        result
    }

    async fn execute(
        &self,
        request: &RenderRequest,
        observer: &mut dyn ExportObserver,
        cancel: &CancellationToken,
    ) -> Result<ExportOutcome> {
        request.validate()?;
        self.config().validate()?;

        let strategy = self.select_strategy(request);
        let limit = self.timeout_for(request);
        info!(
            %strategy,
            duration_secs = request.duration_secs,
            timeout_secs = limit.as_secs_f64(),
            "Export requested"
        );

        let outcome =
            match tokio::time::timeout(limit, self.dispatch(strategy, request, observer, cancel))
                .await
            {
                Ok(result) => result?,
                Err(_) => {
                    cancel.cancel();
                    warn!(limit_secs = limit.as_secs_f64(), "Export timed out");
                    return Err(ToneError::Timeout {
                        duration_secs: request.duration_secs,
                        limit_secs: limit.as_secs_f64(),
                    });
                }
            };

        if let (Some(store), Some(fp)) = (&self.fingerprints, &outcome.fingerprint) {
            store.store(fp)?;
        }

        Ok(outcome)
    }

    async fn dispatch(
        &self,
        strategy: ExportStrategy,
        request: &RenderRequest,
        observer: &mut dyn ExportObserver,
        cancel: &CancellationToken,
    ) -> Result<ExportOutcome> {
        match (strategy, &self.desktop, &self.remote) {
            (ExportStrategy::Desktop, Some(bridge), _) => {
                let path = self
                    .exporter
                    .stream_pcm(request, bridge.as_ref(), observer, cancel)
                    .await?;
                Ok(ExportOutcome {
                    strategy,
                    delivery: Delivery::File(path),
                    fingerprint: None,
                })
            }
            (ExportStrategy::Server, _, Some(remote)) => {
                let remote = Arc::clone(remote);
                let owned = request.clone();
                let token = cancel.clone();
                let artifact = tokio::task::spawn_blocking(move || remote.render(&owned, &token))
                    .await
                    .map_err(|e| ToneError::Collaborator {
                        collaborator: "remote renderer",
                        reason: e.to_string(),
                    })??;
                artifact.ensure_audio()?;
                observer.on_progress(100.0);
                Ok(ExportOutcome {
                    strategy,
                    delivery: Delivery::Artifact(artifact),
                    fingerprint: None,
                })
            }
            _ => {
                let result = self.exporter.export(request, observer, cancel).await?;
                Ok(ExportOutcome {
                    strategy: ExportStrategy::Local,
                    delivery: Delivery::Artifact(result.artifact),
                    fingerprint: result.fingerprint,
                })
            }
        }
    }
}

fn summarize(outcome: &ExportOutcome) -> String {
    match &outcome.delivery {
        Delivery::Artifact(artifact) => format!(
            "Export ready: {} ({} file(s), {} bytes)",
            artifact.kind(),
            artifact.file_count(),
            artifact.total_bytes()
        ),
        Delivery::File(path) => format!("Export written to {}", path.display()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::DesktopJob;
    use crate::model::{EffectSet, FrequencyChannel, Waveform};

    struct NullBridge;

    impl DesktopExportBridge for NullBridge {
        fn begin(&self, _job: &DesktopJob) -> Result<()> {
            Ok(())
        }
        fn push_chunk(&self, _index: usize, _pcm: &[u8]) -> Result<()> {
            Ok(())
        }
        fn finish(&self) -> Result<PathBuf> {
            Ok(PathBuf::from("/tmp/out.wav"))
        }
    }

    struct NullRemote;

    impl RemoteRenderService for NullRemote {
        fn render(
            &self,
            _request: &RenderRequest,
            _cancel: &CancellationToken,
        ) -> Result<ExportArtifact> {
            Ok(ExportArtifact::Single(Vec::new()))
        }
    }

    fn request(duration_secs: f64) -> RenderRequest {
        RenderRequest::new(
            duration_secs,
            vec![FrequencyChannel::new(1, 432.0, Waveform::Sine)],
            EffectSet::new(),
        )
    }

    #[test]
    fn test_strategy_selection() {
        let local = ExportOrchestrator::new(ExportConfig::for_tests());
        assert_eq!(local.select_strategy(&request(7200.0)), ExportStrategy::Local);

        let server =
            ExportOrchestrator::new(ExportConfig::for_tests()).with_remote(Arc::new(NullRemote));
        assert_eq!(server.select_strategy(&request(600.0)), ExportStrategy::Local);
        assert_eq!(server.select_strategy(&request(7200.0)), ExportStrategy::Server);

        let desktop = ExportOrchestrator::new(ExportConfig::for_tests())
            .with_remote(Arc::new(NullRemote))
            .with_desktop_bridge(Arc::new(NullBridge));
        assert_eq!(desktop.select_strategy(&request(7200.0)), ExportStrategy::Desktop);
    }

    #[tokio::test]
    async fn test_empty_remote_result_is_a_failure() {
        let orchestrator =
            ExportOrchestrator::new(ExportConfig::for_tests()).with_remote(Arc::new(NullRemote));
        let result = orchestrator
            .run(
                &request(7200.0),
                &mut crate::export::NoopObserver,
                &CancellationToken::new(),
            )
            .await;
        assert!(matches!(result, Err(ToneError::EmptyOutput { part: 1 })));
    }

    #[test]
    fn test_timeout_grows_with_duration() {
        let orchestrator = ExportOrchestrator::new(ExportConfig::default());
        assert_eq!(orchestrator.timeout_for(&request(0.0)), Duration::from_secs(30));
        assert!(orchestrator.timeout_for(&request(3600.0)) > Duration::from_secs(30));
        let max = orchestrator.timeout_for(&request(43_200.0)).as_secs_f64();
        assert!((max - 45_000.0).abs() < 1e-3);
    }

    #[test]
    fn test_failed_notice_carries_suggestions() {
        let notice = ExportNotice::from_error(&ToneError::Timeout {
            duration_secs: 100.0,
            limit_secs: 30.0,
        });
        match notice {
            ExportNotice::Failed { code, suggestions, .. } => {
                assert_eq!(code, "TIMEOUT");
                assert!(suggestions.iter().any(|s| s.contains("shorter duration")));
            }
            other => panic!("unexpected notice {:?}", other),
        }
    }
}
