//! Export pipeline
//!
//! Sliced rendering into WAV parts, packaging, delivery strategies and
//! progress reporting.

mod archive;
mod artifact;
mod collaborators;
mod observer;
mod orchestrator;
mod sliced;

pub use archive::{estimated_archive_size, package_parts};
pub use artifact::{part_name, ExportArtifact};
pub use collaborators::{DesktopExportBridge, DesktopJob, RemoteRenderService};
pub use observer::{ExportObserver, LoggingObserver, NoopObserver, ProgressTracker};
pub use orchestrator::{
    Delivery, ExportNotice, ExportOrchestrator, ExportOutcome, ExportStrategy, Notifier,
    TracingNotifier,
};
pub use sliced::{ExportResult, SlicedExporter};
