//! Out-of-process delivery paths
//!
//! The desktop shell and the remote renderer live outside this crate; these
//! traits are the seams they plug into.

use std::path::PathBuf;

use serde::Serialize;

use super::ExportArtifact;
use crate::engine::CancellationToken;
use crate::error::Result;
use crate::model::RenderRequest;

/// Stream description sent before the first chunk
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DesktopJob {
    pub duration_secs: f64,
    pub sample_rate: u32,
    pub channels: u16,
    pub bits_per_sample: u16,
    pub total_frames: u64,
    /// Number of chunks that will follow
    pub chunks: usize,
}

/// Native desktop writer fed with headerless PCM
///
/// Calls arrive in order: one `begin`, chunks with increasing 0-based
/// indices, then `finish`.
pub trait DesktopExportBridge: Send + Sync {
    fn begin(&self, job: &DesktopJob) -> Result<()>;

    /// Interleaved 16-bit little-endian stereo PCM for one slice
    fn push_chunk(&self, index: usize, pcm: &[u8]) -> Result<()>;

    /// Close the stream and return where the file was written
    fn finish(&self) -> Result<PathBuf>;
}

/// Server-side renderer for very long exports
///
/// Runs on a blocking worker. The export stops waiting once its timeout
/// expires and trips `cancel`; implementations poll it and abandon the job.
pub trait RemoteRenderService: Send + Sync {
    fn render(&self, request: &RenderRequest, cancel: &CancellationToken)
        -> Result<ExportArtifact>;
}
