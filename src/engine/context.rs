//! Offline (non-real-time) rendering context
//!
//! A context renders a fixed number of stereo frames as fast as possible. It
//! is created per window, owns nothing but its dimensions and clock, and is
//! consumed by `start_rendering`, so a graph can never outlive its window.

use crate::engine::buffer::{StereoBuffer, STEREO_CHANNELS};
use crate::error::{Result, ToneError};
use crate::graph::ToneGraph;

/// Maps a window-local frame index onto the timeline oscillators follow
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderClock {
    /// Timeline frame of the window's first sample
    pub start_frame: u64,
    pub sample_rate: u32,
}

impl RenderClock {
    pub fn new(start_frame: u64, sample_rate: u32) -> Self {
        Self {
            start_frame,
            sample_rate,
        }
    }

    /// Timeline position of local frame `index`, in seconds
    #[inline]
    pub fn seconds(&self, index: usize) -> f64 {
        (self.start_frame + index as u64) as f64 / self.sample_rate as f64
    }

    /// Normalized phase in `[0, 1)` of a `frequency` Hz cycle at local frame `index`.
    ///
    /// Whole seconds and the sub-second remainder are folded separately, so
    /// precision holds across a 12-hour timeline and the result depends only
    /// on the timeline frame, not on how the timeline was windowed.
    #[inline]
    pub fn cycles(&self, frequency: f64, index: usize) -> f64 {
        let frame = self.start_frame + index as u64;
        let rate = self.sample_rate as u64;
        let whole = (frame / rate) as f64;
        let rem = (frame % rate) as f64;
        ((frequency * whole).fract() + frequency * rem / self.sample_rate as f64).fract()
    }
}

/// Fixed-size stereo render target for one window
#[derive(Debug, Clone)]
pub struct OfflineContext {
    slice_index: usize,
    num_frames: usize,
    clock: RenderClock,
}

impl OfflineContext {
    /// Create a context for window `slice_index` of `num_frames` frames
    pub fn new(slice_index: usize, num_frames: usize, clock: RenderClock) -> Result<Self> {
        if num_frames == 0 {
            return Err(ToneError::RenderFailed {
                slice_index,
                reason: "render window has no frames".to_string(),
            });
        }
        Ok(Self {
            slice_index,
            num_frames,
            clock,
        })
    }

    pub fn slice_index(&self) -> usize {
        self.slice_index
    }

    pub fn num_frames(&self) -> usize {
        self.num_frames
    }

    pub fn num_channels(&self) -> usize {
        STEREO_CHANNELS
    }

    pub fn sample_rate(&self) -> u32 {
        self.clock.sample_rate
    }

    pub fn clock(&self) -> RenderClock {
        self.clock
    }

    /// Run `graph` into a fresh buffer on the blocking pool.
    ///
    /// Resolves once the whole window is computed. A panicking graph or one
    /// producing NaN/Inf fails the window.
    pub async fn start_rendering(self, mut graph: ToneGraph) -> Result<StereoBuffer> {
        let slice_index = self.slice_index;
        let clock = self.clock;
        let num_frames = self.num_frames;

        let rendered = tokio::task::spawn_blocking(move || {
            let mut output = StereoBuffer::new(num_frames, clock.sample_rate);
            graph.render(&mut output, &clock);
            output
        })
        .await
        .map_err(|e| ToneError::RenderFailed {
            slice_index,
            reason: format!("render worker failed: {}", e),
        })?;

        if let Some((channel, frame)) = rendered.find_non_finite() {
            return Err(ToneError::RenderFailed {
                slice_index,
                reason: format!(
                    "non-finite sample in channel {} at frame {}",
                    channel, frame
                ),
            });
        }

        Ok(rendered)
    }
}
