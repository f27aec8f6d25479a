//! Chunked offline renderer
//!
//! Renders a timeline window by window: each window gets a fresh context and
//! a fresh graph, and its output is copied into one master buffer at the
//! window's frame offset. Windows run strictly in order, one at a time.

use std::time::Duration;

use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{debug, info};

use super::{plan_span, CancellationToken, OfflineContext, RenderClock, Slice, StereoBuffer};
use crate::config::{ExportConfig, PhaseMode};
use crate::error::{Result, ToneError};
use crate::graph::{GraphFactory, ToneGraphBuilder};
use crate::model::{frames_for, EffectSet, FrequencyChannel};

/// Spreads seeds of neighbouring windows apart
const SEED_MIX: u64 = 0x9E37_79B9_7F4A_7C15;

/// Window-by-window renderer over a graph factory
pub struct ChunkedRenderer<F: GraphFactory = ToneGraphBuilder> {
    factory: F,
    config: ExportConfig,
}

impl ChunkedRenderer<ToneGraphBuilder> {
    /// Renderer using the standard tone graph
    pub fn new(config: ExportConfig) -> Self {
        Self::with_factory(config, ToneGraphBuilder::new())
    }
}

impl<F: GraphFactory> ChunkedRenderer<F> {
    pub fn with_factory(config: ExportConfig, factory: F) -> Self {
        Self { factory, config }
    }

    pub fn config(&self) -> &ExportConfig {
        &self.config
    }

    /// Render `duration_secs` from the start of the timeline.
    ///
    /// The result always holds exactly `round(duration_secs * sample_rate)`
    /// frames. `on_progress` receives 0-100 after every window.
    pub async fn render<P>(
        &self,
        duration_secs: f64,
        channels: &[FrequencyChannel],
        effects: &EffectSet,
        sample_rate: u32,
        mut on_progress: P,
    ) -> Result<StereoBuffer>
    where
        P: FnMut(f64) + Send,
    {
        let total_frames = frames_for(duration_secs, sample_rate);
        self.render_span(
            0,
            total_frames,
            channels,
            effects,
            sample_rate,
            &mut on_progress,
            &CancellationToken::new(),
        )
        .await
    }

    /// Render timeline frames `start_frame..start_frame + frame_count`.
    ///
    /// # Arguments
    /// * `start_frame` - First timeline frame of the span
    /// * `frame_count` - Frames to render; the buffer is exactly this long
    /// * `on_progress` - Percent of this span completed, after each window
    /// * `cancel` - Checked before every window
    ///
    /// # Errors
    /// Any window failure aborts the whole span with no retry; the partial
    /// buffer is dropped.
    #[allow(clippy::too_many_arguments)]
    pub async fn render_span(
        &self,
        start_frame: u64,
        frame_count: u64,
        channels: &[FrequencyChannel],
        effects: &EffectSet,
        sample_rate: u32,
        on_progress: &mut (dyn FnMut(f64) + Send),
        cancel: &CancellationToken,
    ) -> Result<StereoBuffer> {
        if !channels.iter().any(|c| c.enabled) {
            return Err(ToneError::NoEnabledChannels);
        }

        let window_frames = self.config.window_frames(sample_rate);
        let slices = plan_span(start_frame, frame_count, window_frames);
        let total = slices.len();

        info!(
            start_frame,
            frame_count,
            windows = total,
            sample_rate,
            phase_mode = ?self.config.phase_mode,
            "Rendering span"
        );

        let mut master = StereoBuffer::new(frame_count as usize, sample_rate);

        for slice in &slices {
            cancel.check()?;

            let rendered = self.render_window(slice, channels, effects, sample_rate).await?;
            master.write_at((slice.start_frame - start_frame) as usize, &rendered)?;

            debug!(
                window = slice.index + 1,
                total,
                start_secs = slice.start_secs(sample_rate),
                "Window rendered"
            );
            on_progress((slice.index + 1) as f64 / total as f64 * 100.0);

            self.cooperative_yield(self.config.slice_yield_ms).await;
        }

        Ok(master)
    }

    async fn render_window(
        &self,
        slice: &Slice,
        channels: &[FrequencyChannel],
        effects: &EffectSet,
        sample_rate: u32,
    ) -> Result<StereoBuffer> {
        let clock_start = match self.config.phase_mode {
            PhaseMode::Continuous => slice.start_frame,
            PhaseMode::ResetPerSlice => 0,
        };
        let ctx = OfflineContext::new(
            slice.index,
            slice.frame_count as usize,
            RenderClock::new(clock_start, sample_rate),
        )?;

        let mut rng = self.window_rng(slice);
        let graph = self
            .factory
            .build(&ctx, channels, effects, &mut rng)
            .map_err(|e| ToneError::RenderFailed {
                slice_index: slice.index,
                reason: format!("graph construction failed: {}", e),
            })?;

        ctx.start_rendering(graph).await
    }

    /// Random source for one window, reproducible when a seed is configured
    fn window_rng(&self, slice: &Slice) -> StdRng {
        match self.config.noise_seed {
            Some(seed) => StdRng::seed_from_u64(seed ^ slice.start_frame.wrapping_mul(SEED_MIX)),
            None => StdRng::from_entropy(),
        }
    }

    async fn cooperative_yield(&self, millis: u64) {
        if millis == 0 {
            tokio::task::yield_now().await;
        } else {
            tokio::time::sleep(Duration::from_millis(millis)).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{EffectKind, Waveform};

    fn sine(frequency: f64) -> Vec<FrequencyChannel> {
        vec![FrequencyChannel::new(1, frequency, Waveform::Sine)]
    }

    fn small_window_config(window_secs: f64) -> ExportConfig {
        ExportConfig {
            slice_window_secs: window_secs,
            ..ExportConfig::for_tests()
        }
    }

    #[tokio::test]
    async fn test_render_length_matches_duration() {
        let renderer = ChunkedRenderer::new(small_window_config(0.7));
        let buffer = renderer
            .render(2.5, &sine(100.0), &EffectSet::new(), 1000, |_| {})
            .await
            .unwrap();
        assert_eq!(buffer.num_frames(), 2500);
        assert_eq!(buffer.num_channels(), 2);
    }

    #[tokio::test]
    async fn test_progress_reaches_100() {
        let renderer = ChunkedRenderer::new(small_window_config(1.0));
        let mut seen = Vec::new();
        renderer
            .render(3.0, &sine(100.0), &EffectSet::new(), 1000, |p| seen.push(p))
            .await
            .unwrap();
        assert_eq!(seen.len(), 3);
        assert_eq!(seen.last().copied(), Some(100.0));
        assert!(seen.windows(2).all(|w| w[0] < w[1]));
    }

    #[tokio::test]
    async fn test_all_channels_disabled_fails_fast() {
        let renderer = ChunkedRenderer::new(small_window_config(1.0));
        let channels = vec![FrequencyChannel::new(1, 440.0, Waveform::Sine).disabled()];
        let result = renderer
            .render(2.0, &channels, &EffectSet::new(), 1000, |_| {})
            .await;
        assert!(matches!(result, Err(ToneError::NoEnabledChannels)));
    }

    #[tokio::test]
    async fn test_cancelled_before_first_window() {
        let renderer = ChunkedRenderer::new(small_window_config(1.0));
        let cancel = CancellationToken::new();
        cancel.cancel();
        let result = renderer
            .render_span(0, 2000, &sine(100.0), &EffectSet::new(), 1000, &mut |_| {}, &cancel)
            .await;
        assert!(matches!(result, Err(ToneError::Cancelled)));
    }

    #[tokio::test]
    async fn test_seeded_noise_is_reproducible() {
        let renderer = ChunkedRenderer::new(small_window_config(1.0));
        let effects = EffectSet::new().with(EffectKind::Noise, 0.5);
        let a = renderer
            .render(2.0, &sine(100.0), &effects, 1000, |_| {})
            .await
            .unwrap();
        let b = renderer
            .render(2.0, &sine(100.0), &effects, 1000, |_| {})
            .await
            .unwrap();
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn test_reset_per_slice_restarts_phase() {
        let config = ExportConfig {
            phase_mode: PhaseMode::ResetPerSlice,
            ..small_window_config(1.0)
        };
        let renderer = ChunkedRenderer::new(config);
        // 0.3 Hz never completes a cycle in one window, so every window repeats
        let buffer = renderer
            .render(3.0, &sine(0.3), &EffectSet::new(), 1000, |_| {})
            .await
            .unwrap();
        assert_eq!(&buffer.left()[0..1000], &buffer.left()[1000..2000]);
    }
}
