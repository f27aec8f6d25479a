//! Stereo sample buffers
//!
//! Rendered audio is held de-interleaved as 32-bit float, one `Vec` per
//! channel. The same type serves as a per-window render target and as the
//! master buffer a whole export is stitched into.

use crate::error::{Result, ToneError};

/// Every render target is stereo
pub const STEREO_CHANNELS: usize = 2;

// ============================================================================
// Helper Functions
// ============================================================================

/// Convert linear amplitude to decibels
///
/// Returns `-f32::INFINITY` for zero input.
#[inline]
pub fn linear_to_db(linear: f32) -> f32 {
    if linear <= 0.0 {
        f32::NEG_INFINITY
    } else {
        20.0 * linear.log10()
    }
}

// ============================================================================
// Stereo Buffer
// ============================================================================

/// De-interleaved stereo audio at a fixed sample rate
#[derive(Debug, Clone, PartialEq)]
pub struct StereoBuffer {
    /// `samples[0]` is left, `samples[1]` is right; both always equal length
    pub samples: Vec<Vec<f32>>,
    pub sample_rate: u32,
}

impl StereoBuffer {
    /// Allocate a silent buffer of `num_frames` frames
    pub fn new(num_frames: usize, sample_rate: u32) -> Self {
        Self {
            samples: vec![vec![0.0; num_frames]; STEREO_CHANNELS],
            sample_rate,
        }
    }

    /// Build from two channel vectors of equal length
    pub fn from_channels(left: Vec<f32>, right: Vec<f32>, sample_rate: u32) -> Result<Self> {
        if left.len() != right.len() {
            return Err(ToneError::BufferLengthMismatch {
                lengths: vec![left.len(), right.len()],
            });
        }
        Ok(Self {
            samples: vec![left, right],
            sample_rate,
        })
    }

    pub fn num_channels(&self) -> usize {
        self.samples.len()
    }

    /// Frames per channel
    pub fn num_frames(&self) -> usize {
        self.samples.first().map_or(0, Vec::len)
    }

    pub fn is_empty(&self) -> bool {
        self.num_frames() == 0
    }

    pub fn duration_secs(&self) -> f64 {
        self.num_frames() as f64 / self.sample_rate as f64
    }

    pub fn channel(&self, channel: usize) -> &[f32] {
        &self.samples[channel]
    }

    pub fn channel_mut(&mut self, channel: usize) -> &mut [f32] {
        &mut self.samples[channel]
    }

    pub fn left(&self) -> &[f32] {
        &self.samples[0]
    }

    pub fn right(&self) -> &[f32] {
        &self.samples[1]
    }

    /// Mutable access to both channels at once
    pub fn stereo_mut(&mut self) -> (&mut [f32], &mut [f32]) {
        let (left, right) = self.samples.split_at_mut(1);
        (&mut left[0], &mut right[0])
    }

    /// Multiply every sample by `gain`
    pub fn apply_gain(&mut self, gain: f32) {
        for channel in &mut self.samples {
            for sample in channel.iter_mut() {
                *sample *= gain;
            }
        }
    }

    /// Copy `source` into this buffer starting at frame `offset`
    pub fn write_at(&mut self, offset: usize, source: &StereoBuffer) -> Result<()> {
        let end = offset + source.num_frames();
        if end > self.num_frames() || source.num_channels() != self.num_channels() {
            return Err(ToneError::BufferLengthMismatch {
                lengths: vec![self.num_frames(), end],
            });
        }
        for (dst, src) in self.samples.iter_mut().zip(&source.samples) {
            dst[offset..end].copy_from_slice(src);
        }
        Ok(())
    }

    /// First `(channel, frame)` holding NaN or infinity
    pub fn find_non_finite(&self) -> Option<(usize, usize)> {
        self.samples.iter().enumerate().find_map(|(ch, data)| {
            data.iter()
                .position(|s| !s.is_finite())
                .map(|frame| (ch, frame))
        })
    }

    /// Absolute peak over both channels
    pub fn peak(&self) -> f32 {
        self.samples
            .iter()
            .flat_map(|channel| channel.iter())
            .map(|s| s.abs())
            .fold(0.0_f32, f32::max)
    }

    /// RMS level of one channel in dB
    pub fn rms_db(&self, channel: usize) -> f32 {
        let data = &self.samples[channel];
        if data.is_empty() {
            return f32::NEG_INFINITY;
        }
        let sum_sq: f64 = data.iter().map(|&s| (s as f64) * (s as f64)).sum();
        linear_to_db((sum_sq / data.len() as f64).sqrt() as f32)
    }
}
