//! Timeline slicing
//!
//! Splits a frame range into consecutive fixed-size windows; the last one
//! takes whatever remains.

use serde::Serialize;

/// One window of the timeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Slice {
    /// 0-based position in the plan
    pub index: usize,
    pub start_frame: u64,
    pub frame_count: u64,
}

impl Slice {
    pub fn end_frame(&self) -> u64 {
        self.start_frame + self.frame_count
    }

    pub fn start_secs(&self, sample_rate: u32) -> f64 {
        self.start_frame as f64 / sample_rate as f64
    }

    pub fn duration_secs(&self, sample_rate: u32) -> f64 {
        self.frame_count as f64 / sample_rate as f64
    }
}

/// Cover `start_frame..start_frame + total_frames` with windows of `window_frames`.
///
/// Yields `ceil(total / window)` slices; no slice is empty.
pub fn plan_span(start_frame: u64, total_frames: u64, window_frames: u64) -> Vec<Slice> {
    let window = window_frames.max(1);
    let count = total_frames.div_ceil(window);
    (0..count)
        .map(|i| {
            let offset = i * window;
            Slice {
                index: i as usize,
                start_frame: start_frame + offset,
                frame_count: window.min(total_frames - offset),
            }
        })
        .collect()
}

/// Cover `0..total_frames` with windows of `window_frames`
pub fn plan_slices(total_frames: u64, window_frames: u64) -> Vec<Slice> {
    plan_span(0, total_frames, window_frames)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_exact_multiple() {
        let slices = plan_slices(240, 120);
        assert_eq!(slices.len(), 2);
        assert!(slices.iter().all(|s| s.frame_count == 120));
    }

    #[test]
    fn test_remainder_slice() {
        let slices = plan_slices(5000, 2400);
        let counts: Vec<u64> = slices.iter().map(|s| s.frame_count).collect();
        assert_eq!(counts, vec![2400, 2400, 200]);
        assert_eq!(slices[2].start_frame, 4800);
        assert_eq!(slices[2].end_frame(), 5000);
    }

    #[test]
    fn test_span_offsets() {
        let slices = plan_span(1000, 250, 100);
        assert_eq!(
            slices,
            vec![
                Slice { index: 0, start_frame: 1000, frame_count: 100 },
                Slice { index: 1, start_frame: 1100, frame_count: 100 },
                Slice { index: 2, start_frame: 1200, frame_count: 50 },
            ]
        );
    }

    #[test]
    fn test_empty_range() {
        assert!(plan_slices(0, 120).is_empty());
    }

    #[test]
    fn test_slice_seconds() {
        let slice = Slice { index: 1, start_frame: 96_000, frame_count: 48_000 };
        assert_eq!(slice.start_secs(48_000), 2.0);
        assert_eq!(slice.duration_secs(48_000), 1.0);
    }
}
