//! Frame pacing statistics for the info overlay

use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Summary of the recent frame intervals, in milliseconds
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FrameStats {
    pub avg_ms: f64,
    pub min_ms: f64,
    pub max_ms: f64,
    /// Median interval
    pub p50_ms: f64,
    pub p95_ms: f64,
    pub p99_ms: f64,
    pub sample_count: usize,
}

/// Sliding window over the intervals between frame starts
#[derive(Debug)]
pub struct FrameProfiler {
    intervals: VecDeque<Duration>,
    window: usize,
    previous_start: Option<Instant>,
}

impl Default for FrameProfiler {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameProfiler {
    /// Five seconds of history at 60 fps
    pub fn new() -> Self {
        Self::with_capacity(300)
    }

    pub fn with_capacity(window: usize) -> Self {
        let window = window.max(1);
        Self {
            intervals: VecDeque::with_capacity(window),
            window,
            previous_start: None,
        }
    }

    pub fn begin_frame(&mut self) {
        self.begin_frame_at(Instant::now());
    }

    pub fn begin_frame_at(&mut self, now: Instant) {
        if let Some(previous) = self.previous_start.replace(now) {
            if self.intervals.len() == self.window {
                self.intervals.pop_front();
            }
            self.intervals.push_back(now.saturating_duration_since(previous));
        }
    }

    /// Drop the history, e.g. so a pause does not count as one long frame
    pub fn reset(&mut self) {
        self.intervals.clear();
        self.previous_start = None;
    }

    pub fn stats(&self) -> FrameStats {
        let mut sorted: Vec<f64> = self.intervals.iter().map(millis).collect();
        if sorted.is_empty() {
            return FrameStats::default();
        }
        sorted.sort_by(f64::total_cmp);

        FrameStats {
            avg_ms: sorted.iter().sum::<f64>() / sorted.len() as f64,
            min_ms: sorted[0],
            max_ms: sorted[sorted.len() - 1],
            p50_ms: percentile(&sorted, 0.50),
            p95_ms: percentile(&sorted, 0.95),
            p99_ms: percentile(&sorted, 0.99),
            sample_count: sorted.len(),
        }
    }

    /// Frames per second over the window
    pub fn fps(&self) -> f64 {
        let total: Duration = self.intervals.iter().sum();
        if total.is_zero() {
            return 0.0;
        }
        self.intervals.len() as f64 / total.as_secs_f64()
    }

    pub fn last_frame_time_ms(&self) -> f64 {
        self.intervals.back().map(millis).unwrap_or(0.0)
    }
}

fn millis(duration: &Duration) -> f64 {
    duration.as_secs_f64() * 1000.0
}

/// Nearest-rank lookup in ascending values
fn percentile(sorted: &[f64], p: f64) -> f64 {
    match sorted.len() {
        0 => 0.0,
        n => sorted[((n - 1) as f64 * p).round() as usize],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed(profiler: &mut FrameProfiler, frames: u64, step_ms: u64) {
        let start = Instant::now();
        for i in 0..frames {
            profiler.begin_frame_at(start + Duration::from_millis(step_ms * i));
        }
    }

    #[test]
    fn test_steady_frames() {
        let mut profiler = FrameProfiler::new();
        feed(&mut profiler, 11, 20);

        let stats = profiler.stats();
        assert_eq!(stats.sample_count, 10);
        assert!((stats.avg_ms - 20.0).abs() < 1e-6);
        assert!((stats.p95_ms - 20.0).abs() < 1e-6);
        assert!((profiler.fps() - 50.0).abs() < 1e-6);
        assert!((profiler.last_frame_time_ms() - 20.0).abs() < 1e-6);
    }

    #[test]
    fn test_window_is_bounded() {
        let mut profiler = FrameProfiler::with_capacity(4);
        feed(&mut profiler, 10, 10);
        assert_eq!(profiler.stats().sample_count, 4);
    }

    #[test]
    fn test_reset_clears_history() {
        let mut profiler = FrameProfiler::new();
        feed(&mut profiler, 3, 16);
        profiler.reset();
        assert_eq!(profiler.fps(), 0.0);
        assert_eq!(profiler.stats(), FrameStats::default());
    }

    #[test]
    fn test_single_frame_has_no_rate() {
        let mut profiler = FrameProfiler::new();
        profiler.begin_frame();
        assert_eq!(profiler.fps(), 0.0);
        assert_eq!(profiler.last_frame_time_ms(), 0.0);
    }

    #[test]
    fn test_percentile() {
        let values: Vec<f64> = (1..=11).map(f64::from).collect();
        assert_eq!(percentile(&values, 0.5), 6.0);
        assert_eq!(percentile(&values, 0.0), 1.0);
        assert_eq!(percentile(&values, 1.0), 11.0);
        assert_eq!(percentile(&[], 0.5), 0.0);
    }
}
