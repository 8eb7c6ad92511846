use serde::Serialize;
use std::time::{Duration, Instant};

/// Collects diagnostic statistics for a preview session.
pub struct DiagnosticStats {
    frame_count: u64,
    drop_count: u64,
    error_count: u64,
    total_bytes: u64,
    start_time: Instant,
    last_frame_time: Option<Instant>,
    processing_us: u64,
    reported_fps: Option<u32>,
}

/// Snapshot of diagnostic stats for serialisation.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiagnosticSnapshot {
    pub fps: f64,
    pub reported_fps: Option<u32>,
    pub frame_count: u64,
    pub drop_count: u64,
    pub error_count: u64,
    pub drop_rate: f64,
    pub processing_ms: f64,
    pub bandwidth_bps: u64,
    /// Milliseconds since the last processed frame; a growing value means
    /// the source or the worker has stalled.
    pub idle_ms: Option<f64>,
}

impl DiagnosticStats {
    /// Create new stats with zeroed counters.
    pub fn new() -> Self {
        Self {
            frame_count: 0,
            drop_count: 0,
            error_count: 0,
            total_bytes: 0,
            start_time: Instant::now(),
            last_frame_time: None,
            processing_us: 0,
            reported_fps: None,
        }
    }

    /// Record a frame that made it through the pipeline.
    pub fn record_frame(&mut self, bytes: usize, processing: Duration) {
        self.frame_count += 1;
        self.total_bytes += bytes as u64;
        self.last_frame_time = Some(Instant::now());
        self.processing_us = processing.as_micros() as u64;
    }

    /// Record a frame discarded by the keep-only-latest policy.
    pub fn record_drop(&mut self) {
        self.drop_count += 1;
    }

    /// Record a frame the pipeline rejected as malformed.
    pub fn record_error(&mut self) {
        self.error_count += 1;
    }

    /// Remember the most recent per-window FPS reading.
    pub fn record_fps(&mut self, fps: u32) {
        self.reported_fps = Some(fps);
    }

    /// Average FPS since the stats were created or reset.
    pub fn fps(&self) -> f64 {
        let elapsed = self.start_time.elapsed().as_secs_f64();
        if elapsed < 0.001 {
            return 0.0;
        }
        self.frame_count as f64 / elapsed
    }

    /// Drop rate as a percentage (0.0 - 100.0).
    pub fn drop_rate(&self) -> f64 {
        let total = self.frame_count + self.drop_count;
        if total == 0 {
            return 0.0;
        }
        (self.drop_count as f64 / total as f64) * 100.0
    }

    /// Time spent in the pipeline for the latest frame, in milliseconds.
    pub fn processing_ms(&self) -> f64 {
        self.processing_us as f64 / 1000.0
    }

    /// Ingested plane bytes per second.
    pub fn bandwidth_bps(&self) -> u64 {
        let elapsed = self.start_time.elapsed().as_secs_f64();
        if elapsed < 0.001 {
            return 0;
        }
        (self.total_bytes as f64 / elapsed) as u64
    }

    /// Time since the last processed frame, if any.
    pub fn since_last_frame(&self) -> Option<Duration> {
        self.last_frame_time.map(|t| t.elapsed())
    }

    /// Reset all counters.
    pub fn reset(&mut self) {
        self.frame_count = 0;
        self.drop_count = 0;
        self.error_count = 0;
        self.total_bytes = 0;
        self.start_time = Instant::now();
        self.last_frame_time = None;
        self.processing_us = 0;
        self.reported_fps = None;
    }

    /// Take a serialisable snapshot.
    pub fn snapshot(&self) -> DiagnosticSnapshot {
        DiagnosticSnapshot {
            fps: self.fps(),
            reported_fps: self.reported_fps,
            frame_count: self.frame_count,
            drop_count: self.drop_count,
            error_count: self.error_count,
            drop_rate: self.drop_rate(),
            processing_ms: self.processing_ms(),
            bandwidth_bps: self.bandwidth_bps(),
            idle_ms: self
                .since_last_frame()
                .map(|idle| idle.as_secs_f64() * 1000.0),
        }
    }
}

impl Default for DiagnosticStats {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn initialises_with_zero_values() {
        let stats = DiagnosticStats::new();
        assert_eq!(stats.frame_count, 0);
        assert_eq!(stats.drop_count, 0);
        assert_eq!(stats.error_count, 0);
        assert_eq!(stats.total_bytes, 0);
        assert!(stats.since_last_frame().is_none());
    }

    #[test]
    fn record_frame_tracks_count_and_processing_time() {
        let mut stats = DiagnosticStats::new();
        stats.record_frame(1000, Duration::from_micros(2500));
        assert_eq!(stats.frame_count, 1);
        assert_eq!(stats.processing_ms(), 2.5);
        stats.record_frame(1000, Duration::from_micros(500));
        assert_eq!(stats.frame_count, 2);
        assert_eq!(stats.processing_ms(), 0.5);
        assert!(stats.since_last_frame().is_some());
    }

    #[test]
    fn record_drop_and_error_are_counted_separately() {
        let mut stats = DiagnosticStats::new();
        stats.record_drop();
        stats.record_drop();
        stats.record_error();
        assert_eq!(stats.drop_count, 2);
        assert_eq!(stats.error_count, 1);
    }

    #[test]
    fn fps_is_positive_after_frames() {
        let mut stats = DiagnosticStats::new();
        for _ in 0..30 {
            stats.record_frame(1000, Duration::ZERO);
        }
        thread::sleep(Duration::from_millis(50));
        let fps = stats.fps();
        assert!(fps > 0.0, "fps should be positive, got {fps}");
    }

    #[test]
    fn drop_rate_returns_percentage() {
        let mut stats = DiagnosticStats::new();
        stats.record_frame(1000, Duration::ZERO);
        stats.record_frame(1000, Duration::ZERO);
        stats.record_drop();
        let rate = stats.drop_rate();
        assert!(
            (rate - 33.333).abs() < 1.0,
            "drop rate should be ~33%, got {rate}"
        );
    }

    #[test]
    fn drop_rate_zero_when_no_events() {
        let stats = DiagnosticStats::new();
        assert_eq!(stats.drop_rate(), 0.0);
    }

    #[test]
    fn bandwidth_bps_tracks_bytes() {
        let mut stats = DiagnosticStats::new();
        stats.record_frame(10_000, Duration::ZERO);
        thread::sleep(Duration::from_millis(50));
        let bps = stats.bandwidth_bps();
        assert!(bps > 0, "bandwidth should be positive, got {bps}");
    }

    #[test]
    fn reset_clears_all_counters() {
        let mut stats = DiagnosticStats::new();
        stats.record_frame(1000, Duration::from_millis(3));
        stats.record_drop();
        stats.record_error();
        stats.record_fps(30);
        stats.reset();
        assert_eq!(stats.frame_count, 0);
        assert_eq!(stats.drop_count, 0);
        assert_eq!(stats.error_count, 0);
        assert_eq!(stats.total_bytes, 0);
        assert_eq!(stats.reported_fps, None);
    }

    #[test]
    fn snapshot_serialises_to_camelcase() {
        let mut stats = DiagnosticStats::new();
        stats.record_frame(5000, Duration::ZERO);
        stats.record_fps(24);
        let json = serde_json::to_value(stats.snapshot()).unwrap();
        assert!(json["frameCount"].is_number());
        assert!(json["dropCount"].is_number());
        assert!(json["errorCount"].is_number());
        assert_eq!(json["reportedFps"], 24);
    }

    #[test]
    fn snapshot_reported_fps_none_serialises_as_null() {
        let stats = DiagnosticStats::new();
        let json = serde_json::to_value(stats.snapshot()).unwrap();
        assert!(json["reportedFps"].is_null());
        assert!(json["idleMs"].is_null());
    }

    #[test]
    fn snapshot_reports_idle_time_after_a_frame() {
        let mut stats = DiagnosticStats::new();
        stats.record_frame(100, Duration::ZERO);
        thread::sleep(Duration::from_millis(20));
        let idle = stats.snapshot().idle_ms.unwrap();
        assert!(idle >= 20.0, "idle should cover the sleep, got {idle}");
    }
}
