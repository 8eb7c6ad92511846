/// Length of one FPS window in milliseconds.
pub const WINDOW_MS: u64 = 1000;

/// Counts frames over tumbling one-second windows.
///
/// The window opens at the first observed frame. Each call counts the frame
/// first, so the frame that closes a window is included in its reading.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RateMonitor {
    frame_count: u32,
    window_start_ms: Option<u64>,
}

impl RateMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a frame at `now_ms`. Returns the frame count of the window
    /// when at least [`WINDOW_MS`] has elapsed since it opened, then starts a
    /// new window at `now_ms`.
    ///
    /// A clock that steps backwards never closes a window.
    pub fn on_frame(&mut self, now_ms: u64) -> Option<u32> {
        let start = *self.window_start_ms.get_or_insert(now_ms);
        self.frame_count += 1;

        if now_ms.saturating_sub(start) >= WINDOW_MS {
            let fps = self.frame_count;
            self.frame_count = 0;
            self.window_start_ms = Some(now_ms);
            Some(fps)
        } else {
            None
        }
    }

    /// Frames counted in the currently open window.
    pub fn frame_count(&self) -> u32 {
        self.frame_count
    }

    /// Start of the currently open window, if any frame has been seen.
    pub fn window_start_ms(&self) -> Option<u64> {
        self.window_start_ms
    }

    /// Reset all counters.
    pub fn reset(&mut self) {
        self.frame_count = 0;
        self.window_start_ms = None;
    }
}
