use parking_lot::{Condvar, Mutex};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use super::sink::DisplaySink;
use crate::diagnostics::stats::{DiagnosticSnapshot, DiagnosticStats};
use crate::frame::PlanarFrame;
use crate::pipeline::config::PipelineConfig;
use crate::pipeline::PipelineController;

/// How long the worker waits for a frame before re-checking `running`.
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// A frame as delivered by the video source, with its per-frame metadata.
#[derive(Debug, Clone)]
pub struct SourceFrame {
    pub frame: PlanarFrame,
    /// Clockwise rotation needed to reach display orientation.
    pub rotation_degrees: i32,
    /// Arrival time in milliseconds on the caller's clock.
    pub timestamp_ms: u64,
}

struct SlotState<T> {
    pending: Option<(u64, T)>,
    generation: u64,
    closed: bool,
}

/// Single-entry mailbox that keeps only the latest item.
///
/// Offering while an item is pending replaces it; the replaced item is
/// dropped, releasing whatever it owns. Every item is stamped with the
/// slot generation current when it was offered, so a consumer can tell
/// items offered before a `restart` from those offered after it.
pub struct LatestFrameSlot<T> {
    state: Mutex<SlotState<T>>,
    ready: Condvar,
}

impl<T> LatestFrameSlot<T> {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(SlotState {
                pending: None,
                generation: 0,
                closed: false,
            }),
            ready: Condvar::new(),
        }
    }

    /// Store `item` as the pending item. Returns `true` if an older pending
    /// item was discarded. Items offered after `close` are dropped.
    pub fn offer(&self, item: T) -> bool {
        let mut state = self.state.lock();
        if state.closed {
            return true;
        }
        let stamped = (state.generation, item);
        let replaced = state.pending.replace(stamped).is_some();
        self.ready.notify_one();
        replaced
    }

    /// Take the pending item and its generation, waiting up to `timeout`
    /// for one to arrive.
    pub fn take(&self, timeout: Duration) -> Option<(u64, T)> {
        let deadline = Instant::now() + timeout;
        let mut state = self.state.lock();
        while state.pending.is_none() && !state.closed {
            if self.ready.wait_until(&mut state, deadline).timed_out() {
                break;
            }
        }
        state.pending.take()
    }

    /// Start a new generation and discard any pending item. Returns the
    /// new generation.
    pub fn restart(&self) -> u64 {
        let mut state = self.state.lock();
        state.pending = None;
        state.generation += 1;
        state.generation
    }

    /// Generation stamped on items offered from now on.
    pub fn generation(&self) -> u64 {
        self.state.lock().generation
    }

    /// Refuse further items and wake any waiter.
    pub fn close(&self) {
        let mut state = self.state.lock();
        state.closed = true;
        state.pending = None;
        self.ready.notify_all();
    }
}

impl<T> Default for LatestFrameSlot<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// A running preview: one worker thread owning a `PipelineController`.
///
/// The video source calls `submit` from its delivery thread. The worker
/// processes the latest pending frame and hands the result to the sink;
/// frames that arrive while one is pending are dropped, never queued.
pub struct PreviewSession {
    slot: Arc<LatestFrameSlot<SourceFrame>>,
    running: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
    stats: Arc<Mutex<DiagnosticStats>>,
}

impl PreviewSession {
    /// Spawn the worker thread and start accepting frames.
    pub fn start(config: PipelineConfig, sink: Arc<dyn DisplaySink>) -> Self {
        let slot = Arc::new(LatestFrameSlot::new());
        let running = Arc::new(AtomicBool::new(true));
        let stats = Arc::new(Mutex::new(DiagnosticStats::new()));

        let thread = {
            let worker = Worker::new(
                PipelineController::new(config),
                Arc::clone(&slot),
                Arc::clone(&stats),
                sink,
            );
            let running = Arc::clone(&running);
            std::thread::Builder::new()
                .name("delta-pipeline".to_string())
                .spawn(move || worker.run(&running))
                .expect("failed to spawn pipeline thread")
        };
        info!("preview session started");

        Self {
            slot,
            running,
            thread: Some(thread),
            stats,
        }
    }

    /// Offer a frame from the video source. Never blocks on processing.
    ///
    /// Returns `false` if the frame displaced a pending one or the session
    /// is stopped; the displaced frame is released immediately.
    pub fn submit(&self, frame: SourceFrame) -> bool {
        if !self.is_running() {
            return false;
        }
        if self.slot.offer(frame) {
            self.stats.lock().record_drop();
            debug!("pipeline busy, dropped pending frame");
            return false;
        }
        true
    }

    /// Signal that the video source restarted. The pending frame is
    /// discarded and the controller state is cleared before the first frame
    /// submitted after this call. A frame already in flight finishes against
    /// the old state and never becomes the new session's baseline.
    pub fn restart(&self) {
        let generation = self.slot.restart();
        self.stats.lock().reset();
        info!(generation, "preview session restarted");
    }

    /// Check if the worker is accepting frames.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }

    /// Take a snapshot of diagnostic stats for this session.
    pub fn diagnostics(&self) -> DiagnosticSnapshot {
        self.stats.lock().snapshot()
    }

    /// Stop the session. Calling stop twice is a no-op.
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::Relaxed);
        self.slot.close();
        if let Some(handle) = self.thread.take() {
            if handle.join().is_err() {
                warn!("pipeline thread panicked");
            }
            info!("preview session stopped");
        }
    }
}

impl Drop for PreviewSession {
    fn drop(&mut self) {
        self.stop();
    }
}

/// State moved onto the worker thread.
struct Worker {
    controller: PipelineController,
    /// Generation of the frames the controller state belongs to.
    generation: u64,
    slot: Arc<LatestFrameSlot<SourceFrame>>,
    stats: Arc<Mutex<DiagnosticStats>>,
    sink: Arc<dyn DisplaySink>,
}

impl Worker {
    fn new(
        controller: PipelineController,
        slot: Arc<LatestFrameSlot<SourceFrame>>,
        stats: Arc<Mutex<DiagnosticStats>>,
        sink: Arc<dyn DisplaySink>,
    ) -> Self {
        Self {
            controller,
            generation: slot.generation(),
            slot,
            stats,
            sink,
        }
    }

    fn run(mut self, running: &AtomicBool) {
        while running.load(Ordering::Relaxed) {
            if let Some((generation, source)) = self.slot.take(POLL_INTERVAL) {
                self.handle(generation, source);
            }
        }
        debug!("pipeline worker exiting");
    }

    /// Process a frame offered in `generation`, resetting the controller
    /// when the first frame of a newer generation arrives.
    fn handle(&mut self, generation: u64, source: SourceFrame) {
        if generation < self.slot.generation() {
            debug!(generation, "dropping frame from before restart");
            self.stats.lock().record_drop();
            return;
        }
        if generation != self.generation {
            self.controller.reset();
            self.generation = generation;
        }
        self.process(source);
    }

    fn process(&mut self, source: SourceFrame) {
        let started = Instant::now();
        let bytes = source.frame.byte_len();
        let result = self.controller.process_frame(
            &source.frame,
            source.rotation_degrees,
            source.timestamp_ms,
        );
        // Release the source frame before delivery.
        drop(source);

        match result {
            Ok(output) => {
                {
                    let mut stats = self.stats.lock();
                    stats.record_frame(bytes, started.elapsed());
                    if let Some(fps) = output.fps {
                        stats.record_fps(fps);
                    }
                }
                if let Some(fps) = output.fps {
                    self.sink.report_fps(fps);
                }
                self.sink.present(output.raster);
            }
            Err(e) => {
                warn!("skipping frame: {e}");
                self.stats.lock().record_error();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::synthetic::SyntheticSource;
    use crate::preview::sink::RasterBuffer;
    use std::thread;

    fn source_frame(index: u64, timestamp_ms: u64) -> SourceFrame {
        SourceFrame {
            frame: SyntheticSource::new(16, 8).frame_at(index),
            rotation_degrees: 0,
            timestamp_ms,
        }
    }

    /// Poll `condition` until it holds or two seconds pass.
    fn wait_for(condition: impl Fn() -> bool) -> bool {
        let deadline = Instant::now() + Duration::from_secs(2);
        while Instant::now() < deadline {
            if condition() {
                return true;
            }
            thread::sleep(Duration::from_millis(5));
        }
        condition()
    }

    /// Sink that blocks in `present` until released.
    struct GatedSink {
        open: Mutex<bool>,
        released: Condvar,
        presented: Mutex<Vec<u32>>,
    }

    impl GatedSink {
        fn new() -> Self {
            Self {
                open: Mutex::new(false),
                released: Condvar::new(),
                presented: Mutex::new(Vec::new()),
            }
        }

        fn release(&self) {
            *self.open.lock() = true;
            self.released.notify_all();
        }
    }

    impl DisplaySink for GatedSink {
        fn present(&self, raster: crate::frame::Raster) {
            self.presented.lock().push(raster.width());
            let mut open = self.open.lock();
            while !*open {
                self.released.wait(&mut open);
            }
        }
    }

    #[test]
    fn slot_returns_none_when_empty() {
        let slot: LatestFrameSlot<u32> = LatestFrameSlot::new();
        assert_eq!(slot.take(Duration::from_millis(10)), None);
    }

    #[test]
    fn slot_keeps_only_latest() {
        let slot = LatestFrameSlot::new();
        assert!(!slot.offer(1));
        assert!(slot.offer(2));
        assert!(slot.offer(3));
        assert_eq!(slot.take(Duration::ZERO), Some((0, 3)));
        assert_eq!(slot.take(Duration::ZERO), None);
    }

    #[test]
    fn slot_releases_replaced_item() {
        let slot = LatestFrameSlot::new();
        let first = Arc::new(());
        slot.offer(Arc::clone(&first));
        slot.offer(Arc::new(()));
        assert_eq!(Arc::strong_count(&first), 1);
    }

    #[test]
    fn slot_take_wakes_on_offer() {
        let slot = Arc::new(LatestFrameSlot::new());
        let producer = {
            let slot = Arc::clone(&slot);
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(20));
                slot.offer(42);
            })
        };
        assert_eq!(slot.take(Duration::from_secs(2)), Some((0, 42)));
        producer.join().unwrap();
    }

    #[test]
    fn closed_slot_rejects_items_and_wakes_waiters() {
        let slot = Arc::new(LatestFrameSlot::<u32>::new());
        let waiter = {
            let slot = Arc::clone(&slot);
            thread::spawn(move || slot.take(Duration::from_secs(5)))
        };
        thread::sleep(Duration::from_millis(20));
        slot.close();
        assert_eq!(waiter.join().unwrap(), None);
        assert!(slot.offer(1));
        assert_eq!(slot.take(Duration::ZERO), None);
    }

    #[test]
    fn slot_restart_discards_pending_and_bumps_generation() {
        let slot = LatestFrameSlot::new();
        slot.offer("old");
        assert_eq!(slot.restart(), 1);
        assert_eq!(slot.take(Duration::ZERO), None);

        slot.offer("new");
        assert_eq!(slot.take(Duration::ZERO), Some((1, "new")));
        assert_eq!(slot.generation(), 1);
    }

    fn worker_with_buffer() -> (Worker, Arc<LatestFrameSlot<SourceFrame>>, Arc<RasterBuffer>) {
        let slot = Arc::new(LatestFrameSlot::new());
        let sink = Arc::new(RasterBuffer::new(1));
        let worker = Worker::new(
            PipelineController::new(PipelineConfig::default()),
            Arc::clone(&slot),
            Arc::new(Mutex::new(DiagnosticStats::new())),
            sink.clone(),
        );
        (worker, slot, sink)
    }

    #[test]
    fn frame_taken_before_restart_never_becomes_baseline() {
        let (mut worker, slot, sink) = worker_with_buffer();

        slot.offer(source_frame(0, 0));
        let (generation, first) = slot.take(Duration::ZERO).unwrap();
        worker.handle(generation, first);
        let undifferenced = sink.latest().unwrap();

        // frame 5 is in flight on the worker when the source restarts
        slot.offer(source_frame(5, 10));
        let (stale_generation, stale) = slot.take(Duration::ZERO).unwrap();
        slot.restart();
        worker.handle(stale_generation, stale);
        assert_eq!(sink.sequence(), 1);

        // the new session starts without a baseline
        slot.offer(source_frame(0, 20));
        let (generation, fresh) = slot.take(Duration::ZERO).unwrap();
        worker.handle(generation, fresh);
        assert_eq!(sink.sequence(), 2);
        assert_eq!(*sink.latest().unwrap(), *undifferenced);
    }

    #[test]
    fn frame_processed_just_before_restart_is_forgotten() {
        let (mut worker, slot, sink) = worker_with_buffer();

        slot.offer(source_frame(3, 0));
        let (generation, old) = slot.take(Duration::ZERO).unwrap();
        worker.handle(generation, old);

        slot.restart();
        slot.offer(source_frame(0, 10));
        let (generation, fresh) = slot.take(Duration::ZERO).unwrap();
        worker.handle(generation, fresh);

        let mut expected = PipelineController::new(PipelineConfig::default());
        let expected = expected
            .process_frame(&source_frame(0, 10).frame, 0, 10)
            .unwrap();
        assert_eq!(*sink.latest().unwrap(), expected.raster);
    }

    #[test]
    fn session_delivers_frames_to_sink() {
        let sink = Arc::new(RasterBuffer::new(2));
        let mut session = PreviewSession::start(PipelineConfig::default(), sink.clone());

        assert!(session.submit(source_frame(0, 0)));
        assert!(wait_for(|| sink.sequence() == 1));
        let raster = sink.latest().unwrap();
        assert_eq!((raster.width(), raster.height()), (16, 8));

        session.stop();
        assert!(!session.is_running());
    }

    #[test]
    fn session_reports_fps_to_sink() {
        let sink = Arc::new(RasterBuffer::new(1));
        let mut session = PreviewSession::start(PipelineConfig::default(), sink.clone());

        assert!(session.submit(source_frame(0, 0)));
        assert!(wait_for(|| sink.sequence() == 1));
        assert!(session.submit(source_frame(1, 1000)));
        assert!(wait_for(|| sink.fps() == Some(2)));
        assert_eq!(session.diagnostics().reported_fps, Some(2));

        session.stop();
    }

    #[test]
    fn busy_session_drops_pending_frames() {
        let sink = Arc::new(GatedSink::new());
        let mut session = PreviewSession::start(PipelineConfig::default(), sink.clone());

        // first frame parks the worker inside the sink
        session.submit(source_frame(0, 0));
        assert!(wait_for(|| sink.presented.lock().len() == 1));

        assert!(session.submit(source_frame(1, 10)));
        assert!(!session.submit(source_frame(2, 20)));
        assert!(!session.submit(source_frame(3, 30)));

        sink.release();
        assert!(wait_for(|| sink.presented.lock().len() == 2));
        let snapshot = session.diagnostics();
        assert_eq!(snapshot.drop_count, 2);
        assert!(wait_for(|| session.diagnostics().frame_count == 2));

        session.stop();
        assert_eq!(sink.presented.lock().len(), 2);
    }

    #[test]
    fn malformed_frame_is_counted_and_skipped() {
        let sink = Arc::new(RasterBuffer::new(1));
        let mut session = PreviewSession::start(PipelineConfig::default(), sink.clone());

        let mut broken = source_frame(0, 0);
        broken.frame.u.data.clear();
        session.submit(broken);
        assert!(wait_for(|| session.diagnostics().error_count == 1));
        assert_eq!(sink.sequence(), 0);

        // the worker keeps going after a bad frame
        session.submit(source_frame(1, 10));
        assert!(wait_for(|| sink.sequence() == 1));

        session.stop();
    }

    #[test]
    fn invalid_rotation_is_counted_and_skipped() {
        let sink = Arc::new(RasterBuffer::new(1));
        let mut session = PreviewSession::start(PipelineConfig::default(), sink.clone());

        let mut rotated = source_frame(0, 0);
        rotated.rotation_degrees = 45;
        session.submit(rotated);
        assert!(wait_for(|| session.diagnostics().error_count == 1));
        assert_eq!(sink.sequence(), 0);

        session.stop();
    }

    #[test]
    fn restart_clears_previous_frame() {
        let sink = Arc::new(RasterBuffer::new(1));
        let mut session = PreviewSession::start(PipelineConfig::default(), sink.clone());

        session.submit(source_frame(0, 0));
        assert!(wait_for(|| sink.sequence() == 1));
        let first = sink.latest().unwrap();

        session.restart();
        session.submit(source_frame(0, 0));
        assert!(wait_for(|| sink.sequence() == 2));
        // no baseline after restart, so the same frame comes through undifferenced
        assert_eq!(*sink.latest().unwrap(), *first);

        session.stop();
    }

    #[test]
    fn stop_is_idempotent_and_rejects_frames() {
        let sink = Arc::new(RasterBuffer::new(1));
        let mut session = PreviewSession::start(PipelineConfig::default(), sink.clone());
        session.stop();
        session.stop();
        assert!(!session.submit(source_frame(0, 0)));
        assert_eq!(sink.sequence(), 0);
    }

    #[test]
    fn session_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<PreviewSession>();
        assert_send_sync::<LatestFrameSlot<SourceFrame>>();
        assert_send_sync::<Worker>();
    }
}
