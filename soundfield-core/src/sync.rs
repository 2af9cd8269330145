//! Keeps the playback position display in step with the media engine.
//!
//! While the engine reports playing, [`PlaybackSyncLoop`] reads a
//! [`PlaybackSnapshot`] every tick on its own thread and marshals a display
//! update onto the UI context through a [`UiExecutor`].
//!
//! # Lifecycle
//!
//! - At most one loop is alive: [`start`](PlaybackSyncLoop::start) cancels
//!   the previous loop before spawning a new one
//! - [`cancel`](PlaybackSyncLoop::cancel) wakes the loop, waits for its thread
//!   to exit, and guarantees no further display writes from it (tasks already
//!   queued on the UI context check the cancellation flag before writing)
//! - The loop also exits by itself the first time it sees `is_playing == false`
//!
//! While the user drags the seek bar (`seeking`), ticks still refresh the time
//! label but leave the progress value alone.

use crate::error::{Result, SoundfieldError};
use crate::executor::UiExecutor;
use crate::time_format::{format_duration, format_millis};
use crate::transport::{MediaEngine, PlaybackSnapshot};
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::thread::JoinHandle;
use std::time::Duration;

/// Receives playback and heading updates for rendering.
///
/// Called on the UI context only (via the executor).
pub trait DisplaySink: Send + Sync {
    /// Elapsed and total time labels, e.g. `("1:05", "3:20")`.
    fn show_time(&self, current: &str, duration: &str);

    /// Seek bar value and range, in milliseconds. Only sent once the
    /// duration is known, so `progress <= max`.
    fn show_progress(&self, progress: u64, max: u64);

    /// Heading indicator angle in degrees.
    fn show_heading(&self, _angle: f32) {}
}

/// Handle to one running sync loop thread.
pub struct SyncLoopHandle {
    cancelled: Arc<AtomicBool>,
    wake: Option<Sender<()>>,
    worker: Option<JoinHandle<()>>,
}

impl SyncLoopHandle {
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    /// Whether the loop thread has exited (cancelled or playback stopped).
    pub fn is_finished(&self) -> bool {
        self.worker.as_ref().is_none_or(|worker| worker.is_finished())
    }

    /// Stops the loop and joins its thread.
    pub fn cancel(&mut self) {
        self.cancelled.store(true, Ordering::Release);
        // Disconnecting the wake channel interrupts the tick sleep
        self.wake.take();

        if let Some(worker) = self.worker.take() {
            if worker.thread().id() == std::thread::current().id() {
                return;
            }
            if worker.join().is_err() {
                log::error!("Playback sync loop panicked");
            }
        }
    }
}

impl Drop for SyncLoopHandle {
    fn drop(&mut self) {
        self.cancel();
    }
}

struct LiveLoopGuard(Arc<AtomicUsize>);

impl Drop for LiveLoopGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::AcqRel);
    }
}

pub struct PlaybackSyncLoop {
    interval: Duration,
    display: Arc<dyn DisplaySink>,
    executor: Arc<dyn UiExecutor>,
    seeking: Arc<AtomicBool>,
    live_loops: Arc<AtomicUsize>,
    handle: Option<SyncLoopHandle>,
}

impl PlaybackSyncLoop {
    pub fn new(
        interval: Duration,
        display: Arc<dyn DisplaySink>,
        executor: Arc<dyn UiExecutor>,
    ) -> Self {
        Self {
            interval,
            display,
            executor,
            seeking: Arc::new(AtomicBool::new(false)),
            live_loops: Arc::new(AtomicUsize::new(0)),
            handle: None,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Starts polling `engine`, cancelling any loop that is still alive.
    pub fn start(&mut self, engine: Arc<dyn MediaEngine>) -> Result<()> {
        self.cancel();

        let cancelled = Arc::new(AtomicBool::new(false));
        let (wake, wake_rx) = crossbeam_channel::bounded::<()>(0);
        let context = LoopContext {
            engine,
            display: self.display.clone(),
            executor: self.executor.clone(),
            seeking: self.seeking.clone(),
            cancelled: cancelled.clone(),
            interval: self.interval,
        };

        self.live_loops.fetch_add(1, Ordering::AcqRel);
        let guard = LiveLoopGuard(self.live_loops.clone());

        let worker = std::thread::Builder::new()
            .name("soundfield-sync".into())
            .spawn(move || {
                let _guard = guard;
                run_sync_loop(context, wake_rx);
            })
            .map_err(|e| {
                SoundfieldError::Transport(format!("Failed to spawn sync loop: {}", e))
            })?;

        log::debug!("Playback sync loop started ({:?} interval)", self.interval);
        self.handle = Some(SyncLoopHandle {
            cancelled,
            wake: Some(wake),
            worker: Some(worker),
        });
        Ok(())
    }

    /// Cancels the running loop, if any. Returns whether one was running.
    pub fn cancel(&mut self) -> bool {
        match self.handle.take() {
            Some(mut handle) => {
                let was_running = !handle.is_finished();
                handle.cancel();
                if was_running {
                    log::debug!("Playback sync loop cancelled");
                }
                was_running
            }
            None => false,
        }
    }

    pub fn is_polling(&self) -> bool {
        self.handle.as_ref().is_some_and(|handle| !handle.is_finished())
    }

    /// Number of loop threads currently alive.
    pub fn live_loops(&self) -> usize {
        self.live_loops.load(Ordering::Acquire)
    }

    /// Marks the start of a manual seek-bar drag.
    pub fn begin_seek(&self) {
        self.seeking.store(true, Ordering::Release);
    }

    pub fn end_seek(&self) {
        self.seeking.store(false, Ordering::Release);
    }

    pub fn is_seeking(&self) -> bool {
        self.seeking.load(Ordering::Acquire)
    }

    /// Pushes one snapshot to the display outside the loop (after pause, seek...).
    pub fn publish(&self, snapshot: PlaybackSnapshot) {
        let display = self.display.clone();
        let seeking = self.seeking.clone();
        self.executor.post(Box::new(move || {
            apply_snapshot(display.as_ref(), &snapshot, seeking.load(Ordering::Acquire));
        }));
    }
}

impl Drop for PlaybackSyncLoop {
    fn drop(&mut self) {
        self.cancel();
    }
}

struct LoopContext {
    engine: Arc<dyn MediaEngine>,
    display: Arc<dyn DisplaySink>,
    executor: Arc<dyn UiExecutor>,
    seeking: Arc<AtomicBool>,
    cancelled: Arc<AtomicBool>,
    interval: Duration,
}

fn run_sync_loop(context: LoopContext, wake: Receiver<()>) {
    loop {
        if context.cancelled.load(Ordering::Acquire) {
            break;
        }

        let snapshot = PlaybackSnapshot::read(context.engine.as_ref());
        if !snapshot.is_playing {
            log::debug!("Engine no longer playing, sync loop exiting");
            break;
        }

        if context.cancelled.load(Ordering::Acquire) {
            break;
        }

        let display = context.display.clone();
        let seeking = context.seeking.clone();
        let cancelled = context.cancelled.clone();
        context.executor.post(Box::new(move || {
            if cancelled.load(Ordering::Acquire) {
                return;
            }
            apply_snapshot(display.as_ref(), &snapshot, seeking.load(Ordering::Acquire));
        }));

        match wake.recv_timeout(context.interval) {
            Err(RecvTimeoutError::Timeout) => {}
            Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
        }
    }
}

fn apply_snapshot(display: &dyn DisplaySink, snapshot: &PlaybackSnapshot, seeking: bool) {
    display.show_time(
        &format_millis(snapshot.position_ms),
        &format_duration(snapshot.duration_ms),
    );

    if seeking {
        return;
    }
    if let Some(duration) = snapshot.duration_ms {
        display.show_progress(snapshot.position_ms, duration);
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::executor::{ChannelExecutor, ImmediateExecutor};
    use crate::transport::tests::FakeEngine;
    use std::sync::Mutex;
    use std::time::Instant;

    #[derive(Default)]
    pub(crate) struct RecordingDisplay {
        pub(crate) times: Mutex<Vec<(String, String)>>,
        pub(crate) progress: Mutex<Vec<(u64, u64)>>,
        pub(crate) headings: Mutex<Vec<f32>>,
    }

    impl RecordingDisplay {
        pub(crate) fn last_progress(&self) -> Option<(u64, u64)> {
            self.progress.lock().unwrap().last().copied()
        }

        pub(crate) fn progress_count(&self) -> usize {
            self.progress.lock().unwrap().len()
        }

        pub(crate) fn time_count(&self) -> usize {
            self.times.lock().unwrap().len()
        }
    }

    impl DisplaySink for RecordingDisplay {
        fn show_time(&self, current: &str, duration: &str) {
            self.times
                .lock()
                .unwrap()
                .push((current.to_string(), duration.to_string()));
        }

        fn show_progress(&self, progress: u64, max: u64) {
            self.progress.lock().unwrap().push((progress, max));
        }

        fn show_heading(&self, angle: f32) {
            self.headings.lock().unwrap().push(angle);
        }
    }

    const TICK: Duration = Duration::from_millis(10);

    fn wait_until(mut condition: impl FnMut() -> bool) -> bool {
        let deadline = Instant::now() + Duration::from_secs(2);
        while Instant::now() < deadline {
            if condition() {
                return true;
            }
            std::thread::sleep(Duration::from_millis(2));
        }
        condition()
    }

    fn sync_loop(display: Arc<RecordingDisplay>) -> PlaybackSyncLoop {
        PlaybackSyncLoop::new(TICK, display, Arc::new(ImmediateExecutor))
    }

    #[test]
    fn test_single_loop_across_play_pause_cycles() {
        let _ = env_logger::builder().is_test(true).try_init();
        let engine = Arc::new(FakeEngine::with_duration(60_000));
        let display = Arc::new(RecordingDisplay::default());
        let mut sync = sync_loop(display);

        engine.play();
        sync.start(engine.clone()).unwrap();
        assert!(sync.is_polling());
        assert_eq!(sync.live_loops(), 1);

        engine.pause();
        sync.cancel();
        assert_eq!(sync.live_loops(), 0);

        for _ in 0..5 {
            engine.play();
            sync.start(engine.clone()).unwrap();
            assert_eq!(sync.live_loops(), 1);
        }

        // Starting again without a pause still leaves exactly one loop
        sync.start(engine.clone()).unwrap();
        assert_eq!(sync.live_loops(), 1);

        assert!(sync.cancel());
        assert!(!sync.cancel());
        assert_eq!(sync.live_loops(), 0);
    }

    #[test]
    fn test_loop_exits_when_engine_stops_playing() {
        let engine = Arc::new(FakeEngine::with_duration(60_000));
        let display = Arc::new(RecordingDisplay::default());
        let mut sync = sync_loop(display.clone());

        engine.play();
        sync.start(engine.clone()).unwrap();
        assert!(wait_until(|| display.progress_count() >= 2));

        engine.pause();
        assert!(wait_until(|| !sync.is_polling()));
        assert_eq!(sync.live_loops(), 0);

        let reads = engine.position_reads.load(Ordering::SeqCst);
        std::thread::sleep(TICK * 5);
        assert_eq!(engine.position_reads.load(Ordering::SeqCst), reads);
    }

    #[test]
    fn test_pushes_position_and_duration() {
        let engine = Arc::new(FakeEngine::with_duration(200_000));
        let display = Arc::new(RecordingDisplay::default());
        let mut sync = sync_loop(display.clone());

        engine.position.store(65_000, Ordering::SeqCst);
        engine.play();
        sync.start(engine.clone()).unwrap();
        assert!(wait_until(|| display.last_progress() == Some((65_000, 200_000))));
        sync.cancel();

        let times = display.times.lock().unwrap();
        assert_eq!(times[0], ("1:05".to_string(), "3:20".to_string()));
    }

    #[test]
    fn test_seeking_suppresses_progress_updates() {
        let engine = Arc::new(FakeEngine::with_duration(60_000));
        let display = Arc::new(RecordingDisplay::default());
        let mut sync = sync_loop(display.clone());

        engine.position.store(1_000, Ordering::SeqCst);
        engine.play();
        sync.begin_seek();
        sync.start(engine.clone()).unwrap();

        // Ticks keep reading the engine and refreshing the label
        assert!(wait_until(|| display.time_count() >= 3));
        assert_eq!(display.progress_count(), 0);
        assert!(engine.position_reads.load(Ordering::SeqCst) >= 3);

        engine.position.store(2_000, Ordering::SeqCst);
        sync.end_seek();
        assert!(wait_until(|| display.last_progress() == Some((2_000, 60_000))));
        sync.cancel();
    }

    #[test]
    fn test_cancelled_loop_writes_nothing_more() {
        let engine = Arc::new(FakeEngine::with_duration(60_000));
        let display = Arc::new(RecordingDisplay::default());
        let executor = Arc::new(ChannelExecutor::new());
        let mut sync = PlaybackSyncLoop::new(TICK, display.clone(), executor.clone());

        engine.play();
        sync.start(engine.clone()).unwrap();
        assert!(wait_until(|| executor.pending() >= 2));

        // Tasks already queued when the loop is cancelled must not write
        sync.cancel();
        executor.run_pending();
        assert_eq!(display.progress_count(), 0);
        assert_eq!(display.time_count(), 0);
    }

    #[test]
    fn test_publish_respects_seeking() {
        let display = Arc::new(RecordingDisplay::default());
        let sync = sync_loop(display.clone());
        let snapshot = PlaybackSnapshot {
            position_ms: 1_500,
            duration_ms: Some(60_000),
            is_playing: false,
        };

        sync.begin_seek();
        sync.publish(snapshot);
        assert_eq!(display.progress_count(), 0);
        assert_eq!(
            display.times.lock().unwrap()[0],
            ("0:01".to_string(), "1:00".to_string())
        );

        sync.end_seek();
        sync.publish(snapshot);
        assert_eq!(display.last_progress(), Some((1_500, 60_000)));
    }

    #[test]
    fn test_unknown_duration_skips_progress() {
        let engine = Arc::new(FakeEngine::default());
        let display = Arc::new(RecordingDisplay::default());
        let mut sync = sync_loop(display.clone());

        engine.position.store(42_000, Ordering::SeqCst);
        engine.play();
        sync.start(engine.clone()).unwrap();
        assert!(wait_until(|| display.time_count() >= 2));
        sync.cancel();

        assert_eq!(display.progress_count(), 0);
        assert_eq!(
            display.times.lock().unwrap()[0],
            ("0:42".to_string(), "-:--".to_string())
        );
    }
}
