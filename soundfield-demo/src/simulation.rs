//! Stand-ins for the platform collaborators: a clock-driven media engine, a
//! simulated compass and a logging surround renderer.

use crossbeam_channel::Sender;
use soundfield_core::heading::{ListenerId, SampleCallback};
use soundfield_core::{
    ContentRef, InputFormat, MediaEngine, MediaEvent, NativeSurround, NativeSurroundFactory,
    OutputConfig, Result, SensorCadence, SensorSubsystem, SoundfieldError, SurroundLayout,
    SurroundRenderer,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

/// Built-in content entry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DemoTrack {
    pub id: &'static str,
    pub title: &'static str,
    pub channels: u16,
    pub sample_rate: u32,
    /// `None` for live streams
    pub duration_ms: Option<u64>,
    /// Playback position at which the engine reports a decode failure
    pub fails_at_ms: Option<u64>,
}

pub const DEMO_TRACKS: &[DemoTrack] = &[
    DemoTrack {
        id: "forest-foa",
        title: "Forest dawn (FOA, 4 ch)",
        channels: 4,
        sample_rate: 48_000,
        duration_ms: Some(95_000),
        fails_at_ms: None,
    },
    DemoTrack {
        id: "choir-soa",
        title: "Cathedral choir (2nd order + stereo, 11 ch)",
        channels: 11,
        sample_rate: 48_000,
        duration_ms: Some(184_000),
        fails_at_ms: None,
    },
    DemoTrack {
        id: "stream-toa",
        title: "Live stream (3rd order, 16 ch)",
        channels: 16,
        sample_rate: 48_000,
        duration_ms: None,
        fails_at_ms: None,
    },
    DemoTrack {
        id: "sting-stereo",
        title: "Stereo sting (2 ch, 6 s)",
        channels: 2,
        sample_rate: 44_100,
        duration_ms: Some(6_000),
        fails_at_ms: None,
    },
    DemoTrack {
        id: "flaky-foa",
        title: "Flaky download (FOA, fails at 0:04)",
        channels: 4,
        sample_rate: 48_000,
        duration_ms: Some(60_000),
        fails_at_ms: Some(4_000),
    },
    DemoTrack {
        id: "broken-7ch",
        title: "Broken upload (7 ch)",
        channels: 7,
        sample_rate: 48_000,
        duration_ms: Some(30_000),
        fails_at_ms: None,
    },
];

pub fn find_track(content: &ContentRef) -> Option<DemoTrack> {
    DEMO_TRACKS
        .iter()
        .find(|track| track.id == content.as_str())
        .copied()
}

#[derive(Default)]
struct ClockState {
    track: Option<DemoTrack>,
    playing: bool,
    base_ms: u64,
    resumed_at: Option<Instant>,
    finished: bool,
}

impl ClockState {
    fn position(&self) -> u64 {
        let running = self
            .resumed_at
            .map(|at| at.elapsed().as_millis() as u64)
            .unwrap_or(0);
        self.base_ms + running
    }

    fn freeze(&mut self, position_ms: u64) {
        self.base_ms = position_ms;
        self.resumed_at = self.playing.then(Instant::now);
    }
}

/// Media engine whose position advances with the wall clock.
///
/// Preparing a track configures the surround renderer for its channel
/// layout, so unsupported layouts fail at prepare time.
pub struct ClockEngine {
    renderer: Arc<SurroundRenderer>,
    state: Mutex<ClockState>,
    events: Mutex<Option<Sender<MediaEvent>>>,
}

impl ClockEngine {
    pub fn new(renderer: Arc<SurroundRenderer>) -> Self {
        Self {
            renderer,
            state: Mutex::new(ClockState::default()),
            events: Mutex::new(None),
        }
    }

    fn lock(&self) -> MutexGuard<'_, ClockState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn send(&self, event: MediaEvent) {
        let events = self
            .events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(sender) = events.as_ref() {
            let _ = sender.send(event);
        }
    }

    /// Advances the clock, raising end-of-content and failure notifications.
    fn advance(&self, state: &mut ClockState) -> u64 {
        let position = state.position();
        let Some(track) = state.track else {
            return position;
        };
        if !state.playing || state.finished {
            return position;
        }

        if let Some(fail_at) = track.fails_at_ms {
            if position >= fail_at {
                state.playing = false;
                state.finished = true;
                state.freeze(fail_at);
                self.send(MediaEvent::Error(format!(
                    "Decoder lost sync in '{}' at {} ms",
                    track.id, fail_at
                )));
                return fail_at;
            }
        }

        if let Some(duration) = track.duration_ms {
            if position >= duration {
                state.playing = false;
                state.finished = true;
                state.freeze(duration);
                self.send(MediaEvent::Ended);
                return duration;
            }
        }

        position
    }
}

impl MediaEngine for ClockEngine {
    fn attach(&self, events: Sender<MediaEvent>) {
        *self
            .events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(events);
    }

    fn prepare(&self, content: &ContentRef) -> Result<()> {
        let track = find_track(content)
            .ok_or_else(|| SoundfieldError::Playback(format!("Unknown content '{}'", content)))?;

        // A refused format leaves nothing loaded
        *self.lock() = ClockState::default();
        self.renderer
            .configure(InputFormat::pcm16(track.sample_rate, track.channels))?;

        *self.lock() = ClockState {
            track: Some(track),
            ..ClockState::default()
        };
        log::debug!("Clock engine prepared '{}'", track.title);
        self.send(MediaEvent::Prepared {
            duration_ms: track.duration_ms,
        });
        Ok(())
    }

    fn play(&self) {
        let mut state = self.lock();
        if state.track.is_none() || state.playing {
            return;
        }
        state.playing = true;
        state.finished = false;
        state.resumed_at = Some(Instant::now());
    }

    fn pause(&self) {
        let mut state = self.lock();
        let position = self.advance(&mut state);
        state.playing = false;
        state.freeze(position);
    }

    fn seek_to(&self, position_ms: u64) {
        let mut state = self.lock();
        state.finished = false;
        state.freeze(position_ms);
    }

    fn current_position(&self) -> u64 {
        let mut state = self.lock();
        self.advance(&mut state)
    }

    fn duration(&self) -> Option<u64> {
        self.lock().track.and_then(|track| track.duration_ms)
    }

    fn is_playing(&self) -> bool {
        let mut state = self.lock();
        self.advance(&mut state);
        state.playing
    }

    fn release(&self) {
        *self.lock() = ClockState::default();
        self.renderer.reset();
    }
}

struct CompassListener {
    stop: Arc<AtomicBool>,
    worker: JoinHandle<()>,
}

/// Device heading sensor simulation.
///
/// Each registered listener gets its own emitter thread delivering the
/// current yaw (plus a small wobble) at the requested cadence.
pub struct SimulatedCompass {
    available: bool,
    yaw_bits: Arc<AtomicU32>,
    listeners: Mutex<HashMap<ListenerId, CompassListener>>,
    next_id: AtomicU64,
}

impl SimulatedCompass {
    pub fn new() -> Self {
        Self {
            available: true,
            yaw_bits: Arc::new(AtomicU32::new(0.0f32.to_bits())),
            listeners: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// A device without a heading sensor.
    pub fn missing() -> Self {
        let mut compass = Self::new();
        compass.available = false;
        compass
    }

    /// Sets the simulated device yaw in degrees.
    pub fn set_yaw(&self, degrees: f32) {
        self.yaw_bits.store(degrees.to_bits(), Ordering::Release);
    }

    pub fn yaw(&self) -> f32 {
        f32::from_bits(self.yaw_bits.load(Ordering::Acquire))
    }

    fn listeners(&self) -> MutexGuard<'_, HashMap<ListenerId, CompassListener>> {
        self.listeners
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for SimulatedCompass {
    fn default() -> Self {
        Self::new()
    }
}

impl SensorSubsystem for SimulatedCompass {
    fn register_listener(
        &self,
        callback: SampleCallback,
        cadence: SensorCadence,
    ) -> Result<ListenerId> {
        if !self.available {
            return Err(SoundfieldError::SensorUnavailable);
        }

        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let stop = Arc::new(AtomicBool::new(false));
        let interval = cadence.nominal_interval().max(Duration::from_millis(5));
        let yaw = self.yaw_bits.clone();
        let thread_stop = stop.clone();

        let worker = std::thread::Builder::new()
            .name("simulated-compass".into())
            .spawn(move || {
                let mut tick: u32 = 0;
                while !thread_stop.load(Ordering::Acquire) {
                    let wobble = (tick as f32 * 0.3).sin() * 0.4;
                    let value = (f32::from_bits(yaw.load(Ordering::Acquire)) + wobble)
                        .rem_euclid(360.0);
                    callback(value);
                    tick = tick.wrapping_add(1);
                    std::thread::sleep(interval);
                }
            })
            .map_err(|e| SoundfieldError::Sensor(format!("Failed to start compass: {}", e)))?;

        log::debug!("Compass listener {:?} registered ({:?})", id, interval);
        self.listeners().insert(id, CompassListener { stop, worker });
        Ok(id)
    }

    fn unregister_listener(&self, id: ListenerId) {
        let listener = self.listeners().remove(&id);
        if let Some(listener) = listener {
            listener.stop.store(true, Ordering::Release);
            if listener.worker.join().is_err() {
                log::error!("Compass emitter thread panicked");
            }
            log::debug!("Compass listener {:?} unregistered", id);
        }
    }
}

impl Drop for SimulatedCompass {
    fn drop(&mut self) {
        let ids: Vec<ListenerId> = self.listeners().keys().copied().collect();
        for id in ids {
            self.unregister_listener(id);
        }
    }
}

/// Native renderer that logs what it would have rendered.
struct LoggingSurround {
    layout: SurroundLayout,
    updates: u64,
}

impl NativeSurround for LoggingSurround {
    fn update_native_orientation(&mut self, w: f32, x: f32, y: f32, z: f32) {
        self.updates += 1;
        log::trace!(
            "{:?} orientation #{}: w={:.3} x={:.3} y={:.3} z={:.3}",
            self.layout,
            self.updates,
            w,
            x,
            y,
            z
        );
    }

    fn release(&mut self) {
        log::info!(
            "{:?} renderer released after {} orientation updates",
            self.layout,
            self.updates
        );
    }
}

pub struct LoggingSurroundFactory;

impl NativeSurroundFactory for LoggingSurroundFactory {
    fn create(
        &self,
        layout: SurroundLayout,
        format: InputFormat,
        output: OutputConfig,
    ) -> Result<Box<dyn NativeSurround>> {
        log::info!(
            "Creating {:?} renderer (order {:?}, {} Hz, {} frames per buffer, {} output channels)",
            layout,
            layout.ambisonic_order(),
            format.sample_rate,
            output.frames_per_buffer,
            output.channels
        );
        Ok(Box::new(LoggingSurround { layout, updates: 0 }))
    }
}
