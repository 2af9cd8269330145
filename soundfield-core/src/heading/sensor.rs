//! Sensor registration as a cancellable stream of heading samples.
//!
//! A platform sensor subsystem delivers samples through callbacks on its own
//! thread. [`HeadingStream`] turns one registration into a channel-backed
//! sequence that ends when it is cancelled or dropped; a stream cannot be
//! restarted, a new one has to be opened. [`SensorListener`] owns at most one
//! stream at a time and drains it on a worker thread.

use super::calibration::{CalibrationFilter, FilterOutput};
use super::{RawHeadingSample, SensorCadence};
use crate::angle::AngleState;
use crate::error::{Result, SoundfieldError};
use crate::events::SoundfieldEvent;
use crossbeam_channel::{Receiver, Sender, select, unbounded};
use std::sync::Arc;
use std::thread::JoinHandle;

/// Callback a sensor subsystem invokes for every raw heading reading.
pub type SampleCallback = Box<dyn Fn(f32) + Send + Sync>;

/// Identifies one registration with a [`SensorSubsystem`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct ListenerId(pub u64);

/// Platform orientation sensor service.
///
/// Implementations must stop invoking a callback once
/// [`unregister_listener`](Self::unregister_listener) returns for its id.
pub trait SensorSubsystem: Send + Sync {
    /// Registers a callback for absolute heading samples.
    ///
    /// Returns [`SoundfieldError::SensorUnavailable`] when the device has no
    /// heading sensor.
    fn register_listener(&self, callback: SampleCallback, cadence: SensorCadence)
    -> Result<ListenerId>;

    fn unregister_listener(&self, id: ListenerId);
}

struct Registration {
    subsystem: Arc<dyn SensorSubsystem>,
    id: ListenerId,
}

/// Lazy, unbounded sequence of sensor samples from one registration.
pub struct HeadingStream {
    receiver: Receiver<RawHeadingSample>,
    registration: Option<Registration>,
}

impl HeadingStream {
    pub fn open(subsystem: Arc<dyn SensorSubsystem>, cadence: SensorCadence) -> Result<Self> {
        let (sender, receiver) = unbounded();
        let callback: SampleCallback = Box::new(move |value| {
            // Receiver gone means the stream was dropped; nothing to deliver to
            let _ = sender.send(RawHeadingSample::sensor(value));
        });

        let id = subsystem.register_listener(callback, cadence)?;
        log::debug!("Sensor listener {:?} registered ({:?})", id, cadence);

        Ok(Self {
            receiver,
            registration: Some(Registration { subsystem, id }),
        })
    }

    pub fn receiver(&self) -> &Receiver<RawHeadingSample> {
        &self.receiver
    }

    pub fn is_cancelled(&self) -> bool {
        self.registration.is_none()
    }

    /// Unregisters from the subsystem. Samples already queued stay readable.
    pub fn cancel(&mut self) {
        if let Some(registration) = self.registration.take() {
            registration.subsystem.unregister_listener(registration.id);
            log::debug!("Sensor listener {:?} unregistered", registration.id);
        }
    }
}

impl Iterator for HeadingStream {
    type Item = RawHeadingSample;

    /// Blocks until the next sample. Ends once cancelled and drained.
    fn next(&mut self) -> Option<Self::Item> {
        if self.registration.is_none() {
            return self.receiver.try_recv().ok();
        }
        self.receiver.recv().ok()
    }
}

impl Drop for HeadingStream {
    fn drop(&mut self) {
        self.cancel();
    }
}

struct ActiveListener {
    shutdown: Sender<()>,
    worker: JoinHandle<()>,
}

/// Turns sensor listening on and off.
///
/// Every enable opens a fresh stream with a fresh [`CalibrationFilter`], so the
/// forward direction is recaptured each session. Enable and disable are both
/// idempotent.
pub struct SensorListener {
    subsystem: Arc<dyn SensorSubsystem>,
    cadence: SensorCadence,
    active: Option<ActiveListener>,
}

impl SensorListener {
    pub fn new(subsystem: Arc<dyn SensorSubsystem>, cadence: SensorCadence) -> Self {
        Self {
            subsystem,
            cadence,
            active: None,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.active.is_some()
    }

    /// Starts delivering calibrated headings into `angle`.
    ///
    /// Returns `Ok(false)` if listening was already enabled.
    pub fn enable(
        &mut self,
        angle: Arc<AngleState>,
        events: Sender<SoundfieldEvent>,
    ) -> Result<bool> {
        if self.active.is_some() {
            return Ok(false);
        }

        let stream = HeadingStream::open(self.subsystem.clone(), self.cadence)?;
        let (shutdown, shutdown_rx) = crossbeam_channel::bounded::<()>(0);

        let worker = std::thread::Builder::new()
            .name("soundfield-sensor".into())
            .spawn(move || run_sensor_worker(stream, shutdown_rx, angle, events))
            .map_err(|e| SoundfieldError::Sensor(format!("Failed to spawn sensor worker: {}", e)))?;

        self.active = Some(ActiveListener { shutdown, worker });
        log::info!("Sensor listening enabled");
        Ok(true)
    }

    /// Stops listening and waits until the subsystem registration is gone.
    ///
    /// Returns `false` if listening was not enabled.
    pub fn disable(&mut self) -> bool {
        let Some(active) = self.active.take() else {
            return false;
        };

        drop(active.shutdown);
        if active.worker.join().is_err() {
            log::error!("Sensor worker panicked");
        }
        log::info!("Sensor listening disabled");
        true
    }
}

impl Drop for SensorListener {
    fn drop(&mut self) {
        self.disable();
    }
}

fn run_sensor_worker(
    mut stream: HeadingStream,
    shutdown: Receiver<()>,
    angle: Arc<AngleState>,
    events: Sender<SoundfieldEvent>,
) {
    let mut filter = CalibrationFilter::new();

    loop {
        select! {
            recv(stream.receiver()) -> sample => match sample {
                Ok(sample) => match filter.accept(sample.value) {
                    FilterOutput::Heading(heading) => angle.set_angle(heading),
                    FilterOutput::Baseline(offset) => {
                        let _ = events.send(SoundfieldEvent::HeadingCalibrated { offset });
                    }
                    FilterOutput::Rejected => {}
                },
                Err(_) => {
                    log::warn!("Sensor subsystem closed the sample stream");
                    break;
                }
            },
            recv(shutdown) -> _ => break,
        }
    }

    stream.cancel();
}
