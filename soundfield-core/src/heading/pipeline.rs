use super::sensor::{SensorListener, SensorSubsystem};
use super::touch::touch_to_angle;
use super::{HeadingMode, SensorCadence};
use crate::angle::AngleState;
use crate::error::{Result, SoundfieldError};
use crate::events::SoundfieldEvent;
use crossbeam_channel::Sender;
use std::sync::Arc;

/// Routes the active heading source into the shared [`AngleState`].
///
/// Touch moves are applied synchronously on the caller's thread. Sensor
/// samples are calibrated and applied on the sensor worker thread. Switching
/// modes, suspending and resuming register and unregister the sensor listener
/// as needed; each new sensor session recalibrates.
pub struct OrientationPipeline {
    angle: Arc<AngleState>,
    mode: HeadingMode,
    sensor: SensorListener,
    suspended: bool,
    shut_down: bool,
    events: Sender<SoundfieldEvent>,
}

impl OrientationPipeline {
    pub fn new(
        subsystem: Arc<dyn SensorSubsystem>,
        cadence: SensorCadence,
        events: Sender<SoundfieldEvent>,
    ) -> Self {
        Self {
            angle: Arc::new(AngleState::new()),
            mode: HeadingMode::TouchDrag,
            sensor: SensorListener::new(subsystem, cadence),
            suspended: false,
            shut_down: false,
            events,
        }
    }

    pub fn angle_state(&self) -> &Arc<AngleState> {
        &self.angle
    }

    pub fn angle(&self) -> f32 {
        self.angle.angle()
    }

    pub fn mode(&self) -> HeadingMode {
        self.mode
    }

    pub fn is_sensor_listening(&self) -> bool {
        self.sensor.is_enabled()
    }

    /// Applies a pointer drag over the dial.
    ///
    /// Returns the new angle, or `None` if the event was ignored (sensor mode
    /// active or degenerate surface).
    pub fn on_touch_move(&self, x: f32, y: f32, width: f32, height: f32) -> Option<f32> {
        if self.mode != HeadingMode::TouchDrag {
            return None;
        }

        let angle = touch_to_angle(x, y, width, height)?;
        self.angle.set_angle(angle);
        Some(angle)
    }

    /// Selects the heading source and returns the mode actually in effect.
    ///
    /// If the device has no heading sensor the pipeline stays in touch mode
    /// and reports [`SoundfieldEvent::SensorUnavailable`].
    pub fn set_mode(&mut self, mode: HeadingMode) -> Result<HeadingMode> {
        if mode == self.mode {
            return Ok(self.mode);
        }

        log::info!("Heading mode: {:?} -> {:?}", self.mode, mode);
        match mode {
            HeadingMode::TouchDrag => {
                self.mode = mode;
                self.stop_sensor();
            }
            HeadingMode::DeviceSensor => {
                self.mode = mode;
                if !self.suspended && !self.shut_down {
                    if let Err(e) = self.start_sensor() {
                        self.mode = HeadingMode::TouchDrag;
                        return match e {
                            SoundfieldError::SensorUnavailable => Ok(self.mode),
                            other => Err(other),
                        };
                    }
                }
            }
        }

        Ok(self.mode)
    }

    /// Releases the sensor while the application is in the background.
    pub fn suspend(&mut self) {
        if self.suspended {
            return;
        }
        self.suspended = true;
        self.stop_sensor();
    }

    /// Releases the sensor for good. Later `resume` and mode switches never
    /// register it again.
    pub fn shutdown(&mut self) {
        if self.shut_down {
            return;
        }
        self.shut_down = true;
        self.suspended = true;
        self.stop_sensor();
        log::debug!("Orientation pipeline shut down");
    }

    pub fn is_shut_down(&self) -> bool {
        self.shut_down
    }

    /// Re-registers the sensor (with a fresh baseline) if sensor mode is selected.
    pub fn resume(&mut self) -> Result<()> {
        if !self.suspended || self.shut_down {
            return Ok(());
        }
        self.suspended = false;

        if self.mode == HeadingMode::DeviceSensor {
            if let Err(e) = self.start_sensor() {
                self.mode = HeadingMode::TouchDrag;
                if e != SoundfieldError::SensorUnavailable {
                    return Err(e);
                }
            }
        }
        Ok(())
    }

    fn start_sensor(&mut self) -> Result<()> {
        match self.sensor.enable(self.angle.clone(), self.events.clone()) {
            Ok(true) => {
                let _ = self.events.send(SoundfieldEvent::SensorEnabled);
                Ok(())
            }
            Ok(false) => Ok(()),
            Err(SoundfieldError::SensorUnavailable) => {
                log::warn!("No heading sensor available, staying on touch control");
                let _ = self.events.send(SoundfieldEvent::SensorUnavailable);
                Err(SoundfieldError::SensorUnavailable)
            }
            Err(e) => {
                log::error!("Failed to enable heading sensor: {}", e);
                Err(e)
            }
        }
    }

    fn stop_sensor(&mut self) {
        if self.sensor.disable() {
            let _ = self.events.send(SoundfieldEvent::SensorDisabled);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::heading::sensor::tests::{FakeSensors, angle_watch};
    use crossbeam_channel::unbounded;
    use std::time::Duration;

    const WAIT: Duration = Duration::from_secs(2);

    fn pipeline(sensors: Arc<FakeSensors>) -> (OrientationPipeline, crossbeam_channel::Receiver<SoundfieldEvent>) {
        let (tx, rx) = unbounded();
        (OrientationPipeline::new(sensors, SensorCadence::Ui, tx), rx)
    }

    #[test]
    fn test_touch_sets_angle_synchronously() {
        let (pipeline, _events) = pipeline(Arc::new(FakeSensors::default()));
        let angles = angle_watch(pipeline.angle_state());

        assert_eq!(pipeline.on_touch_move(100.0, 50.0, 100.0, 100.0), Some(90.0));
        assert_eq!(angles.try_recv().unwrap(), 90.0);
        assert_eq!(pipeline.angle(), 90.0);
    }

    #[test]
    fn test_zero_sized_touch_surface_is_noop() {
        let (pipeline, _events) = pipeline(Arc::new(FakeSensors::default()));
        let angles = angle_watch(pipeline.angle_state());

        assert_eq!(pipeline.on_touch_move(10.0, 10.0, 0.0, 0.0), None);
        assert!(angles.try_recv().is_err());
    }

    #[test]
    fn test_touch_ignored_in_sensor_mode() {
        let sensors = Arc::new(FakeSensors::default());
        let (mut pipeline, _events) = pipeline(sensors.clone());
        let angles = angle_watch(pipeline.angle_state());

        assert_eq!(pipeline.set_mode(HeadingMode::DeviceSensor).unwrap(), HeadingMode::DeviceSensor);
        assert_eq!(pipeline.on_touch_move(100.0, 50.0, 100.0, 100.0), None);

        sensors.emit(40.0);
        sensors.emit(50.0);
        assert_eq!(angles.recv_timeout(WAIT).unwrap(), 10.0);

        pipeline.set_mode(HeadingMode::TouchDrag).unwrap();
        assert_eq!(sensors.listener_count(), 0);
        assert_eq!(pipeline.on_touch_move(50.0, 100.0, 100.0, 100.0), Some(180.0));
    }

    #[test]
    fn test_suspend_resume_recalibrates() {
        let sensors = Arc::new(FakeSensors::default());
        let (mut pipeline, _events) = pipeline(sensors.clone());
        let angles = angle_watch(pipeline.angle_state());

        pipeline.set_mode(HeadingMode::DeviceSensor).unwrap();
        sensors.emit(40.0);
        sensors.emit(60.0);
        assert_eq!(angles.recv_timeout(WAIT).unwrap(), 20.0);

        pipeline.suspend();
        assert!(!pipeline.is_sensor_listening());
        assert_eq!(sensors.listener_count(), 0);
        assert_eq!(pipeline.mode(), HeadingMode::DeviceSensor);

        pipeline.resume().unwrap();
        assert!(pipeline.is_sensor_listening());
        sensors.emit(60.0);
        sensors.emit(75.0);
        assert_eq!(angles.recv_timeout(WAIT).unwrap(), 15.0);
    }

    #[test]
    fn test_sensor_unavailable_falls_back_to_touch() {
        let (mut pipeline, events) = pipeline(Arc::new(FakeSensors::unavailable()));

        assert_eq!(pipeline.set_mode(HeadingMode::DeviceSensor).unwrap(), HeadingMode::TouchDrag);
        assert_eq!(pipeline.mode(), HeadingMode::TouchDrag);
        assert_eq!(events.try_recv().unwrap(), SoundfieldEvent::SensorUnavailable);
        assert!(pipeline.on_touch_move(100.0, 50.0, 100.0, 100.0).is_some());
    }

    #[test]
    fn test_shutdown_is_permanent() {
        let sensors = Arc::new(FakeSensors::default());
        let (mut pipeline, _events) = pipeline(sensors.clone());

        pipeline.set_mode(HeadingMode::DeviceSensor).unwrap();
        pipeline.shutdown();
        assert!(pipeline.is_shut_down());
        assert_eq!(sensors.listener_count(), 0);

        pipeline.resume().unwrap();
        pipeline.set_mode(HeadingMode::TouchDrag).unwrap();
        pipeline.set_mode(HeadingMode::DeviceSensor).unwrap();
        assert!(!pipeline.is_sensor_listening());
        assert_eq!(sensors.listener_count(), 0);
    }

    #[test]
    fn test_mode_switch_events() {
        let sensors = Arc::new(FakeSensors::default());
        let (mut pipeline, events) = pipeline(sensors);

        pipeline.set_mode(HeadingMode::DeviceSensor).unwrap();
        pipeline.set_mode(HeadingMode::DeviceSensor).unwrap();
        pipeline.set_mode(HeadingMode::TouchDrag).unwrap();

        let collected: Vec<_> = events.try_iter().collect();
        assert_eq!(
            collected,
            vec![SoundfieldEvent::SensorEnabled, SoundfieldEvent::SensorDisabled]
        );
    }
}
