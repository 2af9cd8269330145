//! Heading input: touch drags and device orientation sensors.
//!
//! - [`touch`]: maps pointer positions on a square dial to an angle
//! - [`calibration`]: session-local baseline removal for sensor headings
//! - [`sensor`]: sensor registration wrapped as a cancellable sample stream
//! - [`pipeline`]: mode selection and delivery into [`AngleState`](crate::angle::AngleState)

pub mod calibration;
pub mod pipeline;
pub mod sensor;
pub mod touch;

pub use calibration::{CalibrationFilter, CalibrationState, FilterOutput, normalize};
pub use pipeline::OrientationPipeline;
pub use sensor::{HeadingStream, ListenerId, SampleCallback, SensorListener, SensorSubsystem};
pub use touch::touch_to_angle;

use std::time::Duration;

/// Which input currently drives the heading. Exactly one is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HeadingMode {
    /// Heading follows pointer drags over the dial
    #[default]
    TouchDrag,
    /// Heading follows the device orientation sensor, calibrated per session
    DeviceSensor,
}

/// Delivery rate hint passed to the sensor subsystem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SensorCadence {
    Fastest,
    Game,
    /// Rate suitable for driving on-screen widgets
    #[default]
    Ui,
    Normal,
}

impl SensorCadence {
    /// Approximate interval between samples. Delivery is not precisely timed.
    pub fn nominal_interval(&self) -> Duration {
        match self {
            Self::Fastest => Duration::ZERO,
            Self::Game => Duration::from_millis(20),
            Self::Ui => Duration::from_millis(66),
            Self::Normal => Duration::from_millis(200),
        }
    }
}

/// One raw heading reading, consumed once.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawHeadingSample {
    /// Degrees for touch input, sensor units (absolute heading degrees) for sensors
    pub value: f32,
    pub mode: HeadingMode,
}

impl RawHeadingSample {
    pub fn sensor(value: f32) -> Self {
        Self {
            value,
            mode: HeadingMode::DeviceSensor,
        }
    }
}
