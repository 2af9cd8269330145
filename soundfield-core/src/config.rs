//! Configuration for Soundfield

use crate::error::{Result, SoundfieldError};
use crate::heading::{HeadingMode, SensorCadence};
use std::time::Duration;

/// Configuration descriptor for a Soundfield player
#[derive(Debug, Clone)]
pub struct SoundfieldDesc {
    /// How often the playback sync loop reads the media engine while playing
    pub poll_interval: Duration,
    /// Delivery rate requested from the sensor subsystem
    pub sensor_cadence: SensorCadence,
    /// Heading source active when the player is created
    pub initial_mode: HeadingMode,
    /// Output block size handed to the native surround renderer, in frames
    pub frames_per_output_buffer: usize,
    /// Number of output channels produced by the renderer (binaural stereo)
    pub output_channels: u16,
}

impl Default for SoundfieldDesc {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(100),
            sensor_cadence: SensorCadence::Ui,
            initial_mode: HeadingMode::TouchDrag,
            frames_per_output_buffer: 1024,
            output_channels: 2,
        }
    }
}

impl SoundfieldDesc {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn sensor_cadence(mut self, cadence: SensorCadence) -> Self {
        self.sensor_cadence = cadence;
        self
    }

    pub fn initial_mode(mut self, mode: HeadingMode) -> Self {
        self.initial_mode = mode;
        self
    }

    pub fn frames_per_output_buffer(mut self, frames: usize) -> Self {
        self.frames_per_output_buffer = frames;
        self
    }

    pub fn output_channels(mut self, channels: u16) -> Self {
        self.output_channels = channels;
        self
    }

    /// Checks that the descriptor can drive a player.
    pub fn validate(&self) -> Result<()> {
        if self.poll_interval.is_zero() {
            return Err(SoundfieldError::Configuration(
                "poll_interval must be greater than zero".into(),
            ));
        }
        if self.frames_per_output_buffer == 0 {
            return Err(SoundfieldError::Configuration(
                "frames_per_output_buffer must be greater than zero".into(),
            ));
        }
        if self.output_channels == 0 {
            return Err(SoundfieldError::Configuration(
                "output_channels must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_desc_is_valid() {
        let desc = SoundfieldDesc::default();
        assert!(desc.validate().is_ok());
        assert_eq!(desc.poll_interval, Duration::from_millis(100));
        assert_eq!(desc.frames_per_output_buffer, 1024);
        assert_eq!(desc.initial_mode, HeadingMode::TouchDrag);
    }

    #[test]
    fn test_invalid_desc() {
        assert!(
            SoundfieldDesc::new()
                .poll_interval(Duration::ZERO)
                .validate()
                .is_err()
        );
        assert!(
            SoundfieldDesc::new()
                .frames_per_output_buffer(0)
                .validate()
                .is_err()
        );
        assert!(SoundfieldDesc::new().output_channels(0).validate().is_err());
    }
}
