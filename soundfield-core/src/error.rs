//! Error types for Soundfield

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SoundfieldError {
    #[error("Sensor error: {0}")]
    Sensor(String),

    #[error("No heading sensor available on this device")]
    SensorUnavailable,

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Playback error: {0}")]
    Playback(String),

    #[error("Renderer error: {0}")]
    Renderer(String),

    #[error("Audio format error: {0}")]
    AudioFormat(String),

    #[error("Unsupported channel layout: {0} channels")]
    UnsupportedChannelLayout(u16),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

pub type Result<T> = std::result::Result<T, SoundfieldError>;
