//! Event types for Soundfield

use crate::transport::ContentRef;

#[derive(Debug, Clone, PartialEq)]
pub enum SoundfieldEvent {
    Prepared {
        content: ContentRef,
        duration_ms: Option<u64>,
    },
    PlaybackStarted,
    PlaybackPaused {
        position_ms: u64,
    },
    PlaybackStopped,
    PlaybackEnded,
    PlaybackError {
        error: String,
    },
    Released,
    SensorEnabled,
    SensorDisabled,
    SensorUnavailable,
    HeadingCalibrated {
        offset: f32,
    },
}

impl SoundfieldEvent {
    pub fn is_error(&self) -> bool {
        matches!(
            self,
            Self::PlaybackError { .. } | Self::SensorUnavailable
        )
    }

    pub fn is_transport_event(&self) -> bool {
        matches!(
            self,
            Self::Prepared { .. }
                | Self::PlaybackStarted
                | Self::PlaybackPaused { .. }
                | Self::PlaybackStopped
                | Self::PlaybackEnded
                | Self::PlaybackError { .. }
                | Self::Released
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_classification() {
        let prepared = SoundfieldEvent::Prepared {
            content: ContentRef::new("forest.ambix"),
            duration_ms: None,
        };
        assert!(prepared.is_transport_event());
        assert!(SoundfieldEvent::Released.is_transport_event());

        let failure = SoundfieldEvent::PlaybackError {
            error: "decoder".into(),
        };
        assert!(failure.is_transport_event() && failure.is_error());

        assert!(!SoundfieldEvent::SensorEnabled.is_transport_event());
        assert!(!SoundfieldEvent::HeadingCalibrated { offset: 12.0 }.is_transport_event());
        assert!(SoundfieldEvent::SensorUnavailable.is_error());
    }
}
