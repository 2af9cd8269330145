//! Heading-steered spatial audio playback.
//!
//! A listener heading (dragged on a dial or read from a device sensor) is
//! calibrated, wrapped into `[0, 360)`, composed into a rotation and pushed
//! into a spatial-audio renderer. Alongside, a playback sync loop keeps a
//! position display in step with the media engine.
//!
//! Start with [`SoundfieldPlayer`].

pub mod angle;
pub mod config;
pub mod error;
pub mod events;
pub mod executor;
pub mod heading;
pub mod math;
pub mod player;
pub mod rotation;
pub mod sink;
pub mod sync;
pub mod time_format;
pub mod transport;

pub use angle::{AngleState, SubscriptionId};
pub use config::SoundfieldDesc;
pub use error::{Result, SoundfieldError};
pub use events::SoundfieldEvent;
pub use executor::{ChannelExecutor, ImmediateExecutor, UiExecutor};
pub use heading::{HeadingMode, OrientationPipeline, SensorCadence, SensorSubsystem};
pub use math::OrientationRotation;
pub use player::SoundfieldPlayer;
pub use rotation::compose;
pub use sink::{
    AudioSinkAdapter, InputFormat, NativeSurround, NativeSurroundFactory, OutputConfig,
    SpatialAudioEngine, SurroundLayout, SurroundRenderer,
};
pub use sync::{DisplaySink, PlaybackSyncLoop};
pub use transport::{ContentRef, MediaEngine, MediaEvent, PlaybackSnapshot, TransportState};
