// Audio sink boundary
//
// Forwards composed rotations to the spatial-audio engine and transport
// commands to the media engine. The renderer submodule adapts a native
// surround/ambisonic renderer to the orientation contract.

mod renderer;

pub use renderer::{
    InputFormat, NativeSurround, NativeSurroundFactory, OutputConfig, SampleEncoding,
    SurroundLayout, SurroundRenderer,
};

use crate::error::Result;
use crate::math::OrientationRotation;
use crate::transport::{ContentRef, PlaybackSnapshot, Transport, TransportState};
use std::sync::Arc;

/// External spatial-audio engine.
///
/// `update_orientation` is called on whichever thread changed the heading
/// (UI or sensor worker), at up to sensor rate. It must be cheap and must not
/// block.
pub trait SpatialAudioEngine: Send + Sync {
    fn update_orientation(&self, w: f32, x: f32, y: f32, z: f32);
}

/// Cloneable handle that pushes rotations into the spatial engine.
#[derive(Clone)]
pub struct OrientationForwarder {
    spatial: Arc<dyn SpatialAudioEngine>,
}

impl OrientationForwarder {
    pub fn forward(&self, rotation: OrientationRotation) {
        let [w, x, y, z] = rotation.to_wxyz();
        self.spatial.update_orientation(w, x, y, z);
    }
}

/// Owns both external engines for a playback session.
pub struct AudioSinkAdapter {
    spatial: Arc<dyn SpatialAudioEngine>,
    transport: Transport,
}

impl AudioSinkAdapter {
    pub fn new(spatial: Arc<dyn SpatialAudioEngine>, transport: Transport) -> Self {
        Self { spatial, transport }
    }

    pub fn update(&self, rotation: OrientationRotation) {
        self.forwarder().forward(rotation);
    }

    pub fn forwarder(&self) -> OrientationForwarder {
        OrientationForwarder {
            spatial: self.spatial.clone(),
        }
    }

    pub fn transport(&self) -> &Transport {
        &self.transport
    }

    pub fn state(&self) -> &TransportState {
        self.transport.state()
    }

    pub fn snapshot(&self) -> PlaybackSnapshot {
        self.transport.snapshot()
    }

    pub fn prepare(&mut self, content: Option<ContentRef>) -> Result<bool> {
        self.transport.prepare(content)
    }

    pub fn play(&mut self) -> Result<()> {
        self.transport.play()
    }

    pub fn pause(&mut self) -> Result<()> {
        self.transport.pause()
    }

    pub fn stop(&mut self) -> Result<()> {
        self.transport.stop()
    }

    pub fn toggle(&mut self) -> Result<()> {
        self.transport.toggle()
    }

    pub fn seek(&mut self, position_ms: i64) -> Result<u64> {
        self.transport.seek(position_ms)
    }

    pub fn release(&mut self) {
        self.transport.release();
    }

    /// Relays pending engine events (ended, errors) through the transport.
    pub fn process_media_events(&mut self) {
        self.transport.process_media_events();
    }

    pub fn begin_seek(&self) {
        self.transport.sync().begin_seek();
    }

    pub fn end_seek(&self) {
        self.transport.sync().end_seek();
    }

    pub fn is_seeking(&self) -> bool {
        self.transport.sync().is_seeking()
    }
}
