use crate::angle::SubscriptionId;
use crate::config::SoundfieldDesc;
use crate::error::Result;
use crate::events::SoundfieldEvent;
use crate::executor::UiExecutor;
use crate::heading::{HeadingMode, OrientationPipeline, SensorSubsystem};
use crate::rotation::compose;
use crate::sink::{AudioSinkAdapter, SpatialAudioEngine};
use crate::sync::{DisplaySink, PlaybackSyncLoop};
use crate::transport::{ContentRef, MediaEngine, PlaybackSnapshot, Transport, TransportState};
use crossbeam_channel::{Receiver, Sender, unbounded};
use std::sync::Arc;

/// Main player object tying the heading pipeline to the audio engines.
///
/// `SoundfieldPlayer` lives on the UI thread. It owns:
///
/// - **Orientation**: the [`OrientationPipeline`] whose angle changes are
///   composed into rotations and pushed to the spatial-audio engine, and
///   mirrored onto the display's heading indicator
/// - **Transport**: the media engine session and its playback sync loop
///
/// Lifecycle notifications are collected with [`poll_events`](Self::poll_events).
pub struct SoundfieldPlayer {
    desc: SoundfieldDesc,
    pipeline: OrientationPipeline,
    sink: AudioSinkAdapter,
    subscriptions: Vec<SubscriptionId>,
    event_receiver: Receiver<SoundfieldEvent>,
    // Kept so the channel stays open even if every producer is gone
    _event_sender: Sender<SoundfieldEvent>,
}

impl SoundfieldPlayer {
    pub fn new(
        desc: SoundfieldDesc,
        media: Arc<dyn MediaEngine>,
        spatial: Arc<dyn SpatialAudioEngine>,
        sensors: Arc<dyn SensorSubsystem>,
        display: Arc<dyn DisplaySink>,
        executor: Arc<dyn UiExecutor>,
    ) -> Result<Self> {
        desc.validate()?;
        let (event_sender, event_receiver) = unbounded();

        let mut pipeline =
            OrientationPipeline::new(sensors, desc.sensor_cadence, event_sender.clone());

        let sync = PlaybackSyncLoop::new(desc.poll_interval, display.clone(), executor.clone());
        let transport = Transport::new(media, sync, event_sender.clone());
        let sink = AudioSinkAdapter::new(spatial, transport);

        let mut subscriptions = Vec::with_capacity(2);

        let forwarder = sink.forwarder();
        subscriptions.push(
            pipeline
                .angle_state()
                .subscribe(move |angle| forwarder.forward(compose(angle))),
        );

        subscriptions.push(pipeline.angle_state().subscribe(move |angle| {
            let display = display.clone();
            executor.post(Box::new(move || display.show_heading(angle)));
        }));

        let mode = pipeline.set_mode(desc.initial_mode)?;
        log::info!(
            "Soundfield player created (heading mode: {:?}, poll interval: {:?})",
            mode,
            desc.poll_interval
        );

        Ok(Self {
            desc,
            pipeline,
            sink,
            subscriptions,
            event_receiver,
            _event_sender: event_sender,
        })
    }

    pub fn desc(&self) -> &SoundfieldDesc {
        &self.desc
    }

    /// Current heading in degrees, `[0, 360)`.
    pub fn angle(&self) -> f32 {
        self.pipeline.angle()
    }

    pub fn heading_mode(&self) -> HeadingMode {
        self.pipeline.mode()
    }

    /// Pointer drag over the heading dial. Ignored in sensor mode.
    pub fn on_touch_move(&self, x: f32, y: f32, width: f32, height: f32) -> Option<f32> {
        self.pipeline.on_touch_move(x, y, width, height)
    }

    /// Switches heading source; returns the mode actually in effect.
    pub fn set_heading_mode(&mut self, mode: HeadingMode) -> Result<HeadingMode> {
        self.pipeline.set_mode(mode)
    }

    /// Application went to the background: stop listening to the sensor.
    pub fn suspend(&mut self) {
        self.pipeline.suspend();
    }

    pub fn resume(&mut self) -> Result<()> {
        self.pipeline.resume()
    }

    pub fn prepare(&mut self, content: Option<ContentRef>) -> Result<bool> {
        self.sink.prepare(content)
    }

    /// Prepares `content` and starts playing it.
    ///
    /// Returns `Ok(false)` without touching the engine when nothing is selected.
    pub fn open(&mut self, content: Option<ContentRef>) -> Result<bool> {
        if !self.sink.prepare(content)? {
            return Ok(false);
        }
        self.sink.play()?;
        Ok(true)
    }

    pub fn play(&mut self) -> Result<()> {
        self.sink.play()
    }

    pub fn pause(&mut self) -> Result<()> {
        self.sink.pause()
    }

    pub fn stop(&mut self) -> Result<()> {
        self.sink.stop()
    }

    pub fn toggle_playback(&mut self) -> Result<()> {
        self.sink.toggle()
    }

    pub fn seek(&mut self, position_ms: i64) -> Result<u64> {
        self.sink.seek(position_ms)
    }

    /// The user started dragging the seek bar.
    pub fn begin_seek(&self) {
        self.sink.begin_seek();
    }

    /// The user let go of the seek bar.
    pub fn end_seek(&self) {
        self.sink.end_seek();
    }

    pub fn is_seeking(&self) -> bool {
        self.sink.is_seeking()
    }

    pub fn transport_state(&self) -> &TransportState {
        self.sink.state()
    }

    pub fn snapshot(&self) -> PlaybackSnapshot {
        self.sink.snapshot()
    }

    /// Applies pending media engine notifications and returns all events
    /// raised since the last call.
    pub fn poll_events(&mut self) -> Vec<SoundfieldEvent> {
        self.sink.process_media_events();
        self.event_receiver.try_iter().collect()
    }

    /// Releases the media engine and the sensor listener. The player cannot
    /// be resumed afterwards.
    pub fn release(&mut self) {
        self.pipeline.shutdown();
        self.sink.release();
    }
}

impl Drop for SoundfieldPlayer {
    fn drop(&mut self) {
        self.release();
        for id in self.subscriptions.drain(..) {
            self.pipeline.angle_state().unsubscribe(id);
        }
    }
}
