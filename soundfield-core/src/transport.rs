//! Playback transport over an external media engine.
//!
//! This module provides:
//! - [`MediaEngine`]: the decode/playback engine contract consumed by Soundfield
//! - [`ContentRef`]: opaque reference to a user-chosen media source
//! - [`PlaybackSnapshot`]: position/duration/playing state read from the engine
//! - [`Transport`]: owns the engine for a session, forwards transport commands,
//!   drives the [`PlaybackSyncLoop`] and resets on end of playback
//!
//! Most users will go through [`SoundfieldPlayer`](crate::SoundfieldPlayer)
//! rather than using [`Transport`] directly.

use crate::error::{Result, SoundfieldError};
use crate::events::SoundfieldEvent;
use crate::sync::PlaybackSyncLoop;
use crossbeam_channel::{Receiver, Sender, unbounded};
use std::sync::Arc;

/// Opaque reference to a media source (URI, path, catalogue id...).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContentRef(String);

impl ContentRef {
    pub fn new(reference: impl Into<String>) -> Self {
        Self(reference.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ContentRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Asynchronous notifications from the media engine.
#[derive(Debug, Clone, PartialEq)]
pub enum MediaEvent {
    /// Preparation finished; duration is now known (if the source has one)
    Prepared { duration_ms: Option<u64> },
    /// Playback reached the end of the content
    Ended,
    /// Decode or output failure; the session cannot continue
    Error(String),
}

/// External media decode/playback engine.
///
/// State reads are expected to be cheap and non-blocking; they are called
/// from the sync loop thread every tick.
pub trait MediaEngine: Send + Sync {
    /// Hands the engine the channel for its asynchronous events.
    fn attach(&self, events: Sender<MediaEvent>);

    fn prepare(&self, content: &ContentRef) -> Result<()>;

    fn play(&self);

    fn pause(&self);

    fn seek_to(&self, position_ms: u64);

    fn current_position(&self) -> u64;

    /// `None` until preparation has determined the duration.
    fn duration(&self) -> Option<u64>;

    /// Whether the engine intends to play (play requested and not paused).
    fn is_playing(&self) -> bool;

    fn release(&self);
}

/// Point-in-time view of the engine's playback state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaybackSnapshot {
    pub position_ms: u64,
    pub duration_ms: Option<u64>,
    pub is_playing: bool,
}

impl PlaybackSnapshot {
    /// Reads the engine, clamping the position into `[0, duration]`.
    pub fn read(engine: &dyn MediaEngine) -> Self {
        let duration_ms = engine.duration();
        let position_ms = engine.current_position();
        let position_ms = match duration_ms {
            Some(duration) => position_ms.min(duration),
            None => position_ms,
        };

        Self {
            position_ms,
            duration_ms,
            is_playing: engine.is_playing(),
        }
    }
}

/// Current transport state.
#[derive(Debug, Clone, PartialEq)]
pub enum TransportState {
    /// Nothing prepared yet
    Idle,
    /// Content prepared, not yet started
    Ready,
    Playing,
    Paused,
    /// Engine failure; a fresh `prepare` is needed before playing again
    Error(String),
    /// Engine released; the transport cannot be used any more
    Released,
}

pub struct Transport {
    engine: Arc<dyn MediaEngine>,
    media_events: Receiver<MediaEvent>,
    events: Sender<SoundfieldEvent>,
    state: TransportState,
    content: Option<ContentRef>,
    sync: PlaybackSyncLoop,
}

impl Transport {
    pub fn new(
        engine: Arc<dyn MediaEngine>,
        sync: PlaybackSyncLoop,
        events: Sender<SoundfieldEvent>,
    ) -> Self {
        let (media_sender, media_events) = unbounded();
        engine.attach(media_sender);

        Self {
            engine,
            media_events,
            events,
            state: TransportState::Idle,
            content: None,
            sync,
        }
    }

    pub fn state(&self) -> &TransportState {
        &self.state
    }

    pub fn content(&self) -> Option<&ContentRef> {
        self.content.as_ref()
    }

    pub fn is_playing(&self) -> bool {
        self.state == TransportState::Playing
    }

    pub fn snapshot(&self) -> PlaybackSnapshot {
        PlaybackSnapshot::read(self.engine.as_ref())
    }

    pub fn sync(&self) -> &PlaybackSyncLoop {
        &self.sync
    }

    /// Loads a content reference into the engine.
    ///
    /// `None` (nothing selected) is a no-op and returns `Ok(false)`.
    pub fn prepare(&mut self, content: Option<ContentRef>) -> Result<bool> {
        let Some(content) = content else {
            log::debug!("Prepare without a selection, ignoring");
            return Ok(false);
        };
        self.ensure_not_released()?;

        self.sync.cancel();
        log::info!("Preparing content: {}", content);

        if let Err(e) = self.engine.prepare(&content) {
            self.fail(e.to_string());
            return Err(e);
        }

        self.content = Some(content);
        self.state = TransportState::Ready;
        self.sync.publish(self.snapshot());
        Ok(true)
    }

    /// Starts or resumes playback and the display sync loop.
    pub fn play(&mut self) -> Result<()> {
        match &self.state {
            TransportState::Idle => {
                return Err(SoundfieldError::Transport("Nothing prepared".into()));
            }
            TransportState::Error(message) => {
                return Err(SoundfieldError::Playback(format!(
                    "Session failed ({}); prepare the content again",
                    message
                )));
            }
            TransportState::Released => {
                return Err(SoundfieldError::Transport("Transport released".into()));
            }
            TransportState::Playing => {
                if !self.sync.is_polling() {
                    self.sync.start(self.engine.clone())?;
                }
                return Ok(());
            }
            TransportState::Ready | TransportState::Paused => {}
        }

        self.engine.play();
        self.state = TransportState::Playing;
        self.sync.start(self.engine.clone())?;
        log::info!("Playback started");
        self.emit(SoundfieldEvent::PlaybackStarted);
        Ok(())
    }

    /// Pauses playback, keeping the position.
    pub fn pause(&mut self) -> Result<()> {
        self.ensure_not_released()?;
        if self.state != TransportState::Playing {
            return Ok(());
        }

        self.engine.pause();
        self.sync.cancel();
        self.state = TransportState::Paused;

        let snapshot = self.snapshot();
        self.sync.publish(snapshot);
        log::info!("Playback paused at {} ms", snapshot.position_ms);
        self.emit(SoundfieldEvent::PlaybackPaused {
            position_ms: snapshot.position_ms,
        });
        Ok(())
    }

    /// Pauses and rewinds to the start.
    pub fn stop(&mut self) -> Result<()> {
        self.ensure_not_released()?;
        if !matches!(
            self.state,
            TransportState::Playing | TransportState::Paused | TransportState::Ready
        ) {
            return Ok(());
        }

        self.rewind();
        log::info!("Playback stopped");
        self.emit(SoundfieldEvent::PlaybackStopped);
        Ok(())
    }

    pub fn toggle(&mut self) -> Result<()> {
        if self.is_playing() {
            self.pause()
        } else {
            self.play()
        }
    }

    /// Seeks to `position_ms`, clamped into `[0, duration]`.
    ///
    /// Returns the position actually requested from the engine. With an
    /// unknown duration only the lower bound applies.
    pub fn seek(&mut self, position_ms: i64) -> Result<u64> {
        if !matches!(
            self.state,
            TransportState::Playing | TransportState::Paused | TransportState::Ready
        ) {
            return Err(SoundfieldError::Transport(format!(
                "Cannot seek in state {:?}",
                self.state
            )));
        }

        let lower_clamped = u64::try_from(position_ms).unwrap_or(0);
        let target = match self.engine.duration() {
            Some(duration) => lower_clamped.min(duration),
            None => lower_clamped,
        };

        if target as i64 != position_ms {
            log::debug!("Seek to {} ms clamped to {} ms", position_ms, target);
        }
        self.engine.seek_to(target);
        Ok(target)
    }

    /// Releases the engine. Idempotent.
    pub fn release(&mut self) {
        if self.state == TransportState::Released {
            return;
        }

        self.sync.cancel();
        self.engine.release();
        self.state = TransportState::Released;
        self.content = None;
        log::info!("Transport released");
        self.emit(SoundfieldEvent::Released);
    }

    /// Drains engine notifications, applying end-of-playback and error handling.
    pub fn process_media_events(&mut self) {
        while let Ok(event) = self.media_events.try_recv() {
            self.handle_media_event(event);
        }
    }

    pub fn handle_media_event(&mut self, event: MediaEvent) {
        if self.state == TransportState::Released {
            log::debug!("Ignoring media event after release: {:?}", event);
            return;
        }

        match event {
            MediaEvent::Prepared { duration_ms } => {
                log::info!("Content prepared (duration: {:?} ms)", duration_ms);
                if let Some(content) = self.content.clone() {
                    self.emit(SoundfieldEvent::Prepared {
                        content,
                        duration_ms,
                    });
                }
                self.sync.publish(self.snapshot());
            }
            MediaEvent::Ended => {
                if matches!(
                    self.state,
                    TransportState::Playing | TransportState::Paused
                ) {
                    log::info!("Playback ended, resetting transport");
                    self.rewind();
                    self.emit(SoundfieldEvent::PlaybackEnded);
                }
            }
            MediaEvent::Error(message) => {
                log::error!("Media engine error: {}", message);
                self.engine.pause();
                self.fail(message);
            }
        }
    }

    fn rewind(&mut self) {
        self.engine.pause();
        self.sync.cancel();
        self.engine.seek_to(0);
        self.state = TransportState::Paused;
        self.sync.publish(self.snapshot());
    }

    fn fail(&mut self, message: String) {
        self.sync.cancel();
        self.state = TransportState::Error(message.clone());
        self.emit(SoundfieldEvent::PlaybackError { error: message });
    }

    fn ensure_not_released(&self) -> Result<()> {
        if self.state == TransportState::Released {
            return Err(SoundfieldError::Transport("Transport released".into()));
        }
        Ok(())
    }

    fn emit(&self, event: SoundfieldEvent) {
        if self.events.send(event).is_err() {
            log::debug!("Event receiver dropped");
        }
    }
}

impl Drop for Transport {
    fn drop(&mut self) {
        self.release();
    }
}
