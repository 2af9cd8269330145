use crate::simulation::{ClockEngine, LoggingSurroundFactory, SimulatedCompass};
use anyhow::{Context, Result, bail};
use soundfield_core::sync::DisplaySink;
use soundfield_core::{
    ContentRef, HeadingMode, ImmediateExecutor, SoundfieldDesc, SoundfieldEvent,
    SoundfieldPlayer, SurroundRenderer,
};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Display that writes every update to the log.
struct LogDisplay;

impl DisplaySink for LogDisplay {
    fn show_time(&self, current: &str, duration: &str) {
        log::info!("Time {} / {}", current, duration);
    }

    fn show_progress(&self, progress: u64, max: u64) {
        log::debug!("Progress {} of {}", progress, max);
    }

    fn show_heading(&self, angle: f32) {
        log::debug!("Heading indicator at {:.1} deg", angle);
    }
}

pub fn run_scenario() -> Result<()> {
    let desc = SoundfieldDesc::new().poll_interval(Duration::from_millis(250));
    let renderer = Arc::new(SurroundRenderer::from_desc(
        Arc::new(LoggingSurroundFactory),
        &desc,
    ));
    let compass = Arc::new(SimulatedCompass::new());

    let mut player = SoundfieldPlayer::new(
        desc,
        Arc::new(ClockEngine::new(renderer.clone())),
        renderer.clone(),
        compass.clone(),
        Arc::new(LogDisplay),
        Arc::new(ImmediateExecutor),
    )
    .context("creating player")?;

    log::info!("=== Touch heading ===");
    for (x, y, label) in [
        (50.0, 0.0, "front"),
        (100.0, 50.0, "right"),
        (50.0, 100.0, "back"),
        (0.0, 50.0, "left"),
    ] {
        let angle = player.on_touch_move(x, y, 100.0, 100.0);
        log::info!(
            "Touch {} -> {:?}, renderer orientation {:?}",
            label,
            angle,
            renderer.orientation()
        );
    }

    log::info!("=== Sensor heading ===");
    compass.set_yaw(40.0);
    let mode = player.set_heading_mode(HeadingMode::DeviceSensor)?;
    log::info!("Heading mode now {:?}", mode);
    std::thread::sleep(Duration::from_millis(300));
    compass.set_yaw(70.0);
    std::thread::sleep(Duration::from_millis(300));
    log::info!(
        "Device yaw {:.0}, heading relative to the start now {:.1}",
        compass.yaw(),
        player.angle()
    );
    log_events(&mut player);

    player.suspend();
    compass.set_yaw(200.0);
    player.resume()?;
    std::thread::sleep(Duration::from_millis(300));
    log::info!("Resumed with a fresh baseline, heading now {:.1}", player.angle());
    player.set_heading_mode(HeadingMode::TouchDrag)?;
    log_events(&mut player);

    log::info!("=== Playback ===");
    if !player.open(Some(ContentRef::new("sting-stereo")))? {
        bail!("nothing was opened");
    }
    std::thread::sleep(Duration::from_secs(1));
    player.pause()?;
    log::info!("Paused at {:?}", player.snapshot());
    player.play()?;
    let target = player.seek(5_000)?;
    log::info!("Seeked to {} ms, waiting for the end", target);
    wait_for(&mut player, Duration::from_secs(5), |event| {
        *event == SoundfieldEvent::PlaybackEnded
    })?;
    log::info!("After end of playback: {:?}", player.snapshot());

    log::info!("=== Failures ===");
    if let Err(e) = player.open(Some(ContentRef::new("broken-7ch"))) {
        log::warn!("Opening broken content failed as expected: {}", e);
    }
    if let Err(e) = player.play() {
        log::warn!("Play refused: {}", e);
    }
    player.open(Some(ContentRef::new("flaky-foa")))?;
    wait_for(&mut player, Duration::from_secs(6), SoundfieldEvent::is_error)?;
    log::info!("Transport state: {:?}", player.transport_state());

    player.release();
    log_events(&mut player);

    log::info!("=== Device without a heading sensor ===");
    run_without_sensor()?;

    log::info!("CLI scenario completed");
    Ok(())
}

fn run_without_sensor() -> Result<()> {
    let desc = SoundfieldDesc::new().initial_mode(HeadingMode::DeviceSensor);
    let renderer = Arc::new(SurroundRenderer::from_desc(
        Arc::new(LoggingSurroundFactory),
        &desc,
    ));
    let mut player = SoundfieldPlayer::new(
        desc,
        Arc::new(ClockEngine::new(renderer.clone())),
        renderer,
        Arc::new(SimulatedCompass::missing()),
        Arc::new(LogDisplay),
        Arc::new(ImmediateExecutor),
    )
    .context("creating sensorless player")?;

    log::info!("Requested sensor mode, running in {:?}", player.heading_mode());
    let angle = player.on_touch_move(100.0, 50.0, 100.0, 100.0);
    log::info!("Touch still steers the field: {:?}", angle);
    log_events(&mut player);
    Ok(())
}

fn log_events(player: &mut SoundfieldPlayer) {
    for event in player.poll_events() {
        log::info!("Event: {:?}", event);
    }
}

fn wait_for(
    player: &mut SoundfieldPlayer,
    timeout: Duration,
    mut predicate: impl FnMut(&SoundfieldEvent) -> bool,
) -> Result<()> {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        for event in player.poll_events() {
            log::info!("Event: {:?}", event);
            if predicate(&event) {
                return Ok(());
            }
        }
        std::thread::sleep(Duration::from_millis(50));
    }
    bail!("timed out after {:?}", timeout)
}
