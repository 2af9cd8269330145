use crate::simulation::{
    ClockEngine, DEMO_TRACKS, LoggingSurroundFactory, SimulatedCompass,
};
use egui::{Color32, Pos2, Rect, Sense, Stroke, Vec2};
use soundfield_core::sync::DisplaySink;
use soundfield_core::{
    ChannelExecutor, ContentRef, HeadingMode, SoundfieldDesc, SoundfieldEvent, SoundfieldPlayer,
    SurroundRenderer, TransportState,
};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

#[derive(Debug, Clone)]
struct DisplayModel {
    current_time: String,
    duration_time: String,
    progress: u64,
    max: u64,
    heading: f32,
}

impl Default for DisplayModel {
    fn default() -> Self {
        Self {
            current_time: "0:00".to_string(),
            duration_time: "-:--".to_string(),
            progress: 0,
            max: 0,
            heading: 0.0,
        }
    }
}

/// What the widgets render; written only by tasks drained on the UI thread.
#[derive(Default)]
struct DemoDisplay {
    model: Mutex<DisplayModel>,
}

impl DemoDisplay {
    fn model(&self) -> MutexGuard<'_, DisplayModel> {
        self.model
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl DisplaySink for DemoDisplay {
    fn show_time(&self, current: &str, duration: &str) {
        let mut model = self.model();
        model.current_time = current.to_string();
        model.duration_time = duration.to_string();
    }

    fn show_progress(&self, progress: u64, max: u64) {
        let mut model = self.model();
        model.progress = progress;
        model.max = max;
    }

    fn show_heading(&self, angle: f32) {
        self.model().heading = angle;
    }
}

pub struct SoundfieldDemo {
    player: SoundfieldPlayer,
    executor: Arc<ChannelExecutor>,
    display: Arc<DemoDisplay>,
    compass: Arc<SimulatedCompass>,
    renderer: Arc<SurroundRenderer>,
    poll_interval: Duration,

    // UI state
    selected_track: Option<usize>,
    use_sensor: bool,
    in_background: bool,
    device_yaw: f32,
    seek_value: f64,
    status: String,
}

impl SoundfieldDemo {
    pub fn new(cc: &eframe::CreationContext<'_>) -> soundfield_core::Result<Self> {
        let ctx = cc.egui_ctx.clone();
        let executor = Arc::new(ChannelExecutor::with_waker(move || ctx.request_repaint()));

        let desc = SoundfieldDesc::default();
        let poll_interval = desc.poll_interval;
        let renderer = Arc::new(SurroundRenderer::from_desc(
            Arc::new(LoggingSurroundFactory),
            &desc,
        ));
        let compass = Arc::new(SimulatedCompass::new());
        let display = Arc::new(DemoDisplay::default());

        let player = SoundfieldPlayer::new(
            desc,
            Arc::new(ClockEngine::new(renderer.clone())),
            renderer.clone(),
            compass.clone(),
            display.clone(),
            executor.clone(),
        )?;
        log::info!("GUI: player ready with {} demo tracks", DEMO_TRACKS.len());

        Ok(Self {
            player,
            executor,
            display,
            compass,
            renderer,
            poll_interval,
            selected_track: None,
            use_sensor: false,
            in_background: false,
            device_yaw: 0.0,
            seek_value: 0.0,
            status: "Pick a track and press Open".to_string(),
        })
    }

    fn report<T>(&mut self, action: &str, result: soundfield_core::Result<T>) {
        if let Err(e) = result {
            log::error!("GUI: {} failed: {}", action, e);
            self.status = format!("{} failed: {}", action, e);
        }
    }

    fn handle_events(&mut self) {
        for event in self.player.poll_events() {
            if event.is_transport_event() {
                log::info!("GUI: transport event {:?}", event);
            } else {
                log::debug!("GUI: event {:?}", event);
            }
            self.status = match event {
                SoundfieldEvent::Prepared {
                    content,
                    duration_ms,
                } => format!("Prepared {} ({:?} ms)", content, duration_ms),
                SoundfieldEvent::PlaybackStarted => "Playing".to_string(),
                SoundfieldEvent::PlaybackPaused { .. } => "Paused".to_string(),
                SoundfieldEvent::PlaybackStopped => "Stopped".to_string(),
                SoundfieldEvent::PlaybackEnded => "Finished, rewound to start".to_string(),
                SoundfieldEvent::PlaybackError { error } => format!("Playback error: {}", error),
                SoundfieldEvent::Released => "Released".to_string(),
                SoundfieldEvent::SensorEnabled => "Following device sensor".to_string(),
                SoundfieldEvent::SensorDisabled => "Following touch".to_string(),
                SoundfieldEvent::SensorUnavailable => {
                    self.use_sensor = false;
                    "No heading sensor on this device".to_string()
                }
                SoundfieldEvent::HeadingCalibrated { offset } => {
                    format!("Sensor calibrated, forward = {:.0} deg", offset)
                }
            };
        }
    }

    fn draw_dial(&mut self, ui: &mut egui::Ui) {
        let size = ui.available_width().min(ui.available_height()).min(320.0);
        let (rect, response) = ui.allocate_exact_size(Vec2::splat(size), Sense::click_and_drag());

        if response.is_pointer_button_down_on() {
            if let Some(pos) = response.interact_pointer_pos() {
                let local = pos - rect.min;
                self.player
                    .on_touch_move(local.x, local.y, rect.width(), rect.height());
            }
        }

        let painter = ui.painter_at(rect);
        let center = rect.center();
        let radius = size * 0.42;

        painter.circle_filled(center, radius, Color32::from_gray(30));
        painter.circle_stroke(center, radius, Stroke::new(2.0, Color32::from_gray(120)));

        for (label, direction) in [
            ("Front", Vec2::new(0.0, -1.0)),
            ("Right", Vec2::new(1.0, 0.0)),
            ("Back", Vec2::new(0.0, 1.0)),
            ("Left", Vec2::new(-1.0, 0.0)),
        ] {
            painter.text(
                center + direction * (radius + 14.0),
                egui::Align2::CENTER_CENTER,
                label,
                egui::FontId::proportional(13.0),
                Color32::LIGHT_GRAY,
            );
        }

        // 0 deg points up, angles grow clockwise
        let heading = self.display.model().heading.to_radians();
        let tip: Pos2 = center + Vec2::new(heading.sin(), -heading.cos()) * radius * 0.9;
        let indicator = if self.use_sensor {
            Color32::from_rgb(120, 200, 120)
        } else {
            Color32::from_rgb(255, 140, 60)
        };
        painter.line_segment([center, tip], Stroke::new(3.0, indicator));
        painter.circle_filled(tip, 6.0, indicator);
        painter.circle_filled(center, 4.0, Color32::WHITE);

        if self.use_sensor {
            painter.text(
                Rect::from_center_size(center, Vec2::splat(radius)).center_bottom(),
                egui::Align2::CENTER_TOP,
                "sensor",
                egui::FontId::proportional(11.0),
                Color32::GRAY,
            );
        }
    }

    fn draw_transport(&mut self, ui: &mut egui::Ui) {
        ui.label("Content:");
        let selected_text = self
            .selected_track
            .and_then(|index| DEMO_TRACKS.get(index))
            .map_or("(nothing selected)", |track| track.title);
        egui::ComboBox::from_id_salt("content_picker")
            .selected_text(selected_text)
            .width(260.0)
            .show_ui(ui, |ui| {
                for (index, track) in DEMO_TRACKS.iter().enumerate() {
                    ui.selectable_value(&mut self.selected_track, Some(index), track.title);
                }
            });

        if ui.button("Open").clicked() {
            let content = self
                .selected_track
                .and_then(|index| DEMO_TRACKS.get(index))
                .map(|track| ContentRef::new(track.id));
            match self.player.open(content) {
                Ok(false) => self.status = "Nothing selected".to_string(),
                other => self.report("Open", other),
            }
        }

        ui.add_space(8.0);
        ui.horizontal(|ui| {
            let playing = *self.player.transport_state() == TransportState::Playing;
            if ui.button(if playing { "Pause" } else { "Play" }).clicked() {
                let result = self.player.toggle_playback();
                self.report("Play/pause", result);
            }
            if ui.button("Stop").clicked() {
                let result = self.player.stop();
                self.report("Stop", result);
            }
        });

        let (current_time, duration_time, progress, max) = {
            let model = self.display.model();
            (
                model.current_time.clone(),
                model.duration_time.clone(),
                model.progress,
                model.max,
            )
        };

        if !self.player.is_seeking() {
            self.seek_value = progress as f64;
        }
        let response = ui.add_enabled(
            max > 0,
            egui::Slider::new(&mut self.seek_value, 0.0..=max.max(1) as f64).show_value(false),
        );
        if response.drag_started() {
            self.player.begin_seek();
        }
        if response.drag_stopped() || (response.changed() && !response.dragged()) {
            let result = self.player.seek(self.seek_value as i64);
            self.report("Seek", result);
            self.player.end_seek();
        }

        ui.label(format!("{} / {}", current_time, duration_time));
    }

    fn draw_heading_controls(&mut self, ui: &mut egui::Ui) {
        if ui
            .checkbox(&mut self.use_sensor, "Use device sensor")
            .changed()
        {
            let requested = if self.use_sensor {
                HeadingMode::DeviceSensor
            } else {
                HeadingMode::TouchDrag
            };
            match self.player.set_heading_mode(requested) {
                Ok(mode) => self.use_sensor = mode == HeadingMode::DeviceSensor,
                Err(e) => {
                    self.use_sensor = false;
                    self.status = format!("Sensor error: {}", e);
                }
            }
        }

        if self.use_sensor {
            ui.label("Simulated device yaw:");
            self.device_yaw = self.compass.yaw();
            if ui
                .add(egui::Slider::new(&mut self.device_yaw, 0.0..=359.0).suffix(" deg"))
                .changed()
            {
                self.compass.set_yaw(self.device_yaw);
            }
        }

        if ui
            .checkbox(&mut self.in_background, "Simulate app in background")
            .changed()
        {
            if self.in_background {
                self.player.suspend();
            } else {
                let result = self.player.resume();
                self.report("Resume", result);
            }
        }

        ui.label(format!("Heading: {:.1} deg", self.player.angle()));
        let [w, x, y, z] = self.renderer.orientation();
        ui.label(format!(
            "Renderer: w={:.3} x={:.3} y={:.3} z={:.3}",
            w, x, y, z
        ));
        if let Some(layout) = self.renderer.layout() {
            ui.label(format!("Layout: {:?}", layout));
        }
    }
}

impl eframe::App for SoundfieldDemo {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.executor.run_pending();
        self.handle_events();

        egui::SidePanel::right("control_panel")
            .default_width(300.0)
            .show(ctx, |ui| {
                ui.heading("Playback");
                ui.separator();
                self.draw_transport(ui);

                ui.add_space(16.0);
                ui.heading("Heading");
                ui.separator();
                self.draw_heading_controls(ui);

                ui.add_space(16.0);
                ui.separator();
                ui.label(&self.status);
            });

        egui::CentralPanel::default().show(ctx, |ui| {
            ui.heading("Soundfield");
            ui.label(if self.use_sensor {
                "Turn the simulated device to steer the sound field"
            } else {
                "Drag on the dial to face a direction"
            });
            ui.separator();
            self.draw_dial(ui);
        });

        // Engine notifications (end of content, failures) do not wake the UI
        if *self.player.transport_state() == TransportState::Playing {
            ctx.request_repaint_after(self.poll_interval);
        }
    }
}

impl Drop for SoundfieldDemo {
    fn drop(&mut self) {
        log::info!("Shutting down player");
        self.player.release();
    }
}
