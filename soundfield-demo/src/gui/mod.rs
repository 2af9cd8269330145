mod app;

pub use app::SoundfieldDemo;

/// Run the GUI demo
pub fn run() -> Result<(), eframe::Error> {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([720.0, 560.0])
            .with_title("Soundfield Heading Demo"),
        ..Default::default()
    };

    eframe::run_native(
        "Soundfield Heading Demo",
        options,
        Box::new(|cc| Ok(Box::new(SoundfieldDemo::new(cc)?))),
    )
}
