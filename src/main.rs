mod app;
mod color;
mod ui;

use app::RustyWranglerApp;
use eframe::egui;
use rusty_wrangler::PipelineConfig;

fn main() -> eframe::Result {
    env_logger::init();

    let config = match PipelineConfig::load() {
        Ok(config) => config,
        Err(e) => {
            log::warn!("Ignoring configuration, using defaults: {e}");
            PipelineConfig::default()
        }
    };

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1280.0, 860.0])
            .with_min_inner_size([720.0, 480.0])
            .with_drag_and_drop(true),
        ..Default::default()
    };

    eframe::run_native(
        "Rusty Wrangler – Data Console",
        options,
        Box::new(|_cc| Ok(Box::new(RustyWranglerApp::new(config)))),
    )
}
