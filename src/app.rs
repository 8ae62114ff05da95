use eframe::egui;

use rusty_wrangler::AppState;
use rusty_wrangler::PipelineConfig;

use crate::ui::{panels, plot, preview};

// ---------------------------------------------------------------------------
// eframe App implementation
// ---------------------------------------------------------------------------

pub struct RustyWranglerApp {
    pub state: AppState,
}

impl RustyWranglerApp {
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            state: AppState::with_config(config),
        }
    }
}

impl eframe::App for RustyWranglerApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // ---- Drag & drop upload ----
        let dropped = ctx.input(|i| i.raw.dropped_files.clone());
        if let Some(file) = dropped.into_iter().next() {
            panels::load_dropped_file(&mut self.state, file);
        }

        // ---- Top panel: menu bar ----
        egui::TopBottomPanel::top("top_bar").show(ctx, |ui| {
            panels::top_bar(ui, &mut self.state);
        });

        // ---- Left side panel: pipeline controls ----
        egui::SidePanel::left("pipeline_panel")
            .default_width(300.0)
            .resizable(true)
            .show(ctx, |ui| {
                panels::side_panel(ui, &mut self.state);
            });

        // ---- Central panel: stage preview + plot ----
        egui::CentralPanel::default().show(ctx, |ui| {
            preview::stage_tabs(ui, &mut self.state);
            ui.separator();
            plot::column_plot(ui, &mut self.state);
            ui.separator();
            preview::stage_table(ui, &self.state);
        });
    }
}
