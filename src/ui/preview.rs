use eframe::egui::{self, RichText, Ui};
use egui_extras::{Column as TableColumn, TableBuilder};

use rusty_wrangler::{AppState, Stage};

// ---------------------------------------------------------------------------
// Stage tabs
// ---------------------------------------------------------------------------

/// One tab per stage that has produced a table.
pub fn stage_tabs(ui: &mut Ui, state: &mut AppState) {
    ui.horizontal(|ui: &mut Ui| {
        for stage in Stage::ALL {
            let Some(table) = state.table(stage) else {
                continue;
            };
            let text = format!("{} ({} × {})", stage.label(), table.n_rows(), table.n_cols());
            if ui
                .selectable_label(state.active_stage == stage, text)
                .clicked()
            {
                state.active_stage = stage;
            }
        }
    });
}

// ---------------------------------------------------------------------------
// Preview table
// ---------------------------------------------------------------------------

/// First rows of the active stage's table.
pub fn stage_table(ui: &mut Ui, state: &AppState) {
    let Some(preview) = state.preview(state.active_stage) else {
        return;
    };
    if preview.n_cols() == 0 {
        ui.label(RichText::new("No columns selected.").italics());
        return;
    }

    ui.push_id(state.active_stage, |ui: &mut Ui| {
        egui::ScrollArea::horizontal().show(ui, |ui: &mut Ui| {
            TableBuilder::new(ui)
                .striped(true)
                .column(TableColumn::auto().at_least(40.0))
                .columns(
                    TableColumn::auto().at_least(80.0).resizable(true),
                    preview.n_cols(),
                )
                .header(22.0, |mut header| {
                    header.col(|ui: &mut Ui| {
                        ui.strong("#");
                    });
                    for name in preview.column_names() {
                        header.col(|ui: &mut Ui| {
                            ui.strong(name);
                        });
                    }
                })
                .body(|body| {
                    body.rows(20.0, preview.n_rows(), |mut row| {
                        let r = row.index();
                        row.col(|ui: &mut Ui| {
                            ui.label(preview.index()[r].to_string());
                        });
                        for col in preview.columns() {
                            row.col(|ui: &mut Ui| {
                                ui.label(col.values[r].to_string());
                            });
                        }
                    });
                });
        });
    });
}
