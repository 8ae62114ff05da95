use eframe::egui::{self, Color32, RichText, ScrollArea, Ui};

use rusty_wrangler::{AppState, ProfitField, Stage};

// ---------------------------------------------------------------------------
// Left side panel – pipeline controls
// ---------------------------------------------------------------------------

/// Render the pipeline controls, one section per stage.
pub fn side_panel(ui: &mut Ui, state: &mut AppState) {
    ui.heading("Pipeline");
    ui.separator();

    ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui: &mut Ui| {
            upload_section(ui, state);
            ui.separator();
            preprocess_section(ui, state);
            ui.separator();
            result_field_section(ui, state);
            ui.separator();
            filter_section(ui, state);
            ui.separator();
            profit_section(ui, state);
        });
}

fn upload_section(ui: &mut Ui, state: &mut AppState) {
    ui.strong("1. File upload");
    ui.label("Drag and drop a file here, or");
    if ui.button("Select file…").clicked() {
        open_file_dialog(state);
    }
    match (&state.source_name, &state.raw) {
        (Some(name), Some(raw)) => {
            ui.label(format!("{name}: {} rows, {} columns", raw.n_rows(), raw.n_cols()));
        }
        _ => {
            ui.label(RichText::new("No file loaded.").italics());
        }
    }
}

fn preprocess_section(ui: &mut Ui, state: &mut AppState) {
    ui.strong("2. Preprocessing");
    ui.label("Drops duplicates and incomplete rows, then IQR outliers.");
    if ui
        .add_enabled(state.raw.is_some(), egui::Button::new("Preprocess data"))
        .clicked()
    {
        let _ = state.preprocess();
    }
}

fn result_field_section(ui: &mut Ui, state: &mut AppState) {
    ui.strong("3. Result field");
    let ready = state.preprocessed.is_some();

    egui::Grid::new("result_field_grid")
        .num_columns(2)
        .show(ui, |ui: &mut Ui| {
            ui.label("Field name:");
            ui.text_edit_singleline(&mut state.result_field_name);
            ui.end_row();

            ui.label("Formula:");
            ui.add(
                egui::TextEdit::singleline(&mut state.result_formula)
                    .hint_text("revenue - cost"),
            );
            ui.end_row();
        });

    ui.horizontal(|ui: &mut Ui| {
        let can_create = ready
            && !state.result_field_name.trim().is_empty()
            && !state.result_formula.trim().is_empty();
        if ui
            .add_enabled(can_create, egui::Button::new("Create result field"))
            .clicked()
        {
            let _ = state.create_result_field();
        }
        if ui
            .add_enabled(ready, egui::Button::new("Add statistics"))
            .on_hover_text("z-score, percentile rank and rolling mean per numeric column")
            .clicked()
        {
            let _ = state.augment_statistics();
        }
        if ui
            .add_enabled(state.evaluated.is_some(), egui::Button::new("Reset"))
            .clicked()
        {
            state.reset_evaluated();
        }
    });
}

fn filter_section(ui: &mut Ui, state: &mut AppState) {
    ui.strong("4. Filters");
    let options = state.column_options();

    ui.label("Filter formula:");
    ui.add(
        egui::TextEdit::singleline(&mut state.filter_formula)
            .hint_text("revenue > 100 and region == 'north'"),
    );
    ui.checkbox(
        &mut state.drop_statistical_outliers,
        "Drop |z| > limit and percentile tails",
    );

    let header = format!(
        "Columns to display  ({}/{})",
        if state.selected_columns.is_empty() {
            options.len()
        } else {
            state.selected_columns.len()
        },
        options.len()
    );
    egui::CollapsingHeader::new(header)
        .id_salt("columns_to_display")
        .default_open(false)
        .show(ui, |ui: &mut Ui| {
            ui.horizontal(|ui: &mut Ui| {
                if ui.small_button("All").clicked() {
                    state.selected_columns.clear();
                }
            });
            for col in &options {
                let mut checked =
                    state.selected_columns.is_empty() || state.selected_columns.contains(col);
                if ui.checkbox(&mut checked, col).changed() {
                    toggle_column(state, &options, col, checked);
                }
            }
        });

    if ui
        .add_enabled(!options.is_empty(), egui::Button::new("Apply filters"))
        .clicked()
    {
        let _ = state.apply_filters();
    }
}

/// An empty selection means "all columns", so unticking from it starts from
/// the full list.
fn toggle_column(state: &mut AppState, options: &[String], col: &str, checked: bool) {
    if state.selected_columns.is_empty() {
        state.selected_columns = options.iter().cloned().collect();
    }
    if checked {
        state.selected_columns.insert(col.to_string());
    } else {
        state.selected_columns.remove(col);
    }
    if state.selected_columns.len() == options.len() {
        state.selected_columns.clear();
    }
}

fn profit_section(ui: &mut Ui, state: &mut AppState) {
    ui.strong("5. Profit");
    let options = state.profit_options();

    ui.label("Profit field:");
    egui::ComboBox::from_id_salt("profit_field")
        .selected_text(state.profit_field.to_string())
        .show_ui(ui, |ui: &mut Ui| {
            ui.selectable_value(
                &mut state.profit_field,
                ProfitField::AllNumeric,
                ProfitField::AllNumeric.to_string(),
            );
            for col in &options {
                ui.selectable_value(
                    &mut state.profit_field,
                    ProfitField::Column(col.clone()),
                    col,
                );
            }
        });

    if ui
        .add_enabled(!options.is_empty(), egui::Button::new("Calculate profit"))
        .clicked()
    {
        let _ = state.calculate_profit();
    }
    if let Some(msg) = state.profit_message() {
        ui.label(RichText::new(msg).strong().size(18.0));
    }
}

// ---------------------------------------------------------------------------
// Top bar
// ---------------------------------------------------------------------------

/// Render the top menu / toolbar.
pub fn top_bar(ui: &mut Ui, state: &mut AppState) {
    egui::menu::bar(ui, |ui: &mut Ui| {
        ui.menu_button("File", |ui: &mut Ui| {
            if ui.button("Open…").clicked() {
                open_file_dialog(state);
                ui.close_menu();
            }
            let stage = state.active_stage;
            if ui
                .add_enabled(
                    state.table(stage).is_some(),
                    egui::Button::new(format!("Export {}…", stage.label())),
                )
                .clicked()
            {
                export_file_dialog(state, stage);
                ui.close_menu();
            }
        });

        ui.separator();

        if let Some(name) = &state.source_name {
            ui.label(name);
        }
        for stage in Stage::ALL {
            if let Some(t) = state.table(stage) {
                ui.label(format!("{}: {}", stage.label(), t.n_rows()));
            }
        }

        if let Some(msg) = &state.status_message {
            ui.separator();
            ui.label(RichText::new(msg).color(Color32::RED));
        }
    });
}

// ---------------------------------------------------------------------------
// File dialogs / drag and drop
// ---------------------------------------------------------------------------

pub fn open_file_dialog(state: &mut AppState) {
    let file = rfd::FileDialog::new()
        .set_title("Open tabular data")
        .add_filter("Supported files", &["csv", "xls", "xlsx", "xlsm", "ods"])
        .add_filter("CSV", &["csv"])
        .add_filter("Excel", &["xls", "xlsx", "xlsm"])
        .pick_file();

    if let Some(path) = file {
        let _ = state.load_file(&path);
    }
}

pub fn load_dropped_file(state: &mut AppState, file: egui::DroppedFile) {
    if let Some(bytes) = &file.bytes {
        let _ = state.load_bytes(bytes, &file.name);
    } else if let Some(path) = &file.path {
        let _ = state.load_file(path);
    }
}

fn export_file_dialog(state: &mut AppState, stage: Stage) {
    let file = rfd::FileDialog::new()
        .set_title("Export table")
        .set_file_name(format!("{}.csv", stage.label().to_lowercase().replace(' ', "_")))
        .add_filter("CSV", &["csv"])
        .add_filter("Parquet", &["parquet"])
        .save_file();

    if let Some(path) = file {
        let _ = state.export(stage, &path);
    }
}
