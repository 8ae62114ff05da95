use eframe::egui::{self, Ui};
use egui_plot::{Legend, Line, Plot, PlotPoints};

use rusty_wrangler::AppState;

use crate::color::ColorMap;

// ---------------------------------------------------------------------------
// Column plot (central panel)
// ---------------------------------------------------------------------------

/// Line plot of the numeric columns of the active stage against row position.
pub fn column_plot(ui: &mut Ui, state: &mut AppState) {
    let Some(table) = state.table(state.active_stage) else {
        ui.centered_and_justified(|ui: &mut Ui| {
            ui.heading("Open a file to start  (File → Open…)");
        });
        return;
    };

    let numeric = table.numeric_column_names();
    if numeric.is_empty() {
        ui.label("No numeric columns to plot.");
        return;
    }

    // The chosen column may have been projected away downstream.
    if let Some(col) = &state.plot_column {
        if !numeric.contains(col) {
            state.plot_column = None;
        }
    }

    ui.horizontal(|ui: &mut Ui| {
        ui.label("Plot:");
        egui::ComboBox::from_id_salt("plot_column")
            .selected_text(state.plot_column.as_deref().unwrap_or("All numeric"))
            .show_ui(ui, |ui: &mut Ui| {
                ui.selectable_value(&mut state.plot_column, None, "All numeric");
                for col in &numeric {
                    ui.selectable_value(&mut state.plot_column, Some(col.clone()), col);
                }
            });
    });

    let Some(table) = state.table(state.active_stage) else {
        return;
    };
    let color_map = ColorMap::new(&numeric);
    let plotted: Vec<&String> = match &state.plot_column {
        Some(col) => vec![col],
        None => numeric.iter().collect(),
    };

    Plot::new("column_plot")
        .legend(Legend::default())
        .height(240.0)
        .x_axis_label("Row")
        .allow_boxed_zoom(true)
        .allow_drag(true)
        .allow_scroll(true)
        .allow_zoom(true)
        .show(ui, |plot_ui| {
            for name in plotted {
                let Some(col) = table.column(name) else {
                    continue;
                };
                let points: PlotPoints = col
                    .as_f64()
                    .into_iter()
                    .enumerate()
                    .filter_map(|(i, v)| v.map(|y| [i as f64, y]))
                    .collect();

                let line = Line::new(points)
                    .name(name)
                    .color(color_map.color_for(name))
                    .width(1.5);

                plot_ui.line(line);
            }
        });
}
