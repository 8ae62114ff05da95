use std::collections::BTreeSet;
use std::path::Path;

use crate::config::PipelineConfig;
use crate::data::model::Table;
use crate::data::report::ProfitField;
use crate::data::{codec, evaluate, filter, loader, preprocess, report};
use crate::error::{Result, WrangleError};

// ---------------------------------------------------------------------------
// Pipeline stages
// ---------------------------------------------------------------------------

/// The table-producing stages, in pipeline order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Stage {
    Raw,
    Preprocessed,
    Evaluated,
    Filtered,
}

impl Stage {
    pub const ALL: [Stage; 4] = [Stage::Raw, Stage::Preprocessed, Stage::Evaluated, Stage::Filtered];

    pub fn label(self) -> &'static str {
        match self {
            Stage::Raw => "Uploaded",
            Stage::Preprocessed => "Preprocessed",
            Stage::Evaluated => "With results",
            Stage::Filtered => "Filtered",
        }
    }
}

// ---------------------------------------------------------------------------
// Application state
// ---------------------------------------------------------------------------

/// One user session: the output of every stage plus the form inputs,
/// independent of rendering.
///
/// Each stage reads the most recent upstream output and stays idle when
/// there is none. Re-running a stage discards everything downstream of it.
pub struct AppState {
    pub config: PipelineConfig,

    /// File name of the current upload.
    pub source_name: Option<String>,

    pub raw: Option<Table>,
    pub preprocessed: Option<Table>,
    /// Preprocessed table plus statistics / formula fields.
    pub evaluated: Option<Table>,
    pub filtered: Option<Table>,

    /// Last computed profit.
    pub profit: Option<f64>,

    // -- Form inputs --
    pub result_field_name: String,
    pub result_formula: String,
    pub filter_formula: String,
    /// Columns to keep; empty keeps all.
    pub selected_columns: BTreeSet<String>,
    /// Apply the z-score / percentile band filter with the row filter.
    pub drop_statistical_outliers: bool,
    pub profit_field: ProfitField,

    /// Stage shown in the central preview.
    pub active_stage: Stage,
    /// Numeric column plotted under the preview.
    pub plot_column: Option<String>,

    /// Status / error message shown in the UI.
    pub status_message: Option<String>,
}

impl Default for AppState {
    fn default() -> Self {
        Self::with_config(PipelineConfig::default())
    }
}

impl AppState {
    pub fn with_config(config: PipelineConfig) -> Self {
        Self {
            config,
            source_name: None,
            raw: None,
            preprocessed: None,
            evaluated: None,
            filtered: None,
            profit: None,
            result_field_name: "result".to_string(),
            result_formula: String::new(),
            filter_formula: String::new(),
            selected_columns: BTreeSet::new(),
            drop_statistical_outliers: false,
            profit_field: ProfitField::AllNumeric,
            active_stage: Stage::Raw,
            plot_column: None,
            status_message: None,
        }
    }

    pub fn table(&self, stage: Stage) -> Option<&Table> {
        match stage {
            Stage::Raw => self.raw.as_ref(),
            Stage::Preprocessed => self.preprocessed.as_ref(),
            Stage::Evaluated => self.evaluated.as_ref(),
            Stage::Filtered => self.filtered.as_ref(),
        }
    }

    fn slot(&mut self, stage: Stage) -> &mut Option<Table> {
        match stage {
            Stage::Raw => &mut self.raw,
            Stage::Preprocessed => &mut self.preprocessed,
            Stage::Evaluated => &mut self.evaluated,
            Stage::Filtered => &mut self.filtered,
        }
    }

    /// First N rows of a stage's output.
    pub fn preview(&self, stage: Stage) -> Option<Table> {
        self.table(stage).map(|t| t.head(self.config.preview_rows))
    }

    /// Most recent output strictly upstream of `stage`.
    fn input_for(&self, stage: Stage) -> Result<&Table> {
        Stage::ALL
            .iter()
            .rev()
            .filter(|s| **s < stage)
            .find_map(|s| self.table(*s))
            .ok_or_else(|| {
                WrangleError::EmptyOrMissingInput(format!(
                    "{} needs an earlier stage to run first",
                    stage.label()
                ))
            })
    }

    /// Columns offered by the column selector (the filter's input).
    pub fn column_options(&self) -> Vec<String> {
        self.input_for(Stage::Filtered)
            .map(Table::column_names)
            .unwrap_or_default()
    }

    /// Numeric columns offered by the profit selector.
    pub fn profit_options(&self) -> Vec<String> {
        self.report_input()
            .map(Table::numeric_column_names)
            .unwrap_or_default()
    }

    fn report_input(&self) -> Result<&Table> {
        match &self.filtered {
            Some(t) => Ok(t),
            None => self.input_for(Stage::Filtered),
        }
    }

    // -- Stage bookkeeping --

    fn clear_from(&mut self, stage: Stage) {
        for s in Stage::ALL.into_iter().filter(|s| *s >= stage) {
            *self.slot(s) = None;
        }
        self.profit = None;
    }

    /// Store a stage result. A failed run produces nothing and leaves the
    /// previous outputs as they were.
    fn finish(&mut self, stage: Stage, result: Result<Table>) -> Result<()> {
        match result {
            Ok(table) => {
                log::info!(
                    "{} stage: {} rows x {} columns",
                    stage.label(),
                    table.n_rows(),
                    table.n_cols()
                );
                if log::log_enabled!(log::Level::Debug) {
                    if let Ok(text) = codec::render_preview(&table, self.config.preview_rows) {
                        log::debug!("{} preview:\n{text}", stage.label());
                    }
                }
                self.clear_from(stage);
                *self.slot(stage) = Some(table);
                self.active_stage = stage;
                self.status_message = None;
                Ok(())
            }
            Err(e) => {
                self.report_error(stage.label(), &e);
                Err(e)
            }
        }
    }

    fn report_error(&mut self, what: &str, e: &WrangleError) {
        match e {
            WrangleError::EmptyOrMissingInput(msg) => {
                log::debug!("{what} idle: {msg}");
            }
            other => {
                log::error!("{what} failed: {other}");
                self.status_message = Some(format!("{what}: {other}"));
            }
        }
    }

    // -- Loader --

    /// Ingest a new upload, discarding every previous stage.
    pub fn load_bytes(&mut self, bytes: &[u8], filename: &str) -> Result<()> {
        let result = loader::load_bytes(bytes, filename);
        self.ingest(filename, result)
    }

    /// Ingest a base64 upload payload.
    pub fn load_upload(&mut self, contents: &str, filename: &str) -> Result<()> {
        let result = loader::load_upload(contents, filename);
        self.ingest(filename, result)
    }

    pub fn load_file(&mut self, path: &Path) -> Result<()> {
        let result = loader::load_file(path);
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.ingest(&name, result)
    }

    fn ingest(&mut self, filename: &str, result: Result<Table>) -> Result<()> {
        // A failed upload still invalidates the previous session's tables.
        self.clear_from(Stage::Raw);
        self.selected_columns.clear();
        self.plot_column = None;
        self.profit_field = ProfitField::AllNumeric;
        self.source_name = result.is_ok().then(|| filename.to_string());
        self.finish(Stage::Raw, result)
    }

    // -- Preprocessor --

    pub fn preprocess(&mut self) -> Result<()> {
        let result = self
            .input_for(Stage::Preprocessed)
            .and_then(|t| preprocess::preprocess(t, &self.config));
        self.finish(Stage::Preprocessed, result)
    }

    // -- Evaluator --

    /// Append z-score / percentile / rolling-mean columns.
    pub fn augment_statistics(&mut self) -> Result<()> {
        let result = self
            .evaluator_input()
            .and_then(|t| evaluate::augment_statistics(t, &self.config));
        self.finish(Stage::Evaluated, result)
    }

    /// Create `result_field_name` from `result_formula`.
    pub fn create_result_field(&mut self) -> Result<()> {
        let result = self.evaluator_input().and_then(|t| {
            evaluate::create_custom_field(t, &self.result_field_name, &self.result_formula)
        });
        self.finish(Stage::Evaluated, result)
    }

    /// Formula fields accumulate: build on the previous evaluator output.
    fn evaluator_input(&self) -> Result<&Table> {
        match &self.evaluated {
            Some(t) => Ok(t),
            None => self.input_for(Stage::Evaluated),
        }
    }

    /// Drop the evaluator output so the next formula starts from the
    /// preprocessed table again.
    pub fn reset_evaluated(&mut self) {
        self.clear_from(Stage::Evaluated);
        self.active_stage = Stage::Preprocessed;
    }

    // -- Filter --

    /// Row filter, optional statistical filter, then column projection.
    pub fn apply_filters(&mut self) -> Result<()> {
        let result = self.input_for(Stage::Filtered).and_then(|input| {
            let expression = Some(self.filter_formula.as_str());
            let mut out = filter::filter_rows(input, expression)?;
            if self.drop_statistical_outliers {
                out = filter::filter_statistical(&out, &self.config)?;
            }
            // Helper columns removed by the statistical filter are not an
            // error; names unknown to the input still are.
            let selected: Vec<&String> = self
                .selected_columns
                .iter()
                .filter(|c| out.column(c).is_some() || input.column(c).is_none())
                .collect();
            filter::project_columns(&out, &selected)
        });
        self.finish(Stage::Filtered, result)
    }

    // -- Reporter --

    pub fn calculate_profit(&mut self) -> Result<f64> {
        let result = self.report_input().and_then(|t| {
            report::calculate_profit(t, &self.profit_field, self.config.profit_decimals)
        });
        match result {
            Ok(profit) => {
                self.profit = Some(profit);
                self.status_message = None;
                Ok(profit)
            }
            Err(e) => {
                self.profit = None;
                self.report_error("Profit", &e);
                Err(e)
            }
        }
    }

    /// `Profit: 315.00`
    pub fn profit_message(&self) -> Option<String> {
        self.profit
            .map(|p| format!("Profit: {:.*}", self.config.profit_decimals as usize, p))
    }

    // -- Export --

    /// Write a stage's table as CSV or Parquet, chosen by extension.
    pub fn export(&mut self, stage: Stage, path: &Path) -> Result<()> {
        let result = match self.table(stage) {
            None => Err(WrangleError::EmptyOrMissingInput(format!(
                "{} has no table to export",
                stage.label()
            ))),
            Some(table) => match path.extension().and_then(|e| e.to_str()) {
                Some(ext) if ext.eq_ignore_ascii_case("csv") => codec::write_csv(table, path),
                Some(ext) if ext.eq_ignore_ascii_case("parquet") => codec::write_parquet(table, path),
                _ => Err(WrangleError::Export(format!(
                    "choose a .csv or .parquet file name, got {}",
                    path.display()
                ))),
            },
        };
        if let Err(e) = &result {
            self.report_error("Export", e);
        }
        result
    }
}
