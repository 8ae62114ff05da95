use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, WrangleError};

/// Environment variable naming an optional JSON config file.
pub const CONFIG_ENV: &str = "RUSTY_WRANGLER_CONFIG";

// ---------------------------------------------------------------------------
// PipelineConfig – tunables for every stage
// ---------------------------------------------------------------------------

/// Thresholds and sizes used by the pipeline stages.
///
/// Every field has a default, so a config file only needs the keys it
/// changes:
///
/// ```json
/// { "iqr_multiplier": 3.0, "preview_rows": 25 }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// `k` in `[Q1 - k·IQR, Q3 + k·IQR]`.
    pub iqr_multiplier: f64,
    /// Repeat the IQR sweep until it removes nothing.
    pub iterate_outlier_removal: bool,
    /// Trailing window for `<col>_rolling_mean`.
    pub rolling_window: usize,
    /// Rows with `|z|` above this are dropped by the statistical filter.
    pub zscore_limit: f64,
    /// Inclusive percentile band kept by the statistical filter.
    pub percentile_band: (f64, f64),
    /// Rows shown in each stage preview.
    pub preview_rows: usize,
    /// Decimal places of the reported profit.
    pub profit_decimals: u32,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            iqr_multiplier: 1.5,
            iterate_outlier_removal: true,
            rolling_window: 3,
            zscore_limit: 3.0,
            percentile_band: (0.10, 0.90),
            preview_rows: 10,
            profit_decimals: 2,
        }
    }
}

impl PipelineConfig {
    /// Load from `$RUSTY_WRANGLER_CONFIG` if set, defaults otherwise.
    pub fn load() -> Result<Self> {
        match std::env::var_os(CONFIG_ENV) {
            Some(path) => Self::from_path(Path::new(&path)),
            None => Ok(Self::default()),
        }
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| WrangleError::Config(format!("reading {}: {e}", path.display())))?;
        Self::from_json(&text)
    }

    pub fn from_json(text: &str) -> Result<Self> {
        let config: PipelineConfig =
            serde_json::from_str(text).map_err(|e| WrangleError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.iqr_multiplier.is_finite() && self.iqr_multiplier >= 0.0) {
            return Err(WrangleError::Config(format!(
                "iqr_multiplier must be a non-negative number, got {}",
                self.iqr_multiplier
            )));
        }
        if self.rolling_window == 0 {
            return Err(WrangleError::Config("rolling_window must be at least 1".into()));
        }
        if !(self.zscore_limit.is_finite() && self.zscore_limit > 0.0) {
            return Err(WrangleError::Config(format!(
                "zscore_limit must be positive, got {}",
                self.zscore_limit
            )));
        }
        let (lo, hi) = self.percentile_band;
        if !(0.0..=1.0).contains(&lo) || !(0.0..=1.0).contains(&hi) || lo > hi {
            return Err(WrangleError::Config(format!(
                "percentile_band must satisfy 0 <= lo <= hi <= 1, got ({lo}, {hi})"
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_defaults() {
        let cfg = PipelineConfig::from_json(r#"{ "preview_rows": 25 }"#).unwrap();
        assert_eq!(cfg.preview_rows, 25);
        assert_eq!(cfg.iqr_multiplier, 1.5);
        assert_eq!(cfg.rolling_window, 3);
    }

    #[test]
    fn rejects_inverted_band() {
        let err = PipelineConfig::from_json(r#"{ "percentile_band": [0.9, 0.1] }"#).unwrap_err();
        assert!(matches!(err, WrangleError::Config(_)));
    }

    #[test]
    fn rejects_zero_window() {
        let err = PipelineConfig::from_json(r#"{ "rolling_window": 0 }"#).unwrap_err();
        assert!(matches!(err, WrangleError::Config(_)));
    }

    #[test]
    fn reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wrangler.json");
        std::fs::write(&path, r#"{ "zscore_limit": 2.5 }"#).unwrap();
        let cfg = PipelineConfig::from_path(&path).unwrap();
        assert_eq!(cfg.zscore_limit, 2.5);
    }
}
