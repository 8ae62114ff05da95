//! Error taxonomy shared by every pipeline stage.

use thiserror::Error;

/// Errors a pipeline stage can report to the user.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum WrangleError {
    /// The upload's extension does not map to a known parser.
    #[error("unsupported file format: {0} (use CSV or Excel)")]
    UnsupportedFormat(String),

    /// Malformed file contents, bad encoding or bad base64.
    #[error("could not parse file: {0}")]
    Parse(String),

    /// A stage was invoked before its upstream data existed.
    #[error("no input data: {0}")]
    EmptyOrMissingInput(String),

    /// Unknown column or invalid syntax in a user expression.
    #[error("formula error: {0}")]
    Formula(String),

    /// The reporter found nothing numeric to aggregate.
    #[error("no numeric data to aggregate")]
    NoNumericData,

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("export failed: {0}")]
    Export(String),
}

impl WrangleError {
    pub(crate) fn formula(msg: impl Into<String>) -> Self {
        WrangleError::Formula(msg.into())
    }

    /// Fold an `anyhow` chain into a parse error, keeping every context line.
    pub(crate) fn parse(err: anyhow::Error) -> Self {
        WrangleError::Parse(format!("{err:#}"))
    }
}

pub type Result<T> = std::result::Result<T, WrangleError>;
