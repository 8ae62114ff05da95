//! Data-wrangling pipeline behind the rusty-wrangler console.

pub mod config;
pub mod data;
pub mod error;
pub mod state;

pub use config::PipelineConfig;
pub use data::model::{Column, DType, Table, Value};
pub use data::report::ProfitField;
pub use error::WrangleError;
pub use state::{AppState, Stage};
