/// Data layer: core types and the transform pipeline.
///
/// Architecture:
/// ```text
///  upload (.csv / .xls / .xlsx)
///        │
///        ▼
///   ┌──────────┐
///   │  loader   │  bytes → Table
///   └──────────┘
///        │
///        ▼
///   ┌────────────┐
///   │ preprocess  │  dedupe, dropna, coerce, IQR outliers
///   └────────────┘
///        │
///        ▼
///   ┌──────────┐
///   │ evaluate  │  z-score / percentile / rolling mean, formula fields (expr)
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  filter   │  column projection, row predicates, statistical bands
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  report   │  profit scalar
///   └──────────┘
/// ```
///
/// Every stage takes a `&Table` and returns a new `Table` (or scalar) or a
/// `WrangleError`; none of them mutates its input.

pub mod codec;
pub mod evaluate;
pub mod expr;
pub mod filter;
pub mod loader;
pub mod model;
pub mod preprocess;
pub mod report;
pub mod stats;
