/*!
# tabplot - SQL and terminal charts over piped CSV

tabplot loads whatever CSV arrives on stdin into a single in-memory table and
then either runs SQL against it or renders a text chart.

## Example

```text
cat bench.csv | tabplot query "SELECT model, AVG(tps) FROM data GROUP BY model"
cat bench.csv | tabplot heatmap threads batch "avg(tps)"
cat bench.csv | tabplot mcmp build metric "avg(value)"
```

## Architecture

- **Ingest**: the raw text is sniffed for a delimiter and a header row, every
  column gets an inferred type, and the rows are loaded through a [`reader::Reader`].
- **Reader**: executes arbitrary SQL and hands back Polars DataFrames. DuckDB is
  the bundled engine; anything implementing the trait can stand in for it.
- **Parser**: small text utilities for the SQL fragments users type on the
  command line (expression lists, `AS` aliases, `avg(field)` aggregations).
- **Chart**: heatmap and version-comparison renderers that push the
  aggregation into one SQL query and turn the result into fixed-width text.

## Core Components

- [`ingest`] - Delimiter/header detection and typed table loading
- [`parser`] - Expression splitting and aggregation parsing
- [`reader`] - Query engine abstraction layer
- [`chart`] - Heatmap and comparison renderers
- [`command`] - Record-level commands (query, add, filter, groupby)
*/

pub mod chart;
pub mod command;
pub mod format;
pub mod ingest;
pub mod parser;
pub mod reader;

// Re-export key types for convenience
pub use chart::{
    create_heatmap, create_multi_comparison, ChartOutcome, ComparisonOptions, DisplayMode,
    HeatmapOptions,
};
pub use ingest::{create_table_from_csv, Column, ColumnType, HeaderMode, LoadOptions, LoadedTable};
pub use parser::{parse_aggregation, parse_field_with_alias, split_expressions};

// DataFrame abstraction (wraps Polars)
pub use polars::prelude::DataFrame;

/// Main library error type
#[derive(thiserror::Error, Debug)]
pub enum TabplotError {
    #[error("{0}")]
    InputError(String),

    #[error("Error parsing CSV: {0}")]
    ParseError(String),

    #[error("SQL error: {0}")]
    QueryError(String),

    #[error("{0}")]
    ChartArgumentError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

pub type Result<T> = std::result::Result<T, TabplotError>;

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
