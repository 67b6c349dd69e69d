//! Query engine abstraction layer for tabplot
//!
//! The reader module provides a pluggable interface for loading the parsed
//! input table and executing SQL against it, returning Polars DataFrames.
//!
//! # Architecture
//!
//! All readers implement the `Reader` trait, which provides:
//! - Typed table creation from already-parsed CSV rows
//! - SQL query execution → DataFrame conversion
//!
//! Chart and command code only ever talks to `&dyn Reader`, so the engine is
//! swappable. DuckDB is the bundled implementation.
//!
//! # Example
//!
//! ```rust,ignore
//! use tabplot::reader::{Reader, DuckDBReader};
//!
//! let reader = DuckDBReader::in_memory()?;
//! let df = reader.execute("SELECT * FROM data")?;
//! ```

use crate::ingest::Column;
use crate::{DataFrame, Result};

#[cfg(feature = "duckdb")]
pub mod duckdb;

pub mod value;

#[cfg(feature = "duckdb")]
pub use self::duckdb::DuckDBReader;
pub use value::{column_names, dataframe_rows, Value};

/// Trait for query engines
///
/// Readers own exactly one session for the lifetime of a command. The input
/// table is loaded once through `load_table` and then queried any number of
/// times through `execute`.
pub trait Reader {
    /// Execute a SQL query and return the result as a DataFrame
    ///
    /// # Arguments
    ///
    /// * `sql` - The SQL query to execute
    ///
    /// # Returns
    ///
    /// A Polars DataFrame containing the query results. Queries that match no
    /// rows return a DataFrame with the result columns and zero rows.
    ///
    /// # Errors
    ///
    /// Returns `TabplotError::QueryError` carrying the engine's message if:
    /// - The SQL is invalid
    /// - The table or columns don't exist
    fn execute(&self, sql: &str) -> Result<DataFrame>;

    /// Create `name` with the given column definitions and insert `rows`
    ///
    /// Every row has exactly one cell per column. `None` cells and cells that
    /// are empty after trimming are stored as NULL; the remaining cells are
    /// converted according to the column's inferred type.
    fn load_table(
        &self,
        name: &str,
        columns: &[Column],
        rows: &[Vec<Option<String>>],
    ) -> Result<()>;
}

/// Quote an identifier for use in generated SQL
///
/// Embedded double quotes are doubled, so any table or column name survives.
pub fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote_identifier() {
        assert_eq!(quote_identifier("data"), "\"data\"");
        assert_eq!(quote_identifier("my table"), "\"my table\"");
        assert_eq!(quote_identifier("a\"b"), "\"a\"\"b\"");
    }
}
