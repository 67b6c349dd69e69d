//! Input ingestion
//!
//! Turns the text piped on stdin into a typed table:
//!
//! 1. Sniff the delimiter (unless one was given)
//! 2. Parse rows with the `csv` crate
//! 3. Decide whether the first row is a header
//! 4. Sanitize or generate column names and infer a type per column
//! 5. Hand columns and rows to the [`Reader`](crate::reader::Reader)

pub mod detect;
pub mod loader;

pub use detect::{auto_detect_headers, detect_delimiter, HeaderMode, DELIMITER_CANDIDATES};
pub use loader::{
    create_table_from_csv, infer_column_type, parse_rows, sanitize_column_name, Column,
    ColumnType, LoadOptions, LoadedTable, RawTable, DEFAULT_TABLE_NAME,
};
