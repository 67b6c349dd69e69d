//! DuckDB query engine implementation
//!
//! Provides an in-memory DuckDB session with direct Polars DataFrame integration.

use crate::ingest::{Column, ColumnType};
use crate::reader::{quote_identifier, Reader};
use crate::{DataFrame, Result, TabplotError};
use ::duckdb::types::Value as SqlValue;
use ::duckdb::{params, params_from_iter, Connection};
use tracing::{debug, warn};

/// DuckDB query engine
///
/// Holds a private in-memory database. The input table is loaded into it
/// once and every later query runs against that same connection.
///
/// # Examples
///
/// ```rust,ignore
/// use tabplot::reader::{Reader, DuckDBReader};
///
/// let reader = DuckDBReader::in_memory()?;
/// let df = reader.execute("SELECT 1 as x, 2 as y")?;
/// ```
pub struct DuckDBReader {
    conn: Connection,
}

impl DuckDBReader {
    /// Open a fresh in-memory database
    ///
    /// # Errors
    ///
    /// Returns an error if DuckDB initialization fails
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|e| {
            TabplotError::InternalError(format!("Failed to open in-memory DuckDB: {}", e))
        })?;
        Ok(Self { conn })
    }

    /// Get a reference to the underlying DuckDB connection
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    fn insert_rows(
        &self,
        name: &str,
        columns: &[Column],
        rows: &[Vec<Option<String>>],
    ) -> Result<()> {
        let placeholders = vec!["?"; columns.len()].join(", ");
        let insert_sql = format!(
            "INSERT INTO {} VALUES ({})",
            quote_identifier(name),
            placeholders
        );
        let mut stmt = self
            .conn
            .prepare(&insert_sql)
            .map_err(|e| TabplotError::QueryError(e.to_string()))?;

        for (row_idx, row) in rows.iter().enumerate() {
            let values = columns
                .iter()
                .zip(row)
                .map(|(column, cell)| to_sql_value(column, cell.as_deref(), row_idx))
                .collect::<Result<Vec<_>>>()?;
            stmt.execute(params_from_iter(values))
                .map_err(|e| TabplotError::QueryError(e.to_string()))?;
        }
        Ok(())
    }
}

/// Convert one input cell into a value of the column's engine type
fn to_sql_value(column: &Column, cell: Option<&str>, row_idx: usize) -> Result<SqlValue> {
    let Some(raw) = cell else {
        return Ok(SqlValue::Null);
    };
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(SqlValue::Null);
    }

    let invalid = || {
        TabplotError::ParseError(format!(
            "Value '{}' in row {} is not a valid {} for column '{}'",
            raw,
            row_idx + 1,
            column.column_type,
            column.name
        ))
    };

    Ok(match column.column_type {
        ColumnType::Integer => SqlValue::BigInt(trimmed.parse().map_err(|_| invalid())?),
        ColumnType::Real => SqlValue::Double(trimmed.parse().map_err(|_| invalid())?),
        ColumnType::Text => SqlValue::Text(raw.to_string()),
    })
}

/// Helper struct for building typed columns from rows
///
/// Narrow integer types are widened so the resulting frame only ever holds
/// the Int32/Int64/Float64 dtypes Polars supports without extra features.
enum ColumnBuilder {
    Int(Vec<Option<i32>>),
    BigInt(Vec<Option<i64>>),
    UBigInt(Vec<Option<u64>>), // Keep as u64, check overflow
    Double(Vec<Option<f64>>),
    Boolean(Vec<Option<bool>>),
    Text(Vec<Option<String>>),
    Date32(Vec<Option<i32>>),
    Timestamp(Vec<Option<i64>>),
    Time64(Vec<Option<i64>>),
    Decimal(Vec<Option<f64>>),     // Convert to Float64
    HugeInt(Vec<Option<i128>>),    // Will check overflow
    Fallback(Vec<Option<String>>), // Fallback for unsupported types
}

impl ColumnBuilder {
    fn new(duckdb_type: &::duckdb::types::Type) -> Self {
        use ::duckdb::types::Type;
        match duckdb_type {
            Type::TinyInt | Type::SmallInt | Type::Int | Type::UTinyInt | Type::USmallInt => {
                ColumnBuilder::Int(Vec::new())
            }
            Type::BigInt | Type::UInt => ColumnBuilder::BigInt(Vec::new()),
            Type::UBigInt => ColumnBuilder::UBigInt(Vec::new()),
            Type::Float | Type::Double => ColumnBuilder::Double(Vec::new()),
            Type::Boolean => ColumnBuilder::Boolean(Vec::new()),
            Type::Text => ColumnBuilder::Text(Vec::new()),
            Type::Date32 => ColumnBuilder::Date32(Vec::new()),
            Type::Timestamp => ColumnBuilder::Timestamp(Vec::new()),
            Type::Time64 => ColumnBuilder::Time64(Vec::new()),
            Type::Decimal => ColumnBuilder::Decimal(Vec::new()),
            Type::HugeInt => ColumnBuilder::HugeInt(Vec::new()),
            _ => ColumnBuilder::Fallback(Vec::new()),
        }
    }

    fn add_value(&mut self, row: &::duckdb::Row, col_idx: usize) {
        use ::duckdb::types::ValueRef;
        use ColumnBuilder::*;
        match self {
            Int(ref mut values) => {
                let val = match row.get_ref(col_idx) {
                    Ok(ValueRef::TinyInt(i)) => Some(i32::from(i)),
                    Ok(ValueRef::SmallInt(i)) => Some(i32::from(i)),
                    Ok(ValueRef::Int(i)) => Some(i),
                    Ok(ValueRef::UTinyInt(i)) => Some(i32::from(i)),
                    Ok(ValueRef::USmallInt(i)) => Some(i32::from(i)),
                    _ => None,
                };
                values.push(val);
            }
            BigInt(ref mut values) => {
                let val = match row.get_ref(col_idx) {
                    Ok(ValueRef::BigInt(i)) => Some(i),
                    Ok(ValueRef::UInt(i)) => Some(i64::from(i)),
                    _ => None,
                };
                values.push(val);
            }
            UBigInt(ref mut values) => values.push(row.get(col_idx).ok()),
            Double(ref mut values) => {
                let val = match row.get_ref(col_idx) {
                    Ok(ValueRef::Float(f)) => Some(f64::from(f)),
                    Ok(ValueRef::Double(f)) => Some(f),
                    _ => None,
                };
                values.push(val);
            }
            Boolean(ref mut values) => values.push(row.get(col_idx).ok()),
            Text(ref mut values) => values.push(row.get(col_idx).ok()),
            Date32(ref mut values) => values.push(row.get(col_idx).ok()),
            Timestamp(ref mut values) => values.push(row.get(col_idx).ok()),
            Time64(ref mut values) => values.push(row.get(col_idx).ok()),
            Decimal(ref mut values) => {
                let val = match row.get_ref(col_idx) {
                    Ok(ValueRef::Decimal(d)) => {
                        // Convert Decimal to string, then parse as f64
                        d.to_string().parse::<f64>().ok()
                    }
                    Ok(ValueRef::Null) => None,
                    Ok(ValueRef::BigInt(i)) => Some(i as f64),
                    Ok(ValueRef::HugeInt(i)) => Some(i as f64),
                    Ok(ValueRef::Double(f)) => Some(f),
                    _ => None,
                };
                values.push(val);
            }
            HugeInt(ref mut values) => values.push(row.get(col_idx).ok()),
            Fallback(ref mut values) => values.push(row.get(col_idx).ok()),
        }
    }

    fn build(self, column_name: &str) -> Result<polars::prelude::Series> {
        use polars::prelude::*;
        use ColumnBuilder::*;

        Ok(match self {
            Int(values) => Series::new(column_name.into(), values),
            BigInt(values) => Series::new(column_name.into(), values),
            UBigInt(values) => {
                let all_fit = values
                    .iter()
                    .all(|opt_val| opt_val.map(|val| val <= i64::MAX as u64).unwrap_or(true));

                if all_fit {
                    let i64_values: Vec<Option<i64>> = values
                        .into_iter()
                        .map(|opt_val| opt_val.map(|val| val as i64))
                        .collect();
                    Series::new(column_name.into(), i64_values)
                } else {
                    warn!(column = column_name, "UBigInt overflow, converting to string");
                    let string_values: Vec<Option<String>> = values
                        .into_iter()
                        .map(|opt_val| opt_val.map(|val| val.to_string()))
                        .collect();
                    Series::new(column_name.into(), string_values)
                }
            }
            Double(values) => Series::new(column_name.into(), values),
            Boolean(values) => Series::new(column_name.into(), values),
            Text(values) => Series::new(column_name.into(), values),
            Date32(values) => Series::new(column_name.into(), values)
                .cast(&DataType::Date)
                .map_err(|e| TabplotError::InternalError(format!("Date cast failed: {}", e)))?,
            Timestamp(values) => Series::new(column_name.into(), values)
                .cast(&DataType::Datetime(TimeUnit::Microseconds, None))
                .map_err(|e| {
                    TabplotError::InternalError(format!("Timestamp cast failed: {}", e))
                })?,
            Time64(values) => Series::new(column_name.into(), values)
                .cast(&DataType::Time)
                .map_err(|e| TabplotError::InternalError(format!("Time cast failed: {}", e)))?,
            Decimal(values) => Series::new(column_name.into(), values),
            HugeInt(values) => {
                // SUM over BIGINT yields HUGEINT; narrow it back whenever it fits
                let all_fit = values.iter().all(|opt_val| {
                    opt_val
                        .map(|val| val >= i64::MIN as i128 && val <= i64::MAX as i128)
                        .unwrap_or(true)
                });

                if all_fit {
                    let i64_values: Vec<Option<i64>> = values
                        .into_iter()
                        .map(|opt_val| opt_val.map(|val| val as i64))
                        .collect();
                    Series::new(column_name.into(), i64_values)
                } else {
                    warn!(column = column_name, "HugeInt overflow, converting to string");
                    let string_values: Vec<Option<String>> = values
                        .into_iter()
                        .map(|opt_val| opt_val.map(|val| val.to_string()))
                        .collect();
                    Series::new(column_name.into(), string_values)
                }
            }
            Fallback(values) => {
                debug!(column = column_name, "Using fallback string conversion");
                Series::new(column_name.into(), values)
            }
        })
    }
}

impl Reader for DuckDBReader {
    fn execute(&self, sql: &str) -> Result<DataFrame> {
        debug!(sql, "Executing query");

        // Statements that produce no result set are executed directly
        let trimmed = sql.trim().to_uppercase();
        let is_ddl = trimmed.starts_with("CREATE ")
            || trimmed.starts_with("DROP ")
            || trimmed.starts_with("INSERT ")
            || trimmed.starts_with("UPDATE ")
            || trimmed.starts_with("DELETE ")
            || trimmed.starts_with("ALTER ");

        if is_ddl {
            self.conn
                .execute(sql, params![])
                .map_err(|e| TabplotError::QueryError(e.to_string()))?;

            return DataFrame::new(Vec::<polars::prelude::Series>::new()).map_err(|e| {
                TabplotError::InternalError(format!("Failed to create empty DataFrame: {}", e))
            });
        }

        let mut stmt = self
            .conn
            .prepare(sql)
            .map_err(|e| TabplotError::QueryError(e.to_string()))?;

        // Execute to populate schema info
        stmt.execute(params![])
            .map_err(|e| TabplotError::QueryError(e.to_string()))?;

        // Get column metadata BEFORE creating iterator
        let column_count = stmt.column_count();
        let mut column_names = Vec::with_capacity(column_count);
        let mut column_builders = Vec::with_capacity(column_count);
        for i in 0..column_count {
            column_names.push(
                stmt.column_name(i)
                    .map_err(|e| {
                        TabplotError::InternalError(format!("Failed to get column name: {}", e))
                    })?
                    .to_string(),
            );
            let duckdb_type = ::duckdb::types::Type::from(&stmt.column_type(i));
            column_builders.push(ColumnBuilder::new(&duckdb_type));
        }

        // query_map borrows stmt mutably during iteration
        let builders_cell = std::cell::RefCell::new(column_builders);
        let row_count_cell = std::cell::RefCell::new(0usize);

        stmt.query_map(params![], |row| {
            let mut builders = builders_cell.borrow_mut();
            for (col_idx, builder) in builders.iter_mut().enumerate() {
                builder.add_value(row, col_idx);
            }
            *row_count_cell.borrow_mut() += 1;
            Ok(())
        })
        .map_err(|e| TabplotError::QueryError(e.to_string()))?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| TabplotError::QueryError(e.to_string()))?;

        debug!(rows = *row_count_cell.borrow(), "Query finished");

        let mut columns = Vec::with_capacity(column_count);
        for (builder, name) in builders_cell.into_inner().into_iter().zip(&column_names) {
            columns.push(builder.build(name)?);
        }

        DataFrame::new(columns)
            .map_err(|e| TabplotError::QueryError(format!("Failed to create DataFrame: {}", e)))
    }

    fn load_table(
        &self,
        name: &str,
        columns: &[Column],
        rows: &[Vec<Option<String>>],
    ) -> Result<()> {
        let definitions = columns
            .iter()
            .map(|column| {
                format!(
                    "{} {}",
                    quote_identifier(&column.name),
                    column.column_type.engine_type()
                )
            })
            .collect::<Vec<_>>()
            .join(", ");
        let create_sql = format!("CREATE TABLE {} ({})", quote_identifier(name), definitions);
        debug!(sql = %create_sql, rows = rows.len(), "Creating input table");

        self.conn
            .execute(&create_sql, params![])
            .map_err(|e| TabplotError::QueryError(e.to_string()))?;

        // One transaction for the whole load
        self.conn
            .execute_batch("BEGIN TRANSACTION")
            .map_err(|e| TabplotError::QueryError(e.to_string()))?;
        match self.insert_rows(name, columns, rows) {
            Ok(()) => self
                .conn
                .execute_batch("COMMIT")
                .map_err(|e| TabplotError::QueryError(e.to_string())),
            Err(e) => {
                if let Err(rollback) = self.conn.execute_batch("ROLLBACK") {
                    warn!(error = %rollback, "Rollback after failed load did not succeed");
                }
                Err(e)
            }
        }
    }
}
