//! Record-level commands
//!
//! Each command builds one SQL statement over the loaded table, runs it
//! through a [`Reader`] and returns the result as CSV text.

use crate::format::{dataframe_to_csv, write_csv};
use crate::ingest::LoadedTable;
use crate::parser::{parse_field_with_alias, split_expressions, AggregateFunction};
use crate::reader::{column_names, dataframe_rows, quote_identifier, Reader};
use crate::{Result, TabplotError};
use tracing::debug;

/// Execute arbitrary SQL and return the result as CSV
///
/// A query that returns no rows produces no output at all.
pub fn run_query(reader: &dyn Reader, sql: &str) -> Result<String> {
    debug!(sql, "Running query");
    let df = reader.execute(sql)?;
    if df.height() == 0 {
        debug!("Query returned no rows");
        return Ok(String::new());
    }
    dataframe_to_csv(&df)
}

/// Append computed columns to every row
///
/// Unaliased expressions are named `expr_<n>`, continuing the numbering of
/// the existing columns.
pub fn add_columns(reader: &dyn Reader, table: &LoadedTable, expressions: &str) -> Result<String> {
    let sql = format!(
        "SELECT *, {} FROM {}",
        expressions,
        quote_identifier(&table.name)
    );
    debug!(sql, "Adding columns");
    let df = reader.execute(&sql)?;
    if df.height() == 0 {
        return Ok(String::new());
    }

    let offset = table.columns.len();
    let mut headers = table.column_names();
    headers.extend(
        split_expressions(expressions)
            .iter()
            .enumerate()
            .map(|(i, expr)| match parse_field_with_alias(expr) {
                (_, Some(alias)) => alias,
                (_, None) => format!("expr_{}", offset + i + 1),
            }),
    );

    write_csv(&headers, dataframe_rows(&df)?)
}

/// Keep the rows matching a SQL predicate
///
/// The header is written even when nothing matches.
pub fn filter_rows(reader: &dyn Reader, table: &LoadedTable, predicate: &str) -> Result<String> {
    let sql = format!(
        "SELECT * FROM {} WHERE {}",
        quote_identifier(&table.name),
        predicate
    );
    debug!(sql, "Filtering rows");
    let df = reader.execute(&sql)?;

    let mut headers = column_names(&df);
    if headers.is_empty() {
        headers = table.column_names();
    }
    write_csv(&headers, dataframe_rows(&df)?)
}

/// Group rows and aggregate
///
/// `aggregations` is either a comma list of aggregate expressions or a bare
/// function name applied to every numeric column outside the group list.
/// Without it every such column is averaged.
pub fn group_by(
    reader: &dyn Reader,
    table: &LoadedTable,
    fields: &str,
    aggregations: Option<&str>,
) -> Result<String> {
    let groups: Vec<(String, String)> = split_expressions(fields)
        .iter()
        .map(|field| {
            let (expr, alias) = parse_field_with_alias(field);
            let alias = alias.unwrap_or_else(|| expr.clone());
            (expr, alias)
        })
        .collect();
    if groups.is_empty() {
        return Err(TabplotError::ValidationError(
            "No group by fields given".to_string(),
        ));
    }

    let aggregates = match aggregations.map(str::trim).filter(|a| !a.is_empty()) {
        None => shortcut_aggregates(table, &groups, AggregateFunction::Avg)?,
        Some(text) => match AggregateFunction::from_name(text) {
            Some(func) => shortcut_aggregates(table, &groups, func)?,
            None => split_expressions(text)
                .iter()
                .map(|agg| {
                    let (expr, alias) = parse_field_with_alias(agg);
                    let alias = alias.unwrap_or_else(|| expr.clone());
                    format!("{} AS {}", expr, quote_identifier(&alias))
                })
                .collect(),
        },
    };

    let select: Vec<String> = groups
        .iter()
        .map(|(expr, alias)| format!("{} AS {}", expr, quote_identifier(alias)))
        .chain(aggregates)
        .collect();
    let group_exprs: Vec<&str> = groups.iter().map(|(expr, _)| expr.as_str()).collect();
    let group_list = group_exprs.join(", ");

    let sql = format!(
        "SELECT {} FROM {} GROUP BY {} ORDER BY {}",
        select.join(", "),
        quote_identifier(&table.name),
        group_list,
        group_list
    );
    debug!(sql, "Grouping rows");

    let df = reader.execute(&sql)?;
    if df.height() == 0 {
        return Ok(String::new());
    }
    dataframe_to_csv(&df)
}

/// `func(col) AS "col_func"` for every numeric column not being grouped on
fn shortcut_aggregates(
    table: &LoadedTable,
    groups: &[(String, String)],
    func: AggregateFunction,
) -> Result<Vec<String>> {
    let grouped = |name: &str| {
        groups
            .iter()
            .any(|(expr, alias)| expr == name || alias == name)
    };

    let aggregates: Vec<String> = table
        .numeric_columns()
        .filter(|column| !grouped(&column.name))
        .map(|column| {
            format!(
                "{}({}) AS {}",
                func.sql_name(),
                quote_identifier(&column.name),
                quote_identifier(&format!("{}_{}", column.name, func))
            )
        })
        .collect();

    if aggregates.is_empty() {
        return Err(TabplotError::ValidationError(
            "No numeric columns found to aggregate".to_string(),
        ));
    }
    Ok(aggregates)
}

#[cfg(test)]
#[cfg(feature = "duckdb")]
mod tests {
    use super::*;
    use crate::ingest::{create_table_from_csv, LoadOptions};
    use crate::reader::DuckDBReader;

    const SALES: &str = "category,region,sales,quantity\n\
        Electronics,North,1000,5\n\
        Electronics,South,1500,7\n\
        Clothing,North,800,10\n\
        Clothing,South,1200,15";

    fn load(csv: &str) -> (DuckDBReader, LoadedTable) {
        let reader = DuckDBReader::in_memory().unwrap();
        let table = create_table_from_csv(&reader, csv, &LoadOptions::default()).unwrap();
        (reader, table)
    }

    #[test]
    fn test_run_query() {
        let (reader, _) = load(SALES);
        let output = run_query(
            &reader,
            "SELECT region, SUM(sales) AS total FROM data GROUP BY region ORDER BY region",
        )
        .unwrap();
        assert_eq!(output, "region,total\nNorth,1800\nSouth,2700\n");
    }

    #[test]
    fn test_run_query_without_rows_prints_nothing() {
        let (reader, _) = load(SALES);
        let output = run_query(&reader, "SELECT * FROM data WHERE sales > 1000000").unwrap();
        assert_eq!(output, "");
    }

    #[test]
    fn test_run_query_bad_sql() {
        let (reader, _) = load(SALES);
        let err = run_query(&reader, "SELEC nonsense").unwrap_err();
        assert!(matches!(err, TabplotError::QueryError(_)));
    }

    #[test]
    fn test_add_columns_names_aliases_and_positions() {
        let (reader, table) = load("a,b\n1,2\n3,4");
        let output = add_columns(&reader, &table, "a + b AS total, a * b").unwrap();
        let lines: Vec<&str> = output.lines().collect();

        assert_eq!(lines[0], "a,b,total,expr_4");
        assert_eq!(lines[1], "1,2,3,2");
        assert_eq!(lines[2], "3,4,7,12");
    }

    #[test]
    fn test_filter_keeps_header_without_matches() {
        let (reader, table) = load(SALES);

        let output = filter_rows(&reader, &table, "sales > 1100").unwrap();
        assert_eq!(
            output,
            "category,region,sales,quantity\nElectronics,South,1500,7\nClothing,South,1200,15\n"
        );

        let none = filter_rows(&reader, &table, "sales < 0").unwrap();
        assert_eq!(none, "category,region,sales,quantity\n");
    }

    #[test]
    fn test_group_by_defaults_to_average() {
        let (reader, table) = load(SALES);
        let output = group_by(&reader, &table, "category", None).unwrap();

        assert_eq!(
            output,
            "category,sales_avg,quantity_avg\nClothing,1000.0,12.5\nElectronics,1250.0,6.0\n"
        );
    }

    #[test]
    fn test_group_by_function_shortcut_skips_grouped_columns() {
        let (reader, table) = load("year,month,amount\n2023,1,10\n2023,2,20\n2024,1,5");
        let output = group_by(&reader, &table, "year", Some("sum")).unwrap();

        assert_eq!(
            output,
            "year,month_sum,amount_sum\n2023,3,30\n2024,1,5\n"
        );
    }

    #[test]
    fn test_group_by_aliases() {
        let (reader, table) = load(SALES);
        let output = group_by(
            &reader,
            &table,
            "region AS area",
            Some("count(*) AS n, max(sales) AS best"),
        )
        .unwrap();

        assert_eq!(output, "area,n,best\nNorth,2,1000\nSouth,2,1500\n");
    }

    #[test]
    fn test_group_by_without_numeric_columns() {
        let (reader, table) = load("name,team\nann,red\nbob,blue");
        let err = group_by(&reader, &table, "team", None).unwrap_err();

        assert!(matches!(err, TabplotError::ValidationError(_)));
        assert_eq!(
            err.to_string(),
            "Validation error: No numeric columns found to aggregate"
        );
    }
}
