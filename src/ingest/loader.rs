//! Typed table loading from raw CSV text

use super::detect::{detect_delimiter, HeaderMode};
use crate::reader::Reader;
use crate::{Result, TabplotError};
use regex::Regex;
use std::fmt;
use std::sync::OnceLock;
use tracing::debug;

/// Default name of the table the input is loaded into
pub const DEFAULT_TABLE_NAME: &str = "data";

/// Inferred type of an input column
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Integer,
    Real,
    Text,
}

impl ColumnType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ColumnType::Integer => "INTEGER",
            ColumnType::Real => "REAL",
            ColumnType::Text => "TEXT",
        }
    }

    /// Column type used in the engine's CREATE TABLE
    pub fn engine_type(&self) -> &'static str {
        match self {
            ColumnType::Integer => "BIGINT",
            ColumnType::Real => "DOUBLE",
            ColumnType::Text => "VARCHAR",
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, ColumnType::Integer | ColumnType::Real)
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A named, typed column of the input table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    pub name: String,
    pub column_type: ColumnType,
}

/// Options controlling how input text becomes a table
#[derive(Debug, Clone)]
pub struct LoadOptions {
    pub table_name: String,
    pub header_mode: HeaderMode,
    /// Explicit delimiter; sniffed from the input when `None`
    pub delimiter: Option<char>,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            table_name: DEFAULT_TABLE_NAME.to_string(),
            header_mode: HeaderMode::Auto,
            delimiter: None,
        }
    }
}

/// Description of the table created from the input
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedTable {
    pub name: String,
    pub columns: Vec<Column>,
    pub row_count: usize,
}

impl LoadedTable {
    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    pub fn numeric_columns(&self) -> impl Iterator<Item = &Column> {
        self.columns.iter().filter(|c| c.column_type.is_numeric())
    }
}

/// Parsed input split into an optional header and the data rows
#[derive(Debug, Clone, PartialEq)]
pub struct RawTable {
    pub header: Option<Vec<String>>,
    pub rows: Vec<Vec<String>>,
}

impl RawTable {
    pub fn new(mut rows: Vec<Vec<String>>, has_header: bool) -> Self {
        let header = if has_header && !rows.is_empty() {
            Some(rows.remove(0))
        } else {
            None
        };
        Self { header, rows }
    }

    /// Sanitized header names, or `f1..fN` sized by the first data row
    pub fn column_names(&self) -> Vec<String> {
        match &self.header {
            Some(header) => header.iter().map(|h| sanitize_column_name(h)).collect(),
            None => {
                let width = self.rows.first().map(Vec::len).unwrap_or(0);
                (1..=width).map(|i| format!("f{}", i)).collect()
            }
        }
    }

    /// Rows padded with `None` or truncated to exactly `width` cells
    pub fn normalized_rows(&self, width: usize) -> Vec<Vec<Option<String>>> {
        self.rows
            .iter()
            .map(|row| {
                (0..width)
                    .map(|i| row.get(i).cloned())
                    .collect::<Vec<Option<String>>>()
            })
            .collect()
    }
}

fn non_word_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[^\w]").expect("Invalid identifier regex"))
}

/// Turn a header cell into a usable SQL identifier
///
/// Non-word characters become `_`, a leading digit gets a `col_` prefix,
/// and an empty result becomes `unnamed_column`.
pub fn sanitize_column_name(name: &str) -> String {
    let sanitized = non_word_regex().replace_all(name.trim(), "_").into_owned();
    if sanitized.is_empty() {
        return "unnamed_column".to_string();
    }
    if sanitized.starts_with(|c: char| c.is_ascii_digit()) {
        return format!("col_{}", sanitized);
    }
    sanitized
}

/// Infer the narrowest type every non-empty value fits
pub fn infer_column_type<'a, I>(values: I) -> ColumnType
where
    I: IntoIterator<Item = Option<&'a str>>,
{
    let present: Vec<&str> = values
        .into_iter()
        .flatten()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .collect();

    if present.is_empty() {
        return ColumnType::Text;
    }
    if present.iter().all(|v| v.parse::<i64>().is_ok()) {
        return ColumnType::Integer;
    }
    if present.iter().all(|v| v.parse::<f64>().is_ok()) {
        return ColumnType::Real;
    }
    ColumnType::Text
}

/// Parse delimited text into rows of fields
///
/// Double-quote quoting is honored and rows may have differing lengths.
pub fn parse_rows(text: &str, delimiter: char) -> Result<Vec<Vec<String>>> {
    let delimiter = u8::try_from(delimiter).map_err(|_| {
        TabplotError::ParseError(format!("Delimiter '{}' must be a single byte", delimiter))
    })?;

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .from_reader(text.as_bytes());

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| TabplotError::ParseError(e.to_string()))?;
        rows.push(record.iter().map(str::to_string).collect());
    }
    Ok(rows)
}

/// Load CSV text into a new table through the given reader
///
/// # Errors
///
/// Every failure is reported as `TabplotError::ParseError`, including an
/// input without rows, an input that is only a header, and the engine
/// rejecting the table (for example two headers that sanitize to one name).
pub fn create_table_from_csv(
    reader: &dyn Reader,
    csv_text: &str,
    options: &LoadOptions,
) -> Result<LoadedTable> {
    // Surrounding blank lines would otherwise crowd the delimiter sample
    let csv_text = csv_text.trim();
    let delimiter = options
        .delimiter
        .unwrap_or_else(|| detect_delimiter(csv_text));
    let rows = parse_rows(csv_text, delimiter)?;
    if rows.is_empty() {
        return Err(TabplotError::ParseError("No data found in CSV".to_string()));
    }

    let has_header = options.header_mode.resolve(&rows);
    debug!(?delimiter, has_header, "Detected input layout");

    let raw = RawTable::new(rows, has_header);
    if raw.rows.is_empty() {
        return Err(TabplotError::ParseError(
            "No data rows found in CSV".to_string(),
        ));
    }

    let names = raw.column_names();
    let cells = raw.normalized_rows(names.len());
    let columns: Vec<Column> = names
        .into_iter()
        .enumerate()
        .map(|(i, name)| Column {
            column_type: infer_column_type(cells.iter().map(|row| row[i].as_deref())),
            name,
        })
        .collect();

    for column in &columns {
        debug!(column = %column.name, column_type = %column.column_type, "Inferred column");
    }

    reader
        .load_table(&options.table_name, &columns, &cells)
        .map_err(|e| match e {
            TabplotError::ParseError(_) => e,
            other => TabplotError::ParseError(other.to_string()),
        })?;

    Ok(LoadedTable {
        name: options.table_name.clone(),
        columns,
        row_count: cells.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_column_name() {
        assert_eq!(sanitize_column_name("First Name"), "First_Name");
        assert_eq!(sanitize_column_name("Last-Name"), "Last_Name");
        assert_eq!(sanitize_column_name("Age (years)"), "Age__years_");
        assert_eq!(sanitize_column_name("2024"), "col_2024");
        assert_eq!(sanitize_column_name("  padded  "), "padded");
        assert_eq!(sanitize_column_name(""), "unnamed_column");
        assert_eq!(sanitize_column_name("café"), "café");
    }

    #[test]
    fn test_infer_column_type() {
        let infer = |values: &[Option<&str>]| infer_column_type(values.iter().copied());

        assert_eq!(infer(&[Some("1"), Some("2"), Some(" 3 ")]), ColumnType::Integer);
        assert_eq!(infer(&[Some("1"), Some("2.5")]), ColumnType::Real);
        assert_eq!(infer(&[Some("1"), Some("abc")]), ColumnType::Text);
        assert_eq!(infer(&[Some("7"), Some(""), None]), ColumnType::Integer);
        assert_eq!(infer(&[Some(""), None]), ColumnType::Text);
        assert_eq!(infer(&[]), ColumnType::Text);
    }

    #[test]
    fn test_parse_rows_with_quotes() {
        let rows = parse_rows("name,note\n\"Smith, J\",\"said \"\"hi\"\"\"", ',').unwrap();
        assert_eq!(rows[1], vec!["Smith, J", "said \"hi\""]);
    }

    #[test]
    fn test_parse_rows_ragged() {
        let rows = parse_rows("a,b,c\n1,2\n3,4,5,6", ',').unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[1].len(), 2);
        assert_eq!(rows[2].len(), 4);
    }

    #[test]
    fn test_parse_rows_rejects_wide_delimiter() {
        assert!(parse_rows("a", '→').is_err());
    }

    #[test]
    fn test_raw_table_headers() {
        let raw = RawTable::new(
            vec![
                vec!["First Name".to_string(), "2024".to_string()],
                vec!["a".to_string(), "1".to_string()],
            ],
            true,
        );
        assert_eq!(raw.column_names(), vec!["First_Name", "col_2024"]);
        assert_eq!(raw.rows.len(), 1);
    }

    #[test]
    fn test_raw_table_generated_names_and_normalization() {
        let raw = RawTable::new(
            vec![
                vec!["1".to_string(), "2".to_string()],
                vec!["3".to_string()],
                vec!["4".to_string(), "5".to_string(), "6".to_string()],
            ],
            false,
        );
        let names = raw.column_names();
        assert_eq!(names, vec!["f1", "f2"]);

        let cells = raw.normalized_rows(names.len());
        assert_eq!(cells[1], vec![Some("3".to_string()), None]);
        assert_eq!(cells[2], vec![Some("4".to_string()), Some("5".to_string())]);
    }

    #[cfg(feature = "duckdb")]
    mod with_engine {
        use super::super::*;
        use crate::reader::{dataframe_rows, DuckDBReader, Value};

        #[test]
        fn test_semicolon_input_with_explicit_header() {
            let reader = DuckDBReader::in_memory().unwrap();
            let options = LoadOptions {
                table_name: "items".to_string(),
                header_mode: HeaderMode::Yes,
                delimiter: None,
            };
            let table =
                create_table_from_csv(&reader, "id;price\n1;2.50\n2;\n", &options).unwrap();

            assert_eq!(table.name, "items");
            assert_eq!(table.columns[1].column_type, ColumnType::Real);

            let df = reader
                .execute("SELECT price FROM items ORDER BY id")
                .unwrap();
            let rows = dataframe_rows(&df).unwrap();
            assert_eq!(rows[0][0], Value::Real(2.5));
            assert_eq!(rows[1][0], Value::Null);
        }

        #[test]
        fn test_leading_blank_lines_are_ignored() {
            let reader = DuckDBReader::in_memory().unwrap();
            let input = "\n\n\n\n\n\nname;score\nann;3\nbob;5\n\n";
            let table = create_table_from_csv(&reader, input, &LoadOptions::default()).unwrap();

            assert_eq!(table.column_names(), vec!["name", "score"]);
            assert_eq!(table.row_count, 2);
            assert_eq!(table.columns[1].column_type, ColumnType::Integer);
        }

        #[test]
        fn test_forced_no_header() {
            let reader = DuckDBReader::in_memory().unwrap();
            let options = LoadOptions {
                header_mode: HeaderMode::No,
                ..LoadOptions::default()
            };
            let table = create_table_from_csv(&reader, "name,age\nJohn,25", &options).unwrap();

            assert_eq!(table.column_names(), vec!["f1", "f2"]);
            assert_eq!(table.row_count, 2);
            assert_eq!(table.columns[1].column_type, ColumnType::Text);
        }

        #[test]
        fn test_header_only_input_fails() {
            let reader = DuckDBReader::in_memory().unwrap();
            let result = create_table_from_csv(&reader, "a,b,c", &LoadOptions::default());

            let message = result.unwrap_err().to_string();
            assert_eq!(message, "Error parsing CSV: No data rows found in CSV");
        }

        #[test]
        fn test_colliding_names_fail_as_parse_error() {
            let reader = DuckDBReader::in_memory().unwrap();
            let options = LoadOptions {
                header_mode: HeaderMode::Yes,
                ..LoadOptions::default()
            };
            let result = create_table_from_csv(&reader, "a b,a_b\nx,y\n", &options);

            assert!(matches!(result, Err(TabplotError::ParseError(_))));
        }
    }
}
