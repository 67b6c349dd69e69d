//! Multi-version comparison tables
//!
//! One row per metric, one column per version. The baseline column shows
//! raw values and every other column shows its value relative to the
//! baseline, formatted according to a [`DisplayMode`].

use super::display_mode::{DisplayMode, PercentChange};
use super::{query_rows, ChartOutcome};
use crate::parser::value_expression;
use crate::reader::{quote_identifier, Reader, Value};
use crate::Result;
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

/// Version names up to this many characters are used directly as headers
pub const SHORT_NAME_LIMIT: usize = 8;

const METRIC_HEADER: &str = "Metric";
const MIN_METRIC_WIDTH: usize = 7;

/// Options for comparison tables
#[derive(Debug, Clone, Default)]
pub struct ComparisonOptions {
    pub display_mode: DisplayMode,
    /// Version to compare against; the first version in sort order when `None`
    pub baseline: Option<String>,
}

/// metric -> version -> aggregated value, metrics in sorted order
type MetricTable = BTreeMap<String, HashMap<String, Value>>;

/// Render a comparison of every version against a baseline
///
/// Never fails: missing or single versions and an unknown baseline come back
/// as [`ChartOutcome::Notice`], engine errors as [`ChartOutcome::Failed`].
pub fn create_multi_comparison(
    reader: &dyn Reader,
    table: &str,
    versions_field: &str,
    metrics_field: &str,
    value_field: Option<&str>,
    options: &ComparisonOptions,
) -> ChartOutcome {
    let result = build_comparison(
        reader,
        table,
        versions_field,
        metrics_field,
        value_field,
        options,
        None,
    );
    ChartOutcome::from_result(result, "multi-comparison")
}

/// Two-version comparison of the first two versions in sort order
#[deprecated(note = "use create_multi_comparison, which handles any number of versions")]
pub fn create_comparison(
    reader: &dyn Reader,
    table: &str,
    versions_field: &str,
    metrics_field: &str,
    value_field: Option<&str>,
    display_mode: DisplayMode,
) -> ChartOutcome {
    let options = ComparisonOptions {
        display_mode,
        baseline: None,
    };
    let result = build_comparison(
        reader,
        table,
        versions_field,
        metrics_field,
        value_field,
        &options,
        Some(2),
    );
    ChartOutcome::from_result(result, "comparison")
}

fn build_comparison(
    reader: &dyn Reader,
    table: &str,
    versions_field: &str,
    metrics_field: &str,
    value_field: Option<&str>,
    options: &ComparisonOptions,
    version_limit: Option<usize>,
) -> Result<ChartOutcome> {
    let table_ref = quote_identifier(table);

    let version_sql = format!(
        "SELECT DISTINCT {v} FROM {t} WHERE {v} IS NOT NULL ORDER BY {v}",
        v = versions_field,
        t = table_ref
    );
    let mut versions: Vec<String> = query_rows(reader, &version_sql)?
        .into_iter()
        .filter_map(|row| row.into_iter().next())
        .map(|version| version.to_key())
        .collect();
    if let Some(limit) = version_limit {
        versions.truncate(limit);
    }

    match versions.len() {
        0 => return Ok(ChartOutcome::Notice("No versions found".to_string())),
        1 => {
            return Ok(ChartOutcome::Notice(
                "Need at least 2 versions to compare".to_string(),
            ))
        }
        _ => {}
    }

    let baseline = match &options.baseline {
        Some(wanted) if versions.contains(wanted) => wanted.clone(),
        Some(wanted) => {
            return Ok(ChartOutcome::Notice(format!(
                "Baseline version '{}' not found. Available versions: {}",
                wanted,
                versions.join(", ")
            )))
        }
        None => versions[0].clone(),
    };
    let comparisons: Vec<String> = versions
        .iter()
        .filter(|version| **version != baseline)
        .cloned()
        .collect();
    debug!(%baseline, ?comparisons, "Selected baseline");

    let data_sql = format!(
        "SELECT {m} AS metric, {v} AS version, {value} AS value FROM {t} \
         WHERE {m} IS NOT NULL AND {v} IS NOT NULL \
         GROUP BY {m}, {v} ORDER BY {m}, {v}",
        m = metrics_field,
        v = versions_field,
        value = value_expression(value_field),
        t = table_ref
    );
    debug!(
        mode = options.display_mode.name(),
        description = options.display_mode.describe(),
        "Display mode"
    );

    let mut metrics = MetricTable::new();
    for row in query_rows(reader, &data_sql)? {
        let mut cells = row.into_iter();
        let (Some(metric), Some(version), Some(value)) = (cells.next(), cells.next(), cells.next())
        else {
            continue;
        };
        metrics
            .entry(metric.to_key())
            .or_default()
            .insert(version.to_key(), value);
    }
    if metrics.is_empty() {
        return Ok(ChartOutcome::Empty);
    }

    for (metric, values) in &metrics {
        for version in &versions {
            if let Some(value) = values.get(version) {
                debug!(%metric, %version, value = %value, "Data point");
            }
        }
    }

    let labels = VersionLabels::assign(&baseline, &comparisons);
    let grid = ComparisonTable::build(
        &metrics,
        &baseline,
        &comparisons,
        &labels,
        options.display_mode,
    );

    let mut lines = labels.legend(&baseline, &comparisons);
    lines.extend(grid.render());
    Ok(ChartOutcome::Rendered(lines.join("\n")))
}

/// Column headers for the participating versions
struct VersionLabels {
    by_version: HashMap<String, String>,
    lettered: bool,
}

impl VersionLabels {
    fn assign(baseline: &str, comparisons: &[String]) -> Self {
        let ordered: Vec<&str> = std::iter::once(baseline)
            .chain(comparisons.iter().map(String::as_str))
            .collect();
        let lettered = ordered
            .iter()
            .any(|name| name.chars().count() > SHORT_NAME_LIMIT);

        let by_version = ordered
            .iter()
            .enumerate()
            .map(|(idx, name)| {
                let label = if lettered {
                    letter_label(idx)
                } else {
                    name.to_string()
                };
                (name.to_string(), label)
            })
            .collect();

        Self {
            by_version,
            lettered,
        }
    }

    fn get<'a>(&'a self, version: &'a str) -> &'a str {
        self.by_version
            .get(version)
            .map(String::as_str)
            .unwrap_or(version)
    }

    /// Letter-to-name lines followed by a blank line; nothing for short names
    fn legend(&self, baseline: &str, comparisons: &[String]) -> Vec<String> {
        if !self.lettered {
            return Vec::new();
        }
        let mut lines = vec![format!("{}: {} (baseline)", self.get(baseline), baseline)];
        lines.extend(
            comparisons
                .iter()
                .map(|version| format!("{}: {}", self.get(version), version)),
        );
        lines.push(String::new());
        lines
    }
}

/// Spreadsheet-style letters: A..Z, then AA, AB, ...
fn letter_label(mut idx: usize) -> String {
    let mut letters = Vec::new();
    loop {
        letters.push(char::from(b'A' + (idx % 26) as u8));
        if idx < 26 {
            break;
        }
        idx = idx / 26 - 1;
    }
    letters.iter().rev().collect()
}

/// Raw-value text for a cell; absent values read as zero
fn format_value(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => "0".to_string(),
        Some(value) => value.to_string(),
    }
}

fn numeric_or_zero(value: Option<&Value>) -> Option<f64> {
    match value {
        None | Some(Value::Null) => Some(0.0),
        Some(value) => value.as_f64(),
    }
}

fn comparison_cell(mode: DisplayMode, baseline: Option<&Value>, value: Option<&Value>) -> String {
    let (Some(base), Some(current)) = (numeric_or_zero(baseline), numeric_or_zero(value)) else {
        return "N/A".to_string();
    };
    let diff = current - base;
    mode.format_cell(&format_value(value), diff, PercentChange::between(base, diff))
}

struct TableColumn {
    header: String,
    cells: Vec<String>,
    width: usize,
}

impl TableColumn {
    fn new(header: String, cells: Vec<String>, min_width: usize) -> Self {
        let width = cells
            .iter()
            .map(|cell| cell.chars().count())
            .chain([header.chars().count(), min_width])
            .max()
            .unwrap_or(0);
        Self {
            header,
            cells,
            width,
        }
    }
}

struct ComparisonTable {
    columns: Vec<TableColumn>,
    rows: usize,
}

impl ComparisonTable {
    fn build(
        metrics: &MetricTable,
        baseline: &str,
        comparisons: &[String],
        labels: &VersionLabels,
        mode: DisplayMode,
    ) -> Self {
        let mut columns = vec![
            TableColumn::new(
                METRIC_HEADER.to_string(),
                metrics.keys().cloned().collect(),
                MIN_METRIC_WIDTH,
            ),
            TableColumn::new(
                labels.get(baseline).to_string(),
                metrics
                    .values()
                    .map(|values| format_value(values.get(baseline)))
                    .collect(),
                0,
            ),
        ];

        for version in comparisons {
            let cells = metrics
                .values()
                .map(|values| comparison_cell(mode, values.get(baseline), values.get(version)))
                .collect();
            columns.push(TableColumn::new(labels.get(version).to_string(), cells, 0));
        }

        Self {
            columns,
            rows: metrics.len(),
        }
    }

    fn render(&self) -> Vec<String> {
        let join_row = |parts: Vec<String>| parts.join(" | ").trim_end().to_string();

        let mut lines = Vec::with_capacity(self.rows + 2);
        lines.push(join_row(
            self.columns
                .iter()
                .map(|c| format!("{:<width$}", c.header, width = c.width))
                .collect(),
        ));
        lines.push(
            self.columns
                .iter()
                .map(|c| "-".repeat(c.width))
                .collect::<Vec<_>>()
                .join("-+-"),
        );
        for row in 0..self.rows {
            lines.push(join_row(
                self.columns
                    .iter()
                    .map(|c| format!("{:<width$}", c.cells[row], width = c.width))
                    .collect(),
            ));
        }
        lines
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metric_table(entries: &[(&str, &str, Value)]) -> MetricTable {
        let mut table = MetricTable::new();
        for (metric, version, value) in entries {
            table
                .entry(metric.to_string())
                .or_default()
                .insert(version.to_string(), value.clone());
        }
        table
    }

    #[test]
    fn test_letter_labels() {
        assert_eq!(letter_label(0), "A");
        assert_eq!(letter_label(25), "Z");
        assert_eq!(letter_label(26), "AA");
        assert_eq!(letter_label(27), "AB");
    }

    #[test]
    fn test_short_names_are_used_directly() {
        let labels = VersionLabels::assign("v1", &["v2".to_string()]);
        assert_eq!(labels.get("v2"), "v2");
        assert!(labels.legend("v1", &["v2".to_string()]).is_empty());
    }

    #[test]
    fn test_one_long_name_letters_everything() {
        let comparisons = vec!["v2".to_string(), "nightly-build".to_string()];
        let labels = VersionLabels::assign("v1", &comparisons);

        assert_eq!(labels.get("v1"), "A");
        assert_eq!(labels.get("v2"), "B");
        assert_eq!(labels.get("nightly-build"), "C");
        assert_eq!(
            labels.legend("v1", &comparisons),
            vec!["A: v1 (baseline)", "B: v2", "C: nightly-build", ""]
        );
    }

    #[test]
    fn test_comparison_cells() {
        let ten = Value::Integer(10);
        let fifteen = Value::Real(15.0);
        assert_eq!(
            comparison_cell(DisplayMode::ValuePercent, Some(&ten), Some(&fifteen)),
            "15 (+50.0%)"
        );
        assert_eq!(
            comparison_cell(DisplayMode::Full, Some(&ten), None),
            "0 -10 (-100.0%)"
        );
        assert_eq!(
            comparison_cell(DisplayMode::ValuePercent, None, Some(&fifteen)),
            "15 (inf%)"
        );
        assert_eq!(
            comparison_cell(
                DisplayMode::Full,
                Some(&ten),
                Some(&Value::Text("fast".to_string()))
            ),
            "N/A"
        );
    }

    #[test]
    fn test_table_layout() {
        let metrics = metric_table(&[
            ("latency", "a", Value::Integer(10)),
            ("latency", "b", Value::Integer(15)),
            ("throughput_rps", "a", Value::Integer(200)),
        ]);
        let comparisons = vec!["b".to_string()];
        let labels = VersionLabels::assign("a", &comparisons);
        let table =
            ComparisonTable::build(&metrics, "a", &comparisons, &labels, DisplayMode::ValuePercent);

        assert_eq!(
            table.render(),
            vec![
                "Metric         | a   | b",
                "---------------+-----+------------",
                "latency        | 10  | 15 (+50.0%)",
                "throughput_rps | 200 | 0 (-100.0%)",
            ]
        );
    }

    #[test]
    fn test_metric_column_has_minimum_width() {
        let metrics = metric_table(&[
            ("p50", "a", Value::Integer(1)),
            ("p50", "b", Value::Integer(2)),
        ]);
        let comparisons = vec!["b".to_string()];
        let labels = VersionLabels::assign("a", &comparisons);
        let table =
            ComparisonTable::build(&metrics, "a", &comparisons, &labels, DisplayMode::Value);
        let lines = table.render();

        assert!(lines[0].starts_with("Metric  | a"));
        assert!(lines[2].starts_with("p50     | 1"));
    }
}
