//! Text heatmaps over two axes
//!
//! Aggregation happens in a single grouped query: numeric axes are binned
//! with a `CASE` expression, categorical axes are grouped on the raw field.
//! The resulting cells are shaded with a five-glyph ramp.

use super::scale::{bin_count, build_axis_query, AxisQuery};
use super::{query_rows, ChartOutcome};
use crate::format::format_general;
use crate::parser::{parse_aggregation, value_expression};
use crate::reader::{quote_identifier, Reader, Value};
use crate::Result;
use std::collections::HashMap;
use tracing::debug;

/// Default number of x bins
pub const DEFAULT_WIDTH: usize = 20;
/// Default number of y bins
pub const DEFAULT_HEIGHT: usize = 15;

/// Shade ramp from empty to densest
pub const SHADES: [char; 5] = [' ', '░', '▒', '▓', '█'];

const TOP_SHADE: usize = SHADES.len() - 1;
const MIDDLE_SHADE: usize = SHADES.len() / 2;

/// Options for heatmaps
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeatmapOptions {
    /// Target number of bins on a numeric x axis
    pub width: usize,
    /// Target number of bins on a numeric y axis
    pub height: usize,
}

impl Default for HeatmapOptions {
    fn default() -> Self {
        Self {
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
        }
    }
}

/// Render a heatmap of `value_field` (row count when `None`) over x and y
///
/// Never fails: engine errors become [`ChartOutcome::Failed`] and inputs
/// without any plottable cell become [`ChartOutcome::Empty`]. A plain column
/// as the value field cannot be grouped, so that case is reported as a
/// [`ChartOutcome::Notice`] asking for an aggregate.
pub fn create_heatmap(
    reader: &dyn Reader,
    table: &str,
    x_field: &str,
    y_field: &str,
    value_field: Option<&str>,
    options: &HeatmapOptions,
) -> ChartOutcome {
    let result = build_heatmap(reader, table, x_field, y_field, value_field, options);
    ChartOutcome::from_result(result, "heatmap")
}

fn build_heatmap(
    reader: &dyn Reader,
    table: &str,
    x_field: &str,
    y_field: &str,
    value_field: Option<&str>,
    options: &HeatmapOptions,
) -> Result<ChartOutcome> {
    let table_ref = quote_identifier(table);
    let present = format!("({}) IS NOT NULL AND ({}) IS NOT NULL", x_field, y_field);

    let range_sql = format!(
        "SELECT MIN({x}), MAX({x}), MIN({y}), MAX({y}) FROM {t} WHERE {w}",
        x = x_field,
        y = y_field,
        t = table_ref,
        w = present
    );
    let ranges = query_rows(reader, &range_sql)?;
    let Some(range) = ranges.first().filter(|row| row.len() == 4) else {
        return Ok(ChartOutcome::Empty);
    };
    if range.iter().any(Value::is_null) {
        return Ok(ChartOutcome::Empty);
    }

    let x_query = build_axis_query(x_field, &range[0], &range[1], options.width, "x_key");
    let y_query = build_axis_query(y_field, &range[2], &range[3], options.height, "y_key");

    let mut cell_sql = format!(
        "SELECT {}, {}, {} AS cell_value FROM {} WHERE {} GROUP BY {}, {}",
        x_query.select_expr(),
        y_query.select_expr(),
        value_expression(value_field),
        table_ref,
        present,
        x_query.expr,
        y_query.expr
    );
    let binned: Vec<String> = [&x_query, &y_query]
        .iter()
        .filter(|axis| axis.is_numeric())
        .map(|axis| format!("{} IS NOT NULL", axis.expr))
        .collect();
    if !binned.is_empty() {
        cell_sql.push_str(" HAVING ");
        cell_sql.push_str(&binned.join(" AND "));
    }

    let rows = match query_rows(reader, &cell_sql) {
        Ok(rows) => rows,
        Err(e) => {
            let Some(field) = unaggregated_field(value_field) else {
                return Err(e);
            };
            debug!(error = %e, field, "Value field is not aggregated");
            return Ok(ChartOutcome::Notice(format!(
                "Value field '{}' must be aggregated, e.g. avg({}) or sum({})",
                field, field, field
            )));
        }
    };
    let Some(grid) = HeatmapGrid::from_rows(&x_query, &y_query, &rows) else {
        return Ok(ChartOutcome::Empty);
    };
    debug!(
        columns = grid.x.len(),
        rows = grid.y.len(),
        cells = grid.cells.len(),
        "Heatmap grid"
    );

    let value_label = value_field
        .map(str::trim)
        .filter(|field| !field.is_empty())
        .unwrap_or("count");
    Ok(ChartOutcome::Rendered(
        grid.render(x_field, y_field, value_label),
    ))
}

/// The value field when it is a plain column or expression rather than
/// a recognized aggregate call
fn unaggregated_field(value_field: Option<&str>) -> Option<&str> {
    value_field
        .map(str::trim)
        .filter(|field| !field.is_empty())
        .filter(|field| parse_aggregation(field).function.is_none())
}

/// Positions along one axis
#[derive(Debug, Clone, PartialEq)]
enum Axis {
    /// Numeric bins; cell keys are bin indices
    Binned(Vec<f64>),
    /// Distinct observed values in ascending order
    Categorical(Vec<Value>),
}

impl Axis {
    fn new<'a>(query: &AxisQuery, keys: impl Iterator<Item = &'a Value>) -> Self {
        match &query.scale {
            Some(scale) => Axis::Binned(scale.clone()),
            None => {
                let mut values: Vec<Value> = keys.filter(|key| !key.is_null()).cloned().collect();
                values.sort_by(|a, b| a.total_cmp(b));
                values.dedup();
                Axis::Categorical(values)
            }
        }
    }

    fn len(&self) -> usize {
        match self {
            Axis::Binned(scale) => bin_count(scale),
            Axis::Categorical(values) => values.len(),
        }
    }

    fn index_of(&self, key: &Value) -> Option<usize> {
        match self {
            Axis::Binned(_) => match key {
                Value::Integer(idx) => usize::try_from(*idx).ok().filter(|idx| *idx < self.len()),
                _ => None,
            },
            Axis::Categorical(values) => values.iter().position(|value| value == key),
        }
    }

    /// One label per position: the lower edge of each bin, or the category
    fn labels(&self) -> Vec<String> {
        match self {
            Axis::Binned(scale) => scale
                .iter()
                .take(self.len())
                .map(|edge| format_general(*edge))
                .collect(),
            Axis::Categorical(values) => values.iter().map(Value::to_key).collect(),
        }
    }

    fn describe(&self, name: &str, field: &str) -> String {
        match self {
            Axis::Binned(scale) => {
                let first = scale.first().copied().unwrap_or(0.0);
                let last = scale.last().copied().unwrap_or(0.0);
                match scale.get(1) {
                    Some(second) => format!(
                        "{}: {} ({} to {}, step {})",
                        name,
                        field,
                        format_general(first),
                        format_general(last),
                        format_general(second - first)
                    ),
                    None => format!("{}: {} ({})", name, field, format_general(first)),
                }
            }
            Axis::Categorical(values) => {
                format!("{}: {} ({} categories)", name, field, values.len())
            }
        }
    }
}

/// Maps cell values onto the shade ramp
#[derive(Debug, Clone, Copy, PartialEq)]
struct ShadeScale {
    /// Value mapped to the empty glyph: zero for non-negative data
    floor: f64,
    min: f64,
    max: f64,
}

impl ShadeScale {
    fn new(values: impl Iterator<Item = f64>) -> Option<Self> {
        let (min, max) = values.fold(None, |range: Option<(f64, f64)>, value| match range {
            Some((lo, hi)) => Some((lo.min(value), hi.max(value))),
            None => Some((value, value)),
        })?;
        let floor = if min >= 0.0 { 0.0 } else { min };
        Some(Self { floor, min, max })
    }

    fn is_flat(&self) -> bool {
        self.min == self.max
    }

    fn index(&self, value: f64) -> usize {
        if self.is_flat() {
            return MIDDLE_SHADE;
        }
        let scaled = (value - self.floor) / (self.max - self.floor) * TOP_SHADE as f64;
        scaled.round_ties_even().clamp(0.0, TOP_SHADE as f64) as usize
    }

    /// Value interval covered by each glyph, consistent with `index`
    fn legend(&self) -> Vec<String> {
        if self.is_flat() {
            return vec![format!(
                "  '{}'  {}",
                SHADES[MIDDLE_SHADE],
                format_general(self.min)
            )];
        }

        let step = (self.max - self.floor) / TOP_SHADE as f64;
        (0..SHADES.len())
            .map(|idx| {
                let lower = self.floor + step * (idx as f64 - 0.5).max(0.0);
                let upper = self.floor + step * (idx as f64 + 0.5).min(TOP_SHADE as f64);
                let close = if idx == TOP_SHADE { ']' } else { ')' };
                format!(
                    "  '{}'  [{}, {}{}",
                    SHADES[idx],
                    format_general(lower),
                    format_general(upper),
                    close
                )
            })
            .collect()
    }
}

struct HeatmapGrid {
    x: Axis,
    y: Axis,
    /// (x index, y index) -> aggregated value
    cells: HashMap<(usize, usize), f64>,
    shade: ShadeScale,
}

impl HeatmapGrid {
    /// Place `[x_key, y_key, cell_value]` rows on the grid
    ///
    /// Returns `None` when no row carries a numeric value inside both axes.
    fn from_rows(x_query: &AxisQuery, y_query: &AxisQuery, rows: &[Vec<Value>]) -> Option<Self> {
        let rows: Vec<&[Value]> = rows
            .iter()
            .map(Vec::as_slice)
            .filter(|row| row.len() == 3)
            .collect();

        let x = Axis::new(x_query, rows.iter().map(|row| &row[0]));
        let y = Axis::new(y_query, rows.iter().map(|row| &row[1]));

        let mut cells = HashMap::new();
        for row in &rows {
            let (Some(xi), Some(yi), Some(value)) =
                (x.index_of(&row[0]), y.index_of(&row[1]), row[2].as_f64())
            else {
                continue;
            };
            cells.insert((xi, yi), value);
        }

        let shade = ShadeScale::new(cells.values().copied())?;
        Some(Self { x, y, cells, shade })
    }

    fn glyph(&self, xi: usize, yi: usize) -> char {
        self.cells
            .get(&(xi, yi))
            .map(|value| SHADES[self.shade.index(*value)])
            .unwrap_or(SHADES[0])
    }

    fn render(&self, x_field: &str, y_field: &str, value_label: &str) -> String {
        let x_labels = self.x.labels();
        let y_labels = self.y.labels();
        let cell_width = x_labels
            .iter()
            .map(|label| label.chars().count())
            .max()
            .unwrap_or(1)
            .max(1);
        let label_width = y_labels
            .iter()
            .map(|label| label.chars().count())
            .max()
            .unwrap_or(0);
        let grid_width = x_labels.len() * (cell_width + 1) - 1;

        let mut lines = Vec::with_capacity(y_labels.len() + 12);
        let header: Vec<String> = x_labels
            .iter()
            .map(|label| format!("{:>width$}", label, width = cell_width))
            .collect();
        lines.push(format!(
            "{:>lw$} | {}",
            "",
            header.join(" "),
            lw = label_width
        ));
        lines.push(format!(
            "{}-+-{}",
            "-".repeat(label_width),
            "-".repeat(grid_width)
        ));

        // Highest y value on top
        for (yi, label) in y_labels.iter().enumerate().rev() {
            let cells: Vec<String> = (0..x_labels.len())
                .map(|xi| self.glyph(xi, yi).to_string().repeat(cell_width))
                .collect();
            let row = format!("{:>lw$} | {}", label, cells.join(" "), lw = label_width);
            lines.push(row.trim_end().to_string());
        }

        lines.push(String::new());
        lines.push(self.x.describe("X-axis", x_field));
        lines.push(self.y.describe("Y-axis", y_field));
        lines.push(format!(
            "Value: {} ({} to {})",
            value_label,
            format_general(self.shade.min),
            format_general(self.shade.max)
        ));
        lines.push("Legend:".to_string());
        lines.extend(self.shade.legend());

        lines.join("\n")
    }
}
