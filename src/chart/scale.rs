//! Axis scales and binning
//!
//! Numeric axes are cut into "nice" intervals (steps of 1, 2, 2.5, 5 or 10
//! times a power of ten). The same edges drive both the SQL `CASE`
//! expression that bins rows inside the engine and the labels printed
//! along the axis.

use crate::reader::Value;

/// Step multipliers tried in order for a given power of ten
const NICE_STEPS: [f64; 5] = [1.0, 2.0, 2.5, 5.0, 10.0];

/// Relative spread put around a single repeated value
const DEGENERATE_SPREAD: f64 = 0.1;

/// Generate `count` evenly spaced edges starting at `start`
fn generate_edges(start: f64, step: f64, count: usize) -> Vec<f64> {
    (0..count).map(|i| start + step * i as f64).collect()
}

/// Scale for a range that collapsed to one value
fn degenerate_scale(value: f64) -> Vec<f64> {
    if value == 0.0 {
        return vec![0.0];
    }
    let spread = value.abs() * DEGENERATE_SPREAD;
    vec![value - spread, value, value + spread]
}

/// Build ascending bin edges covering `[min, max]`
///
/// The step is the smallest nice step that keeps the number of bins at or
/// below roughly `target_steps`. The first edge is `min` rounded down to a
/// multiple of the step and the last is `max` rounded up.
///
/// A range where `min == max` gets `[0]` for zero and `v ± 10%` around any
/// other value. Non-finite bounds yield no edges.
pub fn create_numeric_scale(min: f64, max: f64, target_steps: usize) -> Vec<f64> {
    if !min.is_finite() || !max.is_finite() {
        return vec![];
    }
    if min == max {
        return degenerate_scale(min);
    }
    let (min, max) = if min > max { (max, min) } else { (min, max) };

    let raw_step = (max - min) / target_steps.max(1) as f64;
    let magnitude = 10f64.powf(raw_step.log10().floor());
    let normalized = raw_step / magnitude;
    let nice = NICE_STEPS
        .into_iter()
        .find(|&candidate| normalized <= candidate)
        .unwrap_or(10.0);
    let step = nice * magnitude;

    let mut first = (min / step).floor();
    let mut last = (max / step).ceil();
    // Keep the data inside the outer edges despite rounding in step * k
    if first * step > min {
        first -= 1.0;
    }
    if last * step < max {
        last += 1.0;
    }

    let count = (last - first).round() as usize + 1;
    generate_edges(first * step, step, count)
}

/// Number of bins a scale defines
///
/// A one-edge scale still has a single bin holding exactly that value.
pub fn bin_count(scale: &[f64]) -> usize {
    scale.len().saturating_sub(1).max(usize::from(!scale.is_empty()))
}

/// Locate the bin holding `value`
///
/// Bins are half-open `[edge_i, edge_i+1)` except the last, which also
/// holds its upper edge. Values outside the scale have no bin.
pub fn find_bin_index(value: f64, scale: &[f64]) -> Option<usize> {
    if let Some(idx) = scale
        .windows(2)
        .position(|edges| edges[0] <= value && value < edges[1])
    {
        return Some(idx);
    }
    match scale.last() {
        Some(&last) if last == value => Some(bin_count(scale) - 1),
        _ => None,
    }
}

/// Format a bin edge as a SQL literal
fn sql_literal(value: f64) -> String {
    format!("{}", value)
}

/// Build a `CASE` expression mapping `field` to its bin index
///
/// Rows outside the scale map to NULL.
pub fn bin_case_expression(field: &str, scale: &[f64]) -> String {
    let field = format!("({})", field);
    let bins = bin_count(scale);
    let mut branches = Vec::with_capacity(bins);

    if scale.len() == 1 {
        branches.push(format!(
            "WHEN {} = {} THEN 0",
            field,
            sql_literal(scale[0])
        ));
    }
    for (idx, edges) in scale.windows(2).enumerate() {
        let upper_op = if idx + 1 == bins { "<=" } else { "<" };
        branches.push(format!(
            "WHEN {field} >= {} AND {field} {} {} THEN {}",
            sql_literal(edges[0]),
            upper_op,
            sql_literal(edges[1]),
            idx,
            field = field
        ));
    }

    format!("CASE {} END", branches.join(" "))
}

/// How one heatmap axis is expressed in SQL
#[derive(Debug, Clone, PartialEq)]
pub struct AxisQuery {
    /// Expression grouped on: a bin-index `CASE` or the raw field
    pub expr: String,
    /// Column alias the expression is selected under
    pub alias: String,
    /// Bin edges for numeric axes; `None` for categorical ones
    pub scale: Option<Vec<f64>>,
}

impl AxisQuery {
    pub fn is_numeric(&self) -> bool {
        self.scale.is_some()
    }

    pub fn select_expr(&self) -> String {
        format!("{} AS {}", self.expr, self.alias)
    }
}

/// Decide how an axis is binned from its observed range
///
/// Both bounds must be engine numbers for the axis to be numeric; anything
/// else (text, booleans, mixed) is treated as categorical and grouped on
/// the field itself.
pub fn build_axis_query(
    field_expr: &str,
    min: &Value,
    max: &Value,
    target_bins: usize,
    alias: &str,
) -> AxisQuery {
    let categorical = || AxisQuery {
        expr: field_expr.to_string(),
        alias: alias.to_string(),
        scale: None,
    };

    if !(min.is_numeric() && max.is_numeric()) {
        return categorical();
    }
    let (Some(lo), Some(hi)) = (min.as_f64(), max.as_f64()) else {
        return categorical();
    };

    let scale = create_numeric_scale(lo, hi, target_bins);
    if scale.is_empty() {
        return categorical();
    }

    AxisQuery {
        expr: bin_case_expression(field_expr, &scale),
        alias: alias.to_string(),
        scale: Some(scale),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(actual: &[f64], expected: &[f64]) {
        assert_eq!(actual.len(), expected.len(), "{:?} vs {:?}", actual, expected);
        for (a, e) in actual.iter().zip(expected) {
            assert!((a - e).abs() < 1e-9, "{:?} vs {:?}", actual, expected);
        }
    }

    #[test]
    fn test_scale_covers_range_with_nice_steps() {
        assert_close(
            &create_numeric_scale(0.0, 100.0, 10),
            &[0.0, 10.0, 20.0, 30.0, 40.0, 50.0, 60.0, 70.0, 80.0, 90.0, 100.0],
        );
        assert_close(&create_numeric_scale(3.0, 17.0, 5), &[0.0, 5.0, 10.0, 15.0, 20.0]);
        assert_close(
            &create_numeric_scale(0.0, 1.0, 4),
            &[0.0, 0.25, 0.5, 0.75, 1.0],
        );
    }

    #[test]
    fn test_scale_properties() {
        for (min, max, steps) in [
            (1.0, 2.0, 20),
            (-37.5, 812.0, 15),
            (0.001, 0.0173, 10),
            (1e6, 3.3e6, 7),
        ] {
            let scale = create_numeric_scale(min, max, steps);
            assert!(scale[0] <= min);
            assert!(*scale.last().unwrap() >= max);
            assert!(scale.windows(2).all(|w| w[0] < w[1]));
        }
    }

    #[test]
    fn test_degenerate_scales() {
        assert_eq!(create_numeric_scale(0.0, 0.0, 10), vec![0.0]);
        assert_close(&create_numeric_scale(10.0, 10.0, 10), &[9.0, 10.0, 11.0]);
        assert_close(&create_numeric_scale(-10.0, -10.0, 10), &[-11.0, -10.0, -9.0]);
        assert!(create_numeric_scale(f64::NAN, 1.0, 10).is_empty());
    }

    #[test]
    fn test_find_bin_index() {
        let scale = [0.0, 10.0, 20.0, 30.0];
        assert_eq!(find_bin_index(0.0, &scale), Some(0));
        assert_eq!(find_bin_index(9.99, &scale), Some(0));
        assert_eq!(find_bin_index(10.0, &scale), Some(1));
        assert_eq!(find_bin_index(30.0, &scale), Some(2));
        assert_eq!(find_bin_index(-1.0, &scale), None);
        assert_eq!(find_bin_index(30.5, &scale), None);
    }

    #[test]
    fn test_maximum_falls_in_last_bin() {
        let scale = [0.0, 10.0, 20.0, 30.0, 40.0];
        assert_eq!(find_bin_index(40.0, &scale), Some(3));
        assert_eq!(find_bin_index(-5.0, &scale), None);
    }

    #[test]
    fn test_single_edge_scale_has_one_bin() {
        assert_eq!(bin_count(&[0.0]), 1);
        assert_eq!(bin_count(&[]), 0);
        assert_eq!(find_bin_index(0.0, &[0.0]), Some(0));
        assert_eq!(find_bin_index(1.0, &[0.0]), None);
    }

    #[test]
    fn test_case_expression() {
        let sql = bin_case_expression("x", &[0.0, 0.5, 1.0]);
        assert_eq!(
            sql,
            "CASE WHEN (x) >= 0 AND (x) < 0.5 THEN 0 WHEN (x) >= 0.5 AND (x) <= 1 THEN 1 END"
        );
        assert_eq!(bin_case_expression("x", &[0.0]), "CASE WHEN (x) = 0 THEN 0 END");
    }

    #[test]
    fn test_axis_query_numeric_and_categorical() {
        let numeric = build_axis_query("x", &Value::Integer(1), &Value::Integer(9), 4, "x_key");
        assert!(numeric.is_numeric());
        assert!(numeric.select_expr().starts_with("CASE WHEN (x)"));
        assert!(numeric.select_expr().ends_with(" AS x_key"));

        let categorical = build_axis_query(
            "dept",
            &Value::Text("A".to_string()),
            &Value::Text("Z".to_string()),
            4,
            "y_key",
        );
        assert!(!categorical.is_numeric());
        assert_eq!(categorical.select_expr(), "dept AS y_key");

        let mixed = build_axis_query(
            "v",
            &Value::Integer(1),
            &Value::Text("9".to_string()),
            4,
            "x_key",
        );
        assert!(!mixed.is_numeric());
    }
}
