//! Aggregation specs such as `avg(price)`

use regex::Regex;
use std::fmt;
use std::sync::OnceLock;

/// Aggregate functions recognized in value fields and groupby shortcuts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregateFunction {
    Avg,
    Sum,
    Min,
    Max,
    Count,
}

impl AggregateFunction {
    pub const ALL: [AggregateFunction; 5] = [
        AggregateFunction::Avg,
        AggregateFunction::Sum,
        AggregateFunction::Min,
        AggregateFunction::Max,
        AggregateFunction::Count,
    ];

    /// Case-insensitive lookup by name
    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.trim();
        Self::ALL
            .into_iter()
            .find(|func| func.as_str().eq_ignore_ascii_case(name))
    }

    /// Lowercase name, as users write it
    pub fn as_str(&self) -> &'static str {
        match self {
            AggregateFunction::Avg => "avg",
            AggregateFunction::Sum => "sum",
            AggregateFunction::Min => "min",
            AggregateFunction::Max => "max",
            AggregateFunction::Count => "count",
        }
    }

    /// Uppercase name used in generated SQL
    pub fn sql_name(&self) -> &'static str {
        match self {
            AggregateFunction::Avg => "AVG",
            AggregateFunction::Sum => "SUM",
            AggregateFunction::Min => "MIN",
            AggregateFunction::Max => "MAX",
            AggregateFunction::Count => "COUNT",
        }
    }
}

impl fmt::Display for AggregateFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A value field, optionally wrapped in a recognized aggregate function
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregationSpec {
    pub function: Option<AggregateFunction>,
    pub field: String,
}

impl AggregationSpec {
    /// SQL for the field: `FUNC(field)` when aggregated, the raw text otherwise
    pub fn to_sql(&self) -> String {
        match self.function {
            Some(func) => format!("{}({})", func.sql_name(), self.field),
            None => self.field.clone(),
        }
    }
}

fn call_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(\w+)\((.+)\)$").expect("Invalid aggregation regex"))
}

/// True when the parenthesis opened at `open` is the one closing at the end
fn wraps_to_end(text: &str, open: usize) -> bool {
    let mut depth = 0i32;
    for (idx, ch) in text.char_indices().skip_while(|(idx, _)| *idx < open) {
        match ch {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    return idx == text.len() - 1;
                }
            }
            _ => {}
        }
    }
    false
}

/// Recognize `func(args)` where `func` is a known aggregate
///
/// The call has to wrap the whole string, so `avg(a) + sum(b)` is a plain
/// expression rather than an aggregation over `a) + sum(b`. Unknown function
/// names are left untouched.
pub fn parse_aggregation(field: &str) -> AggregationSpec {
    let field = field.trim();
    let plain = || AggregationSpec {
        function: None,
        field: field.to_string(),
    };

    let Some(captures) = call_regex().captures(field) else {
        return plain();
    };
    let (Some(name), Some(args)) = (captures.get(1), captures.get(2)) else {
        return plain();
    };
    if !wraps_to_end(field, name.end()) {
        return plain();
    }

    match AggregateFunction::from_name(name.as_str()) {
        Some(function) => AggregationSpec {
            function: Some(function),
            field: args.as_str().trim().to_string(),
        },
        None => plain(),
    }
}

/// SQL for a chart value field; no field means a row count
pub fn value_expression(value_field: Option<&str>) -> String {
    match value_field.map(str::trim).filter(|f| !f.is_empty()) {
        Some(field) => parse_aggregation(field).to_sql(),
        None => "COUNT(*)".to_string(),
    }
}
