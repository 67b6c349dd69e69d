//! Text chart renderers
//!
//! Both charts push their aggregation into SQL and only lay out the grouped
//! result. Rendering never returns an error: every outcome, including engine
//! failures, is described by a [`ChartOutcome`] so the caller decides what to
//! print.

pub mod comparison;
pub mod display_mode;
pub mod heatmap;
pub mod scale;

#[allow(deprecated)]
pub use comparison::create_comparison;
pub use comparison::{create_multi_comparison, ComparisonOptions, SHORT_NAME_LIMIT};
pub use display_mode::{DisplayMode, PercentChange};
pub use heatmap::{create_heatmap, HeatmapOptions, DEFAULT_HEIGHT, DEFAULT_WIDTH, SHADES};
pub use scale::{create_numeric_scale, find_bin_index};

use crate::reader::{dataframe_rows, Reader, Value};
use crate::Result;
use tracing::debug;

/// Result of rendering a chart
#[derive(Debug, Clone, PartialEq)]
pub enum ChartOutcome {
    /// The finished chart text
    Rendered(String),
    /// A message explaining why no chart was drawn
    Notice(String),
    /// The query produced nothing to draw
    Empty,
    /// The engine rejected a query
    Failed(String),
}

impl ChartOutcome {
    /// Text meant for standard output, if any
    pub fn text(&self) -> Option<&str> {
        match self {
            ChartOutcome::Rendered(text) | ChartOutcome::Notice(text) => Some(text),
            ChartOutcome::Empty | ChartOutcome::Failed(_) => None,
        }
    }

    pub fn is_rendered(&self) -> bool {
        matches!(self, ChartOutcome::Rendered(_))
    }

    pub(crate) fn from_result(result: Result<ChartOutcome>, chart: &str) -> Self {
        result.unwrap_or_else(|e| {
            debug!(chart, error = %e, "Chart query failed");
            ChartOutcome::Failed(e.to_string())
        })
    }
}

/// Run a chart query and materialize its rows
pub(crate) fn query_rows(reader: &dyn Reader, sql: &str) -> Result<Vec<Vec<Value>>> {
    debug!(sql, "Chart query");
    let df = reader.execute(sql)?;
    dataframe_rows(&df)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TabplotError;

    #[test]
    fn test_outcome_text() {
        assert_eq!(ChartOutcome::Rendered("x".into()).text(), Some("x"));
        assert_eq!(ChartOutcome::Notice("n".into()).text(), Some("n"));
        assert_eq!(ChartOutcome::Empty.text(), None);
        assert_eq!(ChartOutcome::Failed("e".into()).text(), None);
        assert!(ChartOutcome::Rendered(String::new()).is_rendered());
        assert!(!ChartOutcome::Empty.is_rendered());
    }

    #[test]
    fn test_errors_become_failed_outcomes() {
        let outcome = ChartOutcome::from_result(
            Err(TabplotError::QueryError("no such column".into())),
            "heatmap",
        );
        assert_eq!(
            outcome,
            ChartOutcome::Failed("SQL error: no such column".to_string())
        );
    }
}
