//! Cell formatting policies for comparison tables

use crate::format::{format_percent, format_signed};
use crate::{Result, TabplotError};
use std::fmt;
use std::str::FromStr;
use tracing::debug;

/// Percentage change of a comparison value relative to its baseline
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PercentChange {
    Finite(f64),
    /// Baseline is zero and the value differs from it
    Infinite,
    /// Baseline is zero and so is the difference
    Zero,
}

impl PercentChange {
    pub fn between(baseline: f64, diff: f64) -> Self {
        if baseline != 0.0 {
            PercentChange::Finite(diff / baseline * 100.0)
        } else if diff != 0.0 {
            PercentChange::Infinite
        } else {
            PercentChange::Zero
        }
    }
}

impl fmt::Display for PercentChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PercentChange::Finite(pct) => f.write_str(&format_percent(*pct)),
            PercentChange::Infinite => f.write_str("inf%"),
            PercentChange::Zero => f.write_str("0"),
        }
    }
}

/// Which of value, absolute diff and percent diff a comparison cell shows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DisplayMode {
    /// Value, absolute difference and percentage
    Full,
    /// Percentage only
    Compact,
    Value,
    Diff,
    Percent,
    ValueDiff,
    /// Value and percentage
    #[default]
    ValuePercent,
}

impl DisplayMode {
    pub const ALL: [DisplayMode; 7] = [
        DisplayMode::Full,
        DisplayMode::Compact,
        DisplayMode::Value,
        DisplayMode::Diff,
        DisplayMode::Percent,
        DisplayMode::ValueDiff,
        DisplayMode::ValuePercent,
    ];

    /// Canonical command-line token
    pub fn name(&self) -> &'static str {
        match self {
            DisplayMode::Full => "full",
            DisplayMode::Compact => "compact",
            DisplayMode::Value => "value",
            DisplayMode::Diff => "diff",
            DisplayMode::Percent => "percent",
            DisplayMode::ValueDiff => "value-diff",
            DisplayMode::ValuePercent => "value-percent",
        }
    }

    pub fn describe(&self) -> &'static str {
        match self {
            DisplayMode::Full => "Show value, absolute difference, and percentage",
            DisplayMode::Compact => "Show only percentage difference",
            DisplayMode::Value => "Show only raw values",
            DisplayMode::Diff => "Show only absolute difference",
            DisplayMode::Percent => "Show only percentage difference",
            DisplayMode::ValueDiff => "Show value and absolute difference",
            DisplayMode::ValuePercent => "Show value and percentage difference",
        }
    }

    /// Parse a mode, falling back to `Full` for unknown strings
    pub fn parse_lenient(s: &str) -> Self {
        s.parse().unwrap_or_else(|e: TabplotError| {
            debug!(error = %e, "Falling back to full display mode");
            DisplayMode::Full
        })
    }

    /// Render one comparison cell
    ///
    /// `value` is the already formatted comparison value.
    pub fn format_cell(&self, value: &str, diff: f64, pct: PercentChange) -> String {
        match self {
            DisplayMode::Full => format!("{} {} ({})", value, format_signed(diff), pct),
            DisplayMode::Compact | DisplayMode::Percent => pct.to_string(),
            DisplayMode::Value => value.to_string(),
            DisplayMode::Diff => format_signed(diff),
            DisplayMode::ValueDiff => format!("{} ({})", value, format_signed(diff)),
            DisplayMode::ValuePercent => format!("{} ({})", value, pct),
        }
    }
}

impl fmt::Display for DisplayMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DisplayMode {
    type Err = TabplotError;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|mode| mode.name() == wanted)
            .ok_or_else(|| {
                let mut valid: Vec<&str> = Self::ALL.iter().map(|m| m.name()).collect();
                valid.sort_unstable();
                TabplotError::ChartArgumentError(format!(
                    "Invalid display mode: {}. Valid modes: {}",
                    s,
                    valid.join(", ")
                ))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percent_change() {
        assert_eq!(PercentChange::between(10.0, 5.0), PercentChange::Finite(50.0));
        assert_eq!(PercentChange::between(0.0, 3.0), PercentChange::Infinite);
        assert_eq!(PercentChange::between(0.0, 0.0), PercentChange::Zero);
        assert_eq!(PercentChange::Finite(50.0).to_string(), "+50.0%");
        assert_eq!(PercentChange::Infinite.to_string(), "inf%");
        assert_eq!(PercentChange::Zero.to_string(), "0");
    }

    #[test]
    fn test_every_mode_formats_a_cell() {
        let pct = PercentChange::between(10.0, 5.0);
        let cases = [
            (DisplayMode::Full, "15 +5 (+50.0%)"),
            (DisplayMode::Compact, "+50.0%"),
            (DisplayMode::Value, "15"),
            (DisplayMode::Diff, "+5"),
            (DisplayMode::Percent, "+50.0%"),
            (DisplayMode::ValueDiff, "15 (+5)"),
            (DisplayMode::ValuePercent, "15 (+50.0%)"),
        ];
        for (mode, expected) in cases {
            assert_eq!(mode.format_cell("15", 5.0, pct), expected, "{}", mode);
        }
    }

    #[test]
    fn test_zero_baseline_cells() {
        let inf = PercentChange::between(0.0, 4.0);
        assert_eq!(DisplayMode::ValuePercent.format_cell("4", 4.0, inf), "4 (inf%)");
        assert_eq!(DisplayMode::Full.format_cell("4", 4.0, inf), "4 +4 (inf%)");

        let zero = PercentChange::between(0.0, 0.0);
        assert_eq!(DisplayMode::Percent.format_cell("0", 0.0, zero), "0");
    }

    #[test]
    fn test_from_str() {
        assert_eq!("full".parse::<DisplayMode>().unwrap(), DisplayMode::Full);
        assert_eq!(
            "Value-Percent".parse::<DisplayMode>().unwrap(),
            DisplayMode::ValuePercent
        );
        for mode in DisplayMode::ALL {
            assert_eq!(mode.name().parse::<DisplayMode>().unwrap(), mode);
        }

        let err = "fancy".parse::<DisplayMode>().unwrap_err();
        assert!(matches!(err, TabplotError::ChartArgumentError(_)));
        assert_eq!(
            err.to_string(),
            "Invalid display mode: fancy. Valid modes: compact, diff, full, percent, value, value-diff, value-percent"
        );
    }

    #[test]
    fn test_parse_lenient_falls_back_to_full() {
        assert_eq!(DisplayMode::parse_lenient("diff"), DisplayMode::Diff);
        assert_eq!(DisplayMode::parse_lenient("nonsense"), DisplayMode::Full);
    }

    #[test]
    fn test_describe() {
        assert_eq!(
            DisplayMode::ValuePercent.describe(),
            "Show value and percentage difference"
        );
    }
}
