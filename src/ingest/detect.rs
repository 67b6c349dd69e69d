//! Delimiter and header sniffing

use crate::{Result, TabplotError};
use std::str::FromStr;

/// Candidate delimiters, in tie-break order
pub const DELIMITER_CANDIDATES: [char; 5] = [',', ';', '\t', ' ', '|'];

/// Number of leading lines inspected when sniffing the delimiter
const SAMPLE_LINES: usize = 5;

/// A first row is a data row when at least this share of its fields is numeric
const NUMERIC_ROW_RATIO: f64 = 0.7;

/// Pick the candidate that occurs most often in the first few lines
///
/// Ties go to the earlier candidate; text without any candidate yields `,`.
pub fn detect_delimiter(text: &str) -> char {
    let sample: Vec<&str> = text.split('\n').take(SAMPLE_LINES).collect();

    let mut best = DELIMITER_CANDIDATES[0];
    let mut best_count = 0;
    for candidate in DELIMITER_CANDIDATES {
        let count: usize = sample.iter().map(|line| line.matches(candidate).count()).sum();
        if count > best_count {
            best = candidate;
            best_count = count;
        }
    }
    best
}

fn is_numeric_field(field: &str) -> bool {
    let trimmed = field.trim();
    !trimmed.is_empty() && trimmed.parse::<f64>().is_ok()
}

fn count_numeric_fields(row: &[String]) -> usize {
    row.iter().filter(|field| is_numeric_field(field)).count()
}

/// Guess whether the first parsed row is a header
///
/// A lone row is always a header. Otherwise the first two rows are compared
/// by how many of their fields parse as numbers.
pub fn auto_detect_headers(rows: &[Vec<String>]) -> bool {
    let (first, second) = match rows {
        [first, second, ..] => (first, second),
        _ => return true,
    };

    let first_numeric = count_numeric_fields(first);
    let second_numeric = count_numeric_fields(second);

    if first_numeric == 0 && second_numeric > 0 {
        return true;
    }
    if first_numeric as f64 >= first.len() as f64 * NUMERIC_ROW_RATIO {
        return false;
    }
    first_numeric < second_numeric
}

/// How to decide whether the input starts with a header row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HeaderMode {
    #[default]
    Auto,
    Yes,
    No,
}

impl HeaderMode {
    /// Apply the mode to the parsed rows
    pub fn resolve(&self, rows: &[Vec<String>]) -> bool {
        match self {
            HeaderMode::Auto => auto_detect_headers(rows),
            HeaderMode::Yes => true,
            HeaderMode::No => false,
        }
    }
}

impl FromStr for HeaderMode {
    type Err = TabplotError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "auto" => Ok(HeaderMode::Auto),
            "yes" => Ok(HeaderMode::Yes),
            "no" => Ok(HeaderMode::No),
            _ => Err(TabplotError::ParseError(format!(
                "Invalid header mode '{}'. Expected auto, yes or no",
                s
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows(lines: &[&[&str]]) -> Vec<Vec<String>> {
        lines
            .iter()
            .map(|line| line.iter().map(|f| f.to_string()).collect())
            .collect()
    }

    #[test]
    fn test_detect_delimiter() {
        assert_eq!(detect_delimiter("a,b,c\n1,2,3"), ',');
        assert_eq!(detect_delimiter("a;b;c\n1;2;3"), ';');
        assert_eq!(detect_delimiter("a\tb\tc\n1\t2\t3"), '\t');
        assert_eq!(detect_delimiter("a b c\n1 2 3"), ' ');
        assert_eq!(detect_delimiter("a|b|c\n1|2|3"), '|');
    }

    #[test]
    fn test_detect_delimiter_ties_and_absence() {
        assert_eq!(detect_delimiter("a,b;c"), ',');
        assert_eq!(detect_delimiter("abc\ndef"), ',');
        assert_eq!(detect_delimiter(""), ',');
    }

    #[test]
    fn test_detect_delimiter_only_samples_leading_lines() {
        let text = "a;b\n1;2\n3;4\n5;6\n7;8\n9,9,9,9,9,9,9,9,9,9";
        assert_eq!(detect_delimiter(text), ';');
    }

    #[test]
    fn test_headers_detected_over_numeric_data() {
        assert!(auto_detect_headers(&rows(&[
            &["name", "age", "salary"],
            &["John", "25", "50000"],
        ])));
    }

    #[test]
    fn test_numeric_first_row_is_data() {
        assert!(!auto_detect_headers(&rows(&[
            &["1", "2", "3"],
            &["4", "5", "6"],
        ])));
    }

    #[test]
    fn test_all_text_rows_are_not_headers() {
        assert!(!auto_detect_headers(&rows(&[
            &["alpha", "beta"],
            &["gamma", "delta"],
        ])));
    }

    #[test]
    fn test_single_row_is_header() {
        assert!(auto_detect_headers(&rows(&[&["only", "row"]])));
        assert!(auto_detect_headers(&[]));
    }

    #[test]
    fn test_mixed_rows_compare_numeric_counts() {
        // 1 of 3 numeric in the first row, 2 of 3 in the second
        assert!(auto_detect_headers(&rows(&[
            &["id7", "label", "9"],
            &["x", "1", "2"],
        ])));
    }

    #[test]
    fn test_header_mode_from_str() {
        assert_eq!("auto".parse::<HeaderMode>().unwrap(), HeaderMode::Auto);
        assert_eq!("YES".parse::<HeaderMode>().unwrap(), HeaderMode::Yes);
        assert_eq!("no".parse::<HeaderMode>().unwrap(), HeaderMode::No);
        assert!("maybe".parse::<HeaderMode>().is_err());

        let err = "true".parse::<HeaderMode>().unwrap_err();
        assert!(matches!(err, TabplotError::ParseError(_)));
        assert!("false".parse::<HeaderMode>().is_err());
    }

    #[test]
    fn test_header_mode_resolve() {
        let data = rows(&[&["1", "2"], &["3", "4"]]);
        assert!(HeaderMode::Yes.resolve(&data));
        assert!(!HeaderMode::No.resolve(&data));
        assert!(!HeaderMode::Auto.resolve(&data));
    }
}
