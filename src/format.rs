//! Number formatting and CSV output
//!
//! Chart text uses printf-style general formatting (`%.6g`, `%+.6g`,
//! `%+.1f%%`); record commands write CSV through the `csv` crate.

use crate::reader::{column_names, dataframe_rows, Value};
use crate::{DataFrame, Result, TabplotError};

/// Significant digits used for every number shown in chart text
pub const SIGNIFICANT_DIGITS: usize = 6;

/// Format a number like printf `%.6g`
///
/// Six significant digits, trailing zeros removed, scientific notation for
/// exponents below -4 or at/above the precision.
pub fn format_general(value: f64) -> String {
    format_significant(value, SIGNIFICANT_DIGITS)
}

/// Format a number like printf `%+.6g`
pub fn format_signed(value: f64) -> String {
    let body = format_general(value);
    if body.starts_with('-') || value.is_nan() {
        body
    } else {
        format!("+{}", body)
    }
}

/// Format a percentage like printf `%+.1f%%`
pub fn format_percent(value: f64) -> String {
    format!("{:+.1}%", value)
}

fn format_significant(value: f64, precision: usize) -> String {
    if value.is_nan() {
        return "nan".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "inf" } else { "-inf" }.to_string();
    }
    if value == 0.0 {
        return if value.is_sign_negative() { "-0" } else { "0" }.to_string();
    }

    let precision = precision.max(1);
    // Rounding happens here, so the exponent already reflects carries (9.9999999 -> 1e1)
    let scientific = format!("{:.*e}", precision - 1, value);
    let Some((mantissa, exponent)) = scientific.split_once('e') else {
        return scientific;
    };
    let Ok(exponent) = exponent.parse::<i32>() else {
        return scientific;
    };

    if exponent < -4 || exponent >= precision as i32 {
        let sign = if exponent < 0 { '-' } else { '+' };
        format!(
            "{}e{}{:02}",
            strip_trailing_zeros(mantissa),
            sign,
            exponent.unsigned_abs()
        )
    } else {
        let decimals = (precision as i32 - 1 - exponent).max(0) as usize;
        strip_trailing_zeros(&format!("{:.*}", decimals, value)).to_string()
    }
}

fn strip_trailing_zeros(text: &str) -> &str {
    if text.contains('.') {
        text.trim_end_matches('0').trim_end_matches('.')
    } else {
        text
    }
}

/// Write a header and rows as CSV text
///
/// Rows may be shorter or longer than the header; fields are written as-is.
pub fn write_csv<I>(headers: &[String], rows: I) -> Result<String>
where
    I: IntoIterator<Item = Vec<Value>>,
{
    let mut writer = csv::WriterBuilder::new()
        .flexible(true)
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new());

    let csv_error = |e: csv::Error| TabplotError::InternalError(format!("CSV write failed: {}", e));

    writer.write_record(headers).map_err(csv_error)?;
    for row in rows {
        writer
            .write_record(row.iter().map(Value::to_csv_field))
            .map_err(csv_error)?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| TabplotError::InternalError(format!("CSV flush failed: {}", e)))?;
    String::from_utf8(bytes)
        .map_err(|e| TabplotError::InternalError(format!("CSV output is not UTF-8: {}", e)))
}

/// Write a query result as CSV using its own column names as the header
pub fn dataframe_to_csv(df: &DataFrame) -> Result<String> {
    write_csv(&column_names(df), dataframe_rows(df)?)
}
