use crate::error::SheetcatError;
use crate::model::CellValue;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use std::str::FromStr;

/// Parse a price string into minor currency units (cents).
///
/// Handles formats like:
/// - "R$ 1.234,56" -> 123456 (Brazilian: dot thousands, comma decimal)
/// - "1,234.56" -> 123456 (international)
/// - "1234,5" -> 123450
/// - "", "-", "0", "R$0,00" -> 0
///
/// Unparsable input also yields 0; a warning is logged instead of failing.
pub fn parse_price(s: &str) -> i64 {
    match try_parse_price(s) {
        Ok(cents) => cents,
        Err(e) => {
            tracing::warn!("price '{}' treated as zero: {}", s.trim(), e);
            0
        }
    }
}

/// Price of a cell; numeric cells are taken as currency units directly.
pub fn parse_price_cell(cell: &CellValue) -> i64 {
    match cell {
        CellValue::Number(n) => f64_to_decimal(*n)
            .and_then(|d| to_minor_units(d).ok())
            .unwrap_or_else(|| {
                tracing::warn!("numeric price {} out of range, treated as zero", n);
                0
            }),
        CellValue::Text(s) => parse_price(s),
        CellValue::Empty => 0,
    }
}

/// Convert f64 to Decimal via its shortest string form, so that 1.005 stays
/// 1.005 instead of 1.00499999...
fn f64_to_decimal(f: f64) -> Option<Decimal> {
    format!("{f}")
        .parse::<Decimal>()
        .ok()
        .or_else(|| Decimal::try_from(f).ok())
}

/// Strict variant of [`parse_price`] that reports unparsable input.
pub fn try_parse_price(s: &str) -> Result<i64, SheetcatError> {
    let cleaned = strip_currency(s);
    if is_placeholder(&cleaned) {
        return Ok(0);
    }

    let normalized = normalize_separators(&cleaned);
    let value = Decimal::from_str(&normalized)
        .map_err(|_| SheetcatError::InvalidNumber(s.trim().to_string()))?;
    to_minor_units(value)
}

fn to_minor_units(value: Decimal) -> Result<i64, SheetcatError> {
    value
        .checked_mul(Decimal::ONE_HUNDRED)
        .ok_or_else(|| SheetcatError::InvalidNumber(value.to_string()))?
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_i64()
        .ok_or_else(|| SheetcatError::InvalidNumber(value.to_string()))
}

/// Remove currency markers and all whitespace, keeping digits, separators and sign.
fn strip_currency(s: &str) -> String {
    let upper = s.trim().to_uppercase();
    let without_codes = upper
        .replace("R$", "")
        .replace("US$", "")
        .replace("BRL", "")
        .replace("USD", "")
        .replace("EUR", "");
    without_codes
        .chars()
        .filter(|c| !c.is_whitespace() && !matches!(c, '$' | '€' | '£' | '\u{a0}'))
        .collect()
}

fn is_placeholder(cleaned: &str) -> bool {
    cleaned.is_empty() || cleaned.chars().all(|c| matches!(c, '-' | '–' | '—' | '.' | ','))
}

/// Rewrite the number so that '.' is the only (decimal) separator.
///
/// - Both present: whichever comes last is the decimal separator.
/// - Only commas: one comma with 1-2 trailing digits is decimal, else thousands.
/// - Only dots: several dots, or exactly three trailing digits, mean thousands.
fn normalize_separators(s: &str) -> String {
    let last_comma = s.rfind(',');
    let last_dot = s.rfind('.');

    match (last_comma, last_dot) {
        (Some(c), Some(d)) if c > d => s.replace('.', "").replace(',', "."),
        (Some(_), Some(_)) => s.replace(',', ""),
        (Some(c), None) => {
            let decimals = s.len() - c - 1;
            if s.matches(',').count() == 1 && (1..=2).contains(&decimals) {
                s.replace(',', ".")
            } else {
                s.replace(',', "")
            }
        }
        (None, Some(d)) => {
            let decimals = s.len() - d - 1;
            if s.matches('.').count() > 1 || decimals == 3 {
                s.replace('.', "")
            } else {
                s.to_string()
            }
        }
        (None, None) => s.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_brazilian_and_international_agree() {
        assert_eq!(parse_price("R$ 1.234,56"), 123456);
        assert_eq!(parse_price("1234.56"), 123456);
        assert_eq!(parse_price("1,234.56"), 123456);
        assert_eq!(parse_price("1234,56"), 123456);
        assert_eq!(parse_price("US$ 1,234.56"), 123456);
    }

    #[test]
    fn test_zero_and_placeholders() {
        assert_eq!(parse_price("0"), 0);
        assert_eq!(parse_price(""), 0);
        assert_eq!(parse_price("-"), 0);
        assert_eq!(parse_price("R$0,00"), 0);
        assert_eq!(parse_price("R$ -"), 0);
    }

    #[test]
    fn test_thousands_only() {
        assert_eq!(parse_price("1.234"), 123400);
        assert_eq!(parse_price("1.234.567"), 123456700);
        assert_eq!(parse_price("12,345"), 1234500);
        assert_eq!(parse_price("1.234.567,8"), 123456780);
    }

    #[test]
    fn test_single_decimal_digit() {
        assert_eq!(parse_price("10,5"), 1050);
        assert_eq!(parse_price("10.5"), 1050);
    }

    #[test]
    fn test_rounding_half_away_from_zero() {
        assert_eq!(parse_price("1.000,555"), 100056);
        assert_eq!(parse_price("1,000.125"), 100013);
    }

    #[test]
    fn test_unparsable_is_zero_not_error() {
        assert_eq!(parse_price("sob consulta"), 0);
        assert!(try_parse_price("sob consulta").is_err());
    }

    #[test]
    fn test_numeric_cell() {
        assert_eq!(parse_price_cell(&CellValue::Number(1234.56)), 123456);
        assert_eq!(parse_price_cell(&CellValue::Number(1.005)), 101);
        assert_eq!(parse_price_cell(&CellValue::Number(0.0)), 0);
        assert_eq!(parse_price_cell(&CellValue::Empty), 0);
        assert_eq!(parse_price_cell(&CellValue::Text("R$ 99,90".into())), 9990);
    }

    #[test]
    fn test_out_of_range_is_zero() {
        assert_eq!(parse_price("7000000000000000000000000000"), 0);
        assert!(try_parse_price("7000000000000000000000000000").is_err());
        assert_eq!(parse_price_cell(&CellValue::Number(1e27)), 0);
    }

    #[test]
    fn test_negative_values() {
        assert_eq!(parse_price("-10,00"), -1000);
    }
}
