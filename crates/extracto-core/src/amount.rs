//! Amount normalization for Spanish-formatted statement values
//!
//! Values like `"1.234,56 €"` use a period for thousands grouping and a comma
//! for the decimal point. Amounts stay exact: no rounding happens here, two
//! decimals are only enforced when writing QIF.

use std::str::FromStr;

use rust_decimal::Decimal;
use thiserror::Error;

use crate::models::CellValue;

const CURRENCY_SYMBOLS: [char; 3] = ['€', '$', '£'];

/// Why an amount cell could not be turned into a decimal
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AmountError {
    /// Empty, whitespace-only or "nan" cell: the row simply has no amount
    #[error("amount is empty")]
    Missing,

    #[error("unable to parse amount '{raw}' (cleaned: '{cleaned}')")]
    Invalid { raw: String, cleaned: String },
}

/// Parse an amount cell into an exact decimal
pub fn parse_amount(value: &CellValue) -> Result<Decimal, AmountError> {
    if value.is_blank() {
        return Err(AmountError::Missing);
    }
    parse_amount_str(&value.to_text())
}

/// Parse an amount string, handling European grouping and currency symbols
pub fn parse_amount_str(raw: &str) -> Result<Decimal, AmountError> {
    let mut cleaned: String = raw
        .chars()
        .filter(|c| !c.is_whitespace() && !CURRENCY_SYMBOLS.contains(c))
        .collect();

    if cleaned.is_empty() || cleaned.eq_ignore_ascii_case("nan") {
        return Err(AmountError::Missing);
    }

    if cleaned.contains(',') {
        cleaned = cleaned.replace('.', "").replace(',', ".");
    }

    Decimal::from_str_exact(&cleaned)
        .or_else(|_| Decimal::from_scientific(&cleaned))
        .or_else(|_| Decimal::from_str(&cleaned))
        .map_err(|_| AmountError::Invalid {
            raw: raw.to_string(),
            cleaned,
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_european_grouping() {
        assert_eq!(parse_amount_str("1.234,56").unwrap(), dec("1234.56"));
        assert_eq!(parse_amount_str("-1.234.567,89").unwrap(), dec("-1234567.89"));
        assert_eq!(parse_amount_str("12,5").unwrap(), dec("12.5"));
    }

    #[test]
    fn test_currency_and_spaces() {
        assert_eq!(parse_amount_str("-12,34 €").unwrap(), dec("-12.34"));
        assert_eq!(parse_amount_str("€ 1 000,00").unwrap(), dec("1000.00"));
        assert_eq!(parse_amount_str("1.000,00\u{a0}€").unwrap(), dec("1000.00"));
    }

    #[test]
    fn test_plain_decimal_point() {
        // Without a comma the period is the decimal point
        assert_eq!(parse_amount_str("-45.99").unwrap(), dec("-45.99"));
        assert_eq!(parse_amount_str("100").unwrap(), dec("100"));
    }

    #[test]
    fn test_keeps_precision() {
        let amount = parse_amount_str("0,005").unwrap();
        assert_eq!(amount, dec("0.005"));
        assert_eq!(amount.scale(), 3);
    }

    #[test]
    fn test_missing_amounts() {
        assert_eq!(parse_amount(&CellValue::Empty), Err(AmountError::Missing));
        assert_eq!(
            parse_amount(&CellValue::Text("   ".into())),
            Err(AmountError::Missing)
        );
        assert_eq!(parse_amount_str("nan"), Err(AmountError::Missing));
        assert_eq!(parse_amount_str("NaN"), Err(AmountError::Missing));
        assert_eq!(parse_amount_str(" € "), Err(AmountError::Missing));
    }

    #[test]
    fn test_invalid_amount_reports_both_strings() {
        assert_eq!(
            parse_amount_str("12,34,56 €"),
            Err(AmountError::Invalid {
                raw: "12,34,56 €".to_string(),
                cleaned: "12.34.56".to_string(),
            })
        );
        assert!(matches!(
            parse_amount_str("abc"),
            Err(AmountError::Invalid { .. })
        ));
    }

    #[test]
    fn test_numeric_cells() {
        assert_eq!(
            parse_amount(&CellValue::Number(-12.34)).unwrap(),
            dec("-12.34")
        );
        assert_eq!(parse_amount(&CellValue::Number(1500.0)).unwrap(), dec("1500"));
        assert_eq!(
            parse_amount(&CellValue::Number(f64::NAN)),
            Err(AmountError::Missing)
        );
    }
}
