//! QIF export for converted transactions
//!
//! Output is a single `!Type:Bank` section with one block per record:
//!
//! ```text
//! D01/15/2024
//! T-49.95
//! LCompras:Ropa
//! MZARA
//! ^
//! ```

use std::io::Write;

use encoding_rs::{EncoderResult, WINDOWS_1252};
use rust_decimal::{Decimal, RoundingStrategy};
use tracing::{debug, warn};

use crate::error::Result;
use crate::models::{OutputEncoding, TransactionRecord};

const QIF_HEADER: &str = "!Type:Bank";

/// Replacement byte for characters the target encoding cannot represent
const SUBSTITUTE: u8 = b'?';

/// Format an amount with exactly two decimals, rounding half to even
pub fn format_amount(amount: Decimal) -> String {
    let mut rounded = amount.round_dp_with_strategy(2, RoundingStrategy::MidpointNearestEven);
    rounded.rescale(2);
    rounded.to_string()
}

/// Render one record block, terminator included
pub fn render_record(record: &TransactionRecord) -> String {
    let mut out = format!(
        "D{}\nT{}\n",
        record.date.format("%m/%d/%Y"),
        format_amount(record.amount)
    );
    if let Some(payee) = record.payee.as_deref().filter(|p| !p.is_empty()) {
        out.push_str(&format!("P{}\n", payee));
    }
    if !record.category.is_empty() {
        out.push_str(&format!("L{}\n", record.category));
    }
    if let Some(memo) = record.memo.as_deref().filter(|m| !m.is_empty()) {
        out.push_str(&format!("M{}\n", memo));
    }
    out.push_str("^\n");
    out
}

/// Render the whole QIF document as text
pub fn render_qif(records: &[TransactionRecord]) -> String {
    let mut out = String::with_capacity(64 + records.len() * 64);
    out.push_str(QIF_HEADER);
    out.push('\n');
    for record in records {
        out.push_str(&render_record(record));
    }
    out
}

/// Encode QIF text for the target encoding
///
/// UTF-8 is lossless. The single-byte encodings replace characters they
/// cannot represent with `?`.
pub fn encode(text: &str, encoding: OutputEncoding) -> Vec<u8> {
    let (bytes, substituted) = match encoding {
        OutputEncoding::Utf8 => (text.as_bytes().to_vec(), 0),
        OutputEncoding::Cp1252 => encode_windows_1252(text),
        OutputEncoding::Iso8859_1 => encode_latin1(text),
    };
    if substituted > 0 {
        warn!(
            "{} character(s) not representable in {} were replaced with '?'",
            substituted, encoding
        );
    }
    bytes
}

fn encode_windows_1252(text: &str) -> (Vec<u8>, usize) {
    let mut encoder = WINDOWS_1252.new_encoder();
    let mut out = Vec::with_capacity(text.len());
    let mut buf = [0u8; 4096];
    let mut src = text;
    let mut substituted = 0;

    loop {
        let (result, read, written) =
            encoder.encode_from_utf8_without_replacement(src, &mut buf, true);
        out.extend_from_slice(&buf[..written]);
        src = &src[read..];
        match result {
            EncoderResult::InputEmpty => break,
            EncoderResult::OutputFull => {}
            EncoderResult::Unmappable(c) => {
                debug!("Unmappable character {:?} in cp1252", c);
                out.push(SUBSTITUTE);
                substituted += 1;
            }
        }
    }
    (out, substituted)
}

fn encode_latin1(text: &str) -> (Vec<u8>, usize) {
    let mut substituted = 0;
    let out = text
        .chars()
        .map(|c| match u8::try_from(u32::from(c)) {
            Ok(b) => b,
            Err(_) => {
                substituted += 1;
                SUBSTITUTE
            }
        })
        .collect();
    (out, substituted)
}

/// Write records as QIF to any writer
pub fn write_qif<W: Write>(
    records: &[TransactionRecord],
    writer: &mut W,
    encoding: OutputEncoding,
) -> Result<()> {
    let text = render_qif(records);
    writer.write_all(&encode(&text, encoding))?;
    writer.flush()?;
    debug!("Wrote {} QIF records as {}", records.len(), encoding);
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use chrono::NaiveDate;

    use super::*;

    fn record(date: (i32, u32, u32), amount: &str) -> TransactionRecord {
        TransactionRecord {
            date: NaiveDate::from_ymd_opt(date.0, date.1, date.2).unwrap(),
            amount: Decimal::from_str(amount).unwrap(),
            payee: None,
            category: String::new(),
            memo: None,
        }
    }

    #[test]
    fn test_format_amount() {
        assert_eq!(format_amount(Decimal::from_str("-12.34").unwrap()), "-12.34");
        assert_eq!(format_amount(Decimal::from_str("1234.5").unwrap()), "1234.50");
        assert_eq!(format_amount(Decimal::ZERO), "0.00");
        assert_eq!(format_amount(Decimal::from(7)), "7.00");
        // Half to even
        assert_eq!(format_amount(Decimal::from_str("0.125").unwrap()), "0.12");
        assert_eq!(format_amount(Decimal::from_str("0.135").unwrap()), "0.14");
        assert_eq!(format_amount(Decimal::from_str("-2.675").unwrap()), "-2.68");
    }

    #[test]
    fn test_render_full_record() {
        let mut r = record((2024, 1, 15), "-49.95");
        r.payee = Some("ZARA".into());
        r.category = "Compras:Ropa".into();
        r.memo = Some("rebajas // Tipo: Pago".into());
        assert_eq!(
            render_record(&r),
            "D01/15/2024\nT-49.95\nPZARA\nLCompras:Ropa\nMrebajas // Tipo: Pago\n^\n"
        );
    }

    #[test]
    fn test_render_omits_empty_lines() {
        let mut r = record((2024, 12, 3), "20");
        r.payee = Some(String::new());
        assert_eq!(render_record(&r), "D12/03/2024\nT20.00\n^\n");
    }

    #[test]
    fn test_render_document() {
        let records = vec![record((2024, 1, 1), "1"), record((2024, 1, 2), "-2.5")];
        let qif = render_qif(&records);
        assert!(qif.starts_with("!Type:Bank\nD01/01/2024\n"));
        assert_eq!(qif.matches("^\n").count(), 2);
        assert_eq!(render_qif(&[]), "!Type:Bank\n");
    }

    #[test]
    fn test_encode_utf8() {
        assert_eq!(encode("Peña €", OutputEncoding::Utf8), "Peña €".as_bytes());
    }

    #[test]
    fn test_encode_cp1252() {
        // € is 0x80 in cp1252; the arrow has no mapping
        assert_eq!(
            encode("Peña €→", OutputEncoding::Cp1252),
            vec![b'P', b'e', 0xF1, b'a', b' ', 0x80, b'?']
        );
    }

    #[test]
    fn test_encode_latin1() {
        assert_eq!(
            encode("Peña €", OutputEncoding::Iso8859_1),
            vec![b'P', b'e', 0xF1, b'a', b' ', b'?']
        );
    }

    #[test]
    fn test_write_qif() {
        let mut r = record((2024, 2, 29), "-3.10");
        r.memo = Some("Cafetería".into());
        let mut buf = Vec::new();
        write_qif(&[r], &mut buf, OutputEncoding::Iso8859_1).unwrap();
        assert_eq!(
            buf,
            b"!Type:Bank\nD02/29/2024\nT-3.10\nMCafeter\xEDa\n^\n".to_vec()
        );
    }
}
