//! Description parsing: from free-form bank text to a memo/payee string
//!
//! Bank descriptions look like `"Pago en MERCADONA SA"` or
//! `"Bizum recibido de Juan Pérez"`. Parsing happens in three steps:
//!
//! 1. Strip a known transaction prefix (card payment, Bizum, transfer, refund).
//! 2. Look for an all-caps run at the start of what remains. The run is only
//!    trusted when it covers the whole remainder; a partial run such as the
//!    `"24"` in `"24 horas Supermercado"` is discarded and the full remainder
//!    is used instead.
//! 3. Collapse repeated whitespace.

use regex::Regex;
use tracing::debug;

use crate::error::Result;

/// Transaction subtypes recognised from the description prefix
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransactionKind {
    CardPayment,
    BizumReceived,
    BizumSent,
    TransferReceived,
    InternationalTransferSent,
    CardRefund,
}

impl TransactionKind {
    /// Leading word of the prefix, used as the memo tag in payee mode
    pub fn keyword(&self) -> &'static str {
        match self {
            Self::CardPayment => "Pago",
            Self::BizumReceived | Self::BizumSent => "Bizum",
            Self::TransferReceived | Self::InternationalTransferSent => "Transferencia",
            Self::CardRefund => "Devolución",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CardPayment => "card_payment",
            Self::BizumReceived => "bizum_received",
            Self::BizumSent => "bizum_sent",
            Self::TransferReceived => "transfer_received",
            Self::InternationalTransferSent => "international_transfer_sent",
            Self::CardRefund => "card_refund",
        }
    }
}

impl std::fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A prefix rule: the pattern must match at the start of the description,
/// including the whitespace that separates it from the rest
pub struct PrefixRule {
    pub kind: TransactionKind,
    pub pattern: &'static str,
}

/// Known prefixes, tried in order (case-insensitive)
pub const PREFIX_RULES: &[PrefixRule] = &[
    PrefixRule {
        kind: TransactionKind::CardPayment,
        pattern: r"Pago\s+en\s+",
    },
    PrefixRule {
        kind: TransactionKind::BizumReceived,
        pattern: r"Bizum\s+recibido(?:\s+de)?\s+",
    },
    PrefixRule {
        kind: TransactionKind::BizumSent,
        pattern: r"Bizum\s+enviado(?:\s+a)?\s+",
    },
    PrefixRule {
        kind: TransactionKind::TransferReceived,
        pattern: r"Transferencia\s+recibida(?:\s+de)?\s+",
    },
    PrefixRule {
        kind: TransactionKind::InternationalTransferSent,
        pattern: r"Transferencia\s+internacional\s+emitida\s+[A-Z]\d+\s+",
    },
    PrefixRule {
        kind: TransactionKind::CardRefund,
        pattern: r"Devolución\s+Tarjeta\s+",
    },
];

/// Characters allowed in an all-caps token
const CAPS_TOKEN: &str = r"^[A-ZÁÉÍÓÚÑ0-9.*/&\-]+$";

/// Outcome of the all-caps check on the remainder
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CapsMatch {
    /// The whole remainder is a run of all-caps tokens
    Complete(String),
    /// Only a leading part matched; the match is not trusted
    Partial(String),
    NoMatch,
}

/// Intermediate result of parsing one description
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedDescription {
    pub kind: Option<TransactionKind>,
    /// Description with the prefix removed and trimmed
    pub remaining_text: String,
    pub caps: CapsMatch,
    /// Final text to surface, after whitespace cleanup
    pub extracted: Option<String>,
}

struct CompiledPrefix {
    kind: TransactionKind,
    regex: Regex,
}

/// Compiled prefix table and all-caps token pattern
pub struct DescriptionParser {
    prefixes: Vec<CompiledPrefix>,
    caps_token: Regex,
    whitespace_run: Regex,
}

impl DescriptionParser {
    /// Parser with the built-in prefix table
    pub fn new() -> Result<Self> {
        Self::with_rules(PREFIX_RULES)
    }

    pub fn with_rules(rules: &[PrefixRule]) -> Result<Self> {
        let prefixes = rules
            .iter()
            .map(|rule| {
                Ok(CompiledPrefix {
                    kind: rule.kind,
                    regex: Regex::new(&format!("(?i)^(?:{})", rule.pattern))?,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            prefixes,
            caps_token: Regex::new(CAPS_TOKEN)?,
            whitespace_run: Regex::new(r"\s{2,}")?,
        })
    }

    /// Run all three steps on a description
    pub fn parse(&self, description: &str) -> ParsedDescription {
        let (kind, remaining_text) = self.strip_prefix(description);

        let caps = if remaining_text.is_empty() {
            debug!("Remaining text is empty");
            CapsMatch::NoMatch
        } else {
            self.match_caps(&remaining_text)
        };

        let extracted = match &caps {
            CapsMatch::Complete(run) => {
                debug!("Complete all-caps match: '{}'", run);
                Some(run.as_str())
            }
            CapsMatch::Partial(run) => {
                debug!(
                    "Partial all-caps match '{}', using full remainder '{}'",
                    run, remaining_text
                );
                Some(remaining_text.as_str())
            }
            CapsMatch::NoMatch if remaining_text.is_empty() => None,
            CapsMatch::NoMatch => {
                debug!("No all-caps match, using remainder '{}'", remaining_text);
                Some(remaining_text.as_str())
            }
        }
        .and_then(|text| self.collapse_whitespace(text));

        ParsedDescription {
            kind,
            remaining_text,
            caps,
            extracted,
        }
    }

    /// Remove the first matching prefix; without a match the description is kept whole
    pub fn strip_prefix(&self, description: &str) -> (Option<TransactionKind>, String) {
        for prefix in &self.prefixes {
            if let Some(m) = prefix.regex.find(description) {
                let remaining = description[m.end()..].trim().to_string();
                debug!(
                    "Prefix '{}' detected ({}), remaining '{}'",
                    m.as_str(),
                    prefix.kind,
                    remaining
                );
                return (Some(prefix.kind), remaining);
            }
        }
        debug!("No prefix detected in '{}'", description);
        (None, description.to_string())
    }

    /// Find the run of all-caps tokens at the start of `text`
    ///
    /// Tokens are whitespace-separated words made only of capital letters
    /// (accented vowels and Ñ included), digits and `. * / & -`.
    pub fn match_caps(&self, text: &str) -> CapsMatch {
        let mut end = None;
        let mut cursor = 0;

        for word in text.split_whitespace() {
            // Position of this word, searching forward from the previous one
            let start = match text[cursor..].find(word) {
                Some(offset) => cursor + offset,
                None => break,
            };
            // The run must start at the very beginning
            if end.is_none() && start != 0 {
                break;
            }
            if !self.caps_token.is_match(word) {
                break;
            }
            cursor = start + word.len();
            end = Some(cursor);
        }

        match end {
            None => CapsMatch::NoMatch,
            Some(end) => {
                let run = text[..end].trim().to_string();
                if end == text.len() {
                    CapsMatch::Complete(run)
                } else {
                    CapsMatch::Partial(run)
                }
            }
        }
    }

    /// Replace runs of two or more whitespace characters with one space and
    /// trim; single tabs or NBSPs are kept as they are. Empty -> None
    pub fn collapse_whitespace(&self, text: &str) -> Option<String> {
        let collapsed = self.whitespace_run.replace_all(text, " ");
        let collapsed = collapsed.trim();
        if collapsed.is_empty() {
            None
        } else {
            Some(collapsed.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parser() -> DescriptionParser {
        DescriptionParser::new().unwrap()
    }

    #[test]
    fn test_card_payment_with_caps_name() {
        let parsed = parser().parse("Pago en MERCADONA SA");
        assert_eq!(parsed.kind, Some(TransactionKind::CardPayment));
        assert_eq!(parsed.remaining_text, "MERCADONA SA");
        assert_eq!(parsed.caps, CapsMatch::Complete("MERCADONA SA".to_string()));
        assert_eq!(parsed.extracted.as_deref(), Some("MERCADONA SA"));
    }

    #[test]
    fn test_bizum_received_mixed_case() {
        let parsed = parser().parse("Bizum recibido de Juan Pérez");
        assert_eq!(parsed.kind, Some(TransactionKind::BizumReceived));
        assert_eq!(parsed.remaining_text, "Juan Pérez");
        assert_eq!(parsed.caps, CapsMatch::NoMatch);
        assert_eq!(parsed.extracted.as_deref(), Some("Juan Pérez"));
    }

    #[test]
    fn test_partial_caps_falls_back_to_remainder() {
        let parsed = parser().parse("Pago en 24 horas Supermercado");
        assert_eq!(parsed.caps, CapsMatch::Partial("24".to_string()));
        assert_eq!(parsed.extracted.as_deref(), Some("24 horas Supermercado"));
    }

    #[test]
    fn test_partial_caps_stops_at_first_mixed_word() {
        let caps = parser().match_caps("EL CORTE Inglés MADRID");
        assert_eq!(caps, CapsMatch::Partial("EL CORTE".to_string()));
    }

    #[test]
    fn test_caps_token_must_be_whole_word() {
        // "24horas" is one word and is not all-caps
        assert_eq!(parser().match_caps("24horas SUPER"), CapsMatch::NoMatch);
    }

    #[test]
    fn test_caps_symbols_and_accents() {
        let caps = parser().match_caps("AMAZON*MK12 EU/S.L. & CÍA-ÑU");
        assert_eq!(
            caps,
            CapsMatch::Complete("AMAZON*MK12 EU/S.L. & CÍA-ÑU".to_string())
        );
    }

    #[test]
    fn test_bizum_variants() {
        let p = parser();
        assert_eq!(
            p.strip_prefix("Bizum recibido Dennis"),
            (Some(TransactionKind::BizumReceived), "Dennis".to_string())
        );
        assert_eq!(
            p.strip_prefix("BIZUM ENVIADO A ANA LOPEZ"),
            (Some(TransactionKind::BizumSent), "ANA LOPEZ".to_string())
        );
        assert_eq!(
            p.strip_prefix("Bizum enviado Cena"),
            (Some(TransactionKind::BizumSent), "Cena".to_string())
        );
    }

    #[test]
    fn test_transfer_prefixes() {
        let p = parser();
        assert_eq!(
            p.strip_prefix("Transferencia recibida de ACME SL"),
            (Some(TransactionKind::TransferReceived), "ACME SL".to_string())
        );
        assert_eq!(
            p.strip_prefix("Transferencia internacional emitida X12345 John Smith"),
            (
                Some(TransactionKind::InternationalTransferSent),
                "John Smith".to_string()
            )
        );
    }

    #[test]
    fn test_refund_prefix_case_insensitive() {
        let parsed = parser().parse("DEVOLUCIÓN TARJETA ZARA ESPAÑA");
        assert_eq!(parsed.kind, Some(TransactionKind::CardRefund));
        assert_eq!(parsed.extracted.as_deref(), Some("ZARA ESPAÑA"));
    }

    #[test]
    fn test_no_prefix_keeps_description() {
        let parsed = parser().parse("Recibo Iberdrola Clientes");
        assert_eq!(parsed.kind, None);
        assert_eq!(parsed.remaining_text, "Recibo Iberdrola Clientes");
        assert_eq!(parsed.extracted.as_deref(), Some("Recibo Iberdrola Clientes"));
    }

    #[test]
    fn test_prefix_without_separator_is_not_stripped() {
        // Prefix patterns require whitespace after them
        let parsed = parser().parse("Pago en");
        assert_eq!(parsed.kind, None);
        assert_eq!(parsed.extracted.as_deref(), Some("Pago en"));
    }

    #[test]
    fn test_empty_description() {
        let parsed = parser().parse("");
        assert_eq!(parsed.caps, CapsMatch::NoMatch);
        assert_eq!(parsed.extracted, None);
    }

    #[test]
    fn test_whitespace_collapsed() {
        let parsed = parser().parse("Pago en Bar   Manolo    y  Hnos");
        assert_eq!(parsed.extracted.as_deref(), Some("Bar Manolo y Hnos"));

        let parsed = parser().parse("Pago en TALLERES   GARCIA");
        assert_eq!(
            parsed.caps,
            CapsMatch::Complete("TALLERES   GARCIA".to_string())
        );
        assert_eq!(parsed.extracted.as_deref(), Some("TALLERES GARCIA"));
    }

    #[test]
    fn test_collapse_whitespace() {
        let p = parser();
        assert_eq!(p.collapse_whitespace("  a  b "), Some("a b".to_string()));
        assert_eq!(p.collapse_whitespace(" \t "), None);
        assert_eq!(p.collapse_whitespace("a\t\u{a0}b"), Some("a b".to_string()));
    }

    #[test]
    fn test_single_whitespace_characters_kept() {
        let parsed = parser().parse("Recibo Bar\tPepe  y\u{a0}Hnos");
        assert_eq!(
            parsed.extracted.as_deref(),
            Some("Recibo Bar\tPepe y\u{a0}Hnos")
        );
    }

    #[test]
    fn test_keywords() {
        assert_eq!(TransactionKind::CardPayment.keyword(), "Pago");
        assert_eq!(TransactionKind::BizumSent.keyword(), "Bizum");
        assert_eq!(
            TransactionKind::InternationalTransferSent.keyword(),
            "Transferencia"
        );
        assert_eq!(TransactionKind::CardRefund.keyword(), "Devolución");
    }
}
