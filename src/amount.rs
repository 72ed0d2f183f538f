//! Money tokens as they come out of OCR: `$1,234.56`, `(68.02)`, `68.02-`,
//! `-68.02`, with Unicode minus look-alikes folded to ASCII.

use std::sync::OnceLock;

use regex::Regex;

/// A parsed money token. Every sign cue on the surface form collapses into
/// a single sign on `value`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AmountToken {
    pub value: f64,
    /// The surface form carried `-`, `+`, a trailing `-` or parentheses.
    pub explicit_sign: bool,
}

impl AmountToken {
    pub fn magnitude(&self) -> f64 {
        self.value.abs()
    }
}

const MINUS_LOOKALIKES: [char; 2] = ['\u{2212}', '\u{FF0D}'];

fn fold_minus(raw: &str) -> String {
    raw.chars()
        .map(|c| if MINUS_LOOKALIKES.contains(&c) { '-' } else { c })
        .collect()
}

/// Parse a single money token. Returns `None` when nothing numeric is left
/// after the punctuation is stripped.
pub fn parse_amount_token(raw: &str) -> Option<AmountToken> {
    let folded = fold_minus(raw);
    let mut s = folded.trim();
    let mut negative = false;
    let mut explicit_sign = false;

    // Peel markers from the outside in until none are left, so "$(68.02)-"
    // and "-$68.02" both reduce to the bare digits.
    loop {
        if let Some(rest) = s.strip_suffix('-') {
            negative = true;
            explicit_sign = true;
            s = rest.trim_end();
        } else if let Some(inner) = s.strip_prefix('(').and_then(|v| v.strip_suffix(')')) {
            negative = true;
            explicit_sign = true;
            s = inner.trim();
        } else if let Some(rest) = s.strip_prefix('-') {
            negative = true;
            explicit_sign = true;
            s = rest.trim_start();
        } else if let Some(rest) = s.strip_prefix('+') {
            explicit_sign = true;
            s = rest.trim_start();
        } else if let Some(rest) = s.strip_prefix('$') {
            s = rest.trim_start();
        } else {
            break;
        }
    }

    let digits = s.replace(',', "");
    if !digits.chars().any(|c| c.is_ascii_digit()) {
        return None;
    }
    if !digits.chars().all(|c| c.is_ascii_digit() || c == '.') {
        return None;
    }
    let magnitude: f64 = digits.parse().ok()?;
    let value = if negative && magnitude != 0.0 {
        -magnitude
    } else {
        magnitude
    };
    Some(AmountToken {
        value,
        explicit_sign,
    })
}

/// Full-token amount pattern used by the whitespace tokenizer.
fn amount_token_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^[+\-\x{2212}\x{FF0D}]?\$?\(?[\-\x{2212}\x{FF0D}]?\$?\d[\d,]*\.\d{2}\)?[\-\x{2212}\x{FF0D}]?$")
            .expect("amount token pattern")
    })
}

/// Money-shaped substring anywhere in a line.
fn money_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"[\-\x{2212}\x{FF0D}]?\$?\(?[\-\x{2212}\x{FF0D}]?\$?\d[\d,]*\.\d{2}\)?[\-\x{2212}\x{FF0D}]?")
            .expect("money pattern")
    })
}

pub fn is_amount_token(token: &str) -> bool {
    amount_token_re().is_match(token)
}

pub fn has_money(line: &str) -> bool {
    money_re().is_match(line)
}

pub fn last_money(line: &str) -> Option<&str> {
    money_re().find_iter(line).last().map(|m| m.as_str())
}

pub fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn value(raw: &str) -> f64 {
        parse_amount_token(raw).unwrap().value
    }

    #[test]
    fn test_negative_surface_forms() {
        assert_eq!(value("68.02-"), -68.02);
        assert_eq!(value("(68.02)"), -68.02);
        assert_eq!(value("-68.02"), -68.02);
        assert_eq!(value("$68.02-"), -68.02);
        assert_eq!(value("-$50.00"), -50.0);
        assert_eq!(value("$(68.02)"), -68.02);
    }

    #[test]
    fn test_positive_surface_forms() {
        assert_eq!(value("68.02"), 68.02);
        assert_eq!(value("$68.02"), 68.02);
        assert_eq!(value("$1,234.56"), 1234.56);
        assert_eq!(value("+12.00"), 12.0);
    }

    #[test]
    fn test_sign_markers_do_not_multiply() {
        assert_eq!(value("(68.02)-"), -68.02);
        assert_eq!(value("-(68.02)"), -68.02);
        assert_eq!(value("-68.02-"), -68.02);
    }

    #[test]
    fn test_unicode_minus() {
        assert_eq!(value("\u{2212}68.02"), -68.02);
        assert_eq!(value("\u{FF0D}68.02"), -68.02);
        assert_eq!(value("68.02\u{2212}"), -68.02);
    }

    #[test]
    fn test_explicit_sign_flag() {
        assert!(!parse_amount_token("54.10").unwrap().explicit_sign);
        assert!(!parse_amount_token("$54.10").unwrap().explicit_sign);
        assert!(parse_amount_token("54.10-").unwrap().explicit_sign);
        assert!(parse_amount_token("+54.10").unwrap().explicit_sign);
    }

    #[test]
    fn test_zero_keeps_no_sign() {
        let tok = parse_amount_token("(0.00)").unwrap();
        assert_eq!(tok.value, 0.0);
        assert!(tok.value.is_sign_positive());
    }

    #[test]
    fn test_not_an_amount() {
        assert_eq!(parse_amount_token("$"), None);
        assert_eq!(parse_amount_token("(-)"), None);
        assert_eq!(parse_amount_token("abc"), None);
        assert_eq!(parse_amount_token(""), None);
        assert_eq!(parse_amount_token("12a.00"), None);
    }

    #[test]
    fn test_token_shapes() {
        assert!(is_amount_token("$1,234.56"));
        assert!(is_amount_token("(68.02)"));
        assert!(is_amount_token("68.02-"));
        assert!(is_amount_token("-$5.00"));
        assert!(!is_amount_token("2024-01-05"));
        assert!(!is_amount_token("01/05/2024"));
        assert!(!is_amount_token("68"));
    }

    #[test]
    fn test_money_scanning() {
        let line = "01/05 Card Purchase Amazon 54.10 1,245.90";
        assert_eq!(last_money(line), Some("1,245.90"));
        assert!(has_money("Total $42.10"));
        assert!(!has_money("no money here 12"));
    }

    #[test]
    fn test_round_cents() {
        assert_eq!(round_cents(104.499999999), 104.5);
        assert_eq!(round_cents(-0.004), 0.0);
    }
}
