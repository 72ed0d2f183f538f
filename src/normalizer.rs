//! Layout-agnostic fallback: one line in, at most one row out.

use std::sync::OnceLock;

use chrono::NaiveDate;
use regex::Regex;

use crate::amount::{has_money, is_amount_token, last_money, parse_amount_token};
use crate::categorizer::{detect_source_and_account, guess_category};
use crate::direction::{is_transfer, DirectionContext, DirectionRules};
use crate::models::{
    Direction, FileKind, NormalizedRow, ParseOutcome, RejectReason, RejectedLine, StatementText,
};

pub const STATEMENT_SOURCE: &str = "Statement OCR";
pub const SCREENSHOT_SOURCE: &str = "Screenshot OCR";

fn date_token_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(?:\d{4}-\d{2}-\d{2}|\d{1,2}/\d{1,2}/(?:\d{4}|\d{2}))$")
            .expect("date token pattern")
    })
}

/// `YYYY-MM-DD`, `MM/DD/YYYY` or `MM/DD/YY` (two-digit years get a "20" prefix).
pub fn parse_date_token(token: &str) -> Option<NaiveDate> {
    if token.contains('-') {
        return NaiveDate::parse_from_str(token, "%Y-%m-%d").ok();
    }
    let mut parts = token.split('/');
    let month: u32 = parts.next()?.parse().ok()?;
    let day: u32 = parts.next()?.parse().ok()?;
    let year_raw = parts.next()?;
    let year: i32 = if year_raw.len() == 2 {
        format!("20{year_raw}").parse().ok()?
    } else {
        year_raw.parse().ok()?
    };
    NaiveDate::from_ymd_opt(year, month, day)
}

pub fn default_source(kind: FileKind) -> &'static str {
    match kind {
        FileKind::Image => SCREENSHOT_SOURCE,
        FileKind::Pdf | FileKind::Text => STATEMENT_SOURCE,
    }
}

/// Turn one OCR line into a row, or say why it could not be.
pub fn normalize_line(
    line: &str,
    file_name: &str,
    source: &str,
    rules: &DirectionRules,
) -> Result<NormalizedRow, RejectReason> {
    let tokens: Vec<&str> = line.split_whitespace().collect();

    let date_idx = tokens
        .iter()
        .position(|t| date_token_re().is_match(t))
        .ok_or(RejectReason::NoGenericMatch)?;

    let amount_idx = tokens
        .iter()
        .rposition(|t| is_amount_token(t))
        .filter(|idx| *idx > date_idx)
        .ok_or(RejectReason::NoGenericMatch)?;

    let date = parse_date_token(tokens[date_idx]).ok_or(RejectReason::BadDate)?;

    let description = tokens[date_idx + 1..amount_idx].join(" ");
    if description.trim().is_empty() {
        return Err(RejectReason::NoGenericMatch);
    }

    let token = parse_amount_token(tokens[amount_idx]).ok_or(RejectReason::BadAmount)?;
    let amount = rules.signed_amount(&token, &DirectionContext::new(&description));

    let direction = if is_transfer(&description) {
        Direction::Transfer
    } else {
        Direction::from_amount(amount)
    };

    let (source_system, account_name) = detect_source_and_account(line, file_name, source);
    let category = guess_category(&description);

    Ok(NormalizedRow {
        date,
        amount,
        direction,
        source_system,
        account_name,
        merchant: description.clone(),
        description,
        category,
        notes: format!("from {file_name}"),
    })
}

/// Run every line of `doc` through [`normalize_line`]. Lines that fail but
/// carry a money token become rejected lines.
pub fn parse_generic(doc: &StatementText, rules: &DirectionRules) -> ParseOutcome {
    let source = default_source(doc.kind);
    let mut outcome = ParseOutcome {
        parser: "generic",
        ..ParseOutcome::default()
    };

    for (idx, line) in doc.text.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        match normalize_line(line, &doc.file_name, source, rules) {
            Ok(row) => outcome.rows.push(row),
            Err(reason) => {
                if !has_money(line) {
                    continue;
                }
                outcome.rejected.push(RejectedLine {
                    file_name: doc.file_name.clone(),
                    line_no: idx + 1,
                    raw_text: line.trim_end().to_string(),
                    reason,
                    amount_text: last_money(line).map(|s| s.trim().to_string()),
                });
            }
        }
    }

    outcome
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rules() -> DirectionRules {
        DirectionRules::default()
    }

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_basic_line() {
        let row = normalize_line(
            "01/05/2024 CARD PURCHASE AMAZON 54.10",
            "scan_ocr.txt",
            STATEMENT_SOURCE,
            &rules(),
        )
        .unwrap();
        assert_eq!(row.date, ymd(2024, 1, 5));
        assert_eq!(row.amount, -54.10);
        assert_eq!(row.direction, Direction::Debit);
        assert_eq!(row.description, "CARD PURCHASE AMAZON");
        assert_eq!(row.merchant, row.description);
        assert_eq!(row.source_system, STATEMENT_SOURCE);
        assert_eq!(row.notes, "from scan_ocr.txt");
    }

    #[test]
    fn test_iso_and_short_year() {
        let row = normalize_line("2024-02-01 DIRECT DEPOSIT PAYROLL 1,200.00", "a.txt", STATEMENT_SOURCE, &rules())
            .unwrap();
        assert_eq!(row.date, ymd(2024, 2, 1));
        assert_eq!(row.amount, 1200.0);
        assert_eq!(row.direction, Direction::Credit);

        let row = normalize_line("3/7/24 REFUND STORE $12.00", "a.txt", STATEMENT_SOURCE, &rules()).unwrap();
        assert_eq!(row.date, ymd(2024, 3, 7));
        assert_eq!(row.amount, 12.0);
    }

    #[test]
    fn test_last_amount_wins() {
        let row = normalize_line(
            "01/05/2024 COFFEE 4.50 995.50",
            "a.txt",
            STATEMENT_SOURCE,
            &rules(),
        )
        .unwrap();
        assert_eq!(row.description, "COFFEE 4.50");
        assert_eq!(row.amount, -995.50);
    }

    #[test]
    fn test_transfer_tag_keeps_sign() {
        let row = normalize_line("01/09/2024 ZELLE TO JANE 40.00", "a.txt", STATEMENT_SOURCE, &rules()).unwrap();
        assert_eq!(row.direction, Direction::Transfer);
        assert_eq!(row.amount, -40.0);
        assert_eq!(row.category, "Transfer/Person-to-person");
    }

    #[test]
    fn test_explicit_sign_is_trusted() {
        let row = normalize_line("01/09/2024 PAYROLL ADJ 40.00-", "a.txt", STATEMENT_SOURCE, &rules()).unwrap();
        assert_eq!(row.amount, -40.0);
    }

    #[test]
    fn test_rejections() {
        let r = rules();
        assert_eq!(
            normalize_line("Total $42.10", "a.txt", STATEMENT_SOURCE, &r),
            Err(RejectReason::NoGenericMatch)
        );
        assert_eq!(
            normalize_line("42.10 01/05/2024 stuff", "a.txt", STATEMENT_SOURCE, &r),
            Err(RejectReason::NoGenericMatch)
        );
        assert_eq!(
            normalize_line("01/05/2024 42.10", "a.txt", STATEMENT_SOURCE, &r),
            Err(RejectReason::NoGenericMatch)
        );
        assert_eq!(
            normalize_line("13/45/2024 THING 42.10", "a.txt", STATEMENT_SOURCE, &r),
            Err(RejectReason::BadDate)
        );
        assert_eq!(
            normalize_line("01/05/2024 THING (42.10", "a.txt", STATEMENT_SOURCE, &r),
            Err(RejectReason::BadAmount)
        );
    }

    #[test]
    fn test_rejected_line_capture() {
        let doc = StatementText::new(
            "scan_ocr.txt",
            "Header line\nPaid to store $42.10\n01/05/2024 COFFEE 4.50\n",
            FileKind::Text,
        );
        let outcome = parse_generic(&doc, &rules());
        assert_eq!(outcome.rows.len(), 1);
        assert_eq!(outcome.rejected.len(), 1);
        let rej = &outcome.rejected[0];
        assert_eq!(rej.reason, RejectReason::NoGenericMatch);
        assert_eq!(rej.line_no, 2);
        assert_eq!(rej.amount_text.as_deref(), Some("$42.10"));
    }

    #[test]
    fn test_screenshot_source_for_images() {
        let doc = StatementText::new("shot_ocr.txt", "01/05/2024 COFFEE 4.50", FileKind::Image);
        let outcome = parse_generic(&doc, &rules());
        assert_eq!(outcome.rows[0].source_system, SCREENSHOT_SOURCE);
    }
}
