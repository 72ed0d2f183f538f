//! Capital One card statements.
//!
//! Two tables, each introduced by a cardholder heading:
//!   JANE DOE #0728: Payments, Credits and Adjustments
//!   Trans Date Post Date Description Amount
//!   Dec 14 Dec 14 CAPITAL ONE MOBILE PYMT -$150.00
//!   JANE DOE #0728: Transactions
//!   Dec 12 Dec 13 STARBUCKS STORE 123 $5.75
//!   Total Transactions for This Period $5.75
//!
//! Signs come from the table, never from keywords.

use std::collections::HashSet;
use std::sync::OnceLock;

use chrono::NaiveDate;
use regex::Regex;

use super::period::{month_number, StatementPeriod};
use super::{collapse_ws, unclaimed_lines, ParseContext};
use crate::amount::parse_amount_token;
use crate::categorizer::guess_category;
use crate::models::{Direction, NormalizedRow, ParseOutcome, StatementText};

const SOURCE: &str = "Capital One";
const PAYMENTS_HEADING: &str = "Payments, Credits and Adjustments";
const TRANSACTIONS_HEADING: &str = "Transactions";
const COLUMN_HEADER: &str = "Trans Date Post Date Description Amount";
const CARD_PAYMENT_CATEGORY: &str = "Transfer:Card Payment";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Payments,
    Transactions,
}

fn line_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(concat!(
            r"^\s*(?P<mon>[A-Za-z]{3,9})\s+(?P<day>\d{1,2})\s+",
            r"[A-Za-z]{3,9}\s+\d{1,2}\s+",
            r"(?P<desc>.+?)\s+",
            r"(?P<amount>-?\s*\$?\d[\d,]*\.\d{2})\s*$"
        ))
        .expect("capital one line pattern")
    })
}

fn account_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)(?:#(\d{4}):|ending in (\d{4}))").expect("capital one account pattern")
    })
}

pub fn detect(text: &str) -> bool {
    text.contains(PAYMENTS_HEADING)
        && (text.contains("Capital One") || text.to_ascii_lowercase().contains("capitalone"))
}

fn account_name(text: &str) -> String {
    account_re()
        .captures(text)
        .and_then(|caps| caps.get(1).or_else(|| caps.get(2)))
        .map(|m| format!("Capital One {}", m.as_str()))
        .unwrap_or_else(|| SOURCE.to_string())
}

/// A section heading line, e.g. "JANE DOE #0728: Transactions".
fn heading(line: &str) -> Option<Section> {
    let s = line.trim();
    let tail = s.rsplit_once(':').map_or(s, |(_, t)| t.trim());
    if tail == PAYMENTS_HEADING {
        Some(Section::Payments)
    } else if tail == TRANSACTIONS_HEADING {
        Some(Section::Transactions)
    } else {
        None
    }
}

fn ends_section(line: &str) -> bool {
    let s = line.trim_start();
    s.starts_with("Total Transactions") || s.starts_with("Total Fees")
}

/// Walk both tables, yielding `(line_no, section, line)` for body lines.
fn table_lines(text: &str) -> Vec<(usize, Section, &str)> {
    let mut out = Vec::new();
    let mut section = None;
    for (idx, line) in text.lines().enumerate() {
        if let Some(next) = heading(line) {
            section = Some(next);
            continue;
        }
        let Some(current) = section else {
            continue;
        };
        if ends_section(line) {
            section = None;
            continue;
        }
        if line.trim().is_empty() || line.trim_start().starts_with(COLUMN_HEADER) {
            continue;
        }
        out.push((idx + 1, current, line));
    }
    out
}

pub fn parse(doc: &StatementText, ctx: &ParseContext) -> ParseOutcome {
    let period = StatementPeriod::find_dash(&doc.text);
    let account = account_name(&doc.text);
    let notes = doc.provenance();

    let mut rows = Vec::new();
    let mut consumed = HashSet::new();

    for (line_no, section, line) in table_lines(&doc.text) {
        let Some(caps) = line_re().captures(line) else {
            continue;
        };
        let Some(month) = month_number(&caps["mon"]) else {
            continue;
        };
        let Ok(day) = caps["day"].parse::<u32>() else {
            continue;
        };
        let Some(token) = parse_amount_token(&caps["amount"].replace(' ', "")) else {
            continue;
        };
        let year = period.map_or(ctx.fallback_year, |p| p.year_for_month(month));
        let Some(date) = NaiveDate::from_ymd_opt(year, month, day) else {
            continue;
        };

        let desc = collapse_ws(&caps["desc"]);
        let (amount, direction, category) = match section {
            Section::Payments => (
                token.magnitude(),
                Direction::Credit,
                CARD_PAYMENT_CATEGORY.to_string(),
            ),
            Section::Transactions => (-token.magnitude(), Direction::Debit, guess_category(&desc)),
        };

        rows.push(NormalizedRow {
            date,
            amount,
            direction,
            source_system: SOURCE.to_string(),
            account_name: account.clone(),
            merchant: desc.clone(),
            description: desc,
            category,
            notes: notes.clone(),
        });
        consumed.insert(line_no);
    }

    ParseOutcome {
        parser: "capital_one",
        rows,
        rejected: unclaimed_lines(doc, &consumed),
    }
}

pub fn count_candidates(text: &str) -> usize {
    table_lines(text)
        .iter()
        .filter(|(_, _, line)| super::is_date_prefixed(line))
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::direction::DirectionRules;
    use crate::models::FileKind;

    const STATEMENT: &str = "\
Capital One Platinum Mastercard ending in 0728
Dec 10, 2023 - Jan 09, 2024 | 31 days in Billing Cycle

JANE DOE #0728: Payments, Credits and Adjustments
Trans Date Post Date Description Amount
Dec 14 Dec 14 CAPITAL ONE MOBILE PYMT -$150.00
Total Transactions for This Period $150.00

JANE DOE #0728: Transactions
Trans Date Post Date Description Amount
Dec 12 Dec 13 STARBUCKS STORE 123 $5.75
Jan 02 Jan 03 NETFLIX.COM $15.49
Jan 04 Jan 05 WEIRD ROW WITHOUT AMOUNT
Total Transactions for This Period $21.24
Jan 06 Jan 07 AFTER TOTAL $1.00
";

    fn run(text: &str) -> ParseOutcome {
        let rules = DirectionRules::default();
        let ctx = ParseContext {
            rules: &rules,
            fallback_year: 2020,
        };
        parse(&StatementText::new("capone_ocr.txt", text, FileKind::Text), &ctx)
    }

    #[test]
    fn test_detect() {
        assert!(detect(STATEMENT));
        assert!(!detect("Payments, Credits and Adjustments only"));
    }

    #[test]
    fn test_tables_and_signs() {
        let out = run(STATEMENT);
        assert_eq!(out.rows.len(), 3);

        let payment = &out.rows[0];
        assert_eq!(payment.amount, 150.0);
        assert_eq!(payment.direction, Direction::Credit);
        assert_eq!(payment.category, "Transfer:Card Payment");
        assert_eq!(payment.date, NaiveDate::from_ymd_opt(2023, 12, 14).unwrap());

        let coffee = &out.rows[1];
        assert_eq!(coffee.amount, -5.75);
        assert_eq!(coffee.direction, Direction::Debit);
        assert_eq!(coffee.category, "Food/Coffee");

        let netflix = &out.rows[2];
        assert_eq!(netflix.date, NaiveDate::from_ymd_opt(2024, 1, 2).unwrap());
        assert_eq!(netflix.account_name, "Capital One 0728");
    }

    #[test]
    fn test_rows_after_total_are_not_taken() {
        let out = run(STATEMENT);
        assert!(out.rows.iter().all(|r| r.description != "AFTER TOTAL"));
        let rejected: Vec<_> = out.rejected.iter().map(|r| r.raw_text.as_str()).collect();
        assert_eq!(rejected, vec!["Jan 06 Jan 07 AFTER TOTAL $1.00"]);
    }

    #[test]
    fn test_candidates() {
        assert_eq!(count_candidates(STATEMENT), 4);
    }
}
