//! OCR of Chase web/mobile account activity screenshots.
//!
//! Dates head a group ("Dec 03,2025 ..."); the lines under them inherit
//! that date until the next one. A line is a transaction when it carries a
//! `$amount` and a transaction word, which filters balance banners.

use std::collections::HashSet;
use std::sync::OnceLock;

use chrono::NaiveDate;
use regex::Regex;

use super::period::month_number;
use super::{collapse_ws, unclaimed_lines};
use crate::amount::parse_amount_token;
use crate::models::{Direction, NormalizedRow, ParseOutcome, StatementText};

const SOURCE: &str = "Chase Screenshot";
const ACCOUNT: &str = "Chase Checking (screenshot)";

fn date_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(Jan|Feb|Mar|Apr|May|Jun|Jul|Aug|Sep|Oct|Nov|Dec)\s+(\d{1,2}),\s*(\d{4})(.*)$")
            .expect("dashboard date pattern")
    })
}

fn keyword_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)\b(Card|ACH|Account transfer|POS|DEBIT|CREDIT|PAYMENT|PAYROLL|TRANSFER)\b")
            .expect("dashboard keyword pattern")
    })
}

fn income_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)\b(credit|deposit|payroll|refund)\b").expect("dashboard income pattern")
    })
}

fn dollar_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"-?\$[\d,]+\.\d{2}").expect("dashboard amount pattern"))
}

fn parse_date_line(line: &str) -> Option<(Option<NaiveDate>, &str)> {
    let caps = date_re().captures(line)?;
    let date = (|| {
        let month = month_number(caps.get(1)?.as_str())?;
        let day = caps.get(2)?.as_str().parse().ok()?;
        let year = caps.get(3)?.as_str().parse().ok()?;
        NaiveDate::from_ymd_opt(year, month, day)
    })();
    let rest = caps.get(4).map_or("", |m| m.as_str());
    Some((date, rest.trim()))
}

/// A line worth a row: has a `$amount` and a transaction word.
fn is_transaction_text(rest: &str) -> bool {
    dollar_re().is_match(rest) && keyword_re().is_match(rest)
}

pub fn detect(text: &str) -> bool {
    let mut dated = false;
    let mut transactional = false;
    for line in text.lines() {
        let line = line.trim();
        if let Some((Some(_), rest)) = parse_date_line(line) {
            dated = true;
            transactional |= is_transaction_text(rest);
        } else {
            transactional |= is_transaction_text(line);
        }
    }
    dated && transactional
}

/// Walk the text as `(line_no, date, rest)` for every transaction line that
/// has a date context.
fn transaction_lines(text: &str) -> Vec<(usize, NaiveDate, &str)> {
    let mut out = Vec::new();
    let mut current: Option<NaiveDate> = None;
    for (idx, raw) in text.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() {
            continue;
        }
        let rest = match parse_date_line(line) {
            Some((date, rest)) => {
                current = date;
                rest
            }
            None => line,
        };
        let Some(date) = current else {
            continue;
        };
        if is_transaction_text(rest) {
            out.push((idx + 1, date, rest));
        }
    }
    out
}

pub fn parse(doc: &StatementText) -> ParseOutcome {
    let notes = doc.provenance();
    let mut rows = Vec::new();
    let mut consumed = HashSet::new();

    for (line_no, date, rest) in transaction_lines(&doc.text) {
        let Some(raw_amount) = dollar_re().find(rest).map(|m| m.as_str()) else {
            continue;
        };
        let Some(token) = parse_amount_token(raw_amount) else {
            continue;
        };
        let amount = if token.explicit_sign {
            token.value
        } else if income_re().is_match(rest) {
            token.magnitude()
        } else {
            -token.magnitude()
        };
        let desc = collapse_ws(&dollar_re().replace_all(rest, " "));
        rows.push(NormalizedRow {
            date,
            amount,
            direction: Direction::from_amount(amount),
            source_system: SOURCE.to_string(),
            account_name: ACCOUNT.to_string(),
            merchant: desc.clone(),
            description: desc,
            category: String::new(),
            notes: notes.clone(),
        });
        consumed.insert(line_no);
    }

    ParseOutcome {
        parser: "chase_dashboard",
        rows,
        rejected: unclaimed_lines(doc, &consumed),
    }
}

pub fn count_candidates(text: &str) -> usize {
    transaction_lines(text).len()
}
