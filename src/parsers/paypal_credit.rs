//! PayPal Credit / PayPal Cashback (Synchrony) statements.
//!
//! ```text
//! Transaction details
//! Date Reference # Description           Amount
//! Payments                               -$29.00
//! 04/15 8521 PAYMENT - THANK YOU         -$29.00
//! Purchases and Other Debits              $49.03
//! 03/30 8521 PAYPAL *ALIPAYUSINC          $30.77
//! SHANGHAI CN
//! ```
//!
//! Rows are `MM/DD`; the year comes from "Payment due date MM/DD/YYYY".
//! A line with neither a date nor an amount continues the previous row.

use std::collections::HashSet;
use std::sync::OnceLock;

use chrono::NaiveDate;
use regex::Regex;

use super::{collapse_ws, is_date_prefixed, unclaimed_lines, ParseContext};
use crate::amount::{has_money, parse_amount_token, AmountToken};
use crate::direction::{DirectionContext, DirectionRules};
use crate::models::{Direction, NormalizedRow, ParseOutcome, StatementText};

const SOURCE: &str = "PayPal Credit";
const DETAILS_MARKER: &str = "Transaction details";
const STOP_MARKER: &str = "Cardholder news and information";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Payments,
    Purchases,
    Fees,
    Interest,
    Other,
}

impl Section {
    fn from_heading(line: &str) -> Option<Self> {
        let t = line.to_uppercase();
        if t.contains("PAYMENTS") {
            Some(Self::Payments)
        } else if t.contains("PURCHASES AND OTHER DEBITS") {
            Some(Self::Purchases)
        } else if t.contains("FEES") {
            Some(Self::Fees)
        } else if t.contains("INTEREST CHARGED") {
            Some(Self::Interest)
        } else {
            None
        }
    }

    /// Sign, direction and category for a row in this section. Rows outside
    /// any section have no layout signal, so they go through `rules`.
    fn apply(&self, token: &AmountToken, desc: &str, rules: &DirectionRules) -> (f64, Direction, String) {
        let magnitude = token.magnitude();
        match self {
            Self::Payments => (magnitude, Direction::Transfer, "Transfer:Card Payment".to_string()),
            Self::Purchases => (-magnitude, Direction::Debit, "Spending:Purchases".to_string()),
            Self::Fees => (-magnitude, Direction::Debit, "Fees:Card Fees".to_string()),
            Self::Interest => (-magnitude, Direction::Debit, "Fees:Interest".to_string()),
            Self::Other => {
                let amount = rules.signed_amount(token, &DirectionContext::new(desc));
                let category = if desc.to_uppercase().contains("CASHBACK") {
                    "Rewards/Cashback".to_string()
                } else {
                    String::new()
                };
                (amount, Direction::from_amount(amount), category)
            }
        }
    }
}

fn detail_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(concat!(
            r"^\s*(?P<month>\d{2})/(?P<day>\d{2})\s+",
            r"(?:(?P<reference>[0-9A-Z]*\d[0-9A-Z]{3,})\s+)?",
            r"(?P<desc>.*\S)\s+",
            r"(?P<amount>-?\$?\d[\d,]*\.\d{2})\s*$"
        ))
        .expect("paypal detail pattern")
    })
}

fn due_date_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"Payment due date\s+(\d{2})/(\d{2})/(\d{4})").expect("paypal due date pattern")
    })
}

pub fn detect(text: &str) -> bool {
    let t = text.to_uppercase();
    t.contains("PAYPAL") && t.contains("TRANSACTION DETAILS") && t.contains("ACCOUNT NUMBER")
}

/// `(due_year, due_month)` from "Payment due date MM/DD/YYYY".
fn due_date(text: &str) -> Option<(i32, u32)> {
    let caps = due_date_re().captures(text)?;
    Some((caps[3].parse().ok()?, caps[1].parse().ok()?))
}

/// Months after the due month belong to the previous year
/// (December charges on a January-due statement).
fn year_for(month: u32, due_year: i32, due_month: u32) -> i32 {
    if month > due_month {
        due_year - 1
    } else {
        due_year
    }
}

/// Body lines after the details header row, up to the stop marker.
fn detail_lines(text: &str) -> Vec<(usize, &str)> {
    let lines: Vec<&str> = text.lines().collect();
    let Some(start) = lines.iter().position(|l| l.contains(DETAILS_MARKER)) else {
        return Vec::new();
    };
    let mut idx = start + 1;
    while idx < lines.len() {
        let header = lines[idx].contains("Date") && lines[idx].contains("Amount");
        idx += 1;
        if header {
            break;
        }
    }
    lines
        .iter()
        .enumerate()
        .skip(idx)
        .take_while(|(_, l)| !l.contains(STOP_MARKER))
        .map(|(i, l)| (i + 1, *l))
        .collect()
}

pub fn parse(doc: &StatementText, ctx: &ParseContext) -> ParseOutcome {
    let (due_year, due_month) = due_date(&doc.text).unwrap_or((ctx.fallback_year, 12));
    let notes = format!("{} (PayPal credit detail)", doc.provenance());

    let mut rows: Vec<NormalizedRow> = Vec::new();
    let mut consumed = HashSet::new();
    let mut section = Section::Other;
    // index into `rows` of the row a continuation line extends
    let mut last_row: Option<usize> = None;

    for (line_no, line) in detail_lines(&doc.text) {
        if let Some(caps) = detail_re().captures(line) {
            let (Ok(month), Ok(day)) = (caps["month"].parse::<u32>(), caps["day"].parse::<u32>())
            else {
                continue;
            };
            let Some(token) = parse_amount_token(&caps["amount"]) else {
                continue;
            };
            let Some(date) = NaiveDate::from_ymd_opt(year_for(month, due_year, due_month), month, day)
            else {
                continue;
            };
            let desc = collapse_ws(&caps["desc"]);
            let (amount, direction, category) = section.apply(&token, &desc, ctx.rules);
            rows.push(NormalizedRow {
                date,
                amount,
                direction,
                source_system: SOURCE.to_string(),
                account_name: SOURCE.to_string(),
                merchant: desc.clone(),
                description: desc,
                category,
                notes: notes.clone(),
            });
            last_row = Some(rows.len() - 1);
            consumed.insert(line_no);
            continue;
        }

        if let Some(next) = Section::from_heading(line) {
            section = next;
            last_row = None;
            continue;
        }

        let stripped = line.trim();
        if stripped.is_empty() || is_date_prefixed(stripped) || has_money(stripped) {
            continue;
        }
        if let Some(row) = last_row.and_then(|i| rows.get_mut(i)) {
            row.description = format!("{} {}", row.description, stripped);
            row.merchant = row.description.clone();
        }
    }

    ParseOutcome {
        parser: "paypal_credit",
        rows,
        rejected: unclaimed_lines(doc, &consumed),
    }
}

pub fn count_candidates(text: &str) -> usize {
    detail_lines(text)
        .iter()
        .filter(|(_, line)| is_date_prefixed(line) && has_money(line))
        .count()
}
