//! Chase checking statements (pdftotext layout).
//!
//! Transactions live between marker lines:
//!   *start*transaction detail
//!   12/20       Card Purchase 12/19 Target T-1234         -54.10      945.90
//!   *end*transaction detail
//!
//! Rows are `MM/DD`; the year comes from the statement period
//! ("December 15, 2023 through January 16, 2024").

use std::collections::HashSet;
use std::sync::OnceLock;

use chrono::NaiveDate;
use regex::Regex;

use super::period::{StatementPeriod, YearTracker};
use super::{collapse_ws, detail_blocks, is_summary_row, unclaimed_lines, ParseContext};
use crate::amount::{last_money, parse_amount_token};
use crate::categorizer::guess_category;
use crate::direction::{is_transfer, DirectionContext, DirectionRules};
use crate::models::{Direction, NormalizedRow, ParseOutcome, StatementText};

pub const BLOCK_START: &str = "*start*transaction detail";
pub const BLOCK_END: &str = "*end*";

const SOURCE: &str = "Chase";
const PAYROLL_CATEGORY: &str = "Income:Payroll";

fn line_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(concat!(
            r"^\s*(?P<month>\d{2})/(?P<day>\d{2})\s+",
            r"(?P<desc>.+?)\s+",
            r"(?P<amount>[-(]?\$?\d[\d,]*\.\d{2}\)?-?)\s+",
            r"(?P<balance>[-(]?\$?\d[\d,]*\.\d{2}\)?-?)\s*$"
        ))
        .expect("chase line pattern")
    })
}

fn payroll_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(concat!(
            r"^\s*(?P<month>\d{2})/(?P<day>\d{2})\s+",
            r"(?P<desc>.+?\bDirect Dep\b.*?)\s+",
            r"(?P<amount>-?\$?\d[\d,]*\.\d{2})\s+",
            r"(?P<balance>-?\$?\d[\d,]*\.\d{2})\s*$"
        ))
        .expect("chase payroll pattern")
    })
}

fn candidate_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\s*\d{2}/\d{2}\s+(.+)$").expect("chase candidate pattern"))
}

fn account_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)account\s+number:?\s*[0-9x*\- ]*?(\d{4})\b").expect("chase account pattern")
    })
}

pub fn detect(text: &str) -> bool {
    text.contains(BLOCK_START)
}

fn account_name(text: &str) -> String {
    account_re()
        .captures(text)
        .map(|caps| format!("Chase {}", &caps[1]))
        .unwrap_or_default()
}

struct RowBuilder<'a> {
    rules: &'a DirectionRules,
    account: String,
    notes: String,
}

impl RowBuilder<'_> {
    fn build(
        &self,
        date: NaiveDate,
        desc: &str,
        amount_raw: &str,
        balances: (Option<f64>, Option<f64>),
        category: Option<&str>,
        notes: &str,
    ) -> Option<NormalizedRow> {
        let token = parse_amount_token(amount_raw)?;
        let ctx = DirectionContext::new(desc).with_balances(balances.0, balances.1);
        let amount = self.rules.signed_amount(&token, &ctx);
        let direction = if is_transfer(desc) {
            Direction::Transfer
        } else {
            Direction::from_amount(amount)
        };
        Some(NormalizedRow {
            date,
            amount,
            direction,
            source_system: SOURCE.to_string(),
            account_name: self.account.clone(),
            merchant: desc.to_string(),
            description: desc.to_string(),
            category: category.map_or_else(|| guess_category(desc), str::to_string),
            notes: notes.to_string(),
        })
    }
}

pub fn parse(doc: &StatementText, ctx: &ParseContext) -> ParseOutcome {
    let period = StatementPeriod::find_through(&doc.text);
    let mut years = match period {
        Some(p) => YearTracker::new(p),
        None => YearTracker::fixed(ctx.fallback_year),
    };
    let builder = RowBuilder {
        rules: ctx.rules,
        account: account_name(&doc.text),
        notes: doc.provenance(),
    };

    let mut rows = Vec::new();
    let mut consumed = HashSet::new();

    for block in detail_blocks(&doc.text) {
        let mut running_balance: Option<f64> = None;
        for (line_no, line) in block {
            if line.contains("Beginning Balance") {
                running_balance = last_money(line)
                    .and_then(parse_amount_token)
                    .map(|t| t.value);
                consumed.insert(line_no);
                continue;
            }
            let Some(caps) = line_re().captures(line) else {
                continue;
            };
            let desc = collapse_ws(&caps["desc"]);
            if is_summary_row(&desc) {
                consumed.insert(line_no);
                continue;
            }
            let (Ok(month), Ok(day)) = (caps["month"].parse::<u32>(), caps["day"].parse::<u32>())
            else {
                continue;
            };
            let year = years.observe(month);
            let Some(date) = NaiveDate::from_ymd_opt(year, month, day) else {
                continue;
            };
            let balance = parse_amount_token(&caps["balance"]).map(|t| t.value);
            if let Some(row) = builder.build(
                date,
                &desc,
                &caps["amount"],
                (running_balance, balance),
                None,
                &builder.notes,
            ) {
                rows.push(row);
                consumed.insert(line_no);
            }
            running_balance = balance;
        }
    }

    // Payroll deposits that the OCR layout pushed outside the marked block.
    let blocked: HashSet<usize> = detail_blocks(&doc.text)
        .into_iter()
        .flatten()
        .map(|(line_no, _)| line_no)
        .collect();
    let recovered_notes = format!("{} (payroll line outside detail block)", doc.provenance());
    for (idx, line) in doc.text.lines().enumerate() {
        let line_no = idx + 1;
        if blocked.contains(&line_no) {
            continue;
        }
        let Some(caps) = payroll_re().captures(line) else {
            continue;
        };
        let (Ok(month), Ok(day)) = (caps["month"].parse::<u32>(), caps["day"].parse::<u32>()) else {
            continue;
        };
        let year = match period {
            Some(p) => p.year_for_month(month),
            None => years.current_year(),
        };
        let Some(date) = NaiveDate::from_ymd_opt(year, month, day) else {
            continue;
        };
        let desc = collapse_ws(&caps["desc"]);
        let Some(row) = builder.build(
            date,
            &desc,
            &caps["amount"],
            (None, None),
            Some(PAYROLL_CATEGORY),
            &recovered_notes,
        ) else {
            continue;
        };
        consumed.insert(line_no);
        let already = rows.iter().any(|r| {
            r.date == row.date
                && (r.amount - row.amount).abs() < 0.005
                && r.description.eq_ignore_ascii_case(&row.description)
        });
        if !already {
            rows.push(row);
        }
    }

    let rejected = unclaimed_lines(doc, &consumed);
    ParseOutcome {
        parser: "chase_detail",
        rows,
        rejected,
    }
}

/// Date-prefixed lines inside the marked blocks, minus balance and total rows.
pub fn count_candidates(text: &str) -> usize {
    detail_blocks(text)
        .iter()
        .flatten()
        .filter(|(_, line)| {
            candidate_re()
                .captures(line)
                .is_some_and(|caps| !is_summary_row(&caps[1]))
        })
        .count()
}
