pub mod capital_one;
pub mod chase;
pub mod chase_dashboard;
pub mod paypal_credit;
pub mod period;

use std::collections::HashSet;
use std::sync::OnceLock;

use regex::Regex;

use crate::amount::{has_money, last_money};
use crate::direction::DirectionRules;
use crate::models::{FileKind, ParseOutcome, RejectReason, RejectedLine, StatementText};
use crate::normalizer::{self, parse_date_token};
use period::month_number;

/// What every parser needs besides the text itself.
pub struct ParseContext<'a> {
    pub rules: &'a DirectionRules,
    /// Used when a layout needs a year and the text does not give one.
    pub fallback_year: i32,
}

// ---------------------------------------------------------------------------
// Parser kinds, tried in priority order
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParserKind {
    ChaseDetail,
    CapitalOne,
    PayPalCredit,
    ChaseDashboard,
    Generic,
}

impl ParserKind {
    pub fn key(&self) -> &'static str {
        match self {
            Self::ChaseDetail => "chase_detail",
            Self::CapitalOne => "capital_one",
            Self::PayPalCredit => "paypal_credit",
            Self::ChaseDashboard => "chase_dashboard",
            Self::Generic => "generic",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::ChaseDetail => "Chase transaction detail",
            Self::CapitalOne => "Capital One statement",
            Self::PayPalCredit => "PayPal Credit statement",
            Self::ChaseDashboard => "Chase dashboard screenshot",
            Self::Generic => "Generic line normalizer",
        }
    }

    /// Whether the issuer signature is present. Dashboard screenshots only
    /// come from image uploads. The generic normalizer accepts everything.
    pub fn detect(&self, doc: &StatementText) -> bool {
        let text = &doc.text;
        match self {
            Self::ChaseDetail => chase::detect(text),
            Self::CapitalOne => capital_one::detect(text),
            Self::PayPalCredit => paypal_credit::detect(text),
            Self::ChaseDashboard => doc.kind == FileKind::Image && chase_dashboard::detect(text),
            Self::Generic => true,
        }
    }

    /// `None` means the layout does not own this text and the next parser
    /// should be tried.
    pub fn parse(&self, doc: &StatementText, ctx: &ParseContext) -> Option<ParseOutcome> {
        if !self.detect(doc) {
            return None;
        }
        let outcome = match self {
            Self::ChaseDetail => chase::parse(doc, ctx),
            Self::CapitalOne => capital_one::parse(doc, ctx),
            Self::PayPalCredit => paypal_credit::parse(doc, ctx),
            Self::ChaseDashboard => chase_dashboard::parse(doc),
            Self::Generic => normalizer::parse_generic(doc, ctx.rules),
        };
        Some(ParseOutcome {
            parser: self.key(),
            ..outcome
        })
    }

    /// Transaction-shaped lines inside this layout's table region.
    pub fn count_candidates(&self, text: &str) -> usize {
        match self {
            Self::ChaseDetail => chase::count_candidates(text),
            Self::CapitalOne => capital_one::count_candidates(text),
            Self::PayPalCredit => paypal_credit::count_candidates(text),
            Self::ChaseDashboard => chase_dashboard::count_candidates(text),
            Self::Generic => count_generic_candidates(text),
        }
    }
}

pub const ALL_PARSERS: &[ParserKind] = &[
    ParserKind::ChaseDetail,
    ParserKind::CapitalOne,
    ParserKind::PayPalCredit,
    ParserKind::ChaseDashboard,
    ParserKind::Generic,
];

pub fn get_by_key(key: &str) -> Option<ParserKind> {
    ALL_PARSERS.iter().find(|p| p.key() == key).copied()
}

/// The parser that owns `doc`: first issuer signature that matches,
/// otherwise the generic normalizer.
pub fn get_for(doc: &StatementText) -> ParserKind {
    ALL_PARSERS
        .iter()
        .find(|p| p.detect(doc))
        .copied()
        .unwrap_or(ParserKind::Generic)
}

/// Rows and rejected lines for one artifact, from exactly one parser.
pub fn parse_statement(doc: &StatementText, ctx: &ParseContext) -> ParseOutcome {
    ALL_PARSERS
        .iter()
        .find_map(|p| p.parse(doc, ctx))
        .unwrap_or_else(|| normalizer::parse_generic(doc, ctx.rules))
}

// ---------------------------------------------------------------------------
// Shared helpers
// ---------------------------------------------------------------------------

pub(crate) const SUMMARY_PREFIXES: &[&str] = &["Beginning Balance", "Ending Balance", "Total "];

pub(crate) fn is_summary_row(description: &str) -> bool {
    let d = description.trim_start();
    SUMMARY_PREFIXES.iter().any(|p| d.starts_with(p))
}

pub(crate) fn collapse_ws(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn date_prefix_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^\s*(?:\d{1,2}/\d{1,2}(?:/\d{2,4})?|\d{4}-\d{2}-\d{2}|([A-Za-z]{3,9})\.?\s+\d{1,2})\b")
            .expect("date prefix pattern")
    })
}

/// Line opens with `MM/DD`, an ISO date or `Mon DD`.
pub(crate) fn is_date_prefixed(line: &str) -> bool {
    match date_prefix_re().captures(line) {
        Some(caps) => caps.get(1).map_or(true, |m| month_number(m.as_str()).is_some()),
        None => false,
    }
}

/// Date-prefixed lines that carry money but that the owning issuer parser
/// did not consume. `consumed` holds 1-based line numbers.
pub(crate) fn unclaimed_lines(doc: &StatementText, consumed: &HashSet<usize>) -> Vec<RejectedLine> {
    doc.text
        .lines()
        .enumerate()
        .map(|(idx, line)| (idx + 1, line))
        .filter(|(line_no, line)| {
            !consumed.contains(line_no) && is_date_prefixed(line) && has_money(line)
        })
        .map(|(line_no, line)| RejectedLine {
            file_name: doc.file_name.clone(),
            line_no,
            raw_text: line.trim_end().to_string(),
            reason: RejectReason::NoIssuerMatch,
            amount_text: last_money(line).map(|s| s.trim().to_string()),
        })
        .collect()
}

/// A `*start*transaction detail` ... `*end*` region as `(line_no, line)`
/// pairs. An unterminated region runs to the end of the text.
pub(crate) fn detail_blocks(text: &str) -> Vec<Vec<(usize, &str)>> {
    let mut blocks = Vec::new();
    let mut current: Option<Vec<(usize, &str)>> = None;
    for (idx, line) in text.lines().enumerate() {
        if line.contains(chase::BLOCK_START) {
            if let Some(block) = current.take() {
                blocks.push(block);
            }
            current = Some(Vec::new());
            continue;
        }
        if current.is_some() && line.trim_start().starts_with(chase::BLOCK_END) {
            blocks.extend(current.take());
            continue;
        }
        if let Some(block) = current.as_mut() {
            block.push((idx + 1, line));
        }
    }
    if let Some(block) = current {
        blocks.push(block);
    }
    blocks
}

/// Generic layout: the whole file is the region; a candidate opens with a
/// full date token and is not a balance or total row.
fn count_generic_candidates(text: &str) -> usize {
    text.lines()
        .filter(|line| {
            let mut tokens = line.split_whitespace();
            match tokens.next() {
                Some(first) if parse_date_token(first).is_some() => {
                    !is_summary_row(&tokens.collect::<Vec<_>>().join(" "))
                }
                _ => false,
            }
        })
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx(rules: &DirectionRules) -> ParseContext<'_> {
        ParseContext {
            rules,
            fallback_year: 2024,
        }
    }

    fn text_doc(text: &str) -> StatementText {
        StatementText::new("scan_ocr.txt", text, FileKind::Text)
    }

    #[test]
    fn test_generic_is_last_resort() {
        assert_eq!(get_for(&text_doc("01/05/2024 COFFEE 4.50")), ParserKind::Generic);
        assert_eq!(
            get_for(&text_doc("*start*transaction detail\n*end*transaction detail")),
            ParserKind::ChaseDetail
        );
    }

    const CLOSING_DATE_STATEMENT: &str = "\
Jan 31, 2024 Statement closing date
Minimum Payment Due $25.00
01/05/2024 COFFEE SHOP 4.50
01/06/2024 GROCERY OUTLET 10.00
";

    #[test]
    fn test_month_name_header_does_not_claim_pdf_statement() {
        let rules = DirectionRules::default();
        let doc = StatementText::new("jan_ocr.txt", CLOSING_DATE_STATEMENT, FileKind::Pdf);
        assert_eq!(get_for(&doc), ParserKind::Generic);
        assert!(ParserKind::ChaseDashboard.parse(&doc, &ctx(&rules)).is_none());

        let outcome = parse_statement(&doc, &ctx(&rules));
        assert_eq!(outcome.parser, "generic");
        assert_eq!(outcome.rows.len(), 2);
        assert_eq!(outcome.rows[0].description, "COFFEE SHOP");
        assert!(outcome
            .rejected
            .iter()
            .all(|r| r.reason != RejectReason::NoIssuerMatch));
    }

    #[test]
    fn test_dashboard_needs_an_image_upload() {
        let shot = "Dec 03,2025 AMAZON MKTPL Card purchase $73.97\n";
        let image = StatementText::new("shot_ocr.txt", shot, FileKind::Image);
        assert_eq!(get_for(&image), ParserKind::ChaseDashboard);
        let text = StatementText::new("shot.txt", shot, FileKind::Text);
        assert_eq!(get_for(&text), ParserKind::Generic);
    }

    #[test]
    fn test_candidates_follow_owning_parser() {
        let chase = "*start*transaction detail\n01/05 Coffee -4.50 95.50\nTotal 1.00\n*end*transaction detail\n01/06/2024 OUTSIDE 1.00\n";
        let doc = text_doc(chase);
        assert_eq!(get_for(&doc).count_candidates(&doc.text), 1);
        let generic = text_doc("01/06/2024 COFFEE 1.00\n01/07/2024 TEA 2.00\n");
        assert_eq!(get_for(&generic).count_candidates(&generic.text), 2);
    }

    #[test]
    fn test_get_by_key() {
        assert_eq!(get_by_key("paypal_credit"), Some(ParserKind::PayPalCredit));
        assert_eq!(get_by_key("nope"), None);
    }

    #[test]
    fn test_issuer_claim_excludes_generic_rows() {
        let text = "\
Chase statement
December 15, 2023 through January 16, 2024
*start*transaction detail
12/20 Card Purchase Target -54.10 945.90
*end*transaction detail
01/02/2024 SOMETHING ELSE 9.99
";
        let rules = DirectionRules::default();
        let doc = StatementText::new("chase_ocr.txt", text, FileKind::Text);
        let outcome = parse_statement(&doc, &ctx(&rules));
        assert_eq!(outcome.parser, "chase_detail");
        assert_eq!(outcome.rows.len(), 1);
        // the stray full-date line is reported, not imported
        assert_eq!(outcome.rejected.len(), 1);
        assert_eq!(outcome.rejected[0].reason, RejectReason::NoIssuerMatch);
    }

    #[test]
    fn test_date_prefix() {
        assert!(is_date_prefixed("12/20 Card Purchase 1.00"));
        assert!(is_date_prefixed("  Dec 12 Dec 13 STORE $1.00"));
        assert!(is_date_prefixed("2024-01-05 X 1.00"));
        assert!(!is_date_prefixed("Page 1 of 3 $1.00"));
        assert!(!is_date_prefixed("Total fees $1.00"));
    }

    #[test]
    fn test_detail_blocks() {
        let text = "a\n*start*transaction detail\nb\nc\n*end*transaction detail\nd\n*start*transaction detail\ne\n";
        let blocks = detail_blocks(text);
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0], vec![(3, "b"), (4, "c")]);
        assert_eq!(blocks[1], vec![(8, "e")]);
    }

    #[test]
    fn test_generic_candidates_skip_summaries() {
        let text = "01/01/2024 Beginning Balance 100.00\n01/02/2024 COFFEE 4.50\nnot a row 1.00\n";
        assert_eq!(ParserKind::Generic.count_candidates(text), 1);
    }
}
