use std::path::PathBuf;

use chrono::Datelike;
use colored::Colorize;
use comfy_table::{Cell, Table};

use crate::cli::read_statement;
use crate::direction::DirectionRules;
use crate::error::{PennyError, Result};
use crate::fmt::{signed_money, truncate};
use crate::models::{FileKind, NormalizedRow, ParseOutcome};
use crate::parsers::{get_by_key, parse_statement, ParseContext, ALL_PARSERS};
use crate::settings::load_settings;

pub fn run(file: &str, csv_out: Option<&str>, parser: Option<&str>, screenshot: bool) -> Result<()> {
    let settings = load_settings();
    let rules = DirectionRules::from_settings(&settings);
    let ctx = ParseContext {
        rules: &rules,
        fallback_year: chrono::Local::now().year(),
    };
    let kind = if screenshot { FileKind::Image } else { FileKind::Text };
    let doc = read_statement(&PathBuf::from(file), kind)?;

    let outcome = match parser {
        Some(key) => {
            let kind = get_by_key(key).ok_or_else(|| {
                let keys: Vec<&str> = ALL_PARSERS.iter().map(|p| p.key()).collect();
                PennyError::Other(format!("unknown parser '{key}' (expected one of: {})", keys.join(", ")))
            })?;
            kind.parse(&doc, &ctx).ok_or_else(|| {
                PennyError::Other(format!("{} does not recognize {}", kind.name(), doc.file_name))
            })?
        }
        None => parse_statement(&doc, &ctx),
    };

    match csv_out {
        Some(path) => {
            write_csv(&PathBuf::from(path), &outcome.rows)?;
            println!("Wrote {} rows to {path}", outcome.rows.len());
        }
        None => print_rows(&outcome),
    }
    print_rejected(&outcome);
    Ok(())
}

fn print_rows(outcome: &ParseOutcome) {
    let mut table = Table::new();
    table.set_header(vec!["Date", "Amount", "Direction", "Account", "Description", "Category"]);
    for row in &outcome.rows {
        let amount = if row.amount < 0.0 {
            Cell::new(signed_money(row.amount).red())
        } else {
            Cell::new(signed_money(row.amount).green())
        };
        table.add_row(vec![
            Cell::new(row.date.to_string()),
            amount,
            Cell::new(row.direction.as_str()),
            Cell::new(&row.account_name),
            Cell::new(truncate(&row.description, 48)),
            Cell::new(&row.category),
        ]);
    }
    println!("{table}");
    println!("{} rows via {}", outcome.rows.len(), outcome.parser);
}

fn print_rejected(outcome: &ParseOutcome) {
    if outcome.rejected.is_empty() {
        return;
    }
    println!();
    println!("{}", format!("{} rejected lines", outcome.rejected.len()).yellow());
    for line in &outcome.rejected {
        println!("  {:>4}  {:<16}  {}", line.line_no, line.reason.as_str(), line.raw_text.trim());
    }
}

fn write_csv(path: &std::path::Path, rows: &[NormalizedRow]) -> Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;
    wtr.write_record([
        "date",
        "amount",
        "direction",
        "source_system",
        "account_name",
        "merchant",
        "description",
        "category",
        "notes",
    ])?;
    for row in rows {
        wtr.write_record([
            row.date.to_string(),
            format!("{:.2}", row.amount),
            row.direction.as_str().to_string(),
            row.source_system.clone(),
            row.account_name.clone(),
            row.merchant.clone(),
            row.description.clone(),
            row.category.clone(),
            row.notes.clone(),
        ])?;
    }
    wtr.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Direction, StatementText};
    use crate::normalizer::parse_generic;

    #[test]
    fn test_write_csv() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("rows.csv");
        let doc = StatementText::new(
            "jan_ocr.txt",
            "01/05/2024 CARD PURCHASE AMAZON 54.10\n",
            FileKind::Text,
        );
        let outcome = parse_generic(&doc, &DirectionRules::default());
        assert_eq!(outcome.rows[0].direction, Direction::Debit);
        write_csv(&out, &outcome.rows).unwrap();

        let mut rdr = csv::Reader::from_path(&out).unwrap();
        let records: Vec<csv::StringRecord> = rdr.records().map(|r| r.unwrap()).collect();
        assert_eq!(records.len(), 1);
        assert_eq!(&records[0][0], "2024-01-05");
        assert_eq!(&records[0][1], "-54.10");
        assert_eq!(&records[0][8], "from jan_ocr.txt");
    }
}
