use std::path::PathBuf;

use chrono::Datelike;
use colored::Colorize;
use comfy_table::{Cell, Table};

use crate::cli::read_statement;
use crate::direction::DirectionRules;
use crate::error::Result;
use crate::fmt::money;
use crate::models::FileKind;
use crate::parsers::{parse_statement, ParseContext};
use crate::reconciler::{find_balances, reconcile, BalanceKind};
use crate::settings::load_settings;

pub fn run(file: &str) -> Result<()> {
    let settings = load_settings();
    let rules = DirectionRules::from_settings(&settings);
    let ctx = ParseContext {
        rules: &rules,
        fallback_year: chrono::Local::now().year(),
    };
    let doc = read_statement(&PathBuf::from(file), FileKind::Text)?;

    let Some(balances) = find_balances(&doc.text) else {
        println!("No opening/closing balance lines found in {}.", doc.file_name);
        return Ok(());
    };
    let outcome = parse_statement(&doc, &ctx);
    let result = reconcile(&balances, &outcome.rows);

    let (opening_label, closing_label) = match balances.kind {
        BalanceKind::Asset => ("Beginning Balance", "Ending Balance"),
        BalanceKind::Liability => ("Previous Balance", "New Balance"),
    };

    let mut table = Table::new();
    table.set_header(vec!["", "Amount"]);
    table.add_row(vec![Cell::new(opening_label), Cell::new(money(balances.opening))]);
    table.add_row(vec![
        Cell::new(format!("Rows ({} via {})", outcome.rows.len(), outcome.parser)),
        Cell::new(money(outcome.rows.iter().map(|r| r.amount).sum::<f64>())),
    ]);
    table.add_row(vec![Cell::new("Implied"), Cell::new(money(result.calculated_balance))]);
    table.add_row(vec![Cell::new(closing_label), Cell::new(money(result.statement_balance))]);
    println!("{table}");

    if result.is_reconciled {
        println!("{}", "Reconciled".green().bold());
    } else {
        println!(
            "{}",
            format!("Off by {}", money(result.discrepancy)).red().bold()
        );
    }
    Ok(())
}
