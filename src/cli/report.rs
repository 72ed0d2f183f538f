use colored::Colorize;
use comfy_table::{Cell, Table};

use crate::cli::open_db;
use crate::coverage::build_import_report;
use crate::error::Result;
use crate::settings::load_settings;

pub fn run() -> Result<()> {
    let settings = load_settings();
    let conn = open_db(&settings)?;
    let report = build_import_report(&conn)?;

    if report.files.is_empty() {
        println!("No statements indexed yet. Run `penny import` first.");
        return Ok(());
    }

    let mut table = Table::new();
    table.set_header(vec!["File", "Parser", "Candidates", "Stored", "Diff"]);
    for file in &report.files {
        let diff = file.discrepancy();
        let diff_cell = match diff {
            0 => Cell::new("0".green()),
            d if d < 0 => Cell::new(d.to_string().red().bold()),
            d => Cell::new(format!("+{d}").yellow()),
        };
        table.add_row(vec![
            Cell::new(&file.file_name),
            Cell::new(file.parser),
            Cell::new(file.candidate_lines),
            Cell::new(file.db_rows),
            diff_cell,
        ]);
    }
    println!("{table}");

    let total = format!(
        "{} files, {} candidate lines, {} stored rows",
        report.files.len(),
        report.candidate_lines,
        report.db_rows
    );
    if report.candidate_lines == report.db_rows {
        println!("{}", total.green());
    } else {
        println!("{}", total.red());
        println!("See `penny rejected` for lines that produced no row.");
    }
    Ok(())
}
