use comfy_table::{Cell, Table};

use crate::cli::open_db;
use crate::coverage::list_rejected;
use crate::error::Result;
use crate::fmt::truncate;
use crate::settings::load_settings;

pub fn run(file: Option<&str>) -> Result<()> {
    let settings = load_settings();
    let conn = open_db(&settings)?;
    let lines = list_rejected(&conn, file)?;

    if lines.is_empty() {
        println!("No rejected lines.");
        return Ok(());
    }

    let mut table = Table::new();
    table.set_header(vec!["Run", "File", "Line", "Reason", "Amount", "Text"]);
    for stored in &lines {
        let line = &stored.line;
        table.add_row(vec![
            Cell::new(stored.run_id.map(|id| id.to_string()).unwrap_or_default()),
            Cell::new(&line.file_name),
            Cell::new(line.line_no),
            Cell::new(line.reason.as_str()),
            Cell::new(line.amount_text.as_deref().unwrap_or("")),
            Cell::new(truncate(line.raw_text.trim(), 60)),
        ]);
    }
    println!("{table}");
    println!("{} rejected lines", lines.len());
    Ok(())
}
