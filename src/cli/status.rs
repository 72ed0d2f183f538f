use crate::db::get_connection;
use crate::error::Result;
use crate::fmt::format_bytes;
use crate::importer::last_run;
use crate::settings::load_settings;

pub fn run() -> Result<()> {
    let settings = load_settings();
    let db_path = settings.db_path();

    println!("Data dir:   {}", settings.data_path().display());
    println!("Database:   {}", db_path.display());
    println!("Uploads:    {}", settings.uploads_dir().display());
    println!("OCR passes: {}", settings.ocr_passes);

    if !db_path.exists() {
        println!();
        println!("Database not found. Run `penny init` to set up.");
        return Ok(());
    }

    let size = std::fs::metadata(&db_path)?.len();
    println!("DB size:    {}", format_bytes(size));

    let conn = get_connection(&db_path)?;
    let statements: i64 = conn.query_row("SELECT count(*) FROM statement_files", [], |r| r.get(0))?;
    let transactions: i64 = conn.query_row("SELECT count(*) FROM transactions", [], |r| r.get(0))?;
    let rejected: i64 = conn.query_row("SELECT count(*) FROM rejected_lines", [], |r| r.get(0))?;

    println!();
    println!("Statements:    {statements}");
    println!("Transactions:  {transactions}");
    println!("Rejected:      {rejected}");

    match last_run(&conn)? {
        Some(run) => {
            println!();
            println!(
                "Last import:   #{} at {} ({} added, {} already present, {} rejected)",
                run.id, run.started_at, run.added, run.skipped_existing, run.rejected_lines
            );
            if run.finished_at.is_none() {
                println!("               (did not finish)");
            }
        }
        None => println!("Last import:   never"),
    }
    Ok(())
}
