use std::path::PathBuf;

use colored::Colorize;

use crate::cli::open_db;
use crate::direction::DirectionRules;
use crate::error::Result;
use crate::importer::{run_pipeline, PipelineConfig};
use crate::ocr::SystemExtractor;
use crate::settings::{load_settings, shellexpand_path};

pub fn run(uploads: Option<String>) -> Result<()> {
    let settings = load_settings();
    let conn = open_db(&settings)?;

    let config = PipelineConfig {
        uploads_dir: uploads
            .map(|u| PathBuf::from(shellexpand_path(&u)))
            .unwrap_or_else(|| settings.uploads_dir()),
        statements_dir: settings.statements_dir(),
        ocr_passes: settings.ocr_passes.max(1),
        rules: DirectionRules::from_settings(&settings),
    };
    std::fs::create_dir_all(&config.statements_dir)?;

    let stats = run_pipeline(&conn, &SystemExtractor, &config)?;

    println!(
        "Files: {} saved, {} duplicates, {} unsupported, {} failed",
        stats.saved_files, stats.skipped_duplicates, stats.unsupported, stats.failed
    );
    if stats.inconsistent > 0 {
        println!(
            "{}",
            format!("{} file(s) gave different text across OCR passes", stats.inconsistent).yellow()
        );
    }
    println!(
        "Rows: {} parsed, {} imported, {} already present",
        stats.statement_rows, stats.added, stats.skipped_existing
    );
    println!("Rejected lines: {}", stats.rejected_lines);

    let coverage = format!(
        "Coverage: {} candidate lines, {} stored rows",
        stats.candidate_lines, stats.db_rows
    );
    if stats.candidate_lines == stats.db_rows {
        println!("{}", coverage.green());
    } else {
        println!("{}  (run `penny report` for details)", coverage.red());
    }
    Ok(())
}
