pub mod import;
pub mod init;
pub mod parse;
pub mod rejected;
pub mod report;
pub mod status;
pub mod validate;

use std::path::Path;

use clap::{Parser, Subcommand};
use rusqlite::Connection;

use crate::db::{get_connection, init_db};
use crate::error::{PennyError, Result};
use crate::fsutil::read_text_lossy;
use crate::models::{FileKind, StatementText};
use crate::settings::Settings;

#[derive(Parser)]
#[command(name = "penny", about = "Turn OCR'd bank and card statements into a deduplicated ledger.")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Set up penny: choose a data directory and initialize the database.
    Init {
        /// Path for penny data (default: ~/Documents/penny)
        #[arg(long = "data-dir")]
        data_dir: Option<String>,
    },
    /// OCR new uploads, parse every statement and import the rows.
    Import {
        /// Directory of raw uploads (default: <data_dir>/uploads)
        #[arg(long)]
        uploads: Option<String>,
    },
    /// Parse one OCR text file and print its rows without storing anything.
    Parse {
        /// Path to an OCR text file
        file: String,
        /// Write rows as CSV to this path instead of printing a table
        #[arg(long)]
        csv: Option<String>,
        /// Force a parser by key (e.g. chase_detail, generic)
        #[arg(long)]
        parser: Option<String>,
        /// The text came from a screenshot rather than a statement
        #[arg(long)]
        screenshot: bool,
    },
    /// Compare candidate lines with stored rows for every statement.
    Report,
    /// List lines that carried money but produced no row.
    Rejected {
        /// Only lines from this statement artifact
        #[arg(long)]
        file: Option<String>,
    },
    /// Check a statement's rows against its opening and closing balances.
    Validate {
        /// Path to an OCR text file
        file: String,
    },
    /// Show data directory, database counts and the last import run.
    Status,
}

/// Open the configured database, creating the schema if needed.
pub(crate) fn open_db(settings: &Settings) -> Result<Connection> {
    let db_path = settings.db_path();
    if !db_path.exists() {
        return Err(PennyError::Other(format!(
            "database not found at {}. Run `penny init` first",
            db_path.display()
        )));
    }
    let conn = get_connection(&db_path)?;
    init_db(&conn)?;
    Ok(conn)
}

/// Read an OCR text file from the command line as a statement.
pub(crate) fn read_statement(path: &Path, kind: FileKind) -> Result<StatementText> {
    let text = read_text_lossy(path)?;
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string());
    Ok(StatementText::new(file_name, text, kind))
}
