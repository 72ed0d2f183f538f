use std::path::PathBuf;

use chrono::Datelike;
use rusqlite::{Connection, OptionalExtension};
use tracing::{info, warn};

use crate::coverage::{db_rows_for_file, record_rejected};
use crate::db::to_cents;
use crate::direction::{classify_kind, DirectionRules};
use crate::error::Result;
use crate::intake::{intake_uploads, list_statement_files, load_artifact};
use crate::models::{Direction, IdentityKey, NormalizedRow, StatementText};
use crate::ocr::TextExtractor;
use crate::parsers::{get_for, parse_statement, ParseContext};

// ---------------------------------------------------------------------------
// Storage seam
// ---------------------------------------------------------------------------

/// What the import bridge needs from storage.
pub trait TransactionStore {
    fn exists(&self, key: &IdentityKey) -> Result<bool>;
    fn insert(&self, row: &NormalizedRow) -> Result<()>;
}

/// SQLite-backed store; rows inserted through it are tagged with `run_id`.
pub struct SqliteStore<'a> {
    conn: &'a Connection,
    run_id: Option<i64>,
}

impl<'a> SqliteStore<'a> {
    pub fn new(conn: &'a Connection, run_id: Option<i64>) -> Self {
        Self { conn, run_id }
    }
}

impl TransactionStore for SqliteStore<'_> {
    fn exists(&self, key: &IdentityKey) -> Result<bool> {
        let mut stmt = self.conn.prepare_cached(
            "SELECT 1 FROM transactions WHERE date = ?1 AND amount_cents = ?2 \
             AND merchant = ?3 AND account_name = ?4 AND source_system = ?5",
        )?;
        Ok(stmt.exists(rusqlite::params![
            key.date.format("%Y-%m-%d").to_string(),
            to_cents(key.amount),
            key.merchant,
            key.account_name,
            key.source_system,
        ])?)
    }

    fn insert(&self, row: &NormalizedRow) -> Result<()> {
        self.conn.execute(
            "INSERT INTO transactions (date, amount, amount_cents, direction, source_system, \
             account_name, merchant, description, category, kind, notes, run_id) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
            rusqlite::params![
                row.date.format("%Y-%m-%d").to_string(),
                row.amount,
                to_cents(row.amount),
                row.direction.as_str(),
                row.source_system,
                row.account_name,
                row.merchant,
                row.description,
                row.category,
                classify_kind(&row.description).as_str(),
                row.notes,
                self.run_id,
            ],
        )?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Import bridge
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ImportResult {
    pub imported: usize,
    pub skipped: usize,
}

/// Insert each row whose identity key is not stored yet. Re-running with
/// the same rows is a no-op.
pub fn import_rows(store: &dyn TransactionStore, rows: &[NormalizedRow]) -> Result<ImportResult> {
    let mut result = ImportResult::default();
    for row in rows {
        let corrected;
        let row = if row.direction.agrees_with(row.amount) {
            row
        } else {
            warn!(
                date = %row.date,
                amount = row.amount,
                direction = row.direction.as_str(),
                "direction disagrees with sign; storing sign-derived direction"
            );
            corrected = NormalizedRow {
                direction: Direction::from_amount(row.amount),
                ..row.clone()
            };
            &corrected
        };
        if store.exists(&row.identity_key())? {
            result.skipped += 1;
            continue;
        }
        store.insert(row)?;
        result.imported += 1;
    }
    Ok(result)
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

pub struct PipelineConfig {
    pub uploads_dir: PathBuf,
    pub statements_dir: PathBuf,
    pub ocr_passes: usize,
    pub rules: DirectionRules,
}

#[derive(Debug, Default, Clone)]
pub struct ImportStats {
    pub run_id: i64,
    pub saved_files: usize,
    pub skipped_duplicates: usize,
    pub unsupported: usize,
    pub failed: usize,
    pub inconsistent: usize,
    pub statement_rows: usize,
    pub added: usize,
    pub skipped_existing: usize,
    pub rejected_lines: usize,
    pub candidate_lines: usize,
    pub db_rows: usize,
}

fn start_run(conn: &Connection) -> Result<i64> {
    conn.execute("INSERT INTO import_runs DEFAULT VALUES", [])?;
    Ok(conn.last_insert_rowid())
}

fn finish_run(conn: &Connection, stats: &ImportStats) -> Result<()> {
    conn.execute(
        "UPDATE import_runs SET finished_at = datetime('now'), saved_files = ?2, \
         skipped_duplicates = ?3, unsupported = ?4, failed = ?5, statement_rows = ?6, added = ?7, \
         skipped_existing = ?8, rejected_lines = ?9, candidate_lines = ?10, db_rows = ?11 \
         WHERE id = ?1",
        rusqlite::params![
            stats.run_id,
            stats.saved_files as i64,
            stats.skipped_duplicates as i64,
            stats.unsupported as i64,
            stats.failed as i64,
            stats.statement_rows as i64,
            stats.added as i64,
            stats.skipped_existing as i64,
            stats.rejected_lines as i64,
            stats.candidate_lines as i64,
            stats.db_rows as i64,
        ],
    )?;
    Ok(())
}

/// Per-artifact share of [`ImportStats`].
#[derive(Debug, Default)]
struct ArtifactCounts {
    statement_rows: usize,
    added: usize,
    skipped_existing: usize,
    rejected_lines: usize,
    candidate_lines: usize,
    db_rows: usize,
}

fn import_artifact(
    conn: &Connection,
    store: &dyn TransactionStore,
    ctx: &ParseContext,
    run_id: i64,
    doc: &StatementText,
) -> Result<ArtifactCounts> {
    let outcome = parse_statement(doc, ctx);
    let imported = import_rows(store, &outcome.rows)?;
    let rejected = record_rejected(conn, run_id, &outcome.rejected)?;
    info!(
        artifact = %doc.file_name,
        parser = outcome.parser,
        rows = outcome.rows.len(),
        added = imported.imported,
        rejected,
        "parsed"
    );
    Ok(ArtifactCounts {
        statement_rows: outcome.rows.len(),
        added: imported.imported,
        skipped_existing: imported.skipped,
        rejected_lines: rejected,
        candidate_lines: get_for(doc).count_candidates(&doc.text),
        db_rows: db_rows_for_file(conn, &doc.file_name)?,
    })
}

/// Intake every upload, parse every indexed artifact in name order and
/// import the rows. A bad file is logged and skipped; the batch goes on.
pub fn run_pipeline(
    conn: &Connection,
    extractor: &dyn TextExtractor,
    config: &PipelineConfig,
) -> Result<ImportStats> {
    let run_id = start_run(conn)?;
    let intake = intake_uploads(
        conn,
        extractor,
        &config.uploads_dir,
        &config.statements_dir,
        config.ocr_passes,
    )?;

    let mut stats = ImportStats {
        run_id,
        saved_files: intake.saved_files,
        skipped_duplicates: intake.skipped_duplicates,
        unsupported: intake.unsupported,
        failed: intake.failed,
        inconsistent: intake.inconsistent,
        ..ImportStats::default()
    };

    let ctx = ParseContext {
        rules: &config.rules,
        fallback_year: chrono::Local::now().year(),
    };
    let store = SqliteStore::new(conn, Some(run_id));

    for file in list_statement_files(conn)? {
        let doc = match load_artifact(&file) {
            Ok(doc) => doc,
            Err(e) => {
                warn!(artifact = %file.ocr_path.display(), error = %e, "unreadable artifact, skipping");
                stats.failed += 1;
                continue;
            }
        };

        match import_artifact(conn, &store, &ctx, run_id, &doc) {
            Ok(counts) => {
                stats.statement_rows += counts.statement_rows;
                stats.added += counts.added;
                stats.skipped_existing += counts.skipped_existing;
                stats.rejected_lines += counts.rejected_lines;
                stats.candidate_lines += counts.candidate_lines;
                stats.db_rows += counts.db_rows;
            }
            Err(e) => {
                warn!(artifact = %doc.file_name, error = %e, "import failed, continuing");
                stats.failed += 1;
            }
        }
    }

    finish_run(conn, &stats)?;
    Ok(stats)
}

#[derive(Debug, Clone)]
pub struct RunSummary {
    pub id: i64,
    pub started_at: String,
    pub finished_at: Option<String>,
    pub added: i64,
    pub skipped_existing: i64,
    pub rejected_lines: i64,
}

pub fn last_run(conn: &Connection) -> Result<Option<RunSummary>> {
    let run = conn
        .query_row(
            "SELECT id, started_at, finished_at, added, skipped_existing, rejected_lines \
             FROM import_runs ORDER BY id DESC LIMIT 1",
            [],
            |row| {
                Ok(RunSummary {
                    id: row.get(0)?,
                    started_at: row.get(1)?,
                    finished_at: row.get(2)?,
                    added: row.get(3)?,
                    skipped_existing: row.get(4)?,
                    rejected_lines: row.get(5)?,
                })
            },
        )
        .optional()?;
    Ok(run)
}
