//! Diagnostics only: how many transaction-shaped lines each artifact holds
//! versus how many rows landed in storage, and which money lines no parser
//! could use. Nothing here feeds back into the import.

use rusqlite::Connection;
use tracing::warn;

use crate::error::Result;
use crate::intake::{list_statement_files, load_artifact};
use crate::models::{RejectReason, RejectedLine};
use crate::parsers::get_for;

/// Stored rows whose provenance note names `file_name`.
pub fn db_rows_for_file(conn: &Connection, file_name: &str) -> Result<usize> {
    let exact = format!("from {file_name}");
    let annotated = format!("from {} (%", escape_like(file_name));
    let count: i64 = conn.query_row(
        "SELECT count(*) FROM transactions WHERE notes = ?1 OR notes LIKE ?2 ESCAPE '\\'",
        rusqlite::params![exact, annotated],
        |row| row.get(0),
    )?;
    Ok(count as usize)
}

fn escape_like(s: &str) -> String {
    s.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_")
}

#[derive(Debug, Clone)]
pub struct FileCoverage {
    pub file_name: String,
    pub parser: &'static str,
    pub candidate_lines: usize,
    pub db_rows: usize,
}

impl FileCoverage {
    /// Stored minus candidates; negative means lines were lost.
    pub fn discrepancy(&self) -> i64 {
        self.db_rows as i64 - self.candidate_lines as i64
    }
}

#[derive(Debug, Clone, Default)]
pub struct ImportReport {
    pub files: Vec<FileCoverage>,
    pub candidate_lines: usize,
    pub db_rows: usize,
}

/// Per-artifact coverage, recomputed from the text on every call.
pub fn build_import_report(conn: &Connection) -> Result<ImportReport> {
    let mut report = ImportReport::default();
    for file in list_statement_files(conn)? {
        let doc = match load_artifact(&file) {
            Ok(doc) => doc,
            Err(e) => {
                warn!(artifact = %file.ocr_path.display(), error = %e, "unreadable artifact");
                continue;
            }
        };
        let parser = get_for(&doc);
        let coverage = FileCoverage {
            parser: parser.key(),
            candidate_lines: parser.count_candidates(&doc.text),
            db_rows: db_rows_for_file(conn, &doc.file_name)?,
            file_name: doc.file_name,
        };
        report.candidate_lines += coverage.candidate_lines;
        report.db_rows += coverage.db_rows;
        report.files.push(coverage);
    }
    Ok(report)
}

// ---------------------------------------------------------------------------
// Rejected lines
// ---------------------------------------------------------------------------

pub fn record_rejected(conn: &Connection, run_id: i64, lines: &[RejectedLine]) -> Result<usize> {
    let mut stmt = conn.prepare_cached(
        "INSERT INTO rejected_lines (run_id, file_name, line_no, raw_text, reason, amount_text) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
    )?;
    for line in lines {
        stmt.execute(rusqlite::params![
            run_id,
            line.file_name,
            line.line_no as i64,
            line.raw_text,
            line.reason.as_str(),
            line.amount_text,
        ])?;
    }
    Ok(lines.len())
}

#[derive(Debug, Clone)]
pub struct StoredRejectedLine {
    pub run_id: Option<i64>,
    pub line: RejectedLine,
}

/// Rejected lines, newest run first, optionally for one artifact.
pub fn list_rejected(conn: &Connection, file_name: Option<&str>) -> Result<Vec<StoredRejectedLine>> {
    let mut stmt = conn.prepare(
        "SELECT run_id, file_name, line_no, raw_text, reason, amount_text FROM rejected_lines \
         WHERE ?1 IS NULL OR file_name = ?1 \
         ORDER BY run_id DESC, file_name, line_no",
    )?;
    let rows = stmt
        .query_map([file_name], |row| {
            let reason: String = row.get(4)?;
            let line_no: i64 = row.get(2)?;
            Ok(StoredRejectedLine {
                run_id: row.get(0)?,
                line: RejectedLine {
                    file_name: row.get(1)?,
                    line_no: line_no as usize,
                    raw_text: row.get(3)?,
                    reason: RejectReason::parse(&reason).unwrap_or(RejectReason::NoGenericMatch),
                    amount_text: row.get(5)?,
                },
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{get_connection, init_db};

    fn test_db() -> (tempfile::TempDir, Connection) {
        let dir = tempfile::tempdir().unwrap();
        let conn = get_connection(&dir.path().join("test.db")).unwrap();
        init_db(&conn).unwrap();
        (dir, conn)
    }

    fn insert_note(conn: &Connection, notes: &str) {
        conn.execute(
            "INSERT INTO transactions (date, amount, amount_cents, direction, source_system, merchant, description, notes) \
             VALUES ('2024-01-05', -1.0, -100, 'debit', 'Chase', 'X', 'X', ?1)",
            [notes],
        )
        .unwrap();
    }

    #[test]
    fn test_db_rows_match_exact_and_annotated_notes() {
        let (_dir, conn) = test_db();
        insert_note(&conn, "from jan_ocr.txt");
        insert_note(&conn, "from jan_ocr.txt (payroll line outside detail block)");
        insert_note(&conn, "from jan_ocr.txt.bak");
        insert_note(&conn, "from janXocr.txt");
        assert_eq!(db_rows_for_file(&conn, "jan_ocr.txt").unwrap(), 2);
    }

    #[test]
    fn test_rejected_lines_roundtrip() {
        let (_dir, conn) = test_db();
        conn.execute("INSERT INTO import_runs DEFAULT VALUES", []).unwrap();
        let run_id = conn.last_insert_rowid();
        let lines = vec![
            RejectedLine {
                file_name: "a_ocr.txt".into(),
                line_no: 7,
                raw_text: "Paid $42.10".into(),
                reason: RejectReason::NoGenericMatch,
                amount_text: Some("$42.10".into()),
            },
            RejectedLine {
                file_name: "b_ocr.txt".into(),
                line_no: 2,
                raw_text: "01/02 Thing 1.00".into(),
                reason: RejectReason::NoIssuerMatch,
                amount_text: None,
            },
        ];
        assert_eq!(record_rejected(&conn, run_id, &lines).unwrap(), 2);

        let all = list_rejected(&conn, None).unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].run_id, Some(run_id));

        let only_b = list_rejected(&conn, Some("b_ocr.txt")).unwrap();
        assert_eq!(only_b.len(), 1);
        assert_eq!(only_b[0].line.reason, RejectReason::NoIssuerMatch);
        assert_eq!(only_b[0].line.amount_text, None);
    }
}
