use std::path::Path;

use rusqlite::Connection;

use crate::error::Result;

pub const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS statement_files (
    id INTEGER PRIMARY KEY,
    checksum TEXT NOT NULL UNIQUE,
    source_name TEXT NOT NULL,
    source_kind TEXT NOT NULL,
    ocr_path TEXT NOT NULL,
    consistent INTEGER DEFAULT 1,
    created_at TEXT DEFAULT (datetime('now'))
);

CREATE TABLE IF NOT EXISTS import_runs (
    id INTEGER PRIMARY KEY,
    started_at TEXT DEFAULT (datetime('now')),
    finished_at TEXT,
    saved_files INTEGER DEFAULT 0,
    skipped_duplicates INTEGER DEFAULT 0,
    unsupported INTEGER DEFAULT 0,
    failed INTEGER DEFAULT 0,
    statement_rows INTEGER DEFAULT 0,
    added INTEGER DEFAULT 0,
    skipped_existing INTEGER DEFAULT 0,
    rejected_lines INTEGER DEFAULT 0,
    candidate_lines INTEGER DEFAULT 0,
    db_rows INTEGER DEFAULT 0
);

CREATE TABLE IF NOT EXISTS transactions (
    id INTEGER PRIMARY KEY,
    date TEXT NOT NULL,
    amount REAL NOT NULL,
    amount_cents INTEGER NOT NULL,
    direction TEXT NOT NULL,
    source_system TEXT NOT NULL,
    account_name TEXT NOT NULL DEFAULT '',
    merchant TEXT NOT NULL,
    description TEXT NOT NULL,
    category TEXT NOT NULL DEFAULT '',
    kind TEXT,
    notes TEXT,
    run_id INTEGER,
    created_at TEXT DEFAULT (datetime('now')),
    FOREIGN KEY (run_id) REFERENCES import_runs(id)
);

CREATE INDEX IF NOT EXISTS idx_transactions_identity
    ON transactions (date, amount_cents, merchant, account_name, source_system);

CREATE TABLE IF NOT EXISTS rejected_lines (
    id INTEGER PRIMARY KEY,
    run_id INTEGER,
    file_name TEXT NOT NULL,
    line_no INTEGER NOT NULL,
    raw_text TEXT NOT NULL,
    reason TEXT NOT NULL,
    amount_text TEXT,
    created_at TEXT DEFAULT (datetime('now')),
    FOREIGN KEY (run_id) REFERENCES import_runs(id)
);
";

pub fn get_connection(db_path: &Path) -> Result<Connection> {
    let conn = Connection::open(db_path)?;
    conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
    Ok(conn)
}

pub fn init_db(conn: &Connection) -> Result<()> {
    conn.execute_batch(SCHEMA)?;
    Ok(())
}

/// Signed cents, the form amounts take in identity comparisons.
pub fn to_cents(amount: f64) -> i64 {
    (amount * 100.0).round() as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_db() -> (tempfile::TempDir, Connection) {
        let dir = tempfile::tempdir().unwrap();
        let conn = get_connection(&dir.path().join("test.db")).unwrap();
        init_db(&conn).unwrap();
        (dir, conn)
    }

    #[test]
    fn test_init_db_creates_tables() {
        let (_dir, conn) = test_db();
        let tables: Vec<String> = conn
            .prepare("SELECT name FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%'")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<std::result::Result<Vec<_>, _>>()
            .unwrap();
        for expected in &["statement_files", "transactions", "rejected_lines", "import_runs"] {
            assert!(tables.contains(&expected.to_string()), "missing table: {expected}");
        }
    }

    #[test]
    fn test_init_db_is_idempotent() {
        let (_dir, conn) = test_db();
        init_db(&conn).unwrap();
    }

    #[test]
    fn test_checksum_is_unique() {
        let (_dir, conn) = test_db();
        let insert = "INSERT INTO statement_files (checksum, source_name, source_kind, ocr_path) \
                      VALUES ('abc', 'a.pdf', 'pdf', '/tmp/a_ocr.txt')";
        conn.execute(insert, []).unwrap();
        assert!(conn.execute(insert, []).is_err());
    }

    #[test]
    fn test_to_cents() {
        assert_eq!(to_cents(-54.10), -5410);
        assert_eq!(to_cents(0.1 + 0.2), 30);
        assert_eq!(to_cents(1200.0), 120000);
    }
}
