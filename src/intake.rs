use std::path::{Path, PathBuf};

use rusqlite::{Connection, OptionalExtension};
use sha2::{Digest, Sha256};
use tracing::{info, warn};

use crate::error::{PennyError, Result};
use crate::fsutil::{read_text_lossy, safe_unlink, write_atomic};
use crate::models::{FileKind, StatementFile, StatementText};
use crate::ocr::{extract_with_consistency, TextExtractor};

pub fn compute_checksum(file_path: &Path) -> Result<String> {
    let data = std::fs::read(file_path)?;
    let mut hasher = Sha256::new();
    hasher.update(&data);
    Ok(hex::encode(hasher.finalize()))
}

// ---------------------------------------------------------------------------
// Checksum index
// ---------------------------------------------------------------------------

fn row_to_statement_file(row: &rusqlite::Row) -> rusqlite::Result<StatementFile> {
    let kind: String = row.get(2)?;
    let ocr_path: String = row.get(3)?;
    Ok(StatementFile {
        checksum: row.get(0)?,
        source_name: row.get(1)?,
        source_kind: FileKind::parse(&kind).unwrap_or(FileKind::Text),
        ocr_path: PathBuf::from(ocr_path),
    })
}

pub fn find_by_checksum(conn: &Connection, checksum: &str) -> Result<Option<StatementFile>> {
    let found = conn
        .query_row(
            "SELECT checksum, source_name, source_kind, ocr_path FROM statement_files WHERE checksum = ?1",
            [checksum],
            row_to_statement_file,
        )
        .optional()?;
    Ok(found)
}

pub fn record_statement_file(conn: &Connection, file: &StatementFile, consistent: bool) -> Result<()> {
    conn.execute(
        "INSERT INTO statement_files (checksum, source_name, source_kind, ocr_path, consistent) \
         VALUES (?1, ?2, ?3, ?4, ?5) \
         ON CONFLICT(checksum) DO UPDATE SET source_name = ?2, source_kind = ?3, ocr_path = ?4, consistent = ?5",
        rusqlite::params![
            file.checksum,
            file.source_name,
            file.source_kind.as_str(),
            file.ocr_path.to_string_lossy(),
            consistent,
        ],
    )?;
    Ok(())
}

/// Every indexed artifact, in artifact-name order.
pub fn list_statement_files(conn: &Connection) -> Result<Vec<StatementFile>> {
    let mut stmt = conn.prepare(
        "SELECT checksum, source_name, source_kind, ocr_path FROM statement_files ORDER BY ocr_path",
    )?;
    let files = stmt
        .query_map([], row_to_statement_file)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(files)
}

pub fn load_artifact(file: &StatementFile) -> Result<StatementText> {
    let text = read_text_lossy(&file.ocr_path)?;
    let name = file
        .ocr_path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| file.source_name.clone());
    Ok(StatementText::new(name, text, file.source_kind))
}

// ---------------------------------------------------------------------------
// Intake
// ---------------------------------------------------------------------------

/// `chase_jan.pdf` -> `chase_jan_ocr.txt`; text uploads keep their name.
pub fn artifact_name(path: &Path, kind: FileKind) -> String {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    match kind {
        FileKind::Text => path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| format!("{stem}.txt")),
        FileKind::Pdf | FileKind::Image => format!("{stem}_ocr.txt"),
    }
}

#[derive(Debug, Default, Clone)]
pub struct IntakeStats {
    pub saved_files: usize,
    pub skipped_duplicates: usize,
    pub unsupported: usize,
    pub failed: usize,
    pub inconsistent: usize,
}

/// Regular, non-hidden files directly under `dir`, sorted by name.
fn upload_files(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.exists() {
        return Ok(Vec::new());
    }
    let mut files: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_file())
        .filter(|p| {
            !p.file_name()
                .map(|n| n.to_string_lossy().starts_with('.'))
                .unwrap_or(true)
        })
        .collect();
    files.sort();
    Ok(files)
}

/// Pick an artifact path that does not clobber another file's artifact.
fn unclaimed_artifact_path(
    conn: &Connection,
    statements_dir: &Path,
    name: &str,
    checksum: &str,
) -> Result<PathBuf> {
    let candidate = statements_dir.join(name);
    let owner: Option<String> = conn
        .query_row(
            "SELECT checksum FROM statement_files WHERE ocr_path = ?1",
            [candidate.to_string_lossy()],
            |row| row.get(0),
        )
        .optional()?;
    match owner {
        Some(other) if other != checksum => {
            let stem = name.trim_end_matches(".txt");
            Ok(statements_dir.join(format!("{stem}_{}.txt", &checksum[..8])))
        }
        _ => Ok(candidate),
    }
}

fn intake_one(
    conn: &Connection,
    extractor: &dyn TextExtractor,
    path: &Path,
    kind: FileKind,
    statements_dir: &Path,
    passes: usize,
    stats: &mut IntakeStats,
) -> Result<()> {
    let checksum = compute_checksum(path)?;
    if let Some(existing) = find_by_checksum(conn, &checksum)? {
        if existing.ocr_path.exists() {
            info!(file = %path.display(), artifact = %existing.ocr_path.display(), "already processed");
            stats.skipped_duplicates += 1;
            return Ok(());
        }
    }

    let extraction = extract_with_consistency(extractor, path, kind, passes)?;
    let name = artifact_name(path, kind);
    let ocr_path = unclaimed_artifact_path(conn, statements_dir, &name, &checksum)?;
    write_atomic(&ocr_path, &extraction.text)?;

    if !extraction.consistent {
        stats.inconsistent += 1;
        let stem = name.trim_end_matches(".txt");
        for (i, pass) in extraction.passes.iter().enumerate() {
            write_atomic(&statements_dir.join(format!("{stem}.pass{}.debug", i + 1)), pass)?;
        }
    }

    let source_name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    let record = StatementFile {
        checksum,
        source_name,
        source_kind: kind,
        ocr_path: ocr_path.clone(),
    };
    if let Err(e) = record_statement_file(conn, &record, extraction.consistent) {
        // An unindexed artifact would be orphaned; drop it so a re-run redoes it.
        safe_unlink(&ocr_path)?;
        return Err(e);
    }
    info!(file = %path.display(), artifact = %ocr_path.display(), "saved OCR text");
    stats.saved_files += 1;
    Ok(())
}

fn upload_kind(path: &Path) -> Result<FileKind> {
    FileKind::from_path(path).ok_or_else(|| PennyError::UnsupportedFile(path.display().to_string()))
}

/// Turn every new upload into a text artifact. Per-file failures are
/// logged and counted; only setup errors abort.
pub fn intake_uploads(
    conn: &Connection,
    extractor: &dyn TextExtractor,
    uploads_dir: &Path,
    statements_dir: &Path,
    passes: usize,
) -> Result<IntakeStats> {
    std::fs::create_dir_all(statements_dir)?;
    let mut stats = IntakeStats::default();

    for path in upload_files(uploads_dir)? {
        let kind = match upload_kind(&path) {
            Ok(kind) => kind,
            Err(e) => {
                warn!(error = %e, "skipping upload");
                stats.unsupported += 1;
                continue;
            }
        };
        if let Err(e) = intake_one(conn, extractor, &path, kind, statements_dir, passes, &mut stats) {
            warn!(file = %path.display(), error = %e, "intake failed, continuing");
            stats.failed += 1;
        }
    }

    Ok(stats)
}
