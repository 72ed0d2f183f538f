//! External text extraction: `pdftotext -layout` for PDFs, `tesseract` for
//! images. Both are black boxes behind [`TextExtractor`].

use std::path::Path;
use std::process::Command;

use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use crate::error::{PennyError, Result};
use crate::models::FileKind;

pub trait TextExtractor {
    /// Text for one source file. `Text` inputs are read as they are.
    fn extract(&self, path: &Path, kind: FileKind) -> Result<String>;
}

/// Shells out to the installed tools.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemExtractor;

impl TextExtractor for SystemExtractor {
    fn extract(&self, path: &Path, kind: FileKind) -> Result<String> {
        match kind {
            FileKind::Pdf => run_tool("pdftotext", &["-layout", path_str(path)?, "-"]),
            FileKind::Image => run_tool("tesseract", &[path_str(path)?, "stdout"]),
            FileKind::Text => crate::fsutil::read_text_lossy(path),
        }
    }
}

fn path_str(path: &Path) -> Result<&str> {
    path.to_str()
        .ok_or_else(|| PennyError::Other(format!("invalid file path: {}", path.display())))
}

/// Run `tool args...` and capture stdout.
fn run_tool(tool: &str, args: &[&str]) -> Result<String> {
    which::which(tool).map_err(|_| PennyError::ToolMissing(tool.to_string()))?;

    debug!(tool, ?args, "running extractor");
    let output = Command::new(tool).args(args).output()?;

    if !output.status.success() {
        return Err(PennyError::ToolFailed {
            tool: tool.to_string(),
            code: output.status.code().unwrap_or(-1),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

pub fn text_checksum(text: &str) -> String {
    hex::encode(Sha256::digest(text.as_bytes()))
}

/// Result of running extraction one or more times on the same file.
#[derive(Debug, Clone)]
pub struct Extraction {
    /// The first pass; canonical even when later passes disagree.
    pub text: String,
    /// Every pass, in order. Only kept when they disagree.
    pub passes: Vec<String>,
    pub consistent: bool,
}

/// Extract `passes` times and compare output checksums. Disagreement is
/// logged and the first pass wins.
pub fn extract_with_consistency(
    extractor: &dyn TextExtractor,
    path: &Path,
    kind: FileKind,
    passes: usize,
) -> Result<Extraction> {
    let first = extractor.extract(path, kind)?;
    let first_sum = text_checksum(&first);
    let mut others = Vec::new();

    // Plain text has nothing to re-run.
    let extra = if kind == FileKind::Text {
        0
    } else {
        passes.saturating_sub(1)
    };
    for _ in 0..extra {
        others.push(extractor.extract(path, kind)?);
    }

    let consistent = others.iter().all(|t| text_checksum(t) == first_sum);
    if !consistent {
        warn!(
            file = %path.display(),
            passes = others.len() + 1,
            "OCR passes disagree; keeping the first pass"
        );
    }

    let passes = if consistent {
        Vec::new()
    } else {
        std::iter::once(first.clone()).chain(others).collect()
    };
    Ok(Extraction {
        text: first,
        passes,
        consistent,
    })
}
