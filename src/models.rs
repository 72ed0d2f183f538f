use std::path::{Path, PathBuf};

use chrono::NaiveDate;

/// Money direction of a normalized row. `Transfer` is an informational tag
/// for internal movement; it never changes the sign of the amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Debit,
    Credit,
    Transfer,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Debit => "debit",
            Self::Credit => "credit",
            Self::Transfer => "transfer",
        }
    }

    /// Debit for negative amounts, credit otherwise.
    pub fn from_amount(amount: f64) -> Self {
        if amount < 0.0 {
            Self::Debit
        } else {
            Self::Credit
        }
    }

    /// Whether this direction is consistent with the sign of `amount`.
    pub fn agrees_with(&self, amount: f64) -> bool {
        match self {
            Self::Transfer => true,
            other => *other == Self::from_amount(amount),
        }
    }
}

/// The common currency between every parser and the import bridge.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedRow {
    pub date: NaiveDate,
    /// Negative = money out, positive = money in.
    pub amount: f64,
    pub direction: Direction,
    pub source_system: String,
    pub account_name: String,
    pub merchant: String,
    pub description: String,
    pub category: String,
    /// Provenance, e.g. "from chase_2024_01_ocr.txt".
    pub notes: String,
}

impl NormalizedRow {
    pub fn identity_key(&self) -> IdentityKey<'_> {
        IdentityKey {
            date: self.date,
            amount: self.amount,
            merchant: &self.merchant,
            account_name: &self.account_name,
            source_system: &self.source_system,
        }
    }
}

/// Fields that decide whether a row has already been imported.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IdentityKey<'a> {
    pub date: NaiveDate,
    pub amount: f64,
    pub merchant: &'a str,
    pub account_name: &'a str,
    pub source_system: &'a str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    NoGenericMatch,
    NoIssuerMatch,
    BadAmount,
    BadDate,
}

impl RejectReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NoGenericMatch => "no_generic_match",
            Self::NoIssuerMatch => "no_issuer_match",
            Self::BadAmount => "bad_amount",
            Self::BadDate => "bad_date",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "no_generic_match" => Some(Self::NoGenericMatch),
            "no_issuer_match" => Some(Self::NoIssuerMatch),
            "bad_amount" => Some(Self::BadAmount),
            "bad_date" => Some(Self::BadDate),
            _ => None,
        }
    }
}

/// A line that carried a money token but could not be turned into a row.
#[derive(Debug, Clone, PartialEq)]
pub struct RejectedLine {
    pub file_name: String,
    pub line_no: usize,
    pub raw_text: String,
    pub reason: RejectReason,
    pub amount_text: Option<String>,
}

/// Kind of an uploaded statement file, decided by extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Pdf,
    Image,
    Text,
}

impl FileKind {
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "pdf" => Some(Self::Pdf),
            "png" | "jpg" | "jpeg" => Some(Self::Image),
            "txt" => Some(Self::Text),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Image => "image",
            Self::Text => "text",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "pdf" => Some(Self::Pdf),
            "image" => Some(Self::Image),
            "text" => Some(Self::Text),
            _ => None,
        }
    }
}

/// One OCR text artifact, ready for the parser chain.
#[derive(Debug, Clone)]
pub struct StatementText {
    pub file_name: String,
    pub text: String,
    pub kind: FileKind,
}

impl StatementText {
    pub fn new(file_name: impl Into<String>, text: impl Into<String>, kind: FileKind) -> Self {
        Self {
            file_name: file_name.into(),
            text: text.into(),
            kind,
        }
    }

    pub fn provenance(&self) -> String {
        format!("from {}", self.file_name)
    }
}

/// A row of the checksum index: which bytes produced which OCR artifact.
#[derive(Debug, Clone)]
pub struct StatementFile {
    pub checksum: String,
    pub source_name: String,
    pub source_kind: FileKind,
    pub ocr_path: PathBuf,
}

/// What a parser produced for one artifact.
#[derive(Debug, Clone, Default)]
pub struct ParseOutcome {
    pub parser: &'static str,
    pub rows: Vec<NormalizedRow>,
    pub rejected: Vec<RejectedLine>,
}
