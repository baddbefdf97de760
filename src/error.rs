use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum PsmError {
    #[error("failed to read association file at {0}")]
    #[diagnostic(help("the association file is required; check the -o/--organisms path"))]
    AssociationRead(PathBuf),

    #[error("failed to read result directory at {0}")]
    #[diagnostic(help("the result directory is required; check the -d/--directory path"))]
    ResultDirectoryRead(PathBuf),

    #[error("malformed association row at line {line}: {content:?}")]
    MalformedAssociationRow { line: usize, content: String },

    #[error("truncated record at line {line}: found {found} fields, expected at least {expected}")]
    TruncatedRecord {
        line: usize,
        found: usize,
        expected: usize,
    },

    #[error("invalid numeric field {field} at line {line}: {value:?}")]
    InvalidNumericField {
        line: usize,
        field: &'static str,
        value: String,
    },

    #[error("malformed peptide at line {line}: {value:?}")]
    MalformedPeptide { line: usize, value: String },

    #[error(
        "can't associate file {file} with an organism (in directory {directory}, but not listed in association file {association})"
    )]
    UnroutableFile {
        file: String,
        directory: String,
        association: String,
    },

    #[error("result file not found: {0}")]
    MissingFile(PathBuf),

    #[error("filesystem error: {0}")]
    Filesystem(String),

    #[error("failed to read config file at {0}")]
    ConfigRead(PathBuf),

    #[error("failed to parse JSON config: {0}")]
    ConfigParse(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("invalid PTM marker: {0:?} (expected a single character)")]
    InvalidPtmMarker(String),
}

impl PsmError {
    /// Errors that only invalidate a single line of input.
    pub fn is_line_level(&self) -> bool {
        matches!(
            self,
            PsmError::MalformedAssociationRow { .. }
                | PsmError::TruncatedRecord { .. }
                | PsmError::InvalidNumericField { .. }
                | PsmError::MalformedPeptide { .. }
        )
    }
}
