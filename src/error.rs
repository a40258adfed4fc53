//! Error types shared across the crate.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while building, loading or querying an index.
#[derive(Error, Debug)]
pub enum SeamError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("cannot open {}: {source}", path.display())]
    Open { path: PathBuf, source: io::Error },

    #[error("corrupt index: {0}")]
    CorruptIndex(String),

    #[error("invalid FASTA: {0}")]
    Fasta(String),

    #[error("read length {0} out of range")]
    ReadLengthOutOfRange(usize),

    #[error("invalid base {0:?} in sequence")]
    InvalidBase(char),

    #[error("suffix array construction failed")]
    SuffixArray,
}

pub type Result<T> = std::result::Result<T, SeamError>;
