use std::path::PathBuf;

use thiserror::Error;

pub type Rs3Result<T> = Result<T, Rs3Error>;

/// Errors raised by the data layer.
///
/// `Format` and `Value` are usually row-local: callers log them and move on
/// with the rest of the batch.
#[derive(Error, Debug)]
pub enum Rs3Error {
    #[error("{}: line {line}: {reason}", file.display())]
    Format {
        file: PathBuf,
        line: usize,
        reason: String,
    },

    #[error("{}: row {row}: field '{field}' has non-numeric value '{value}'", file.display())]
    Value {
        file: PathBuf,
        row: usize,
        field: &'static str,
        value: String,
    },

    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid search pattern: {0}")]
    Pattern(#[from] glob::PatternError),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("{}: header {index} should be '{expected}', found '{found}'", file.display())]
    Header {
        file: PathBuf,
        index: usize,
        expected: String,
        found: String,
    },

    #[error("{}: row {row}: site '{site}' reappears after its group was closed", file.display())]
    NonContiguousSite {
        file: PathBuf,
        site: String,
        row: usize,
    },

    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl Rs3Error {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Rs3Error::Io {
            path: path.into(),
            source,
        }
    }
}
