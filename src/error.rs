use std::fmt;

use thiserror::Error;

use crate::settings::ConfigProblem;

#[derive(Error, Debug)]
pub enum MailError {
    #[error("Mail connection failed: {0}")]
    Connection(String),

    #[error("Mail server error: {0}")]
    Protocol(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExtractionError {
    #[error("Could not extract payment amount from text")]
    AmountNotFound,

    #[error("Invalid amount format: {0}")]
    AmountMalformed(String),
}

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[cfg(feature = "sqlite")]
    #[error("Database error: {0}")]
    Db(#[from] rusqlite::Error),

    #[error("Corrupt ledger row {row}: {reason}")]
    CorruptRow { row: usize, reason: String },

    #[error("Ledger total overflows at row {row} (amount {amount})")]
    TotalOverflow { row: usize, amount: rust_decimal::Decimal },
}

/// Every configuration problem found at startup, reported together.
#[derive(Debug)]
pub struct ConfigErrors(pub Vec<ConfigProblem>);

impl fmt::Display for ConfigErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Invalid configuration:")?;
        for problem in &self.0 {
            writeln!(f, "   - {problem}")?;
        }
        write!(
            f,
            "\nSet these environment variables or run `penny init`:\n   \
             EMAIL_ADDRESS=your_email@gmail.com\n   \
             EMAIL_PASSWORD=your_app_password"
        )
    }
}

#[derive(Error, Debug)]
pub enum PennyError {
    #[error(transparent)]
    Mail(#[from] MailError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("{0}")]
    Config(ConfigErrors),

    #[error("Settings error: {0}")]
    Settings(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

impl From<Vec<ConfigProblem>> for PennyError {
    fn from(problems: Vec<ConfigProblem>) -> Self {
        Self::Config(ConfigErrors(problems))
    }
}

pub type Result<T> = std::result::Result<T, PennyError>;
