//! Error types for the split engine.

use crate::money::Money;
use thiserror::Error;

/// Result type alias for engine operations
pub type Result<T> = std::result::Result<T, EngineError>;

/// Errors that can occur during engine operation.
#[derive(Error, Debug)]
pub enum EngineError {
    /// Participant input rejected before any share was produced
    #[error("Invalid input: {reason}")]
    InvalidInput { reason: String },

    /// Split policy tag not recognized
    #[error("Unsupported split type: {0}")]
    UnsupportedSplitType(String),

    /// Strict settlement requires credits and debts to cancel out
    #[error("Balances do not sum to zero: credits {credits}, debts {debts}")]
    PreconditionViolated { credits: Money, debts: Money },

    /// Expense amount missing, malformed or negative
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    /// Currency code is not three letters
    #[error("Invalid currency code: {0}")]
    InvalidCurrency(String),

    /// Failed to open or read the input file
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV parsing error
    #[error("CSV parsing error: {0}")]
    Csv(#[from] csv::Error),

    /// Invalid ledger record
    #[error("Invalid record at row {row}: {message}")]
    InvalidRecord { row: usize, message: String },

    /// Command-line flag not recognized
    #[error("Unknown option: {0}")]
    UnknownOption(String),

    /// Missing input file argument
    #[error(
        "Missing input file argument. Usage: split-engine [--strict] [--balances | --debts] <ledger.csv>"
    )]
    MissingArgument,
}

impl EngineError {
    pub(crate) fn invalid(reason: impl Into<String>) -> Self {
        EngineError::InvalidInput {
            reason: reason.into(),
        }
    }
}
