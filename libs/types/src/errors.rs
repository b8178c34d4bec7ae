//! Error types for the shared primitives
//!
//! Comprehensive error taxonomy using thiserror

use thiserror::Error;

/// Amount parsing and arithmetic errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum NumericError {
    #[error("Invalid amount format: {input}")]
    InvalidFormat { input: String },

    #[error("Amount must not be negative: {input}")]
    Negative { input: String },

    #[error("Amount {input} has more than {decimals} fractional digits")]
    TooPrecise { input: String, decimals: u32 },

    #[error("Arithmetic overflow")]
    Overflow,

    #[error("Division by zero")]
    DivisionByZero,
}

/// Fee split configuration errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FeeError {
    #[error("Fee shares exceed 100%: {total_bps} bps")]
    SharesExceedTotal { total_bps: u32 },

    #[error("Numeric error: {0}")]
    Numeric(#[from] NumericError),
}
