//! Error types for primitive conversions.

use thiserror::Error;

/// Errors raised while parsing fixed-point amount text.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AmountError {
    /// The text is not a decimal number.
    #[error("invalid amount: {text:?}")]
    Invalid {
        /// The rejected input.
        text: String,
    },

    /// The text has more fractional digits than the token allows.
    #[error("amount {text:?} has more than {decimals} fractional digits")]
    PrecisionLoss {
        /// The rejected input.
        text: String,
        /// Decimal places of the token.
        decimals: u8,
    },
}

impl AmountError {
    /// Create an invalid amount error.
    pub fn invalid<S: Into<String>>(text: S) -> Self {
        Self::Invalid { text: text.into() }
    }
}

/// Result type for amount parsing.
pub type AmountResult<T> = Result<T, AmountError>;

/// Errors raised when a `ContractValue` does not have the shape a caller expects.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValueError {
    /// The value has a different type than requested.
    #[error("expected {expected}, found {found}")]
    UnexpectedType {
        /// Requested type name.
        expected: &'static str,
        /// Actual type name.
        found: &'static str,
    },

    /// The value has the right type but does not fit the target.
    #[error("value out of range for {target}: {value}")]
    OutOfRange {
        /// Target type name.
        target: &'static str,
        /// Rendered value.
        value: String,
    },

    /// Byte string is not valid UTF-8.
    #[error("byte string is not valid utf-8")]
    InvalidUtf8,
}

/// Result type for value conversions.
pub type ValueResult<T> = Result<T, ValueError>;
