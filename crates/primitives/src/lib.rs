//! # SoroShark Primitives
//!
//! Fundamental types shared by the SoroShark crates.
//!
//! This crate provides:
//! - `BigDecimal`: fixed-point token amounts of arbitrary precision
//! - `ContractValue`: typed values returned by contract reads and carried by contract events
//! - Campaign derivations: amount formatting, funding percentage, time remaining, expiry
//!
//! ## Design Principles
//!
//! - **Zero dependencies on other soroshark-* crates**
//! - **Pure**: nothing in this crate performs I/O or holds state
//! - **Exact**: on-chain integers are never routed through floating point for display
//!
//! ## Example
//!
//! ```rust
//! use num_bigint::BigInt;
//! use soroshark_primitives::{format_amount, percentage};
//!
//! assert_eq!(format_amount(&BigInt::from(123456), 2), "1234.56");
//! assert_eq!(percentage(&BigInt::from(1000), &BigInt::from(5000), 2), 20.0);
//! ```

pub mod big_decimal;
pub mod contract_value;
pub mod derivation;
pub mod error;

// Re-exports
pub use big_decimal::BigDecimal;
pub use contract_value::ContractValue;
pub use derivation::{
    format_amount, is_expired, is_expired_at, parse_amount, percentage, remaining_time,
    remaining_time_at, EXPIRED,
};
pub use error::{AmountError, AmountResult, ValueError, ValueResult};
