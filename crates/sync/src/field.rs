//! Field kinds and decoded field values.

use chrono::{DateTime, TimeZone, Utc};
use num_bigint::BigInt;
use num_traits::ToPrimitive;
use serde::{Deserialize, Serialize};
use soroshark_primitives::{ContractValue, ValueError, ValueResult};
use std::fmt;

/// How a raw contract value is interpreted for a view-model field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    /// Token amount in smallest units.
    Amount,
    /// Decimal places of a token.
    Decimals,
    /// Free text (names, symbols).
    Text,
    /// Unix time in seconds.
    Timestamp,
    /// Boolean condition.
    Flag,
}

impl FieldKind {
    /// Decodes `value` into a field of this kind.
    pub fn decode(self, value: &ContractValue) -> ValueResult<FieldValue> {
        match self {
            Self::Amount => value.as_integer().map(FieldValue::Amount),
            Self::Decimals => {
                let raw = value.as_integer()?;
                raw.to_u8()
                    .map(FieldValue::Decimals)
                    .ok_or_else(|| ValueError::OutOfRange {
                        target: "decimals",
                        value: raw.to_string(),
                    })
            }
            Self::Text => value.as_text().map(FieldValue::Text),
            Self::Timestamp => {
                let raw = value.as_integer()?;
                raw.to_i64()
                    .and_then(|secs| Utc.timestamp_opt(secs, 0).single())
                    .map(FieldValue::Timestamp)
                    .ok_or_else(|| ValueError::OutOfRange {
                        target: "timestamp",
                        value: raw.to_string(),
                    })
            }
            Self::Flag => value.as_bool().map(FieldValue::Flag),
        }
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Amount => write!(f, "amount"),
            Self::Decimals => write!(f, "decimals"),
            Self::Text => write!(f, "text"),
            Self::Timestamp => write!(f, "timestamp"),
            Self::Flag => write!(f, "flag"),
        }
    }
}

/// A decoded view-model field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    Amount(BigInt),
    Decimals(u8),
    Text(String),
    Timestamp(DateTime<Utc>),
    Flag(bool),
}

impl FieldValue {
    pub fn kind(&self) -> FieldKind {
        match self {
            Self::Amount(_) => FieldKind::Amount,
            Self::Decimals(_) => FieldKind::Decimals,
            Self::Text(_) => FieldKind::Text,
            Self::Timestamp(_) => FieldKind::Timestamp,
            Self::Flag(_) => FieldKind::Flag,
        }
    }

    pub fn as_amount(&self) -> Option<&BigInt> {
        match self {
            Self::Amount(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_decimals(&self) -> Option<u8> {
        match self {
            Self::Decimals(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_timestamp(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::Timestamp(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_flag(&self) -> Option<bool> {
        match self {
            Self::Flag(value) => Some(*value),
            _ => None,
        }
    }
}
