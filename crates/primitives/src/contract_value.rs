//! Typed contract values.
//!
//! Contract read calls return, and contract events carry, values shaped like VM
//! stack items. On the wire they use the same tagged form as RPC invoke results:
//!
//! ```json
//! {"type": "Integer", "value": "100000000000000000000"}
//! {"type": "ByteString", "value": "U0hBUks="}
//! ```
//!
//! Integers are carried as decimal strings so they never lose precision in JSON.

use crate::error::{ValueError, ValueResult};
use num_bigint::BigInt;
use num_traits::Zero;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A value returned by a contract read or carried by a contract event.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum ContractValue {
    /// No value (`void` return, payload-less event).
    Any,
    /// Boolean.
    Boolean(bool),
    /// Arbitrary precision integer.
    Integer(#[serde(with = "bigint_string")] BigInt),
    /// UTF-8 string.
    String(String),
    /// Raw bytes, base64 on the wire.
    ByteString(#[serde(with = "base64_bytes")] Vec<u8>),
    /// Ordered list of values.
    Array(Vec<ContractValue>),
}

impl ContractValue {
    /// Name of the variant, used in error messages.
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::Any => "Any",
            Self::Boolean(_) => "Boolean",
            Self::Integer(_) => "Integer",
            Self::String(_) => "String",
            Self::ByteString(_) => "ByteString",
            Self::Array(_) => "Array",
        }
    }

    /// Returns `true` for [`ContractValue::Any`].
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Any)
    }

    /// Reads the value as an integer. Decimal strings are accepted.
    pub fn as_integer(&self) -> ValueResult<BigInt> {
        match self {
            Self::Integer(value) => Ok(value.clone()),
            Self::String(text) => BigInt::from_str(text.trim()).map_err(|_| ValueError::OutOfRange {
                target: "Integer",
                value: text.clone(),
            }),
            other => Err(ValueError::UnexpectedType {
                expected: "Integer",
                found: other.type_name(),
            }),
        }
    }

    /// Reads the value as a boolean. Integers are true when non-zero.
    pub fn as_bool(&self) -> ValueResult<bool> {
        match self {
            Self::Boolean(value) => Ok(*value),
            Self::Integer(value) => Ok(!value.is_zero()),
            other => Err(ValueError::UnexpectedType {
                expected: "Boolean",
                found: other.type_name(),
            }),
        }
    }

    /// Reads the value as text. Byte strings must be valid UTF-8.
    pub fn as_text(&self) -> ValueResult<String> {
        match self {
            Self::String(text) => Ok(text.clone()),
            Self::ByteString(bytes) => {
                String::from_utf8(bytes.clone()).map_err(|_| ValueError::InvalidUtf8)
            }
            other => Err(ValueError::UnexpectedType {
                expected: "String",
                found: other.type_name(),
            }),
        }
    }
}

impl fmt::Display for ContractValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Any => write!(f, "null"),
            Self::Boolean(value) => write!(f, "{value}"),
            Self::Integer(value) => write!(f, "{value}"),
            Self::String(text) => write!(f, "{text:?}"),
            Self::ByteString(bytes) => write!(f, "0x{}", hex_lower(bytes)),
            Self::Array(items) => {
                write!(f, "[")?;
                for (index, item) in items.iter().enumerate() {
                    if index > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
        }
    }
}

fn hex_lower(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

impl From<BigInt> for ContractValue {
    fn from(value: BigInt) -> Self {
        Self::Integer(value)
    }
}

impl From<i64> for ContractValue {
    fn from(value: i64) -> Self {
        Self::Integer(BigInt::from(value))
    }
}

impl From<bool> for ContractValue {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}

impl From<&str> for ContractValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for ContractValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

mod bigint_string {
    use num_bigint::BigInt;
    use serde::{de, Deserialize, Deserializer, Serializer};
    use std::str::FromStr;

    pub fn serialize<S: Serializer>(value: &BigInt, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(value)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<BigInt, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Text(String),
            Signed(i64),
            Unsigned(u64),
        }

        match Repr::deserialize(deserializer)? {
            Repr::Text(text) => BigInt::from_str(&text).map_err(de::Error::custom),
            Repr::Signed(value) => Ok(BigInt::from(value)),
            Repr::Unsigned(value) => Ok(BigInt::from(value)),
        }
    }
}

mod base64_bytes {
    use base64::{engine::general_purpose, Engine as _};
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&general_purpose::STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let text = String::deserialize(deserializer)?;
        general_purpose::STANDARD
            .decode(text.as_bytes())
            .map_err(de::Error::custom)
    }
}
