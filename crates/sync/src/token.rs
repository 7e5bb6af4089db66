use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifies one synchronization cycle.
///
/// Tokens only move forward. Any read or event callback completing under a
/// token other than the latest one is discarded.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct RefreshToken(u64);

impl RefreshToken {
    /// Token assigned on mount.
    pub const fn initial() -> Self {
        Self(1)
    }

    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    pub const fn value(self) -> u64 {
        self.0
    }

    /// The token that supersedes this one.
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0.saturating_add(1))
    }
}

impl fmt::Display for RefreshToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokens_strictly_increase() {
        let first = RefreshToken::initial();
        let second = first.next();
        assert!(second > first);
        assert_eq!(second.value(), 2);
        assert_eq!(RefreshToken::new(u64::MAX).next().value(), u64::MAX);
    }
}
