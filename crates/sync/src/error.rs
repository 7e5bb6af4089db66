//! Error types for contract state synchronization.

use thiserror::Error;

/// Failures reported by the read gateway or the event feed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GatewayError {
    /// The contract call was rejected.
    #[error("call {method} on {contract} rejected: {message}")]
    Rejected {
        contract: String,
        method: String,
        message: String,
    },

    /// The contract call did not complete in time.
    #[error("call {method} on {contract} timed out after {timeout_ms}ms")]
    Timeout {
        contract: String,
        method: String,
        timeout_ms: u64,
    },

    /// The feed refused to open a subscription.
    #[error("subscription to {topic} on {contract} refused: {message}")]
    SubscribeRefused {
        contract: String,
        topic: String,
        message: String,
    },

    /// The feed connection dropped or errored.
    #[error("event feed failure: {0}")]
    Feed(String),

    /// The subscriber fell behind and events were dropped.
    #[error("event feed lagged, {0} events dropped")]
    Lagged(u64),
}

impl GatewayError {
    /// Create a rejected call error.
    pub fn rejected(
        contract: impl Into<String>,
        method: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::Rejected {
            contract: contract.into(),
            method: method.into(),
            message: message.into(),
        }
    }
}

/// Synchronization errors.
///
/// A result arriving under a superseded refresh token is not an error; it is
/// discarded and counted in [`crate::SyncStats::stale_discards`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SyncError {
    /// A read in the initial batch failed; the whole cycle is unavailable.
    #[error("read of {group}.{field} failed: {message}")]
    ReadFailure {
        group: String,
        field: String,
        message: String,
    },

    /// A subscription could not be opened or its feed failed.
    #[error("subscription {group}/{topic} failed: {source}")]
    SubscriptionFailure {
        group: String,
        topic: String,
        #[source]
        source: GatewayError,
    },

    /// An event payload did not match its topic's schema.
    #[error("event {group}/{topic} dropped: {message}")]
    EventDecodeFailure {
        group: String,
        topic: String,
        message: String,
    },

    /// A view definition references undeclared fields, flags or groups.
    #[error("invalid view definition: {0}")]
    InvalidDefinition(String),
}

impl SyncError {
    pub(crate) fn decode(
        group: impl Into<String>,
        topic: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::EventDecodeFailure {
            group: group.into(),
            topic: topic.into(),
            message: message.into(),
        }
    }
}

/// Result type for synchronization operations.
pub type SyncResult<T> = Result<T, SyncError>;
