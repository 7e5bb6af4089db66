//! Boundaries to the contract RPC transport.

use crate::definition::ContractId;
use crate::error::GatewayError;
use crate::event::FeedEvent;
use async_trait::async_trait;
use futures::stream::BoxStream;
use soroshark_primitives::ContractValue;

/// Stream of events for one `(contract, topic)` subscription.
///
/// Dropping the stream cancels the subscription. An `Err` item reports a feed
/// failure; the stream may keep delivering afterwards.
pub type EventStream = BoxStream<'static, Result<FeedEvent, GatewayError>>;

/// Point-in-time contract reads.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ReadGateway: Send + Sync {
    /// Invokes a read-only `method` on `contract`.
    async fn read(
        &self,
        contract: &ContractId,
        method: &str,
        args: &[ContractValue],
    ) -> Result<ContractValue, GatewayError>;
}

/// Push delivery of contract events.
///
/// Delivery is at-least-once and in order within one topic.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EventFeed: Send + Sync {
    async fn subscribe(
        &self,
        contract: &ContractId,
        topic: &str,
    ) -> Result<EventStream, GatewayError>;
}
