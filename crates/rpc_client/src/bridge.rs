//! Bridge from a contract notification source to per-topic event streams.

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use soroshark_config::SyncConfig;
use soroshark_sync::{ContractId, EventFeed, EventStream, FeedEvent, GatewayError};
use std::sync::Arc;
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::debug;

/// A contract event as delivered by the notification source.
#[derive(Debug, Clone, PartialEq)]
pub struct ContractNotification {
    pub contract: ContractId,
    pub topic: String,
    pub event: FeedEvent,
}

/// Fans contract notifications out to [`EventFeed`] subscribers.
///
/// Each subscription gets its own broadcast receiver filtered to one
/// `(contract, topic)`. A receiver that falls more than `capacity` events
/// behind yields [`GatewayError::Lagged`] and then continues with the oldest
/// retained event.
#[derive(Debug, Clone)]
pub struct NotificationBridge {
    sender: broadcast::Sender<ContractNotification>,
}

impl NotificationBridge {
    /// A bridge buffering up to `capacity` notifications per subscriber,
    /// at least one.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    #[must_use]
    pub fn from_config(config: &SyncConfig) -> Self {
        Self::new(config.event_buffer)
    }

    /// Publishes a notification to every matching subscription.
    pub fn notify(&self, contract: &ContractId, topic: &str, event: FeedEvent) {
        let notification = ContractNotification {
            contract: contract.clone(),
            topic: topic.to_string(),
            event,
        };
        if let Err(err) = self.sender.send(notification) {
            debug!(%contract, topic, "no subscribers for notification: {}", err);
        }
    }

    /// The sender for direct publishing.
    #[must_use]
    pub fn sender(&self) -> broadcast::Sender<ContractNotification> {
        self.sender.clone()
    }

    #[must_use]
    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }

    fn filtered(&self, contract: ContractId, topic: String) -> EventStream {
        let receiver = self.sender.subscribe();
        stream::unfold(
            (receiver, contract, topic),
            |(mut receiver, contract, topic)| async move {
                loop {
                    match receiver.recv().await {
                        Ok(notification)
                            if notification.contract == contract && notification.topic == topic =>
                        {
                            return Some((Ok(notification.event), (receiver, contract, topic)));
                        }
                        Ok(_) => continue,
                        Err(RecvError::Lagged(skipped)) => {
                            return Some((
                                Err(GatewayError::Lagged(skipped)),
                                (receiver, contract, topic),
                            ));
                        }
                        Err(RecvError::Closed) => return None,
                    }
                }
            },
        )
        .boxed()
    }
}

impl Default for NotificationBridge {
    fn default() -> Self {
        Self::new(soroshark_config::DEFAULT_EVENT_BUFFER)
    }
}

#[async_trait]
impl EventFeed for NotificationBridge {
    async fn subscribe(
        &self,
        contract: &ContractId,
        topic: &str,
    ) -> Result<EventStream, GatewayError> {
        debug!(%contract, topic, "opening notification subscription");
        Ok(self.filtered(contract.clone(), topic.to_string()))
    }
}

/// Shared notification bridge.
pub type SharedNotificationBridge = Arc<NotificationBridge>;
