use soroshark_primitives::ContractValue;

/// A notification delivered by an event feed subscription.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedEvent {
    /// Stable id across redeliveries (e.g. transaction hash and log index).
    pub id: Option<String>,
    /// Event payload, [`ContractValue::Any`] for payload-less events.
    pub payload: ContractValue,
}

impl FeedEvent {
    pub fn new(payload: ContractValue) -> Self {
        Self { id: None, payload }
    }

    /// A payload-less event.
    pub fn signal() -> Self {
        Self::new(ContractValue::Any)
    }

    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }
}

/// A feed event tagged with the subscription it arrived on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractEvent {
    /// Group whose contract emitted the event
    pub group: String,
    pub topic: String,
    pub event: FeedEvent,
}

impl ContractEvent {
    pub fn new(group: impl Into<String>, topic: impl Into<String>, event: FeedEvent) -> Self {
        Self {
            group: group.into(),
            topic: topic.into(),
            event,
        }
    }
}
