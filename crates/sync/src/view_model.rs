//! The merged, display-ready snapshot of contract state.

use crate::definition::{ContractId, TopicRule, ViewDefinition};
use crate::error::{SyncError, SyncResult};
use crate::event::ContractEvent;
use crate::field::FieldValue;
use crate::token::RefreshToken;
use chrono::{DateTime, Utc};
use indexmap::IndexSet;
use num_bigint::BigInt;
use std::collections::BTreeMap;
use std::sync::Arc;

/// A decoded result of one read in the initial batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldRead {
    pub group: String,
    pub key: String,
    pub value: FieldValue,
}

/// Fields and flags of one contract group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupState {
    identity: ContractId,
    fields: BTreeMap<String, FieldValue>,
    flags: BTreeMap<String, bool>,
    applied: IndexSet<String>,
}

impl GroupState {
    fn new(identity: ContractId, flags: &[String]) -> Self {
        Self {
            identity,
            fields: BTreeMap::new(),
            flags: flags.iter().map(|flag| (flag.clone(), false)).collect(),
            applied: IndexSet::new(),
        }
    }

    pub fn identity(&self) -> &ContractId {
        &self.identity
    }

    pub fn field(&self, key: &str) -> Option<&FieldValue> {
        self.fields.get(key)
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.fields.iter().map(|(key, value)| (key.as_str(), value))
    }

    /// Latest known value of a sticky flag; `false` until an event raises it.
    pub fn flag(&self, name: &str) -> bool {
        self.flags.get(name).copied().unwrap_or(false)
    }

    fn remember(&mut self, id: &str, window: usize) {
        if window == 0 {
            return;
        }
        self.applied.insert(id.to_string());
        while self.applied.len() > window {
            self.applied.shift_remove_index(0);
        }
    }
}

/// The synchronizer's merged view of every contract group for one refresh token.
///
/// A model is built only from a complete read batch and is replaced, never
/// mutated, when an event applies. Field access stays optional so callers
/// handle declarations the model does not carry.
#[derive(Debug, Clone)]
pub struct ContractViewModel {
    token: RefreshToken,
    definition: Arc<ViewDefinition>,
    groups: BTreeMap<String, GroupState>,
    degraded: bool,
    dedup_window: usize,
}

impl ContractViewModel {
    /// Merges a complete read batch. Flags start `false`.
    pub fn from_reads(
        token: RefreshToken,
        definition: Arc<ViewDefinition>,
        reads: Vec<FieldRead>,
        dedup_window: usize,
    ) -> Self {
        let mut groups: BTreeMap<String, GroupState> = definition
            .groups
            .iter()
            .map(|group| {
                (
                    group.name.clone(),
                    GroupState::new(group.identity.clone(), &group.flags),
                )
            })
            .collect();

        for read in reads {
            if let Some(state) = groups.get_mut(&read.group) {
                state.fields.insert(read.key, read.value);
            }
        }

        Self {
            token,
            definition,
            groups,
            degraded: false,
            dedup_window,
        }
    }

    pub fn token(&self) -> RefreshToken {
        self.token
    }

    pub fn definition(&self) -> &ViewDefinition {
        &self.definition
    }

    /// `true` while an event subscription is down; fields keep their last known values.
    pub fn is_degraded(&self) -> bool {
        self.degraded
    }

    pub fn group(&self, name: &str) -> Option<&GroupState> {
        self.groups.get(name)
    }

    pub fn groups(&self) -> impl Iterator<Item = (&str, &GroupState)> {
        self.groups.iter().map(|(name, state)| (name.as_str(), state))
    }

    pub fn field(&self, group: &str, key: &str) -> Option<&FieldValue> {
        self.groups.get(group)?.field(key)
    }

    pub fn amount(&self, group: &str, key: &str) -> Option<&BigInt> {
        self.field(group, key)?.as_amount()
    }

    pub fn decimals(&self, group: &str, key: &str) -> Option<u8> {
        self.field(group, key)?.as_decimals()
    }

    pub fn text(&self, group: &str, key: &str) -> Option<&str> {
        self.field(group, key)?.as_text()
    }

    pub fn timestamp(&self, group: &str, key: &str) -> Option<DateTime<Utc>> {
        self.field(group, key)?.as_timestamp()
    }

    pub fn flag(&self, group: &str, flag: &str) -> bool {
        self.groups.get(group).is_some_and(|state| state.flag(flag))
    }

    /// `true` when every declared field has a value.
    pub fn is_complete(&self) -> bool {
        self.definition.groups.iter().all(|group| {
            group
                .fields
                .iter()
                .all(|decl| self.field(&group.name, &decl.key).is_some())
        })
    }

    pub(crate) fn with_degraded(&self, degraded: bool) -> Self {
        let mut next = self.clone();
        next.degraded = degraded;
        next
    }

    /// Folds one event into the view.
    ///
    /// Returns `Ok(None)` when the event leaves the view unchanged: unknown
    /// topic, redelivered delta, already raised flag or identical value.
    /// A payload that does not fit its topic is an
    /// [`SyncError::EventDecodeFailure`] and the view is left as is.
    pub fn apply_event(&self, event: &ContractEvent) -> SyncResult<Option<Self>> {
        let Some(rule) = self.definition.rule_for(&event.group, &event.topic) else {
            return Ok(None);
        };
        let target = rule.target_group();
        let Some(state) = self.groups.get(target) else {
            return Ok(None);
        };
        let decode_error =
            |message: String| SyncError::decode(&event.group, &event.topic, message);

        match rule {
            TopicRule::Replace { field, .. } => {
                let Some(current) = state.field(field) else {
                    return Ok(None);
                };
                let value = current
                    .kind()
                    .decode(&event.event.payload)
                    .map_err(|err| decode_error(err.to_string()))?;
                if &value == current {
                    return Ok(None);
                }
                Ok(Some(self.patched(target, |group| {
                    group.fields.insert(field.clone(), value);
                })))
            }
            TopicRule::Increment { field, .. } => {
                let Some(current) = state.field(field).and_then(FieldValue::as_amount) else {
                    return Ok(None);
                };
                let id = event
                    .event
                    .id
                    .as_deref()
                    .ok_or_else(|| decode_error("delta event without id".to_string()))?;
                let delta = event
                    .event
                    .payload
                    .as_integer()
                    .map_err(|err| decode_error(err.to_string()))?;
                if state.applied.contains(id) {
                    return Ok(None);
                }
                let updated = current + &delta;
                let window = self.dedup_window;
                Ok(Some(self.patched(target, |group| {
                    group.fields.insert(field.clone(), FieldValue::Amount(updated));
                    group.remember(id, window);
                })))
            }
            TopicRule::Raise { flag, .. } => {
                if !state.flags.contains_key(flag) || state.flag(flag) {
                    return Ok(None);
                }
                Ok(Some(self.patched(target, |group| {
                    group.flags.insert(flag.clone(), true);
                })))
            }
        }
    }

    fn patched(&self, group: &str, patch: impl FnOnce(&mut GroupState)) -> Self {
        let mut next = self.clone();
        if let Some(state) = next.groups.get_mut(group) {
            patch(state);
        }
        next
    }
}

impl PartialEq for ContractViewModel {
    fn eq(&self, other: &Self) -> bool {
        self.token == other.token && self.degraded == other.degraded && self.groups == other.groups
    }
}

impl Eq for ContractViewModel {}

/// What the presentation layer sees.
#[derive(Debug, Clone, PartialEq)]
pub enum ViewState {
    /// No refresh token assigned yet.
    Idle,
    /// Reads for `token` are in flight.
    Loading { token: RefreshToken },
    /// The complete view for its token.
    Ready(Arc<ContractViewModel>),
    /// A read for `token` failed; nothing from that cycle is shown.
    Unavailable { token: RefreshToken, reason: String },
    /// The synchronizer was unmounted.
    Closed,
}

impl ViewState {
    pub fn token(&self) -> Option<RefreshToken> {
        match self {
            Self::Loading { token } | Self::Unavailable { token, .. } => Some(*token),
            Self::Ready(model) => Some(model.token()),
            Self::Idle | Self::Closed => None,
        }
    }

    pub fn model(&self) -> Option<&Arc<ContractViewModel>> {
        match self {
            Self::Ready(model) => Some(model),
            _ => None,
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready(_))
    }

    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::Unavailable { .. })
    }

    pub fn is_degraded(&self) -> bool {
        self.model().is_some_and(|model| model.is_degraded())
    }
}
