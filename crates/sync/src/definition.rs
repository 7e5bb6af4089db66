//! Declarative description of what a view reads and which events patch it.
//!
//! A [`ViewDefinition`] is an open list of named contract groups. Each group
//! names one contract identity, the fields read from it in the initial batch,
//! the sticky flags it carries, and the event topics subscribed on it. Topic
//! rules may patch a field or flag of any group, so an event emitted by one
//! contract can update state read from another.

use crate::error::{SyncError, SyncResult};
use crate::field::FieldKind;
use serde::{Deserialize, Serialize};
use soroshark_primitives::ContractValue;
use std::collections::HashSet;
use std::fmt;

/// Opaque contract address.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContractId(String);

impl ContractId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContractId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One field read in the initial batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDecl {
    /// View-model key
    pub key: String,
    /// Contract method invoked to read the field
    pub method: String,
    /// Method arguments
    #[serde(default)]
    pub args: Vec<ContractValue>,
    pub kind: FieldKind,
}

impl FieldDecl {
    pub fn new(key: impl Into<String>, method: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            key: key.into(),
            method: method.into(),
            args: Vec::new(),
            kind,
        }
    }

    #[must_use]
    pub fn with_args(mut self, args: Vec<ContractValue>) -> Self {
        self.args = args;
        self
    }
}

/// How an event on a topic patches the view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum TopicRule {
    /// Payload is the new absolute value of the field.
    Replace { group: String, field: String },
    /// Payload is a signed amount added to the field. Events must carry an id.
    Increment { group: String, field: String },
    /// No payload; sets a sticky flag.
    Raise { group: String, flag: String },
}

impl TopicRule {
    /// Group whose state the rule patches.
    pub fn target_group(&self) -> &str {
        match self {
            Self::Replace { group, .. }
            | Self::Increment { group, .. }
            | Self::Raise { group, .. } => group,
        }
    }
}

/// A subscribed topic and its rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicDecl {
    pub topic: String,
    #[serde(flatten)]
    pub rule: TopicRule,
}

impl TopicDecl {
    pub fn new(topic: impl Into<String>, rule: TopicRule) -> Self {
        Self {
            topic: topic.into(),
            rule,
        }
    }
}

/// Fields, flags and topics of one contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractGroup {
    pub name: String,
    pub identity: ContractId,
    #[serde(default)]
    pub fields: Vec<FieldDecl>,
    #[serde(default)]
    pub flags: Vec<String>,
    #[serde(default)]
    pub topics: Vec<TopicDecl>,
}

impl ContractGroup {
    pub fn new(name: impl Into<String>, identity: ContractId) -> Self {
        Self {
            name: name.into(),
            identity,
            fields: Vec::new(),
            flags: Vec::new(),
            topics: Vec::new(),
        }
    }

    #[must_use]
    pub fn field(mut self, decl: FieldDecl) -> Self {
        self.fields.push(decl);
        self
    }

    #[must_use]
    pub fn flag(mut self, name: impl Into<String>) -> Self {
        self.flags.push(name.into());
        self
    }

    #[must_use]
    pub fn topic(mut self, decl: TopicDecl) -> Self {
        self.topics.push(decl);
        self
    }

    pub fn field_decl(&self, key: &str) -> Option<&FieldDecl> {
        self.fields.iter().find(|f| f.key == key)
    }

    pub fn has_flag(&self, flag: &str) -> bool {
        self.flags.iter().any(|f| f == flag)
    }

    pub fn topic_decl(&self, topic: &str) -> Option<&TopicDecl> {
        self.topics.iter().find(|t| t.topic == topic)
    }
}

/// Everything one synchronizer reads and subscribes to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewDefinition {
    pub groups: Vec<ContractGroup>,
}

impl ViewDefinition {
    /// Builds a definition and validates it.
    pub fn new(groups: Vec<ContractGroup>) -> SyncResult<Self> {
        let definition = Self { groups };
        definition.validate()?;
        Ok(definition)
    }

    pub fn group(&self, name: &str) -> Option<&ContractGroup> {
        self.groups.iter().find(|g| g.name == name)
    }

    /// Every `(group, topic)` pair to subscribe to.
    pub fn subscriptions(&self) -> impl Iterator<Item = (&ContractGroup, &TopicDecl)> {
        self.groups
            .iter()
            .flat_map(|group| group.topics.iter().map(move |topic| (group, topic)))
    }

    /// Rule for `topic` delivered on `group`'s subscription.
    pub fn rule_for(&self, group: &str, topic: &str) -> Option<&TopicRule> {
        self.group(group)?.topic_decl(topic).map(|decl| &decl.rule)
    }

    /// Number of reads in the initial batch.
    pub fn field_count(&self) -> usize {
        self.groups.iter().map(|g| g.fields.len()).sum()
    }

    /// Checks names are unique and every topic rule targets a declared field or flag.
    pub fn validate(&self) -> SyncResult<()> {
        let mut names = HashSet::new();
        for group in &self.groups {
            if group.name.is_empty() {
                return Err(SyncError::InvalidDefinition("group name is empty".into()));
            }
            if !names.insert(group.name.as_str()) {
                return Err(SyncError::InvalidDefinition(format!(
                    "duplicate group {}",
                    group.name
                )));
            }

            let mut keys = HashSet::new();
            for field in &group.fields {
                if !keys.insert(field.key.as_str()) {
                    return Err(SyncError::InvalidDefinition(format!(
                        "duplicate field {}.{}",
                        group.name, field.key
                    )));
                }
            }

            let mut topics = HashSet::new();
            for topic in &group.topics {
                if !topics.insert(topic.topic.as_str()) {
                    return Err(SyncError::InvalidDefinition(format!(
                        "duplicate topic {}/{}",
                        group.name, topic.topic
                    )));
                }
            }
        }

        for (group, topic) in self.subscriptions() {
            self.validate_rule(&group.name, &topic.topic, &topic.rule)?;
        }
        Ok(())
    }

    fn validate_rule(&self, source: &str, topic: &str, rule: &TopicRule) -> SyncResult<()> {
        let target = self.group(rule.target_group()).ok_or_else(|| {
            SyncError::InvalidDefinition(format!(
                "{source}/{topic} targets unknown group {}",
                rule.target_group()
            ))
        })?;

        match rule {
            TopicRule::Replace { field, .. } => {
                if target.field_decl(field).is_none() {
                    return Err(SyncError::InvalidDefinition(format!(
                        "{source}/{topic} replaces undeclared field {}.{field}",
                        target.name
                    )));
                }
            }
            TopicRule::Increment { field, .. } => match target.field_decl(field) {
                Some(decl) if decl.kind == FieldKind::Amount => {}
                Some(decl) => {
                    return Err(SyncError::InvalidDefinition(format!(
                        "{source}/{topic} increments {} field {}.{field}",
                        decl.kind, target.name
                    )))
                }
                None => {
                    return Err(SyncError::InvalidDefinition(format!(
                        "{source}/{topic} increments undeclared field {}.{field}",
                        target.name
                    )))
                }
            },
            TopicRule::Raise { flag, .. } => {
                if !target.has_flag(flag) {
                    return Err(SyncError::InvalidDefinition(format!(
                        "{source}/{topic} raises undeclared flag {}.{flag}",
                        target.name
                    )));
                }
            }
        }
        Ok(())
    }
}
