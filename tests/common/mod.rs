//! Scripted read gateway and event feed for end-to-end tests.

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use soroshark::config::SyncConfig;
use soroshark::primitives::ContractValue;
use soroshark::rpc_client::NotificationBridge;
use soroshark::sync::{
    campaign, CampaignSession, ContractId, EventFeed, EventStream, GatewayError, ReadGateway,
    ViewDefinition,
};
use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;

pub const TOKEN: &str = "CTOKEN";
pub const CROWDFUND: &str = "CFUND";
pub const BACKER: &str = "GBACKER";
pub const OTHER_BACKER: &str = "GOTHER";

/// Fixed wall clock for campaign derivations.
pub fn clock() -> DateTime<Utc> {
    Utc.timestamp_opt(1_700_000_000, 0).unwrap()
}

type Key = (String, String, Vec<ContractValue>);

#[derive(Default)]
struct Script {
    values: HashMap<Key, Result<ContractValue, GatewayError>>,
    gate: Option<watch::Receiver<bool>>,
}

/// Answers reads from a table. While a gate is installed, reads started
/// under it wait until it opens.
#[derive(Default)]
pub struct ScriptedGateway {
    script: Mutex<Script>,
    calls: AtomicUsize,
}

impl ScriptedGateway {
    pub fn set(
        &self,
        contract: &str,
        method: &str,
        args: Vec<ContractValue>,
        value: ContractValue,
    ) {
        self.script
            .lock()
            .unwrap()
            .values
            .insert((contract.into(), method.into(), args), Ok(value));
    }

    pub fn reject(&self, contract: &str, method: &str, args: Vec<ContractValue>) {
        self.script.lock().unwrap().values.insert(
            (contract.into(), method.into(), args),
            Err(GatewayError::rejected(contract, method, "contract trapped")),
        );
    }

    /// Holds reads started from now on until the returned sender sends `true`.
    pub fn hold(&self) -> watch::Sender<bool> {
        let (sender, receiver) = watch::channel(false);
        self.script.lock().unwrap().gate = Some(receiver);
        sender
    }

    /// Lets reads started from now on complete immediately.
    pub fn release(&self) {
        self.script.lock().unwrap().gate = None;
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Scripts the pledge campaign contracts.
    pub fn campaign(pledged: i64, target: i64, deadline: DateTime<Utc>) -> Self {
        let gateway = Self::default();
        gateway.set(TOKEN, "balance", vec![CROWDFUND.into()], pledged.into());
        gateway.set(TOKEN, "balance", vec![BACKER.into()], 250i64.into());
        gateway.set(TOKEN, "decimals", vec![], 2i64.into());
        gateway.set(TOKEN, "name", vec![], "MyStartup".into());
        gateway.set(TOKEN, "symbol", vec![], "MCP1".into());
        gateway.set(CROWDFUND, "deadline", vec![], deadline.timestamp().into());
        gateway.set(CROWDFUND, "target", vec![], target.into());
        gateway
    }
}

#[async_trait]
impl ReadGateway for ScriptedGateway {
    async fn read(
        &self,
        contract: &ContractId,
        method: &str,
        args: &[ContractValue],
    ) -> Result<ContractValue, GatewayError> {
        let key = (contract.to_string(), method.to_string(), args.to_vec());
        let (result, gate) = {
            let script = self.script.lock().unwrap();
            let result = script
                .values
                .get(&key)
                .cloned()
                .unwrap_or_else(|| {
                    Err(GatewayError::rejected(contract.as_str(), method, "unknown method"))
                });
            (result, script.gate.clone())
        };
        self.calls.fetch_add(1, Ordering::SeqCst);

        if let Some(mut gate) = gate {
            let _ = gate.wait_for(|open| *open).await;
        }
        result
    }
}

/// Notification bridge that can refuse subscriptions.
pub struct ScriptedFeed {
    pub bridge: NotificationBridge,
    refuse: AtomicBool,
    opened: AtomicUsize,
}

impl ScriptedFeed {
    pub fn new(capacity: usize) -> Self {
        Self {
            bridge: NotificationBridge::new(capacity),
            refuse: AtomicBool::new(false),
            opened: AtomicUsize::new(0),
        }
    }

    pub fn refuse(&self, refuse: bool) {
        self.refuse.store(refuse, Ordering::SeqCst);
    }

    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    pub fn notify(&self, contract: &str, topic: &str, event: soroshark::sync::FeedEvent) {
        self.bridge.notify(&ContractId::new(contract), topic, event);
    }

    /// Waits until exactly `count` subscriptions are attached.
    pub async fn subscribers(&self, count: usize) {
        eventually(|| self.bridge.receiver_count() == count).await;
    }
}

#[async_trait]
impl EventFeed for ScriptedFeed {
    async fn subscribe(
        &self,
        contract: &ContractId,
        topic: &str,
    ) -> Result<EventStream, GatewayError> {
        if self.refuse.load(Ordering::SeqCst) {
            return Err(GatewayError::SubscribeRefused {
                contract: contract.to_string(),
                topic: topic.to_string(),
                message: "feed offline".into(),
            });
        }
        self.opened.fetch_add(1, Ordering::SeqCst);
        self.bridge.subscribe(contract, topic).await
    }
}

pub type Session = CampaignSession<ScriptedGateway, ScriptedFeed>;

pub fn campaign_definition(backer: Option<&str>) -> ViewDefinition {
    ViewDefinition::pledge_campaign(ContractId::new(TOKEN), ContractId::new(CROWDFUND), backer)
}

pub fn session(gateway: &Arc<ScriptedGateway>, feed: &Arc<ScriptedFeed>) -> Session {
    CampaignSession::new(
        Arc::clone(gateway),
        Arc::clone(feed),
        campaign_definition(None),
        SyncConfig::default(),
    )
    .unwrap()
}

/// Polls `condition` until it holds, failing the test after five seconds.
pub async fn eventually(mut condition: impl FnMut() -> bool) {
    within(async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await;
}

pub async fn within<T>(future: impl Future<Output = T>) -> T {
    tokio::time::timeout(Duration::from_secs(5), future)
        .await
        .expect("timed out")
}

pub fn topic_pledged() -> &'static str {
    campaign::PLEDGED_AMOUNT_CHANGED
}

pub fn topic_target_reached() -> &'static str {
    campaign::TARGET_REACHED
}
