//! Presentation-side owner of a campaign view.

use crate::campaign::CampaignSnapshot;
use crate::definition::{ContractId, ViewDefinition};
use crate::error::SyncResult;
use crate::gateway::{EventFeed, ReadGateway};
use crate::stats::SyncStats;
use crate::synchronizer::{ViewHandle, ViewSynchronizer};
use crate::token::RefreshToken;
use crate::view_model::ViewState;
use chrono::{DateTime, Utc};
use num_bigint::BigInt;
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use soroshark_config::{CampaignConfig, SyncConfig};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{info, warn};

/// A connected wallet account.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Account {
    pub address: String,
}

impl Account {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
        }
    }
}

/// Confirmation of a pledge transaction accepted by the network.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PledgeReceipt {
    pub transaction: String,
    /// Pledged amount in the token's smallest unit
    pub amount: BigInt,
}

/// Owns the synchronizer and the refresh token of one mounted campaign view.
///
/// The token starts at [`RefreshToken::initial`] on mount and advances on
/// every refresh, so a pledge always re-reads the whole view. Dropping the
/// session unmounts it.
pub struct CampaignSession<G, F> {
    synchronizer: ViewSynchronizer<G, F>,
    updated_at: Mutex<Option<RefreshToken>>,
    account: RwLock<Option<Account>>,
}

impl<G, F> CampaignSession<G, F>
where
    G: ReadGateway + 'static,
    F: EventFeed + 'static,
{
    pub fn new(
        gateway: Arc<G>,
        feed: Arc<F>,
        definition: ViewDefinition,
        config: SyncConfig,
    ) -> SyncResult<Self> {
        Ok(Self {
            synchronizer: ViewSynchronizer::new(gateway, feed, definition, config)?,
            updated_at: Mutex::new(None),
            account: RwLock::new(None),
        })
    }

    /// Builds the pledge campaign view for the configured contracts. A
    /// configured backer is connected from the start.
    pub fn from_config(
        gateway: Arc<G>,
        feed: Arc<F>,
        campaign: &CampaignConfig,
        config: SyncConfig,
    ) -> SyncResult<Self> {
        let definition = ViewDefinition::pledge_campaign(
            ContractId::new(campaign.token_contract.as_str()),
            ContractId::new(campaign.crowdfund_contract.as_str()),
            campaign.backer.as_deref(),
        );
        let session = Self::new(gateway, feed, definition, config)?;
        if let Some(backer) = &campaign.backer {
            *session.account.write() = Some(Account::new(backer.as_str()));
        }
        Ok(session)
    }

    /// Connects `account` and reads its own deposit from now on.
    ///
    /// A mounted view showing another account's deposit is re-read; the
    /// returned handle watches that cycle.
    pub fn connect(&self, account: Account) -> Option<ViewHandle> {
        info!(address = %account.address, "account connected");
        let rebound = self.bind_backer(Some(&account.address));
        *self.account.write() = Some(account);
        let mounted = self.updated_at().is_some() && self.state() != ViewState::Closed;
        (rebound && mounted).then(|| self.refresh())
    }

    /// Forgets the connected account. Its deposit stays hidden; the next
    /// cycle no longer reads it.
    pub fn disconnect(&self) {
        if let Some(account) = self.account.write().take() {
            info!(address = %account.address, "account disconnected");
        }
        self.bind_backer(None);
    }

    /// Points the deposit read at `backer`. Returns `true` if the definition changed.
    fn bind_backer(&self, backer: Option<&str>) -> bool {
        let current = self.synchronizer.definition();
        if current.backer().as_deref() == backer {
            return false;
        }
        let rebound = current.as_ref().clone().with_backer(backer);
        if *current == rebound {
            return false;
        }
        match self.synchronizer.redefine(rebound) {
            Ok(()) => true,
            Err(err) => {
                warn!(error = %err, "keeping deposit read of previous account");
                false
            }
        }
    }

    /// Starts the first sync cycle. Mounting twice keeps the running view.
    pub fn mount(&self) -> ViewHandle {
        let mut updated_at = self.updated_at.lock();
        let token = match *updated_at {
            Some(token) => token,
            None => {
                let token = RefreshToken::initial();
                *updated_at = Some(token);
                token
            }
        };
        self.synchronizer.synchronize(token)
    }

    /// Re-reads the whole view under a fresh token.
    pub fn refresh(&self) -> ViewHandle {
        let mut updated_at = self.updated_at.lock();
        let token = updated_at.map_or(RefreshToken::initial(), RefreshToken::next);
        *updated_at = Some(token);
        self.synchronizer.synchronize(token)
    }

    pub fn pledge_succeeded(&self, receipt: &PledgeReceipt) -> ViewHandle {
        info!(
            transaction = %receipt.transaction,
            amount = %receipt.amount,
            "pledge confirmed, refreshing campaign view"
        );
        self.refresh()
    }
}

impl<G, F> CampaignSession<G, F> {
    pub fn account(&self) -> Option<Account> {
        self.account.read().clone()
    }

    pub fn is_connected(&self) -> bool {
        self.account.read().is_some()
    }

    pub fn updated_at(&self) -> Option<RefreshToken> {
        *self.updated_at.lock()
    }

    pub fn view(&self) -> watch::Receiver<ViewState> {
        self.synchronizer.view()
    }

    pub fn state(&self) -> ViewState {
        self.synchronizer.current()
    }

    pub fn snapshot(&self) -> Option<CampaignSnapshot> {
        self.snapshot_at(Utc::now())
    }

    /// Derives display quantities from the published model as seen at `now`.
    pub fn snapshot_at(&self, now: DateTime<Utc>) -> Option<CampaignSnapshot> {
        let state = self.synchronizer.current();
        let model = state.model()?;
        let account = self.account();
        CampaignSnapshot::derive(model, account.as_ref().map(|a| a.address.as_str()), now)
    }

    pub fn stats(&self) -> SyncStats {
        self.synchronizer.stats()
    }

    pub fn synchronizer(&self) -> &ViewSynchronizer<G, F> {
        &self.synchronizer
    }

    /// Cancels reads and subscriptions and publishes [`ViewState::Closed`].
    pub fn unmount(&self) {
        self.synchronizer.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::{MockEventFeed, MockReadGateway};
    use futures::stream::{self, StreamExt};
    use soroshark_primitives::ContractValue;

    fn campaign(backer: Option<&str>) -> CampaignConfig {
        CampaignConfig {
            token_contract: "CTOKEN".into(),
            crowdfund_contract: "CFUND".into(),
            backer: backer.map(str::to_string),
        }
    }

    fn gateway(deadline: i64) -> MockReadGateway {
        let mut gateway = MockReadGateway::new();
        gateway.expect_read().returning(move |_, method, args| {
            Ok(match method {
                "balance" if args == [ContractValue::from("CFUND")] => ContractValue::from(1000i64),
                "balance" => ContractValue::from(300i64),
                "decimals" => ContractValue::from(2i64),
                "name" => ContractValue::from("MyStartup"),
                "symbol" => ContractValue::from("MCP1"),
                "deadline" => ContractValue::from(deadline),
                "target" => ContractValue::from(5000i64),
                _ => ContractValue::Any,
            })
        });
        gateway
    }

    fn feed() -> MockEventFeed {
        let mut feed = MockEventFeed::new();
        feed.expect_subscribe()
            .returning(|_, _| Ok(stream::pending().boxed()));
        feed
    }

    #[tokio::test]
    async fn test_mount_publishes_snapshot() {
        let deadline = Utc::now().timestamp() + 7200;
        let session = CampaignSession::from_config(
            Arc::new(gateway(deadline)),
            Arc::new(feed()),
            &campaign(Some("GBACKER")),
            SyncConfig::default(),
        )
        .unwrap();

        assert!(session.is_connected());
        let state = session.mount().settled().await;
        assert!(state.is_ready());
        assert_eq!(session.updated_at(), Some(RefreshToken::initial()));

        let snapshot = session.snapshot().unwrap();
        assert_eq!(snapshot.pledged, "10");
        assert_eq!(snapshot.goal, "50");
        assert_eq!(snapshot.percentage, 20.0);
        assert_eq!(snapshot.backer_deposit.as_deref(), Some("3"));
        assert!(snapshot.can_pledge);
    }

    #[tokio::test]
    async fn test_pledge_advances_token() {
        let deadline = Utc::now().timestamp() + 7200;
        let session = CampaignSession::from_config(
            Arc::new(gateway(deadline)),
            Arc::new(feed()),
            &campaign(None),
            SyncConfig::default(),
        )
        .unwrap();

        session.mount().settled().await;
        let receipt = PledgeReceipt {
            transaction: "0xabc".into(),
            amount: BigInt::from(500),
        };
        let state = session.pledge_succeeded(&receipt).settled().await;
        assert_eq!(state.token(), Some(RefreshToken::new(2)));
        assert_eq!(session.stats().cycles_published, 2);
        assert!(!session.snapshot().unwrap().can_pledge);
    }

    fn deposits_gateway(deadline: i64) -> MockReadGateway {
        let mut gateway = MockReadGateway::new();
        gateway.expect_read().returning(move |_, method, args| {
            let deposit = |address: &str| args == [ContractValue::from(address)];
            Ok(match method {
                "balance" if deposit("GALICE") => ContractValue::from(300i64),
                "balance" if deposit("GBOB") => ContractValue::from(700i64),
                "balance" => ContractValue::from(1000i64),
                "decimals" => ContractValue::from(2i64),
                "name" => ContractValue::from("MyStartup"),
                "symbol" => ContractValue::from("MCP1"),
                "deadline" => ContractValue::from(deadline),
                "target" => ContractValue::from(5000i64),
                _ => ContractValue::Any,
            })
        });
        gateway
    }

    #[tokio::test]
    async fn test_connect_reads_own_deposit() {
        let deadline = Utc::now().timestamp() + 7200;
        let session = CampaignSession::from_config(
            Arc::new(deposits_gateway(deadline)),
            Arc::new(feed()),
            &campaign(Some("GALICE")),
            SyncConfig::default(),
        )
        .unwrap();

        session.mount().settled().await;
        assert_eq!(session.snapshot().unwrap().backer_deposit.as_deref(), Some("3"));

        let mut handle = session.connect(Account::new("GBOB")).unwrap();
        assert_eq!(handle.token(), RefreshToken::new(2));
        let state = handle.settled().await;
        assert_eq!(state.token(), Some(RefreshToken::new(2)));

        let snapshot = session.snapshot().unwrap();
        assert_eq!(session.account(), Some(Account::new("GBOB")));
        assert_eq!(snapshot.backer_deposit.as_deref(), Some("7"));
    }

    #[tokio::test]
    async fn test_connect_after_mount_without_backer() {
        let deadline = Utc::now().timestamp() + 7200;
        let session = CampaignSession::from_config(
            Arc::new(deposits_gateway(deadline)),
            Arc::new(feed()),
            &campaign(None),
            SyncConfig::default(),
        )
        .unwrap();

        session.mount().settled().await;
        assert_eq!(session.snapshot().unwrap().backer_deposit, None);

        session.connect(Account::new("GBOB")).unwrap().settled().await;
        assert_eq!(session.snapshot().unwrap().backer_deposit.as_deref(), Some("7"));
        assert!(session.connect(Account::new("GBOB")).is_none());
    }

    #[tokio::test]
    async fn test_disconnect_drops_deposit_read() {
        let deadline = Utc::now().timestamp() + 7200;
        let session = CampaignSession::from_config(
            Arc::new(deposits_gateway(deadline)),
            Arc::new(feed()),
            &campaign(Some("GALICE")),
            SyncConfig::default(),
        )
        .unwrap();

        session.mount().settled().await;
        session.disconnect();
        assert_eq!(session.snapshot().unwrap().backer_deposit, None);
        assert_eq!(session.synchronizer().definition().backer(), None);

        session.refresh().settled().await;
        assert_eq!(session.stats().cycles_published, 2);
        assert_eq!(session.snapshot().unwrap().backer_deposit, None);
    }

    #[test]
    fn test_connect_before_mount_does_not_read() {
        let session = CampaignSession::from_config(
            Arc::new(MockReadGateway::new()),
            Arc::new(MockEventFeed::new()),
            &campaign(None),
            SyncConfig::default(),
        )
        .unwrap();

        assert!(session.connect(Account::new("GBOB")).is_none());
        assert_eq!(session.synchronizer().definition().backer().as_deref(), Some("GBOB"));
        assert_eq!(session.state(), ViewState::Idle);
    }

    #[tokio::test]
    async fn test_unmount_closes_view() {
        let session = CampaignSession::from_config(
            Arc::new(gateway(0)),
            Arc::new(feed()),
            &campaign(None),
            SyncConfig::default(),
        )
        .unwrap();

        session.mount().settled().await;
        session.unmount();
        assert_eq!(session.state(), ViewState::Closed);
        assert!(session.snapshot().is_none());
    }
}
