//! The pledge campaign view: an equity token plus the crowdfund contract
//! holding pledges.

use crate::definition::{
    ContractGroup, ContractId, FieldDecl, TopicDecl, TopicRule, ViewDefinition,
};
use crate::field::FieldKind;
use crate::token::RefreshToken;
use crate::view_model::ContractViewModel;
use chrono::{DateTime, Utc};
use serde::Serialize;
use soroshark_primitives::{
    format_amount, is_expired_at, percentage, remaining_time_at, ContractValue,
};
use std::fmt;

pub const EQUITY: &str = "equity";
pub const CROWDFUND: &str = "crowdfund";

pub const BALANCE: &str = "balance";
pub const DECIMALS: &str = "decimals";
pub const NAME: &str = "name";
pub const SYMBOL: &str = "symbol";
pub const BACKER_BALANCE: &str = "backer_balance";
pub const DEADLINE: &str = "deadline";
pub const TARGET: &str = "target";

pub const TARGET_REACHED: &str = "target_reached";
pub const PLEDGED_AMOUNT_CHANGED: &str = "pledged_amount_changed";

impl ViewDefinition {
    /// Equity token fields, crowdfund deadline and target, and the two
    /// crowdfund events.
    ///
    /// `balance` is the token balance held by the crowdfund contract, i.e. the
    /// pledged total. With a `backer` the backer's own deposit is read too.
    pub fn pledge_campaign(
        token: ContractId,
        crowdfund: ContractId,
        backer: Option<&str>,
    ) -> Self {
        let equity = ContractGroup::new(EQUITY, token)
            .field(
                FieldDecl::new(BALANCE, "balance", FieldKind::Amount)
                    .with_args(vec![ContractValue::from(crowdfund.as_str())]),
            )
            .field(FieldDecl::new(DECIMALS, "decimals", FieldKind::Decimals))
            .field(FieldDecl::new(NAME, "name", FieldKind::Text))
            .field(FieldDecl::new(SYMBOL, "symbol", FieldKind::Text));

        let crowdfund = ContractGroup::new(CROWDFUND, crowdfund)
            .field(FieldDecl::new(DEADLINE, "deadline", FieldKind::Timestamp))
            .field(FieldDecl::new(TARGET, "target", FieldKind::Amount))
            .flag(TARGET_REACHED)
            .topic(TopicDecl::new(
                PLEDGED_AMOUNT_CHANGED,
                TopicRule::Replace {
                    group: EQUITY.into(),
                    field: BALANCE.into(),
                },
            ))
            .topic(TopicDecl::new(
                TARGET_REACHED,
                TopicRule::Raise {
                    group: CROWDFUND.into(),
                    flag: TARGET_REACHED.into(),
                },
            ));

        Self {
            groups: vec![equity, crowdfund],
        }
        .with_backer(backer)
    }

    /// Reads `backer`'s own deposit instead of the current backer's, or no
    /// deposit at all. Definitions without an equity group are returned as is.
    pub fn with_backer(mut self, backer: Option<&str>) -> Self {
        let Some(equity) = self.groups.iter_mut().find(|group| group.name == EQUITY) else {
            return self;
        };
        equity.fields.retain(|field| field.key != BACKER_BALANCE);
        if let Some(backer) = backer {
            equity.fields.push(
                FieldDecl::new(BACKER_BALANCE, "balance", FieldKind::Amount)
                    .with_args(vec![ContractValue::from(backer)]),
            );
        }
        self
    }

    /// The account whose deposit this definition reads.
    pub fn backer(&self) -> Option<String> {
        let field = self.group(EQUITY)?.field_decl(BACKER_BALANCE)?;
        field.args.first()?.as_text().ok()
    }
}

/// Display quantities of a pledge campaign, derived from one view model.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CampaignSnapshot {
    pub token: RefreshToken,
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
    /// Pledged total, formatted
    pub pledged: String,
    /// Funding goal, formatted
    pub goal: String,
    pub percentage: f64,
    pub remaining: String,
    pub deadline: DateTime<Utc>,
    pub expired: bool,
    pub target_reached: bool,
    /// The connected backer's own deposit, formatted
    pub backer_deposit: Option<String>,
    /// Open campaign and a connected account
    pub can_pledge: bool,
    pub degraded: bool,
}

impl CampaignSnapshot {
    /// Derives the snapshot as seen at `now` for the connected `account`.
    ///
    /// A deposit is shown only if the model read it for `account`. Returns
    /// `None` when the model lacks any campaign field.
    pub fn derive(
        model: &ContractViewModel,
        account: Option<&str>,
        now: DateTime<Utc>,
    ) -> Option<Self> {
        let balance = model.amount(EQUITY, BALANCE)?;
        let decimals = model.decimals(EQUITY, DECIMALS)?;
        let name = model.text(EQUITY, NAME)?;
        let symbol = model.text(EQUITY, SYMBOL)?;
        let deadline = model.timestamp(CROWDFUND, DEADLINE)?;
        let target = model.amount(CROWDFUND, TARGET)?;

        let expired = is_expired_at(deadline, now);
        let backer_deposit = account
            .filter(|account| model.definition().backer().as_deref() == Some(*account))
            .and_then(|_| model.amount(EQUITY, BACKER_BALANCE))
            .map(|deposit| format_amount(deposit, decimals));
        Some(Self {
            token: model.token(),
            name: name.to_string(),
            symbol: symbol.to_string(),
            decimals,
            pledged: format_amount(balance, decimals),
            goal: format_amount(target, decimals),
            percentage: percentage(balance, target, decimals),
            remaining: remaining_time_at(deadline, now),
            deadline,
            expired,
            target_reached: model.flag(CROWDFUND, TARGET_REACHED),
            backer_deposit,
            can_pledge: account.is_some() && !expired,
            degraded: model.is_degraded(),
        })
    }
}

impl fmt::Display for CampaignSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({}): {} {} of {} {} ({:.2}%), {}",
            self.name,
            self.symbol,
            self.pledged,
            self.symbol,
            self.goal,
            self.symbol,
            self.percentage,
            self.remaining
        )?;
        if self.target_reached {
            f.write_str(", target reached")?;
        }
        if let Some(deposit) = &self.backer_deposit {
            write!(f, ", deposited {} {}", deposit, self.symbol)?;
        }
        if self.degraded {
            f.write_str(" [events degraded]")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::FieldValue;
    use crate::view_model::FieldRead;
    use chrono::Duration;
    use num_bigint::BigInt;
    use std::sync::Arc;

    fn read(group: &str, key: &str, value: FieldValue) -> FieldRead {
        FieldRead {
            group: group.into(),
            key: key.into(),
            value,
        }
    }

    fn model(now: DateTime<Utc>, with_backer: bool) -> ContractViewModel {
        let definition = ViewDefinition::pledge_campaign(
            ContractId::new("CTOKEN"),
            ContractId::new("CFUND"),
            with_backer.then_some("GBACKER"),
        );
        let mut reads = vec![
            read(EQUITY, BALANCE, FieldValue::Amount(BigInt::from(1000))),
            read(EQUITY, DECIMALS, FieldValue::Decimals(2)),
            read(EQUITY, NAME, FieldValue::Text("MyStartup".into())),
            read(EQUITY, SYMBOL, FieldValue::Text("MCP1".into())),
            read(CROWDFUND, DEADLINE, FieldValue::Timestamp(now + Duration::seconds(3600))),
            read(CROWDFUND, TARGET, FieldValue::Amount(BigInt::from(5000))),
        ];
        if with_backer {
            reads.push(read(EQUITY, BACKER_BALANCE, FieldValue::Amount(BigInt::from(250))));
        }
        ContractViewModel::from_reads(RefreshToken::initial(), Arc::new(definition), reads, 16)
    }

    #[test]
    fn test_pledge_campaign_definition_is_valid() {
        let definition = ViewDefinition::pledge_campaign(
            ContractId::new("CTOKEN"),
            ContractId::new("CFUND"),
            Some("GBACKER"),
        );
        definition.validate().unwrap();
        assert_eq!(definition.field_count(), 7);
        let balance = definition.group(EQUITY).unwrap().field_decl(BALANCE).unwrap();
        assert_eq!(balance.args, vec![ContractValue::from("CFUND")]);
        let topics: Vec<_> = definition
            .subscriptions()
            .map(|(g, t)| (g.name.as_str(), t.topic.as_str()))
            .collect();
        assert_eq!(
            topics,
            vec![(CROWDFUND, PLEDGED_AMOUNT_CHANGED), (CROWDFUND, TARGET_REACHED)]
        );
    }

    #[test]
    fn test_snapshot_derivation() {
        let now = Utc::now();
        let snapshot = CampaignSnapshot::derive(&model(now, false), Some("GBACKER"), now).unwrap();
        assert_eq!(snapshot.pledged, "10");
        assert_eq!(snapshot.goal, "50");
        assert_eq!(snapshot.percentage, 20.0);
        assert_eq!(snapshot.remaining, "1h 0m 0s");
        assert!(!snapshot.expired);
        assert!(!snapshot.target_reached);
        assert!(snapshot.can_pledge);
        assert_eq!(snapshot.backer_deposit, None);
        assert_eq!(
            snapshot.to_string(),
            "MyStartup (MCP1): 10 MCP1 of 50 MCP1 (20.00%), 1h 0m 0s"
        );
    }

    #[test]
    fn test_snapshot_after_deadline() {
        let now = Utc::now();
        let later = now + Duration::seconds(3601);
        let snapshot = CampaignSnapshot::derive(&model(now, true), Some("GBACKER"), later).unwrap();
        assert!(snapshot.expired);
        assert!(!snapshot.can_pledge);
        assert_eq!(snapshot.remaining, soroshark_primitives::EXPIRED);
        assert_eq!(snapshot.backer_deposit.as_deref(), Some("2.5"));
    }

    #[test]
    fn test_backer_deposit_hidden_when_disconnected() {
        let now = Utc::now();
        let snapshot = CampaignSnapshot::derive(&model(now, true), None, now).unwrap();
        assert_eq!(snapshot.backer_deposit, None);
        assert!(!snapshot.can_pledge);
    }

    #[test]
    fn test_deposit_of_another_account_is_hidden() {
        let now = Utc::now();
        let snapshot = CampaignSnapshot::derive(&model(now, true), Some("GOTHER"), now).unwrap();
        assert_eq!(snapshot.backer_deposit, None);
        assert!(snapshot.can_pledge);
    }

    #[test]
    fn test_with_backer_rebinds_deposit_read() {
        let definition = ViewDefinition::pledge_campaign(
            ContractId::new("CTOKEN"),
            ContractId::new("CFUND"),
            Some("GALICE"),
        );
        assert_eq!(definition.backer().as_deref(), Some("GALICE"));

        let rebound = definition.clone().with_backer(Some("GBOB"));
        rebound.validate().unwrap();
        assert_eq!(rebound.backer().as_deref(), Some("GBOB"));
        assert_eq!(rebound.field_count(), definition.field_count());
        let deposit = rebound.group(EQUITY).unwrap().field_decl(BACKER_BALANCE).unwrap();
        assert_eq!(deposit.args, vec![ContractValue::from("GBOB")]);

        let cleared = rebound.with_backer(None);
        assert_eq!(cleared.backer(), None);
        assert_eq!(cleared.field_count(), 6);
    }

    #[test]
    fn test_partial_model_has_no_snapshot() {
        let definition = ViewDefinition::pledge_campaign(
            ContractId::new("CTOKEN"),
            ContractId::new("CFUND"),
            None,
        );
        let partial = ContractViewModel::from_reads(
            RefreshToken::initial(),
            Arc::new(definition),
            vec![read(EQUITY, BALANCE, FieldValue::Amount(BigInt::from(1)))],
            16,
        );
        assert!(CampaignSnapshot::derive(&partial, Some("GBACKER"), Utc::now()).is_none());
    }
}
