//! Superseded refresh tokens never reach the published view.

mod common;

use chrono::Duration;
use common::*;
use num_bigint::BigInt;
use soroshark::sync::campaign::{BALANCE, EQUITY};
use soroshark::sync::{FeedEvent, RefreshToken, ViewState};
use std::sync::Arc;

#[tokio::test]
async fn slow_batch_of_old_token_is_discarded() {
    let gateway = Arc::new(ScriptedGateway::campaign(1000, 5000, clock() + Duration::hours(1)));
    let feed = Arc::new(ScriptedFeed::new(16));
    let session = session(&gateway, &feed);

    let gate = gateway.hold();
    let first = session.mount();
    assert_eq!(first.token(), RefreshToken::initial());
    eventually(|| gateway.calls() == 6).await;

    gateway.release();
    gateway.set(TOKEN, "balance", vec![CROWDFUND.into()], 2000i64.into());
    let state = within(session.refresh().settled()).await;
    assert_eq!(state.token(), Some(RefreshToken::new(2)));

    // Let the first cycle's reads complete after the second one published.
    let _ = gate.send(true);
    tokio::task::yield_now().await;
    feed.subscribers(2).await;

    let model = session.state().model().cloned().unwrap();
    assert_eq!(model.token(), RefreshToken::new(2));
    assert_eq!(model.amount(EQUITY, BALANCE), Some(&BigInt::from(2000)));
    assert!(session.stats().stale_discards >= 1);
    assert_eq!(session.stats().cycles_published, 1);
}

#[tokio::test]
async fn events_from_old_subscriptions_are_ignored() {
    let gateway = Arc::new(ScriptedGateway::campaign(1000, 5000, clock() + Duration::hours(1)));
    let feed = Arc::new(ScriptedFeed::new(16));
    let session = session(&gateway, &feed);

    within(session.mount().settled()).await;
    feed.subscribers(2).await;

    let gate = gateway.hold();
    let second = session.refresh();
    assert_eq!(session.state(), ViewState::Loading { token: second.token() });

    // The first token's subscriptions are cancelled with its cycle.
    feed.subscribers(0).await;
    feed.notify(CROWDFUND, topic_pledged(), FeedEvent::new(4000i64.into()));
    feed.notify(CROWDFUND, topic_target_reached(), FeedEvent::signal());
    assert_eq!(session.state(), ViewState::Loading { token: second.token() });

    let _ = gate.send(true);
    let state = within(second.clone().settled()).await;
    let model = state.model().cloned().unwrap();
    assert_eq!(model.token(), RefreshToken::new(2));
    assert_eq!(model.amount(EQUITY, BALANCE), Some(&BigInt::from(1000)));
    assert!(!session.snapshot_at(clock()).unwrap().target_reached);
    assert_eq!(session.stats().events_applied, 0);
}

#[tokio::test]
async fn refresh_storm_publishes_latest_only() {
    let gateway = Arc::new(ScriptedGateway::campaign(1000, 5000, clock() + Duration::hours(1)));
    let feed = Arc::new(ScriptedFeed::new(16));
    let session = session(&gateway, &feed);

    let gate = gateway.hold();
    session.mount();
    for _ in 0..4 {
        session.refresh();
    }
    gateway.release();
    let last = session.refresh();
    assert_eq!(last.token(), RefreshToken::new(6));

    let state = within(last.clone().settled()).await;
    assert_eq!(state.token(), Some(RefreshToken::new(6)));
    let _ = gate.send(true);
    tokio::task::yield_now().await;

    assert_eq!(session.state().token(), Some(RefreshToken::new(6)));
    assert_eq!(session.stats().cycles_started, 6);
    assert_eq!(session.stats().cycles_published, 1);
}
