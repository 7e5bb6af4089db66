use anyhow::{bail, Result};
use soroshark_sync::{CampaignSession, EventFeed, ReadGateway, ViewState};
use std::future;
use std::time::Duration;
use tokio::signal;
use tokio::time::{self, Interval, MissedTickBehavior};
use tracing::{debug, error, info, warn};

/// Options for the watch loop.
#[derive(Debug, Clone, Copy, Default)]
pub struct WatchOptions {
    pub once: bool,
    pub refresh_interval: Option<Duration>,
}

/// Mounts the session, prints every published view and unmounts on Ctrl-C.
pub async fn run<G, F>(session: CampaignSession<G, F>, options: WatchOptions) -> Result<()>
where
    G: ReadGateway + 'static,
    F: EventFeed + 'static,
{
    let mut view = session.view();
    let state = session.mount().settled().await;
    view.borrow_and_update();
    report(&session, &state);

    if options.once {
        session.unmount();
        if let ViewState::Unavailable { reason, .. } = state {
            bail!("campaign view unavailable: {reason}");
        }
        return Ok(());
    }

    let mut ticker = options.refresh_interval.map(|period| {
        let mut ticker = time::interval_at(time::Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker
    });

    let shutdown = signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            result = &mut shutdown => {
                if let Err(err) = result {
                    error!(error = %err, "failed to wait for shutdown signal");
                } else {
                    info!("shutdown signal received (Ctrl+C)");
                }
                break;
            }
            changed = view.changed() => {
                if changed.is_err() {
                    break;
                }
                let state = view.borrow_and_update().clone();
                report(&session, &state);
            }
            _ = tick(&mut ticker) => {
                let handle = session.refresh();
                debug!(token = %handle.token(), "periodic refresh");
            }
        }
    }

    session.unmount();
    info!(stats = ?session.stats(), "campaign view unmounted");
    Ok(())
}

async fn tick(ticker: &mut Option<Interval>) {
    match ticker {
        Some(ticker) => {
            ticker.tick().await;
        }
        None => future::pending().await,
    }
}

fn report<G, F>(session: &CampaignSession<G, F>, state: &ViewState) {
    match state {
        ViewState::Idle | ViewState::Closed => {}
        ViewState::Loading { token } => debug!(%token, "loading campaign view"),
        ViewState::Ready(model) => match session.snapshot() {
            Some(snapshot) => println!("{snapshot}"),
            None => warn!(token = %model.token(), "published view lacks campaign fields"),
        },
        ViewState::Unavailable { token, reason } => {
            warn!(%token, %reason, "campaign view unavailable");
        }
    }
}
