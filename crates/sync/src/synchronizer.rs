//! The view synchronizer.
//!
//! One synchronizer serves one mounted view. Each refresh token starts a
//! cycle:
//!
//! 1. every declared field is read concurrently; the cycle waits for all of
//!    them or fails on the first rejection,
//! 2. the merged model is published exactly once,
//! 3. only then are event subscriptions opened, and their events patch the
//!    published model in delivery order.
//!
//! A newer token cancels the previous cycle's reads and subscriptions through
//! its [`DropGuard`]. Cancellation is best effort, so every completion point
//! also compares its token with the published one under the `watch` sender
//! lock and discards itself when superseded.

use crate::definition::{ContractGroup, FieldDecl, ViewDefinition};
use crate::error::{GatewayError, SyncError, SyncResult};
use crate::event::ContractEvent;
use crate::gateway::{EventFeed, ReadGateway};
use crate::stats::{Counters, SyncStats};
use crate::token::RefreshToken;
use crate::view_model::{ContractViewModel, FieldRead, ViewState};
use futures::future::try_join_all;
use futures::stream::{self, StreamExt};
use parking_lot::{Mutex, RwLock};
use soroshark_config::SyncConfig;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::{debug, info, warn};

/// Outcome of a token-checked state update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Update {
    Changed,
    Unchanged,
    Stale,
}

struct Cycle {
    token: RefreshToken,
    definition: Arc<ViewDefinition>,
    cancel: CancellationToken,
    _guard: DropGuard,
    subscriptions: Option<DropGuard>,
}

impl Cycle {
    fn new(token: RefreshToken, definition: Arc<ViewDefinition>) -> Self {
        let cancel = CancellationToken::new();
        Self {
            token,
            definition,
            _guard: cancel.clone().drop_guard(),
            cancel,
            subscriptions: None,
        }
    }
}

#[derive(Default)]
struct CycleSlot {
    current: Option<Cycle>,
    closed: bool,
}

struct Inner<G, F> {
    gateway: Arc<G>,
    feed: Arc<F>,
    definition: RwLock<Arc<ViewDefinition>>,
    config: SyncConfig,
    state: watch::Sender<ViewState>,
    slot: Mutex<CycleSlot>,
    counters: Counters,
}

/// Keeps a [`ContractViewModel`] consistent with remote contract state.
///
/// Dropping the synchronizer closes it and cancels every open subscription.
pub struct ViewSynchronizer<G, F> {
    inner: Arc<Inner<G, F>>,
}

/// Watches the view published for one refresh token.
#[derive(Debug, Clone)]
pub struct ViewHandle {
    token: RefreshToken,
    receiver: watch::Receiver<ViewState>,
}

impl ViewHandle {
    pub fn token(&self) -> RefreshToken {
        self.token
    }

    /// The currently published state, whatever its token.
    pub fn state(&self) -> ViewState {
        self.receiver.borrow().clone()
    }

    /// Waits until this handle's cycle publishes or fails, or a newer token
    /// supersedes it, and returns that state.
    pub async fn settled(&mut self) -> ViewState {
        let token = self.token;
        let result = self
            .receiver
            .wait_for(|state| !matches!(state, ViewState::Loading { token: t } if *t == token))
            .await
            .map(|state| state.clone());
        match result {
            Ok(state) => state,
            Err(_) => ViewState::Closed,
        }
    }

    pub fn receiver(&self) -> watch::Receiver<ViewState> {
        self.receiver.clone()
    }
}

impl<G, F> ViewSynchronizer<G, F>
where
    G: ReadGateway + 'static,
    F: EventFeed + 'static,
{
    /// Creates an idle synchronizer. Nothing is read until [`Self::synchronize`].
    pub fn new(
        gateway: Arc<G>,
        feed: Arc<F>,
        definition: ViewDefinition,
        config: SyncConfig,
    ) -> SyncResult<Self> {
        definition.validate()?;
        let (state, _) = watch::channel(ViewState::Idle);
        Ok(Self {
            inner: Arc::new(Inner {
                gateway,
                feed,
                definition: RwLock::new(Arc::new(definition)),
                config,
                state,
                slot: Mutex::new(CycleSlot::default()),
                counters: Counters::default(),
            }),
        })
    }

    /// Starts a cycle for `token`, superseding any older cycle.
    ///
    /// A token not newer than the latest one is stale: it is counted and the
    /// returned handle simply observes the current view.
    pub fn synchronize(&self, token: RefreshToken) -> ViewHandle {
        let handle = ViewHandle {
            token,
            receiver: self.inner.state.subscribe(),
        };

        let Some((cancel, definition)) = self.inner.advance(token) else {
            Counters::bump(&self.inner.counters.stale_discards);
            debug!(%token, "ignoring synchronize for superseded token");
            return handle;
        };

        Counters::bump(&self.inner.counters.cycles_started);
        debug!(%token, reads = definition.field_count(), "starting sync cycle");
        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move { inner.run_cycle(token, cancel, definition).await });
        handle
    }

    /// Makes `token` the latest and cancels everything tied to older tokens
    /// without starting new reads. Returns `false` if `token` is not newer.
    pub fn invalidate(&self, token: RefreshToken) -> bool {
        self.inner.advance(token).is_some()
    }

    /// Reopens the current token's subscriptions without re-reading.
    ///
    /// Merged fields are kept and the degraded flag is cleared. Returns
    /// `false` when no view is published for the latest token.
    pub fn resubscribe(&self) -> bool {
        let Some(token) = self.latest_token() else {
            return false;
        };
        if !matches!(self.inner.state.borrow().model(), Some(model) if model.token() == token) {
            return false;
        }
        info!(%token, "resubscribing to contract events");
        self.inner.set_degraded(token, false);
        self.inner.open_subscriptions(token);
        true
    }
}

impl<G, F> ViewSynchronizer<G, F> {
    /// A receiver of every published state.
    pub fn view(&self) -> watch::Receiver<ViewState> {
        self.inner.state.subscribe()
    }

    /// The currently published state.
    pub fn current(&self) -> ViewState {
        self.inner.state.borrow().clone()
    }

    pub fn latest_token(&self) -> Option<RefreshToken> {
        self.inner.slot.lock().current.as_ref().map(|cycle| cycle.token)
    }

    /// The definition the next cycle will read.
    pub fn definition(&self) -> Arc<ViewDefinition> {
        Arc::clone(&self.inner.definition.read())
    }

    /// Replaces the definition from the next [`ViewSynchronizer::synchronize`]
    /// on. Running cycles and the published model keep the one they started with.
    pub fn redefine(&self, definition: ViewDefinition) -> SyncResult<()> {
        definition.validate()?;
        *self.inner.definition.write() = Arc::new(definition);
        debug!("view definition replaced");
        Ok(())
    }

    pub fn stats(&self) -> SyncStats {
        self.inner.counters.snapshot()
    }

    /// Cancels all work and publishes [`ViewState::Closed`].
    pub fn close(&self) {
        self.inner.close();
    }
}

impl<G, F> Drop for ViewSynchronizer<G, F> {
    fn drop(&mut self) {
        self.inner.close();
    }
}

impl<G, F> Inner<G, F> {
    /// Installs a cycle for `token` if it is newer than the current one,
    /// cancelling the previous cycle. Returns the new cycle's cancel token and
    /// the definition it reads.
    fn advance(&self, token: RefreshToken) -> Option<(CancellationToken, Arc<ViewDefinition>)> {
        let mut slot = self.slot.lock();
        if slot.closed || slot.current.as_ref().is_some_and(|c| token <= c.token) {
            return None;
        }

        // Publish the new token first so late completions of the old cycle
        // fail their token check.
        self.state.send_modify(|state| *state = ViewState::Loading { token });

        let definition = Arc::clone(&self.definition.read());
        let cycle = Cycle::new(token, Arc::clone(&definition));
        let cancel = cycle.cancel.clone();
        if let Some(previous) = slot.current.replace(cycle) {
            debug!(previous = %previous.token, %token, "cancelling superseded cycle");
        }
        Some((cancel, definition))
    }

    fn close(&self) {
        let mut slot = self.slot.lock();
        if slot.closed {
            return;
        }
        slot.closed = true;
        slot.current = None;
        self.state.send_modify(|state| *state = ViewState::Closed);
        debug!("view synchronizer closed");
    }

    /// Runs `patch` on the published state iff it still belongs to `token`.
    fn update(&self, token: RefreshToken, patch: impl FnOnce(&mut ViewState) -> bool) -> Update {
        let mut outcome = Update::Stale;
        self.state.send_if_modified(|state| {
            if state.token() != Some(token) {
                return false;
            }
            let changed = patch(state);
            outcome = if changed { Update::Changed } else { Update::Unchanged };
            changed
        });
        if outcome == Update::Stale {
            Counters::bump(&self.counters.stale_discards);
            debug!(%token, "discarding result of superseded token");
        }
        outcome
    }

    fn set_degraded(&self, token: RefreshToken, degraded: bool) {
        self.update(token, |state| match state {
            ViewState::Ready(model) if model.is_degraded() != degraded => {
                *model = Arc::new(model.with_degraded(degraded));
                true
            }
            _ => false,
        });
    }

    fn handle_event(&self, token: RefreshToken, event: ContractEvent) {
        let mut failure = None;
        let outcome = self.update(token, |state| {
            let ViewState::Ready(model) = state else {
                return false;
            };
            match model.apply_event(&event) {
                Ok(Some(next)) => {
                    *model = Arc::new(next);
                    true
                }
                Ok(None) => false,
                Err(err) => {
                    failure = Some(err);
                    false
                }
            }
        });

        if let Some(err) = failure {
            Counters::bump(&self.counters.decode_failures);
            warn!(%token, error = %err, "dropping undecodable event");
            return;
        }
        match outcome {
            Update::Changed => {
                Counters::bump(&self.counters.events_applied);
                debug!(%token, group = %event.group, topic = %event.topic, "event applied");
            }
            Update::Unchanged => {
                Counters::bump(&self.counters.events_ignored);
                debug!(
                    %token,
                    group = %event.group,
                    topic = %event.topic,
                    "event left view unchanged"
                );
            }
            Update::Stale => {}
        }
    }

    fn subscription_failed(&self, token: RefreshToken, err: &SyncError) {
        Counters::bump(&self.counters.subscription_failures);
        warn!(%token, error = %err, "event subscription degraded");
        self.set_degraded(token, true);
    }
}

impl<G, F> Inner<G, F>
where
    G: ReadGateway + 'static,
    F: EventFeed + 'static,
{
    async fn run_cycle(
        self: Arc<Self>,
        token: RefreshToken,
        cancel: CancellationToken,
        definition: Arc<ViewDefinition>,
    ) {
        let batch = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                Counters::bump(&self.counters.stale_discards);
                debug!(%token, "read batch cancelled");
                return;
            }
            batch = self.read_batch(&definition) => batch,
        };

        match batch {
            Ok(reads) => {
                let model = ContractViewModel::from_reads(
                    token,
                    definition,
                    reads,
                    self.config.dedup_window,
                );
                let outcome = self.update(token, |state| {
                    *state = ViewState::Ready(Arc::new(model));
                    true
                });
                if outcome == Update::Changed {
                    Counters::bump(&self.counters.cycles_published);
                    info!(%token, "contract view published");
                    self.open_subscriptions(token);
                }
            }
            Err(err) => {
                let reason = err.to_string();
                let outcome = self.update(token, |state| {
                    *state = ViewState::Unavailable { token, reason };
                    true
                });
                if outcome == Update::Changed {
                    Counters::bump(&self.counters.read_failures);
                    warn!(%token, error = %err, "read batch failed, view unavailable");
                }
            }
        }
    }

    async fn read_batch(&self, definition: &ViewDefinition) -> SyncResult<Vec<FieldRead>> {
        let timeout = Duration::from_millis(self.config.read_timeout_ms);
        let reads = definition.groups.iter().flat_map(|group| {
            group
                .fields
                .iter()
                .map(move |field| self.read_field(group, field, timeout))
        });
        try_join_all(reads).await
    }

    async fn read_field(
        &self,
        group: &ContractGroup,
        field: &FieldDecl,
        timeout: Duration,
    ) -> SyncResult<FieldRead> {
        let failure = |message: String| SyncError::ReadFailure {
            group: group.name.clone(),
            field: field.key.clone(),
            message,
        };

        let read = self.gateway.read(&group.identity, &field.method, &field.args);
        let value = match tokio::time::timeout(timeout, read).await {
            Ok(Ok(value)) => value,
            Ok(Err(err)) => return Err(failure(err.to_string())),
            Err(_) => {
                let err = GatewayError::Timeout {
                    contract: group.identity.to_string(),
                    method: field.method.clone(),
                    timeout_ms: self.config.read_timeout_ms,
                };
                return Err(failure(err.to_string()));
            }
        };

        let value = field
            .kind
            .decode(&value)
            .map_err(|err| failure(err.to_string()))?;
        Ok(FieldRead {
            group: group.name.clone(),
            key: field.key.clone(),
            value,
        })
    }

    /// Opens subscriptions for `token`, replacing any already open for it.
    fn open_subscriptions(self: &Arc<Self>, token: RefreshToken) {
        let (cancel, definition) = {
            let mut slot = self.slot.lock();
            let Some(cycle) = slot.current.as_mut().filter(|cycle| cycle.token == token) else {
                Counters::bump(&self.counters.stale_discards);
                return;
            };
            let cancel = cycle.cancel.child_token();
            cycle.subscriptions = Some(cancel.clone().drop_guard());
            (cancel, Arc::clone(&cycle.definition))
        };

        let inner = Arc::clone(self);
        tokio::spawn(async move { inner.run_subscriptions(token, cancel, definition).await });
    }

    async fn run_subscriptions(
        self: Arc<Self>,
        token: RefreshToken,
        cancel: CancellationToken,
        definition: Arc<ViewDefinition>,
    ) {
        let mut streams = Vec::new();
        for (group, topic) in definition.subscriptions() {
            let opened = tokio::select! {
                biased;
                _ = cancel.cancelled() => return,
                opened = self.feed.subscribe(&group.identity, &topic.topic) => opened,
            };
            match opened {
                Ok(events) => {
                    debug!(%token, group = %group.name, topic = %topic.topic, "subscribed");
                    let (name, topic) = (group.name.clone(), topic.topic.clone());
                    streams.push(
                        events
                            .map(move |item| (name.clone(), topic.clone(), item))
                            .boxed(),
                    );
                }
                Err(source) => {
                    let err = SyncError::SubscriptionFailure {
                        group: group.name.clone(),
                        topic: topic.topic.clone(),
                        source,
                    };
                    self.subscription_failed(token, &err);
                }
            }
        }

        if streams.is_empty() {
            return;
        }

        let mut merged = stream::select_all(streams);
        loop {
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => return,
                next = merged.next() => next,
            };
            match next {
                Some((group, topic, Ok(event))) => {
                    self.handle_event(token, ContractEvent::new(group, topic, event));
                }
                Some((group, topic, Err(source))) => {
                    let err = SyncError::SubscriptionFailure { group, topic, source };
                    self.subscription_failed(token, &err);
                }
                None => {
                    let err = SyncError::SubscriptionFailure {
                        group: "*".into(),
                        topic: "*".into(),
                        source: GatewayError::Feed("all subscriptions ended".into()),
                    };
                    self.subscription_failed(token, &err);
                    return;
                }
            }
        }
    }
}
