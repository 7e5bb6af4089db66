use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering::Relaxed};

/// Point-in-time copy of the synchronizer counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SyncStats {
    pub cycles_started: u64,
    pub cycles_published: u64,
    pub read_failures: u64,
    pub events_applied: u64,
    pub events_ignored: u64,
    pub decode_failures: u64,
    pub subscription_failures: u64,
    /// Results and events dropped because their refresh token was superseded
    pub stale_discards: u64,
}

#[derive(Debug, Default)]
pub(crate) struct Counters {
    pub cycles_started: AtomicU64,
    pub cycles_published: AtomicU64,
    pub read_failures: AtomicU64,
    pub events_applied: AtomicU64,
    pub events_ignored: AtomicU64,
    pub decode_failures: AtomicU64,
    pub subscription_failures: AtomicU64,
    pub stale_discards: AtomicU64,
}

impl Counters {
    #[inline]
    pub fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Relaxed);
    }

    pub fn snapshot(&self) -> SyncStats {
        SyncStats {
            cycles_started: self.cycles_started.load(Relaxed),
            cycles_published: self.cycles_published.load(Relaxed),
            read_failures: self.read_failures.load(Relaxed),
            events_applied: self.events_applied.load(Relaxed),
            events_ignored: self.events_ignored.load(Relaxed),
            decode_failures: self.decode_failures.load(Relaxed),
            subscription_failures: self.subscription_failures.load(Relaxed),
            stale_discards: self.stale_discards.load(Relaxed),
        }
    }
}
