use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use crate::domain::ListingKind;

/// In-memory run guard, one flag per listing kind.
#[derive(Debug, Default)]
pub struct SyncLocks {
    active: [AtomicBool; 2],
}

impl SyncLocks {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Claim the flag for `kind`. `None` when a run of that kind already holds it.
    pub fn try_acquire(self: &Arc<Self>, kind: ListingKind) -> Option<SyncGuard> {
        self.active[kind.index()]
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| SyncGuard {
                locks: Arc::clone(self),
                kind,
            })
    }

    pub fn is_active(&self, kind: ListingKind) -> bool {
        self.active[kind.index()].load(Ordering::Acquire)
    }
}

/// Releases its flag when dropped, whichever way the run ends.
#[derive(Debug)]
pub struct SyncGuard {
    locks: Arc<SyncLocks>,
    kind: ListingKind,
}

impl SyncGuard {
    pub fn kind(&self) -> ListingKind {
        self.kind
    }
}

impl Drop for SyncGuard {
    fn drop(&mut self) {
        self.locks.active[self.kind.index()].store(false, Ordering::Release);
    }
}
