//! Snapshot cache with per-case state and single-flight rebuilds
//!
//! The index is a bounded LRU of case slots. Each slot carries:
//! - a build lock, so at most one rebuild per case is in flight
//! - the case state and the last built snapshot
//!
//! State transitions per case:
//!
//! ```text
//! UNBUILT --build--> BUILT --version bump--> STALE --rebuild--> BUILT
//! ```
//!
//! A STALE snapshot is kept (a failed rebuild leaves it in place) but never served.

use crate::EngineError;
use lexgraph_domain::{CaseId, GraphSnapshot};
use lru::LruCache;
use serde::{Deserialize, Serialize};
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex, RwLock};

/// Lifecycle state of one case in the cache
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CaseState {
    /// No snapshot has been built
    Unbuilt,

    /// The cached snapshot matches the last observed source version
    Built,

    /// The source version moved past the cached snapshot
    Stale,
}

impl CaseState {
    /// Validate a transition and return the new state
    ///
    /// # Errors
    /// `Internal` for any transition outside the lifecycle
    pub fn transition(self, to: CaseState) -> Result<CaseState, EngineError> {
        match (self, to) {
            (CaseState::Unbuilt, CaseState::Built)
            | (CaseState::Built, CaseState::Stale)
            | (CaseState::Stale, CaseState::Built) => Ok(to),
            _ => Err(EngineError::Internal(format!(
                "invalid case state transition {:?} -> {:?}",
                self, to
            ))),
        }
    }
}

#[derive(Debug)]
struct SlotState {
    state: CaseState,
    snapshot: Option<Arc<GraphSnapshot>>,
}

/// Cache entry for one case
#[derive(Debug)]
pub(crate) struct CaseSlot {
    pub(crate) build_lock: tokio::sync::Mutex<()>,
    inner: RwLock<SlotState>,
}

impl CaseSlot {
    fn new() -> Self {
        Self {
            build_lock: tokio::sync::Mutex::new(()),
            inner: RwLock::new(SlotState {
                state: CaseState::Unbuilt,
                snapshot: None,
            }),
        }
    }

    fn read(&self) -> Result<std::sync::RwLockReadGuard<'_, SlotState>, EngineError> {
        self.inner
            .read()
            .map_err(|_| EngineError::Internal("case slot lock poisoned".to_string()))
    }

    fn write(&self) -> Result<std::sync::RwLockWriteGuard<'_, SlotState>, EngineError> {
        self.inner
            .write()
            .map_err(|_| EngineError::Internal("case slot lock poisoned".to_string()))
    }

    pub(crate) fn state(&self) -> Result<CaseState, EngineError> {
        Ok(self.read()?.state)
    }

    /// The cached snapshot, if BUILT at `version` or later
    pub(crate) fn fresh(&self, version: u64) -> Result<Option<Arc<GraphSnapshot>>, EngineError> {
        let inner = self.read()?;
        if inner.state != CaseState::Built {
            return Ok(None);
        }
        Ok(inner
            .snapshot
            .as_ref()
            .filter(|s| s.version() >= version)
            .cloned())
    }

    /// Move BUILT to STALE when the source has a newer version
    pub(crate) fn observe_version(&self, version: u64) -> Result<(), EngineError> {
        let mut inner = self.write()?;
        let behind = inner
            .snapshot
            .as_ref()
            .is_some_and(|s| s.version() < version);
        if inner.state == CaseState::Built && behind {
            inner.state = inner.state.transition(CaseState::Stale)?;
        }
        Ok(())
    }

    /// Install a freshly built snapshot
    pub(crate) fn install(&self, snapshot: Arc<GraphSnapshot>) -> Result<(), EngineError> {
        let mut inner = self.write()?;
        inner.state = inner.state.transition(CaseState::Built)?;
        inner.snapshot = Some(snapshot);
        Ok(())
    }
}

/// Bounded index from case id to slot
#[derive(Debug)]
pub(crate) struct SnapshotCache {
    slots: Mutex<LruCache<CaseId, Arc<CaseSlot>>>,
}

impl SnapshotCache {
    pub(crate) fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            slots: Mutex::new(LruCache::new(capacity)),
        }
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, LruCache<CaseId, Arc<CaseSlot>>>, EngineError> {
        self.slots
            .lock()
            .map_err(|_| EngineError::Internal("snapshot cache lock poisoned".to_string()))
    }

    /// Slot for a case, created if absent
    ///
    /// Returns the slot and the case evicted to make room, if any. Slots with a
    /// build in flight are skipped when choosing the victim, so a rebuilding
    /// case keeps its single build lock. Only when every slot is building does
    /// the least recently used one go regardless.
    pub(crate) fn slot(&self, case_id: &CaseId) -> Result<(Arc<CaseSlot>, Option<CaseId>), EngineError> {
        let mut slots = self.lock()?;
        if let Some(slot) = slots.get(case_id) {
            return Ok((slot.clone(), None));
        }

        let mut evicted = None;
        if slots.len() >= slots.cap().get() {
            // Iteration runs most to least recently used
            let idle = slots
                .iter()
                .rev()
                .find(|(_, slot)| slot.build_lock.try_lock().is_ok())
                .map(|(id, _)| id.clone());
            if let Some(id) = idle {
                slots.pop(&id);
                evicted = Some(id);
            }
        }

        let slot = Arc::new(CaseSlot::new());
        let displaced = slots.push(case_id.clone(), slot.clone()).map(|(id, _)| id);
        Ok((slot, evicted.or(displaced)))
    }

    /// State of a case without touching its recency
    pub(crate) fn state(&self, case_id: &CaseId) -> Result<CaseState, EngineError> {
        let slot = self.lock()?.peek(case_id).cloned();
        match slot {
            Some(slot) => slot.state(),
            None => Ok(CaseState::Unbuilt),
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.lock().map(|slots| slots.len()).unwrap_or(0)
    }
}
