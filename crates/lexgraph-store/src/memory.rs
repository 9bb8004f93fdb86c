//! In-memory case store for tests and demos

use lexgraph_domain::{CaseId, CaseStore, EntityRecord, RelationshipRecord, UpstreamError};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use thiserror::Error;

/// Errors returned by [`MemoryCaseStore`]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MemoryStoreError {
    /// Case not found
    #[error("Case not found: {0}")]
    CaseNotFound(String),

    /// The outage switch is on
    #[error("Store unavailable")]
    Unavailable,
}

impl From<MemoryStoreError> for UpstreamError {
    fn from(e: MemoryStoreError) -> Self {
        match e {
            MemoryStoreError::CaseNotFound(case_id) => UpstreamError::NotFound(case_id),
            other => UpstreamError::Unavailable(other.to_string()),
        }
    }
}

#[derive(Debug, Default, Clone)]
struct CaseData {
    version: u64,
    entities: Vec<EntityRecord>,
    relationships: Vec<RelationshipRecord>,
}

/// In-memory implementation of CaseStore
///
/// Mutations bump the case version like the SQLite store. For exercising the
/// engine it also offers:
/// - a fixed latency added to every entity fetch
/// - an outage switch that makes every call fail, and one for record fetches only
/// - counters for version checks and entity fetches
#[derive(Debug, Default)]
pub struct MemoryCaseStore {
    cases: Mutex<HashMap<CaseId, CaseData>>,
    latency: Mutex<Duration>,
    unavailable: AtomicBool,
    fetches_unavailable: AtomicBool,
    version_checks: AtomicUsize,
    fetches: AtomicUsize,
}

impl MemoryCaseStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty store whose entity fetches take at least `latency`
    pub fn with_latency(latency: Duration) -> Self {
        let store = Self::default();
        store.set_latency(latency);
        store
    }

    fn cases(&self) -> MutexGuard<'_, HashMap<CaseId, CaseData>> {
        // Test double: a poisoned lock only follows a panicking test thread
        self.cases.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Replace a case's records wholesale; returns the new version
    pub fn put_case(
        &self,
        case_id: impl Into<CaseId>,
        entities: Vec<EntityRecord>,
        relationships: Vec<RelationshipRecord>,
    ) -> u64 {
        let mut cases = self.cases();
        let data = cases.entry(case_id.into()).or_default();
        data.entities = entities;
        data.relationships = relationships;
        data.version += 1;
        data.version
    }

    /// Append an entity record; returns the new version
    pub fn add_entity(&self, case_id: impl Into<CaseId>, entity: EntityRecord) -> u64 {
        let mut cases = self.cases();
        let data = cases.entry(case_id.into()).or_default();
        data.entities.push(entity);
        data.version += 1;
        data.version
    }

    /// Append a relationship record; returns the new version
    pub fn add_relationship(&self, case_id: impl Into<CaseId>, relationship: RelationshipRecord) -> u64 {
        let mut cases = self.cases();
        let data = cases.entry(case_id.into()).or_default();
        data.relationships.push(relationship);
        data.version += 1;
        data.version
    }

    /// Bump a case's version without changing its records
    pub fn touch(&self, case_id: impl Into<CaseId>) -> u64 {
        let mut cases = self.cases();
        let data = cases.entry(case_id.into()).or_default();
        data.version += 1;
        data.version
    }

    /// Set the latency added to entity fetches
    pub fn set_latency(&self, latency: Duration) {
        *self.latency.lock().unwrap_or_else(|e| e.into_inner()) = latency;
    }

    /// Turn the outage switch on (`false`) or off (`true`)
    pub fn set_available(&self, available: bool) {
        self.unavailable.store(!available, Ordering::SeqCst);
    }

    /// Make record fetches fail (`false`) while version checks keep working
    pub fn set_fetches_available(&self, available: bool) {
        self.fetches_unavailable.store(!available, Ordering::SeqCst);
    }

    /// Number of `current_version` calls so far
    pub fn version_checks(&self) -> usize {
        self.version_checks.load(Ordering::SeqCst)
    }

    /// Number of `fetch_entities` calls so far
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    fn check_available(&self) -> Result<(), MemoryStoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(MemoryStoreError::Unavailable);
        }
        Ok(())
    }

    fn check_fetches_available(&self) -> Result<(), MemoryStoreError> {
        if self.fetches_unavailable.load(Ordering::SeqCst) {
            return Err(MemoryStoreError::Unavailable);
        }
        Ok(())
    }

    fn with_case<T>(
        &self,
        case_id: &CaseId,
        read: impl FnOnce(&CaseData) -> T,
    ) -> Result<T, MemoryStoreError> {
        self.check_available()?;
        self.cases()
            .get(case_id)
            .map(read)
            .ok_or_else(|| MemoryStoreError::CaseNotFound(case_id.to_string()))
    }
}

impl CaseStore for MemoryCaseStore {
    type Error = MemoryStoreError;

    fn current_version(&self, case_id: &CaseId) -> Result<u64, Self::Error> {
        self.version_checks.fetch_add(1, Ordering::SeqCst);
        self.with_case(case_id, |data| data.version)
    }

    fn fetch_entities(&self, case_id: &CaseId) -> Result<Vec<EntityRecord>, Self::Error> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        let latency = *self.latency.lock().unwrap_or_else(|e| e.into_inner());
        if !latency.is_zero() {
            std::thread::sleep(latency);
        }
        self.check_fetches_available()?;
        self.with_case(case_id, |data| data.entities.clone())
    }

    fn fetch_relationships(&self, case_id: &CaseId) -> Result<Vec<RelationshipRecord>, Self::Error> {
        self.check_fetches_available()?;
        self.with_case(case_id, |data| data.relationships.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_versions_and_counters() {
        let store = MemoryCaseStore::new();
        assert_eq!(
            store.put_case("c1", vec![EntityRecord::new("c1", "case", "C1")], vec![]),
            1
        );
        assert_eq!(store.touch("c1"), 2);

        let case = CaseId::from("c1");
        assert_eq!(store.current_version(&case).unwrap(), 2);
        assert_eq!(store.fetch_entities(&case).unwrap().len(), 1);
        assert_eq!(store.version_checks(), 1);
        assert_eq!(store.fetch_count(), 1);
    }

    #[test]
    fn test_outage_switch() {
        let store = MemoryCaseStore::new();
        store.touch("c1");
        store.set_available(false);

        let case = CaseId::from("c1");
        assert_eq!(store.current_version(&case), Err(MemoryStoreError::Unavailable));
        assert_eq!(store.fetch_relationships(&case), Err(MemoryStoreError::Unavailable));

        store.set_available(true);
        assert!(store.current_version(&case).is_ok());
    }

    #[test]
    fn test_fetch_outage_keeps_versions() {
        let store = MemoryCaseStore::new();
        store.touch("c1");
        store.set_fetches_available(false);

        let case = CaseId::from("c1");
        assert_eq!(store.current_version(&case), Ok(1));
        assert_eq!(store.fetch_entities(&case), Err(MemoryStoreError::Unavailable));
        // Failed fetches still count
        assert_eq!(store.fetch_count(), 1);
    }

    #[test]
    fn test_unknown_case_maps_to_not_found() {
        let store = MemoryCaseStore::new();
        let err = store.current_version(&CaseId::from("nope")).unwrap_err();
        assert_eq!(UpstreamError::from(err), UpstreamError::NotFound("nope".to_string()));
    }
}
