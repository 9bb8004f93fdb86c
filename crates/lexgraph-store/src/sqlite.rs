//! SQLite-backed case store

use crate::StoreError;
use lexgraph_domain::{CaseId, CaseStore, EntityRecord, RelationshipRecord};
use rusqlite::{params, Connection, OptionalExtension, Transaction};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

/// SQLite-based implementation of CaseStore
///
/// Stores raw entity and relationship records per case. Writes run in a
/// transaction that also bumps the case version, so a reader never sees new
/// records under an old version.
///
/// # Thread Safety
///
/// The connection is guarded by a mutex; the store can be shared across
/// threads behind an `Arc`.
pub struct SqliteCaseStore {
    conn: Mutex<Connection>,
}

impl SqliteCaseStore {
    /// Create a new SqliteCaseStore with the given database path
    ///
    /// Use `:memory:` for an in-memory database (useful for testing).
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        conn.execute_batch(include_str!("schema.sql"))?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn.lock().map_err(|_| StoreError::LockPoisoned)
    }

    /// Register a case without records; returns its current version
    pub fn create_case(&self, case_id: &CaseId) -> Result<u64, StoreError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        tx.execute(
            "INSERT OR IGNORE INTO cases (case_id, version) VALUES (?1, 0)",
            params![case_id.as_str()],
        )?;
        let version = Self::version_in(&tx, case_id)?;
        tx.commit()?;
        Ok(version)
    }

    /// Add an entity record to a case; returns the new case version
    pub fn put_entity(&self, case_id: &CaseId, entity: &EntityRecord) -> Result<u64, StoreError> {
        let case_refs = serde_json::to_string(&entity.case_refs)?;
        let attributes = serde_json::to_string(&entity.attributes)?;

        self.write(case_id, |tx| {
            tx.execute(
                "INSERT INTO entities (case_id, external_id, kind, display_name, case_refs, attributes, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    case_id.as_str(),
                    &entity.external_id,
                    &entity.kind,
                    &entity.display_name,
                    &case_refs,
                    &attributes,
                    entity.updated_at.map(|t| t as i64),
                ],
            )?;
            Ok(())
        })
    }

    /// Add a relationship record to a case; returns the new case version
    pub fn put_relationship(
        &self,
        case_id: &CaseId,
        relationship: &RelationshipRecord,
    ) -> Result<u64, StoreError> {
        self.write(case_id, |tx| {
            tx.execute(
                "INSERT INTO relationships (case_id, source_id, target_id, relation, confidence, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    case_id.as_str(),
                    &relationship.source_id,
                    &relationship.target_id,
                    &relationship.relation,
                    relationship.confidence,
                    relationship.updated_at.map(|t| t as i64),
                ],
            )?;
            Ok(())
        })
    }

    /// Remove every relationship `source -[relation]-> target` from a case
    ///
    /// Returns the new case version; `CaseNotFound` for an unknown case and
    /// `RecordNotFound` if no relationship matched.
    pub fn remove_relationship(
        &self,
        case_id: &CaseId,
        source_id: &str,
        target_id: &str,
        relation: &str,
    ) -> Result<u64, StoreError> {
        // Cases are never deleted, so the check holds for the write below
        Self::version_in(&*self.lock()?, case_id)?;

        self.write(case_id, |tx| {
            let removed = tx.execute(
                "DELETE FROM relationships
                 WHERE case_id = ?1 AND source_id = ?2 AND target_id = ?3 AND relation = ?4",
                params![case_id.as_str(), source_id, target_id, relation],
            )?;
            if removed == 0 {
                return Err(StoreError::RecordNotFound(format!(
                    "{}: no {} relationship {} -> {}",
                    case_id, relation, source_id, target_id
                )));
            }
            Ok(())
        })
    }

    /// Run a write and bump the case version in one transaction
    fn write<F>(&self, case_id: &CaseId, apply: F) -> Result<u64, StoreError>
    where
        F: FnOnce(&Transaction<'_>) -> Result<(), StoreError>,
    {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        tx.execute(
            "INSERT OR IGNORE INTO cases (case_id, version) VALUES (?1, 0)",
            params![case_id.as_str()],
        )?;
        apply(&tx)?;
        tx.execute(
            "UPDATE cases SET version = version + 1 WHERE case_id = ?1",
            params![case_id.as_str()],
        )?;
        let version = Self::version_in(&tx, case_id)?;
        tx.commit()?;

        tracing::debug!(case_id = %case_id, version, "Case data written");
        Ok(version)
    }

    fn version_in(conn: &Connection, case_id: &CaseId) -> Result<u64, StoreError> {
        conn.query_row(
            "SELECT version FROM cases WHERE case_id = ?1",
            params![case_id.as_str()],
            |row| row.get::<_, i64>(0),
        )
        .optional()?
        .map(|v| v as u64)
        .ok_or_else(|| StoreError::CaseNotFound(case_id.to_string()))
    }
}

impl CaseStore for SqliteCaseStore {
    type Error = StoreError;

    fn current_version(&self, case_id: &CaseId) -> Result<u64, Self::Error> {
        let conn = self.lock()?;
        Self::version_in(&conn, case_id)
    }

    fn fetch_entities(&self, case_id: &CaseId) -> Result<Vec<EntityRecord>, Self::Error> {
        let conn = self.lock()?;
        Self::version_in(&conn, case_id)?;

        let mut stmt = conn.prepare(
            "SELECT external_id, kind, display_name, case_refs, attributes, updated_at
             FROM entities WHERE case_id = ?1 ORDER BY id",
        )?;

        let rows = stmt
            .query_map(params![case_id.as_str()], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, String>(4)?,
                    row.get::<_, Option<i64>>(5)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(external_id, kind, display_name, case_refs, attributes, updated_at)| {
                let case_refs: Vec<String> = serde_json::from_str(&case_refs)?;
                let attributes: BTreeMap<String, String> = serde_json::from_str(&attributes)?;
                Ok(EntityRecord {
                    external_id,
                    kind,
                    display_name,
                    case_refs,
                    attributes,
                    updated_at: updated_at.map(|t| t as u64),
                })
            })
            .collect()
    }

    fn fetch_relationships(&self, case_id: &CaseId) -> Result<Vec<RelationshipRecord>, Self::Error> {
        let conn = self.lock()?;
        Self::version_in(&conn, case_id)?;

        let mut stmt = conn.prepare(
            "SELECT source_id, target_id, relation, confidence, updated_at
             FROM relationships WHERE case_id = ?1 ORDER BY id",
        )?;

        let relationships = stmt
            .query_map(params![case_id.as_str()], |row| {
                Ok(RelationshipRecord {
                    source_id: row.get(0)?,
                    target_id: row.get(1)?,
                    relation: row.get(2)?,
                    confidence: row.get(3)?,
                    updated_at: row.get::<_, Option<i64>>(4)?.map(|t| t as u64),
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(relationships)
    }
}
