//! In-memory document store.
//!
//! Not durable. Useful for tests and for embedding a repository where
//! persistence is handled elsewhere. Every call is counted so tests can
//! observe when the cache was bypassed.

use super::DocumentStore;
use crate::schema::{DeleteMode, RepositorySchema};
use crate::{RepoError, RepoResult};
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::ops::Bound;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone)]
struct Row {
    document: String,
    modified: Option<DateTime<Utc>>,
    removed: Option<DateTime<Utc>>,
}

impl Row {
    fn is_active(&self) -> bool {
        self.removed.is_none()
    }
}

/// Snapshot of how often each store operation ran.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreCalls {
    pub loads: usize,
    pub inserts: usize,
    pub updates: usize,
    pub removes: usize,
    pub pages: usize,
}

#[derive(Debug, Default)]
struct Counters {
    loads: AtomicUsize,
    inserts: AtomicUsize,
    updates: AtomicUsize,
    removes: AtomicUsize,
    pages: AtomicUsize,
}

#[derive(Debug)]
pub struct MemoryStore {
    schema: RepositorySchema,
    rows: Mutex<BTreeMap<String, Row>>,
    counters: Counters,
    fail_writes: AtomicBool,
}

impl MemoryStore {
    pub fn new(schema: RepositorySchema) -> Self {
        Self {
            schema,
            rows: Mutex::new(BTreeMap::new()),
            counters: Counters::default(),
            fail_writes: AtomicBool::new(false),
        }
    }

    pub fn calls(&self) -> StoreCalls {
        StoreCalls {
            loads: self.counters.loads.load(Ordering::SeqCst),
            inserts: self.counters.inserts.load(Ordering::SeqCst),
            updates: self.counters.updates.load(Ordering::SeqCst),
            removes: self.counters.removes.load(Ordering::SeqCst),
            pages: self.counters.pages.load(Ordering::SeqCst),
        }
    }

    /// Makes every subsequent insert, update and remove fail.
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Raw document for `id`, including soft-removed rows.
    pub fn raw(&self, id: &str) -> Option<String> {
        self.rows().get(id).map(|row| row.document.clone())
    }

    /// Whether `id` exists as a soft-removed row.
    pub fn is_removed(&self, id: &str) -> bool {
        self.rows().get(id).is_some_and(|row| !row.is_active())
    }

    pub fn modified_at(&self, id: &str) -> Option<DateTime<Utc>> {
        self.rows().get(id).and_then(|row| row.modified)
    }

    fn rows(&self) -> MutexGuard<'_, BTreeMap<String, Row>> {
        self.rows.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn check_writable(&self) -> RepoResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            Err(RepoError::Storage("writes disabled".into()))
        } else {
            Ok(())
        }
    }

    fn stamp(&self, at: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.schema.modified_column.as_ref().map(|_| at)
    }
}

impl DocumentStore for MemoryStore {
    fn schema(&self) -> &RepositorySchema {
        &self.schema
    }

    fn load(&self, id: &str) -> RepoResult<Option<String>> {
        self.counters.loads.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .rows()
            .get(id)
            .filter(|row| row.is_active())
            .map(|row| row.document.clone()))
    }

    fn exists(&self, id: &str) -> RepoResult<bool> {
        Ok(self.rows().get(id).is_some_and(Row::is_active))
    }

    fn insert(&self, id: &str, document: &str, at: DateTime<Utc>) -> RepoResult<()> {
        self.counters.inserts.fetch_add(1, Ordering::SeqCst);
        self.check_writable()?;
        let mut rows = self.rows();
        if rows.contains_key(id) {
            return Err(RepoError::Collision(id.to_string()));
        }
        rows.insert(
            id.to_string(),
            Row {
                document: document.to_string(),
                modified: self.stamp(at),
                removed: None,
            },
        );
        Ok(())
    }

    fn update(&self, id: &str, document: &str, at: DateTime<Utc>) -> RepoResult<bool> {
        self.counters.updates.fetch_add(1, Ordering::SeqCst);
        self.check_writable()?;
        let modified = self.stamp(at);
        match self.rows().get_mut(id).filter(|row| row.is_active()) {
            Some(row) => {
                row.document = document.to_string();
                row.modified = modified;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn remove(&self, id: &str, at: DateTime<Utc>) -> RepoResult<bool> {
        self.counters.removes.fetch_add(1, Ordering::SeqCst);
        self.check_writable()?;
        let modified = self.stamp(at);
        let mut rows = self.rows();
        if !rows.get(id).is_some_and(Row::is_active) {
            return Ok(false);
        }
        match self.schema.delete_mode {
            DeleteMode::Hard => {
                rows.remove(id);
            }
            DeleteMode::Soft { .. } => {
                if let Some(row) = rows.get_mut(id) {
                    row.removed = Some(at);
                    row.modified = modified;
                }
            }
        }
        Ok(true)
    }

    fn page(
        &self,
        after: Option<&str>,
        limit: usize,
        cancel: &CancellationToken,
    ) -> RepoResult<Vec<(String, String)>> {
        self.counters.pages.fetch_add(1, Ordering::SeqCst);
        if cancel.is_cancelled() {
            return Err(RepoError::Interrupted);
        }
        let start = after.map_or(Bound::Unbounded, Bound::Excluded);
        Ok(self
            .rows()
            .range::<str, _>((start, Bound::Unbounded))
            .filter(|(_, row)| row.is_active())
            .take(limit)
            .map(|(id, row)| (id.clone(), row.document.clone()))
            .collect())
    }
}
