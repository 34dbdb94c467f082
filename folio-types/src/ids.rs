//! Identifiers: per-update ids, account ids, and the pluggable source of
//! record ids.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use uuid::Uuid;

/// Identifies one executed edit command. UUID v7, so ids taken later sort
/// after ids taken earlier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UpdateId(Uuid);

impl UpdateId {
    #[must_use]
    pub fn now() -> Self {
        Self(Uuid::now_v7())
    }
}

impl fmt::Display for UpdateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Id of the account an [`Account`](crate::Account) describes. Issued by
/// whatever session layer owns accounts; the core only compares and logs it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountId(Uuid);

impl AccountId {
    #[must_use]
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Source of identifiers for newly created records.
///
/// Repositories call this once per `create` that does not supply its own id.
pub trait IdFactory: Send + Sync {
    /// Returns a fresh identifier. Must not repeat within one repository.
    fn next_id(&self) -> String;
}

/// Default factory: UUID v7 strings.
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidIdFactory;

impl IdFactory for UuidIdFactory {
    fn next_id(&self) -> String {
        Uuid::now_v7().to_string()
    }
}

/// Produces `<prefix><n>` ids with a monotonically increasing counter.
///
/// Useful for human-readable ids in fixtures and for node ids inside a
/// single document, where global uniqueness is not required.
#[derive(Debug)]
pub struct SequentialIdFactory {
    prefix: String,
    next: AtomicU64,
}

impl SequentialIdFactory {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self::starting_at(prefix, 1)
    }

    pub fn starting_at(prefix: impl Into<String>, first: u64) -> Self {
        Self {
            prefix: prefix.into(),
            next: AtomicU64::new(first),
        }
    }
}

impl IdFactory for SequentialIdFactory {
    fn next_id(&self) -> String {
        let n = self.next.fetch_add(1, Ordering::Relaxed);
        format!("{}{}", self.prefix, n)
    }
}
