//! Per-update state shared between the pipeline and its observers.

use crate::{RepoError, RepoResult};
use chrono::{DateTime, Utc};
use folio_types::{Account, UpdateId};
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};
use std::time::Duration;
use tokio::sync::{watch, OnceCell};
use tokio::time::timeout;

/// What kind of change an update makes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    Create,
    Edit,
    Delete,
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActionType::Create => write!(f, "create"),
            ActionType::Edit => write!(f, "edit"),
            ActionType::Delete => write!(f, "delete"),
        }
    }
}

/// Lifecycle of an update.
///
/// `Pending → Submitted → InProgress → Completed | Canceled | Error`.
/// The last three are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdateStatus {
    /// Built but not yet executed.
    Pending,
    /// Handed to a worker.
    Submitted,
    /// Worker is applying changes and notifying observers.
    InProgress,
    Completed,
    /// A pre-commit observer rejected the update.
    Canceled,
    /// Changes, storage or a worker failed.
    Error,
}

impl UpdateStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            UpdateStatus::Completed | UpdateStatus::Canceled | UpdateStatus::Error
        )
    }
}

/// What the pipeline has published for `modified()` waiters.
enum Modified<D> {
    Pending,
    Ready(Option<Arc<D>>),
    /// The update failed before changes were applied.
    Abandoned,
}

pub(crate) type OriginalLoader<D> =
    Box<dyn Fn() -> BoxFuture<'static, RepoResult<Option<D>>> + Send + Sync>;

/// Everything an observer can learn about an update in flight.
///
/// The original record is loaded lazily, at most once, the first time
/// anyone asks for it. The modified record becomes available when the
/// pipeline has applied the changes; waiting on it before that blocks up
/// to the configured timeout.
pub struct UpdateContext<D> {
    id: String,
    update_id: UpdateId,
    action: ActionType,
    actor: Option<Account>,
    initial: Option<Arc<D>>,
    status: Mutex<UpdateStatus>,
    timestamp: OnceLock<DateTime<Utc>>,
    original: OnceCell<Option<Arc<D>>>,
    loader: Option<OriginalLoader<D>>,
    modified: watch::Sender<Modified<D>>,
    errors: Mutex<Vec<String>>,
    original_timeout: Duration,
    modified_timeout: Duration,
}

impl<D: Send + Sync + 'static> UpdateContext<D> {
    pub(crate) fn new(
        id: String,
        action: ActionType,
        actor: Option<Account>,
        initial: Option<Arc<D>>,
        loader: Option<OriginalLoader<D>>,
        original_timeout: Duration,
        modified_timeout: Duration,
    ) -> Self {
        let (modified, _) = watch::channel(Modified::Pending);
        Self {
            id,
            update_id: UpdateId::now(),
            action,
            actor,
            initial,
            status: Mutex::new(UpdateStatus::Pending),
            timestamp: OnceLock::new(),
            original: OnceCell::new(),
            loader,
            modified,
            errors: Mutex::new(Vec::new()),
            original_timeout,
            modified_timeout,
        }
    }

    /// Id of the record being changed.
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn update_id(&self) -> UpdateId {
        self.update_id
    }

    pub fn action(&self) -> ActionType {
        self.action
    }

    /// Account that requested the update, if any.
    pub fn actor(&self) -> Option<&Account> {
        self.actor.as_ref()
    }

    /// The record as it was when the command was built. `None` for creates.
    pub fn initial_state(&self) -> Option<&Arc<D>> {
        self.initial.as_ref()
    }

    pub fn status(&self) -> UpdateStatus {
        *self.lock_status()
    }

    /// When the write was committed. `None` until then.
    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        self.timestamp.get().copied()
    }

    /// The stored record as of execution, before changes were applied.
    ///
    /// Loaded on first call and shared afterwards. `None` for creates, and
    /// for deletes of records that no longer exist.
    pub async fn original(&self) -> RepoResult<Option<Arc<D>>> {
        let load = self.original.get_or_try_init(|| async {
            match &self.loader {
                Some(loader) => loader().await.map(|dto| dto.map(Arc::new)),
                None => Ok(None),
            }
        });
        match timeout(self.original_timeout, load).await {
            Ok(Ok(original)) => Ok(original.clone()),
            Ok(Err(e)) => Err(e),
            Err(_) => Err(RepoError::Timeout {
                what: "original",
                id: self.id.clone(),
            }),
        }
    }

    /// The record with all changes applied. `None` for deletes.
    ///
    /// Fails with `NoModifiedState` as soon as the update fails before its
    /// changes were applied.
    pub async fn modified(&self) -> RepoResult<Option<Arc<D>>> {
        let mut rx = self.modified.subscribe();
        let wait = async {
            rx.wait_for(|state| !matches!(state, Modified::Pending))
                .await
                .map(|state| match &*state {
                    Modified::Ready(modified) => Ok(modified.clone()),
                    _ => Err(RepoError::NoModifiedState(self.id.clone())),
                })
        };
        match timeout(self.modified_timeout, wait).await {
            Ok(Ok(modified)) => modified,
            // The sender lives as long as `self`, so the channel cannot close here.
            Ok(Err(_)) => Err(RepoError::Interrupted),
            Err(_) => Err(RepoError::Timeout {
                what: "modified",
                id: self.id.clone(),
            }),
        }
    }

    /// Records a non-fatal problem, e.g. a failed post-commit observer.
    pub fn add_error(&self, message: impl Into<String>) {
        self.errors
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(message.into());
    }

    pub fn errors(&self) -> Vec<String> {
        self.errors
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub(crate) fn set_status(&self, status: UpdateStatus) {
        let mut current = self.lock_status();
        if !current.is_terminal() {
            *current = status;
        }
    }

    pub(crate) fn publish_modified(&self, modified: Option<Arc<D>>) {
        self.modified.send_replace(Modified::Ready(modified));
    }

    /// Wakes `modified()` waiters with an error if nothing was published.
    pub(crate) fn abandon_modified(&self) {
        self.modified.send_if_modified(|state| {
            if matches!(state, Modified::Pending) {
                *state = Modified::Abandoned;
                true
            } else {
                false
            }
        });
    }

    pub(crate) fn mark_committed(&self, at: DateTime<Utc>) {
        let _ = self.timestamp.set(at);
    }

    fn lock_status(&self) -> MutexGuard<'_, UpdateStatus> {
        self.status.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<D> fmt::Debug for UpdateContext<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UpdateContext")
            .field("id", &self.id)
            .field("update_id", &self.update_id)
            .field("action", &self.action)
            .field(
                "status",
                &*self.status.lock().unwrap_or_else(PoisonError::into_inner),
            )
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::FutureExt;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn context(loader: Option<OriginalLoader<String>>) -> UpdateContext<String> {
        UpdateContext::new(
            "w1".into(),
            ActionType::Edit,
            None,
            None,
            loader,
            Duration::from_millis(50),
            Duration::from_millis(50),
        )
    }

    #[tokio::test]
    async fn original_loads_once() {
        let loads = Arc::new(AtomicUsize::new(0));
        let counter = loads.clone();
        let ctx = context(Some(Box::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            async { Ok(Some("Hume".to_string())) }.boxed()
        })));

        let (a, b) = tokio::join!(ctx.original(), ctx.original());
        assert_eq!(a.unwrap().as_deref().map(String::as_str), Some("Hume"));
        assert_eq!(b.unwrap().as_deref().map(String::as_str), Some("Hume"));
        assert_eq!(loads.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn original_times_out() {
        let ctx = context(Some(Box::new(|| {
            async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok(None)
            }
            .boxed()
        })));
        assert!(matches!(
            ctx.original().await,
            Err(RepoError::Timeout { what: "original", .. })
        ));
    }

    #[tokio::test]
    async fn modified_waits_for_publish() {
        let ctx = Arc::new(context(None));
        let waiter = {
            let ctx = ctx.clone();
            tokio::spawn(async move { ctx.modified().await })
        };
        tokio::task::yield_now().await;
        ctx.publish_modified(Some(Arc::new("Essays".to_string())));
        let modified = waiter.await.unwrap().unwrap();
        assert_eq!(modified.as_deref().map(String::as_str), Some("Essays"));
    }

    #[tokio::test]
    async fn modified_times_out_when_never_published() {
        let ctx = context(None);
        assert!(matches!(
            ctx.modified().await,
            Err(RepoError::Timeout { what: "modified", .. })
        ));
    }

    #[tokio::test]
    async fn published_delete_is_none() {
        let ctx = context(None);
        ctx.publish_modified(None);
        assert!(ctx.modified().await.unwrap().is_none());
    }

    #[test]
    fn terminal_status_sticks() {
        let ctx = context(None);
        ctx.set_status(UpdateStatus::InProgress);
        ctx.set_status(UpdateStatus::Canceled);
        ctx.set_status(UpdateStatus::Completed);
        assert_eq!(ctx.status(), UpdateStatus::Canceled);
    }
}
