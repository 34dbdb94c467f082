//! The update pipeline.
//!
//! For creates and edits:
//!
//! 1. load the original (edits only) and apply the recorded changes
//! 2. publish the modified record on the context
//! 3. notify before-commit observers concurrently; any error cancels
//! 4. write to the store
//! 5. invalidate the cache entry and stamp the commit time
//! 6. notify after-commit observers; errors are logged and recorded
//!
//! Deletes follow the same shape with no changes and a `None` modified
//! record. Deleting a record that is already gone skips the observers and
//! reports `false`.

use crate::command::Transform;
use crate::context::{ActionType, UpdateContext, UpdateStatus};
use crate::observer::UpdateObserver;
use crate::shared::RepoCore;
use crate::{Document, RepoError, RepoResult};
use chrono::{DateTime, Utc};
use futures::future::join_all;
use std::sync::Arc;
use tracing::{debug, warn};

pub(crate) struct UpdateStrategy<R, D: Document> {
    core: Arc<RepoCore<R, D>>,
    context: Arc<UpdateContext<D>>,
}

impl<R, D> UpdateStrategy<R, D>
where
    R: Send + Sync + 'static,
    D: Document,
{
    pub(crate) fn new(core: Arc<RepoCore<R, D>>, context: Arc<UpdateContext<D>>) -> Self {
        Self { core, context }
    }

    /// Runs a create or edit to completion.
    pub(crate) async fn apply(self, transform: Transform<D>) -> RepoResult<Arc<D>> {
        self.begin();
        let result = self.run_update(transform).await;
        self.settle(&result);
        result
    }

    /// Runs a delete to completion. Returns whether a record was removed.
    pub(crate) async fn delete(self) -> RepoResult<bool> {
        self.begin();
        let result = self.run_delete().await;
        self.settle(&result);
        result
    }

    fn begin(&self) {
        self.context.set_status(UpdateStatus::InProgress);
        debug!(
            id = %self.context.id(),
            action = %self.context.action(),
            update = %self.context.update_id(),
            "Applying update"
        );
    }

    async fn run_update(&self, transform: Transform<D>) -> RepoResult<Arc<D>> {
        let original = self.context.original().await?;
        let modified = Arc::new(transform(original)?);
        self.context.publish_modified(Some(modified.clone()));

        self.notify_before().await?;

        let id = self.context.id().to_string();
        let document = serde_json::to_string(modified.as_ref())?;
        let at = Utc::now();
        match self.context.action() {
            ActionType::Create => {
                self.core
                    .blocking(move |store| store.insert(&id, &document, at))
                    .await?;
            }
            _ => {
                let updated = self
                    .core
                    .blocking(move |store| store.update(&id, &document, at))
                    .await?;
                if !updated {
                    return Err(RepoError::NotFound(self.context.id().to_string()));
                }
            }
        }

        self.committed(at);
        self.notify_after().await;
        Ok(modified)
    }

    async fn run_delete(&self) -> RepoResult<bool> {
        // Must be loaded before the row goes away.
        let original = self.context.original().await?;
        self.context.publish_modified(None);

        if original.is_none() {
            self.core.cache.invalidate(self.context.id());
            self.context.set_status(UpdateStatus::Completed);
            return Ok(false);
        }

        self.notify_before().await?;

        let id = self.context.id().to_string();
        let at = Utc::now();
        let removed = self.core.blocking(move |store| store.remove(&id, at)).await?;

        if removed {
            self.committed(at);
            self.notify_after().await;
        } else {
            self.core.cache.invalidate(self.context.id());
            self.context.set_status(UpdateStatus::Completed);
        }
        Ok(removed)
    }

    fn committed(&self, at: DateTime<Utc>) {
        self.core.cache.invalidate(self.context.id());
        self.context.mark_committed(at);
        self.context.set_status(UpdateStatus::Completed);
    }

    async fn notify_before(&self) -> RepoResult<()> {
        let observers = self.core.before.snapshot();
        let results = notify(&observers, &self.context).await;
        match results.into_iter().find_map(Result::err) {
            Some(e) => {
                debug!(id = %self.context.id(), error = %e, "Update vetoed by observer");
                Err(RepoError::Canceled {
                    id: self.context.id().to_string(),
                    source: e.into(),
                })
            }
            None => Ok(()),
        }
    }

    async fn notify_after(&self) {
        let observers = self.core.after.snapshot();
        for e in notify(&observers, &self.context)
            .await
            .into_iter()
            .filter_map(Result::err)
        {
            warn!(id = %self.context.id(), error = %e, "After-update observer failed");
            self.context.add_error(format!("{e:#}"));
        }
    }

    fn settle<T>(&self, result: &RepoResult<T>) {
        if result.is_err() {
            self.context.abandon_modified();
        }
        match result {
            Ok(_) => {}
            Err(e) if e.is_canceled() => self.context.set_status(UpdateStatus::Canceled),
            Err(e) => {
                warn!(id = %self.context.id(), action = %self.context.action(), error = %e, "Update failed");
                self.context.set_status(UpdateStatus::Error);
            }
        }
    }
}

async fn notify<D: Document>(
    observers: &[Arc<dyn UpdateObserver<D>>],
    context: &UpdateContext<D>,
) -> Vec<anyhow::Result<()>> {
    join_all(observers.iter().map(|o| o.on_update(context))).await
}
