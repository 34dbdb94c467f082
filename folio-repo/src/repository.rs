use crate::command::{BasicCommandFactory, EditCommand, EditCommandFactory, UpdateExecutor};
use crate::config::RepositoryConfig;
use crate::context::{ActionType, UpdateStatus};
use crate::shared::RepoCore;
use crate::listing::{self, RecordStream};
use crate::observer::UpdateObserver;
use crate::schema::RepositorySchema;
use crate::strategy::UpdateStrategy;
use crate::{Document, RepoError, RepoResult};
use folio_types::{Account, Registration};
use futures::future::try_join_all;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Cached, observable access to records of one type.
///
/// `R` is the record handed to callers, `D` the document persisted as JSON,
/// and `F` decides what command type [`create`](Self::create) and
/// [`edit`](Self::edit) return.
///
/// All writes go through edit commands. Reads go through a bounded cache
/// that each committed write invalidates before its future resolves, so a
/// read issued after awaiting a write never sees the old state.
///
/// Cloning yields another handle to the same repository.
pub struct DocumentRepository<R, D: Document, F = BasicCommandFactory> {
    core: Arc<RepoCore<R, D>>,
    factory: Arc<F>,
}

impl<R, D, F> DocumentRepository<R, D, F>
where
    R: Send + Sync + 'static,
    D: Document,
    F: EditCommandFactory<D>,
{
    pub(crate) fn new(core: RepoCore<R, D>, factory: F) -> Self {
        Self {
            core: Arc::new(core),
            factory: Arc::new(factory),
        }
    }

    pub fn schema(&self) -> &RepositorySchema {
        self.core.store.schema()
    }

    pub fn config(&self) -> &RepositoryConfig {
        &self.core.config
    }

    /// The record with `id`, or `None` if there is no active record.
    pub async fn get(&self, id: &str) -> RepoResult<Option<Arc<R>>> {
        self.core.ensure_open()?;
        self.core.get(id).await
    }

    /// Like [`get`](Self::get), but a missing record is a `NotFound` error.
    #[deprecated(note = "use `get` and handle `None`")]
    pub async fn get_unsafe(&self, id: &str) -> RepoResult<Arc<R>> {
        self.get(id)
            .await?
            .ok_or_else(|| RepoError::NotFound(id.to_string()))
    }

    /// Records for the given ids in first-seen order. Duplicates are read
    /// once; missing ids are skipped.
    pub async fn get_many<I, S>(&self, ids: I) -> RepoResult<Vec<Arc<R>>>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.core.ensure_open()?;
        let mut seen = HashSet::new();
        let unique: Vec<String> = ids
            .into_iter()
            .map(|id| id.as_ref().to_string())
            .filter(|id| seen.insert(id.clone()))
            .collect();
        let records = try_join_all(unique.iter().map(|id| self.core.get(id))).await?;
        Ok(records.into_iter().flatten().collect())
    }

    pub async fn exists(&self, id: &str) -> RepoResult<bool> {
        self.core.ensure_open()?;
        if self.core.cache.get(id).is_some() {
            return Ok(true);
        }
        let id = id.to_string();
        self.core.blocking(move |store| store.exists(&id)).await
    }

    /// Every active record, fetched a page at a time.
    pub fn list_all(&self) -> RecordStream<R> {
        self.list_all_with_cancel(CancellationToken::new())
    }

    /// Like [`list_all`](Self::list_all), but stops with `Interrupted` once
    /// `cancel` fires.
    pub fn list_all_with_cancel(&self, cancel: CancellationToken) -> RecordStream<R> {
        listing::list_all(self.core.clone(), cancel)
    }

    /// Command creating a record under a freshly generated id.
    pub fn create(&self, account: Option<&Account>) -> RepoResult<F::Command> {
        let id = self.core.id_factory.next_id();
        self.create_with_id(account, id)
    }

    /// Command creating a record under `id`. A collision surfaces when the
    /// command executes.
    pub fn create_with_id(
        &self,
        account: Option<&Account>,
        id: impl Into<String>,
    ) -> RepoResult<F::Command> {
        self.core.ensure_open()?;
        let id = id.into();
        if id.trim().is_empty() {
            return Err(RepoError::InvalidArgument("record id must not be empty".into()));
        }
        let context = self.core.context(&id, ActionType::Create, account, None);
        Ok(self.factory.create(EditCommand::new(context, self.executor())))
    }

    /// Command editing the record with `id`. Fails with `NotFound` if there
    /// is no active record.
    pub async fn edit(&self, account: Option<&Account>, id: &str) -> RepoResult<F::Command> {
        self.core.ensure_open()?;
        let initial = self
            .core
            .load_dto(id)
            .await?
            .ok_or_else(|| RepoError::NotFound(id.to_string()))?;
        let context = self.core.context(id, ActionType::Edit, account, Some(initial));
        Ok(self.factory.edit(EditCommand::new(context, self.executor())))
    }

    /// Removes the record with `id`. Returns `false` if there was no active
    /// record. Once started, the removal completes even if this future is
    /// dropped.
    pub async fn delete(&self, account: Option<&Account>, id: &str) -> RepoResult<bool> {
        self.core.ensure_open()?;
        let context = self.core.context(id, ActionType::Delete, account, None);
        context.set_status(UpdateStatus::Submitted);
        let strategy = UpdateStrategy::new(self.core.clone(), context);
        tokio::spawn(strategy.delete())
            .await
            .map_err(RepoError::worker)?
    }

    /// Registers an observer that runs before each write commits and can
    /// veto it.
    pub fn before_update(&self, observer: impl UpdateObserver<D> + 'static) -> Registration {
        self.core.before.add(Arc::new(observer))
    }

    /// Registers an observer that runs after each write commits.
    pub fn after_update(&self, observer: impl UpdateObserver<D> + 'static) -> Registration {
        self.core.after.add(Arc::new(observer))
    }

    pub fn observer_counts(&self) -> (usize, usize) {
        (self.core.before.len(), self.core.after.len())
    }

    /// Number of cached records.
    pub fn cached_len(&self) -> usize {
        self.core.cache.len()
    }

    /// Drops every cached record, e.g. after the table was changed behind
    /// the repository's back.
    pub fn clear_cache(&self) {
        self.core.cache.invalidate_all();
    }

    /// Stops accepting work and drops the cache. Updates already submitted
    /// run to completion.
    pub fn close(&self) {
        if self.core.close() {
            self.core.cache.invalidate_all();
            info!(table = %self.schema().table, "Closed document repository");
        }
    }

    pub fn is_closed(&self) -> bool {
        self.core.is_closed()
    }

    fn executor(&self) -> Arc<dyn UpdateExecutor<D>> {
        self.core.clone()
    }
}

impl<R, D: Document, F> Clone for DocumentRepository<R, D, F> {
    fn clone(&self) -> Self {
        Self {
            core: self.core.clone(),
            factory: self.factory.clone(),
        }
    }
}

impl<R: Send + Sync + 'static, D: Document, F> fmt::Debug for DocumentRepository<R, D, F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DocumentRepository")
            .field("table", &self.core.store.schema().table)
            .field("cached", &self.core.cache.len())
            .field("closed", &self.core.is_closed())
            .finish()
    }
}
