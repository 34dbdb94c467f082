//! State shared by a repository, its commands and its update workers.

use crate::cache::RecordCache;
use crate::command::{PendingUpdate, Transform, UpdateExecutor};
use crate::config::RepositoryConfig;
use crate::context::{ActionType, OriginalLoader, UpdateContext, UpdateStatus};
use crate::observer::ObserverSet;
use crate::store::DocumentStore;
use crate::strategy::UpdateStrategy;
use crate::{Document, RepoError, RepoResult};
use folio_types::{Account, IdFactory};
use futures::FutureExt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::runtime::Handle;

pub(crate) type Adapter<R, D> = Arc<dyn Fn(D) -> RepoResult<R> + Send + Sync>;

pub(crate) struct RepoCore<R, D: Document> {
    pub(crate) store: Arc<dyn DocumentStore>,
    pub(crate) cache: RecordCache<R>,
    pub(crate) before: ObserverSet<D>,
    pub(crate) after: ObserverSet<D>,
    pub(crate) config: RepositoryConfig,
    pub(crate) id_factory: Arc<dyn IdFactory>,
    adapter: Adapter<R, D>,
    closed: AtomicBool,
}

impl<R, D> RepoCore<R, D>
where
    R: Send + Sync + 'static,
    D: Document,
{
    pub(crate) fn new(
        store: Arc<dyn DocumentStore>,
        adapter: Adapter<R, D>,
        id_factory: Arc<dyn IdFactory>,
        config: RepositoryConfig,
    ) -> Self {
        Self {
            cache: RecordCache::new(config.cache_capacity, config.cache_ttl()),
            store,
            before: ObserverSet::new(),
            after: ObserverSet::new(),
            config,
            id_factory,
            adapter,
            closed: AtomicBool::new(false),
        }
    }

    pub(crate) fn ensure_open(&self) -> RepoResult<()> {
        if self.closed.load(Ordering::Acquire) {
            Err(RepoError::Closed)
        } else {
            Ok(())
        }
    }

    pub(crate) fn close(&self) -> bool {
        !self.closed.swap(true, Ordering::AcqRel)
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Runs `f` against the store on the blocking pool.
    pub(crate) async fn blocking<T, F>(&self, f: F) -> RepoResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&dyn DocumentStore) -> RepoResult<T> + Send + 'static,
    {
        let store = self.store.clone();
        tokio::task::spawn_blocking(move || f(store.as_ref()))
            .await
            .map_err(RepoError::worker)?
    }

    pub(crate) async fn load_dto(&self, id: &str) -> RepoResult<Option<D>> {
        let id = id.to_string();
        let document = self.blocking(move |store| store.load(&id)).await?;
        match document {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    pub(crate) fn adapt(&self, dto: D) -> RepoResult<R> {
        (self.adapter)(dto)
    }

    pub(crate) fn parse_record(&self, document: &str) -> RepoResult<Arc<R>> {
        let dto: D = serde_json::from_str(document)?;
        Ok(Arc::new(self.adapt(dto)?))
    }

    /// Cached read. Misses load from the store and populate the cache
    /// unless a write invalidated it in the meantime.
    pub(crate) async fn get(&self, id: &str) -> RepoResult<Option<Arc<R>>> {
        if let Some(hit) = self.cache.get(id) {
            return Ok(Some(hit));
        }
        let generation = self.cache.generation();
        let Some(dto) = self.load_dto(id).await? else {
            return Ok(None);
        };
        let record = Arc::new(self.adapt(dto)?);
        self.cache.insert_if_fresh(id, record.clone(), generation);
        Ok(Some(record))
    }

    /// Loader for an update's original record. Edits require the record to
    /// still exist; deletes tolerate its absence.
    fn loader(self: &Arc<Self>, id: &str, action: ActionType) -> Option<OriginalLoader<D>> {
        if action == ActionType::Create {
            return None;
        }
        let core = Arc::clone(self);
        let id = id.to_string();
        Some(Box::new(move || {
            let core = core.clone();
            let id = id.clone();
            async move {
                match core.load_dto(&id).await? {
                    Some(dto) => Ok(Some(dto)),
                    None if action == ActionType::Edit => Err(RepoError::NotFound(id)),
                    None => Ok(None),
                }
            }
            .boxed()
        }))
    }

    pub(crate) fn context(
        self: &Arc<Self>,
        id: &str,
        action: ActionType,
        actor: Option<&Account>,
        initial: Option<D>,
    ) -> Arc<UpdateContext<D>> {
        Arc::new(UpdateContext::new(
            id.to_string(),
            action,
            actor.cloned(),
            initial.map(Arc::new),
            self.loader(id, action),
            self.config.original_timeout(),
            self.config.modified_timeout(),
        ))
    }
}

impl<R, D> UpdateExecutor<D> for RepoCore<R, D>
where
    R: Send + Sync + 'static,
    D: Document,
{
    fn submit(
        self: Arc<Self>,
        context: Arc<UpdateContext<D>>,
        transform: Transform<D>,
    ) -> RepoResult<PendingUpdate<D>> {
        self.ensure_open()?;
        let runtime = Handle::try_current().map_err(|e| RepoError::Worker(e.to_string()))?;
        context.set_status(UpdateStatus::Submitted);
        let strategy = UpdateStrategy::new(self, context.clone());
        let handle = runtime.spawn(strategy.apply(transform));
        Ok(PendingUpdate::new(context, handle))
    }
}
