use crate::command::{BasicCommandFactory, EditCommandFactory};
use crate::config::RepositoryConfig;
use crate::shared::{Adapter, RepoCore};
use crate::repository::DocumentRepository;
use crate::store::DocumentStore;
use crate::{Document, RepoError, RepoResult};
use folio_types::{IdFactory, UuidIdFactory};
use std::sync::Arc;
use tracing::info;

/// Assembles a [`DocumentRepository`] over a store.
///
/// ```no_run
/// # use folio_repo::{RepositoryBuilder, RepositorySchema, SqliteStore};
/// # use std::sync::Arc;
/// # #[derive(Clone, Default, serde::Serialize, serde::Deserialize)]
/// # struct Work { title: String }
/// let store = SqliteStore::open("folio.db", RepositorySchema::new("works"))?;
/// let works = RepositoryBuilder::<Work, Work>::new(Arc::new(store))
///     .adapter(|dto| dto)
///     .open()?;
/// # Ok::<(), folio_repo::RepoError>(())
/// ```
pub struct RepositoryBuilder<R, D, F = BasicCommandFactory> {
    store: Arc<dyn DocumentStore>,
    adapter: Option<Adapter<R, D>>,
    factory: F,
    id_factory: Arc<dyn IdFactory>,
    config: RepositoryConfig,
}

impl<R, D> RepositoryBuilder<R, D, BasicCommandFactory>
where
    R: Send + Sync + 'static,
    D: Document,
{
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            store,
            adapter: None,
            factory: BasicCommandFactory,
            id_factory: Arc::new(UuidIdFactory),
            config: RepositoryConfig::default(),
        }
    }
}

impl<R, D, F> RepositoryBuilder<R, D, F>
where
    R: Send + Sync + 'static,
    D: Document,
    F: EditCommandFactory<D>,
{
    /// Converts stored documents into records.
    pub fn adapter(mut self, adapter: impl Fn(D) -> R + Send + Sync + 'static) -> Self {
        self.adapter = Some(Arc::new(move |dto| Ok(adapter(dto))));
        self
    }

    /// Like [`adapter`](Self::adapter), for conversions that can fail.
    pub fn try_adapter(
        mut self,
        adapter: impl Fn(D) -> RepoResult<R> + Send + Sync + 'static,
    ) -> Self {
        self.adapter = Some(Arc::new(adapter));
        self
    }

    pub fn command_factory<G: EditCommandFactory<D>>(self, factory: G) -> RepositoryBuilder<R, D, G> {
        RepositoryBuilder {
            store: self.store,
            adapter: self.adapter,
            factory,
            id_factory: self.id_factory,
            config: self.config,
        }
    }

    pub fn id_factory(mut self, id_factory: Arc<dyn IdFactory>) -> Self {
        self.id_factory = id_factory;
        self
    }

    pub fn config(mut self, config: RepositoryConfig) -> Self {
        self.config = config;
        self
    }

    pub fn open(self) -> RepoResult<DocumentRepository<R, D, F>> {
        self.store.schema().validate()?;
        self.config.validate()?;
        let adapter = self
            .adapter
            .ok_or_else(|| RepoError::Config("repository has no record adapter".into()))?;

        info!(
            table = %self.store.schema().table,
            cache_capacity = self.config.cache_capacity,
            "Opened document repository"
        );
        let core = RepoCore::new(self.store, adapter, self.id_factory, self.config);
        Ok(DocumentRepository::new(core, self.factory))
    }
}
