//! Repository wiring for categorization schemes.

use crate::command::{SchemeCommand, SchemeCommandFactory};
use crate::model::SchemeDto;
use crate::tree::TreeCategorization;
use folio_repo::{DocumentRepository, DocumentStore, RepoError, RepoResult, RepositoryRegistry};
use folio_types::{Account, IdFactory};
use futures::StreamExt;
use std::sync::Arc;
use tracing::{debug, info};

/// Repository holding categorization schemes.
pub type SchemeRepository = DocumentRepository<TreeCategorization, SchemeDto, SchemeCommandFactory>;

/// Creates, reads, edits and removes categorization schemes.
///
/// Observers and caching come from the underlying [`SchemeRepository`],
/// reachable through [`repository`](Self::repository).
#[derive(Debug, Clone)]
pub struct CategorizationService {
    schemes: SchemeRepository,
}

impl CategorizationService {
    /// Opens the service over `store`, with scheme and node ids both taken
    /// from the registry's id factory.
    pub fn open(registry: &RepositoryRegistry, store: Arc<dyn DocumentStore>) -> RepoResult<Self> {
        Self::with_node_ids(registry, store, registry.id_factory().clone())
    }

    /// Like [`open`](Self::open), with a separate source of node ids.
    pub fn with_node_ids(
        registry: &RepositoryRegistry,
        store: Arc<dyn DocumentStore>,
        node_ids: Arc<dyn IdFactory>,
    ) -> RepoResult<Self> {
        let schemes = registry
            .builder::<TreeCategorization, SchemeDto>(store)
            .try_adapter(TreeCategorization::from_dto)
            .command_factory(SchemeCommandFactory::new(node_ids))
            .open()?;
        info!(table = %schemes.schema().table, "Categorization service opened");
        Ok(Self { schemes })
    }

    pub fn repository(&self) -> &SchemeRepository {
        &self.schemes
    }

    /// Command creating a scheme with `key` and `label`. The root node is
    /// created with the scheme and carries the same label.
    ///
    /// Fails with `Collision` if a scheme with `key` already exists.
    pub async fn create_scheme(
        &self,
        account: Option<&Account>,
        key: &str,
        label: &str,
    ) -> RepoResult<SchemeCommand> {
        if key.trim().is_empty() {
            return Err(RepoError::InvalidArgument("scheme key must not be empty".into()));
        }
        if self.find_by_key(key).await?.is_some() {
            return Err(RepoError::Collision(format!("scheme key '{key}'")));
        }

        let mut command = self.schemes.create(account)?;
        command.set_key(key).set_label(label);
        command.root().set_label(label);
        debug!(scheme = %command.id(), key, "Creating categorization scheme");
        Ok(command)
    }

    pub async fn get(&self, id: &str) -> RepoResult<Option<Arc<TreeCategorization>>> {
        self.schemes.get(id).await
    }

    /// Command editing scheme `id`. Fails with `NotFound` if it does not
    /// exist.
    pub async fn edit(&self, account: Option<&Account>, id: &str) -> RepoResult<SchemeCommand> {
        self.schemes.edit(account, id).await
    }

    /// Removes scheme `id`. Returns `false` if it was already gone.
    pub async fn remove(&self, account: Option<&Account>, id: &str) -> RepoResult<bool> {
        self.schemes.delete(account, id).await
    }

    /// The scheme whose key is `key`, if any.
    pub async fn find_by_key(&self, key: &str) -> RepoResult<Option<Arc<TreeCategorization>>> {
        let mut schemes = self.schemes.list_all();
        while let Some(scheme) = schemes.next().await {
            let scheme = scheme?;
            if scheme.key() == key {
                return Ok(Some(scheme));
            }
        }
        Ok(None)
    }
}
