//! Type-keyed lookup of repositories.

use crate::builder::RepositoryBuilder;
use crate::config::RepositoryConfig;
use crate::store::DocumentStore;
use crate::{Document, RepoError, RepoResult};
use folio_resolver::ResolverRegistry;
use folio_types::{Account, IdFactory, Registration, UuidIdFactory};
use std::any::{type_name, Any, TypeId};
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, PoisonError, RwLock, Weak};
use tracing::info;
use uuid::Uuid;

type RepositoryFactory = Arc<dyn Fn(Option<&Account>) -> Box<dyn Any + Send> + Send + Sync>;

struct Entry {
    name: String,
    registration: Uuid,
    factory: RepositoryFactory,
}

type Entries = RwLock<HashMap<TypeId, Entry>>;

/// Shared wiring for an application's repositories.
///
/// Holds the repository configuration, id factory and entry resolvers
/// every repository is built with, and maps each repository type to a
/// factory that produces it for an account.
#[derive(Clone)]
pub struct RepositoryRegistry {
    entries: Arc<Entries>,
    resolvers: ResolverRegistry,
    config: RepositoryConfig,
    id_factory: Arc<dyn IdFactory>,
}

impl RepositoryRegistry {
    pub fn new(config: RepositoryConfig) -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
            resolvers: ResolverRegistry::new(),
            config,
            id_factory: Arc::new(UuidIdFactory),
        }
    }

    /// Registry configured from the `[repository]` table at `path`, or the
    /// defaults if that cannot be read.
    pub fn load_from(path: impl AsRef<Path>) -> Self {
        Self::new(RepositoryConfig::load_from(path))
    }

    pub fn with_id_factory(mut self, id_factory: Arc<dyn IdFactory>) -> Self {
        self.id_factory = id_factory;
        self
    }

    pub fn config(&self) -> &RepositoryConfig {
        &self.config
    }

    pub fn id_factory(&self) -> &Arc<dyn IdFactory> {
        &self.id_factory
    }

    pub fn resolvers(&self) -> &ResolverRegistry {
        &self.resolvers
    }

    /// Builder preloaded with this registry's config and id factory.
    pub fn builder<R, D>(&self, store: Arc<dyn DocumentStore>) -> RepositoryBuilder<R, D>
    where
        R: Send + Sync + 'static,
        D: Document,
    {
        RepositoryBuilder::new(store)
            .config(self.config.clone())
            .id_factory(self.id_factory.clone())
    }

    /// Registers the factory producing repositories of type `T`.
    pub fn register<T, F>(&self, name: impl Into<String>, factory: F) -> RepoResult<Registration>
    where
        T: Send + 'static,
        F: Fn(Option<&Account>) -> T + Send + Sync + 'static,
    {
        let name = name.into();
        let key = TypeId::of::<T>();
        let registration = Uuid::new_v4();
        let factory: RepositoryFactory =
            Arc::new(move |account: Option<&Account>| -> Box<dyn Any + Send> {
                Box::new(factory(account))
            });
        {
            let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
            if let Some(existing) = entries.get(&key) {
                return Err(RepoError::AlreadyRegistered(format!(
                    "{} (as '{}')",
                    type_name::<T>(),
                    existing.name
                )));
            }
            entries.insert(
                key,
                Entry {
                    name: name.clone(),
                    registration,
                    factory,
                },
            );
        }
        info!(repository = %name, "Registered repository");

        let weak: Weak<Entries> = Arc::downgrade(&self.entries);
        Ok(Registration::new(move || {
            if let Some(entries) = weak.upgrade() {
                let mut entries = entries.write().unwrap_or_else(PoisonError::into_inner);
                if entries.get(&key).is_some_and(|e| e.registration == registration) {
                    entries.remove(&key);
                }
            }
        }))
    }

    /// Produces the repository of type `T` for `account`.
    pub fn repository<T: 'static>(&self, account: Option<&Account>) -> RepoResult<T> {
        let factory = self
            .entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&TypeId::of::<T>())
            .map(|entry| entry.factory.clone())
            .ok_or_else(|| RepoError::NotRegistered(type_name::<T>().to_string()))?;
        factory(account)
            .downcast::<T>()
            .map(|repository| *repository)
            .map_err(|_| RepoError::NotRegistered(type_name::<T>().to_string()))
    }

    pub fn is_available<T: 'static>(&self) -> bool {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(&TypeId::of::<T>())
    }

    /// Names of all registered repositories, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .map(|entry| entry.name.clone())
            .collect();
        names.sort();
        names
    }
}

impl Default for RepositoryRegistry {
    fn default() -> Self {
        Self::new(RepositoryConfig::default())
    }
}

impl std::fmt::Debug for RepositoryRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RepositoryRegistry")
            .field("repositories", &self.names())
            .field("resolvers", &self.resolvers)
            .field("config", &self.config)
            .finish()
    }
}
