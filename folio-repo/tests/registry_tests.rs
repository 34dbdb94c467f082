//! Tests for RepositoryRegistry.

mod common;

use common::*;
use folio_repo::{RepoError, RepositoryConfig, RepositoryRegistry};
use folio_types::{Account, SequentialIdFactory};
use pretty_assertions::assert_eq;
use std::sync::Arc;

/// A repository wrapper scoped to one account.
#[derive(Clone)]
struct AccountWorks {
    owner: Option<String>,
    works: WorkRepo,
}

#[tokio::test]
async fn registered_repository_is_produced_per_account() {
    let registry = RepositoryRegistry::default();
    let works: WorkRepo = registry
        .builder::<Work, WorkDto>(memory_store())
        .adapter(Work::from)
        .open()
        .unwrap();

    let _registration = registry
        .register("works", move |account: Option<&Account>| AccountWorks {
            owner: account.map(|a| a.display_name.clone()),
            works: works.clone(),
        })
        .unwrap();

    assert!(registry.is_available::<AccountWorks>());
    assert_eq!(registry.names(), vec!["works".to_string()]);

    let editor = Account::new("Editor");
    let scoped = registry.repository::<AccountWorks>(Some(&editor)).unwrap();
    assert_eq!(scoped.owner.as_deref(), Some("Editor"));

    seed(&scoped.works, "w1", "Essays").await;
    let anonymous = registry.repository::<AccountWorks>(None).unwrap();
    assert_eq!(anonymous.owner, None);
    assert_eq!(anonymous.works.get("w1").await.unwrap().unwrap().title, "Essays");
}

#[test]
fn duplicate_registration_is_rejected() {
    let registry = RepositoryRegistry::default();
    let _first = registry.register("numbers", |_: Option<&Account>| 1u32).unwrap();
    let err = registry.register("more numbers", |_: Option<&Account>| 2u32).unwrap_err();
    assert!(matches!(err, RepoError::AlreadyRegistered(_)));
    assert_eq!(registry.repository::<u32>(None).unwrap(), 1);
}

#[test]
fn unregister_makes_type_unavailable() {
    let registry = RepositoryRegistry::default();
    let registration = registry.register("numbers", |_: Option<&Account>| 1u32).unwrap();
    registration.unregister();

    assert!(!registry.is_available::<u32>());
    assert!(matches!(
        registry.repository::<u32>(None),
        Err(RepoError::NotRegistered(_))
    ));
    registry.register("numbers", |_: Option<&Account>| 2u32).unwrap();
    assert_eq!(registry.repository::<u32>(None).unwrap(), 2);
}

#[tokio::test]
async fn builder_inherits_config_and_ids() {
    let config = RepositoryConfig {
        cache_capacity: 3,
        ..RepositoryConfig::default()
    };
    let registry = RepositoryRegistry::new(config.clone())
        .with_id_factory(Arc::new(SequentialIdFactory::starting_at("work-", 10)));
    let repo: WorkRepo = registry
        .builder::<Work, WorkDto>(memory_store())
        .adapter(Work::from)
        .open()
        .unwrap();

    assert_eq!(repo.config(), &config);
    assert_eq!(repo.create(None).unwrap().id(), "work-10");
}

#[test]
fn load_from_reads_repository_table() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("folio.toml");
    std::fs::write(&path, "[repository]\npage_size = 7\n").unwrap();
    let registry = RepositoryRegistry::load_from(&path);
    assert_eq!(registry.config().page_size, 7);
    assert!(registry.resolvers().entry_types().is_empty());
}
