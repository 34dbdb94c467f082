//! Shared fixtures for repository tests.

#![allow(dead_code)]

use folio_repo::{
    DocumentRepository, EditCommand, EditCommandFactory, MemoryStore, PendingUpdate, RepoResult,
    RepositoryBuilder, RepositoryConfig, RepositorySchema,
};
use folio_types::SequentialIdFactory;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Stored form of a work.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkDto {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub authors: Vec<String>,
}

/// Record handed to callers.
#[derive(Debug, Clone, PartialEq)]
pub struct Work {
    pub id: String,
    pub title: String,
    pub authors: Vec<String>,
}

impl From<WorkDto> for Work {
    fn from(dto: WorkDto) -> Self {
        Self {
            id: dto.id,
            title: dto.title,
            authors: dto.authors,
        }
    }
}

pub type WorkRepo = DocumentRepository<Work, WorkDto>;
pub type TypedWorkRepo = DocumentRepository<Work, WorkDto, WorkCommandFactory>;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn memory_store() -> Arc<MemoryStore> {
    Arc::new(MemoryStore::new(RepositorySchema::new("works")))
}

pub fn open_repo(store: Arc<MemoryStore>) -> WorkRepo {
    open_repo_with(store, RepositoryConfig::default())
}

pub fn open_repo_with(store: Arc<MemoryStore>, config: RepositoryConfig) -> WorkRepo {
    init_tracing();
    RepositoryBuilder::<Work, WorkDto>::new(store)
        .adapter(Work::from)
        .id_factory(Arc::new(SequentialIdFactory::new("w")))
        .config(config)
        .open()
        .unwrap()
}

pub fn open_typed_repo(store: Arc<MemoryStore>) -> TypedWorkRepo {
    init_tracing();
    RepositoryBuilder::<Work, WorkDto>::new(store)
        .adapter(Work::from)
        .command_factory(WorkCommandFactory)
        .id_factory(Arc::new(SequentialIdFactory::new("w")))
        .open()
        .unwrap()
}

/// Creates a work and waits for it to be stored.
pub async fn seed(repo: &WorkRepo, id: &str, title: &str) -> Arc<WorkDto> {
    let mut command = repo.create_with_id(None, id).unwrap();
    let (id, title) = (id.to_string(), title.to_string());
    command.change("id", move |dto| dto.id = id);
    command.change("title", move |dto| dto.title = title);
    command.execute().unwrap().await.unwrap()
}

pub async fn retitle(repo: &WorkRepo, id: &str, title: &str) -> RepoResult<Arc<WorkDto>> {
    let mut command = repo.edit(None, id).await?;
    let title = title.to_string();
    command.change("title", move |dto| dto.title = title);
    command.execute()?.await
}

// ── Typed commands ──────────────────────────────────────────────

/// Wraps edit commands in typed setters; stamps the id on create.
#[derive(Debug, Clone, Copy, Default)]
pub struct WorkCommandFactory;

pub struct WorkCommand(EditCommand<WorkDto>);

impl WorkCommand {
    pub fn id(&self) -> &str {
        self.0.id()
    }

    pub fn set_title(&mut self, title: &str) -> &mut Self {
        let title = title.to_string();
        self.0.try_change("title", move |dto| {
            if title.trim().is_empty() {
                return Err("title must not be empty".into());
            }
            dto.title = title;
            Ok(())
        });
        self
    }

    pub fn add_author(&mut self, author: &str) -> &mut Self {
        let author = author.to_string();
        self.0.change("authors", move |dto| dto.authors.push(author));
        self
    }

    pub fn change_names(&self) -> Vec<&str> {
        self.0.change_names()
    }

    pub fn execute(&mut self) -> RepoResult<PendingUpdate<WorkDto>> {
        self.0.execute()
    }
}

impl EditCommandFactory<WorkDto> for WorkCommandFactory {
    type Command = WorkCommand;

    fn create(&self, mut command: EditCommand<WorkDto>) -> WorkCommand {
        let id = command.id().to_string();
        command.change("id", move |dto| dto.id = id);
        WorkCommand(command)
    }

    fn edit(&self, command: EditCommand<WorkDto>) -> WorkCommand {
        WorkCommand(command)
    }
}
