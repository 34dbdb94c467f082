//! Repository behavior over a SQLite file.

mod common;

use common::{init_tracing, retitle, seed, Work, WorkDto, WorkRepo};
use folio_repo::{RepositoryBuilder, RepositorySchema, SqliteStore};
use futures::StreamExt;
use pretty_assertions::assert_eq;
use rusqlite::Connection;
use std::path::Path;
use std::sync::Arc;

fn open(path: &Path, schema: RepositorySchema) -> WorkRepo {
    init_tracing();
    let store = SqliteStore::open(path, schema).unwrap();
    RepositoryBuilder::<Work, WorkDto>::new(Arc::new(store))
        .adapter(Work::from)
        .open()
        .unwrap()
}

// ── Persistence ─────────────────────────────────────────────────

#[tokio::test]
async fn records_survive_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("folio.db");

    {
        let repo = open(&path, RepositorySchema::new("works"));
        seed(&repo, "w1", "Hume Essays").await;
        retitle(&repo, "w1", "Essays").await.unwrap();
        seed(&repo, "w2", "Treatise").await;
        repo.close();
    }

    let repo = open(&path, RepositorySchema::new("works"));
    assert_eq!(repo.get("w1").await.unwrap().unwrap().title, "Essays");
    let ids: Vec<String> = repo
        .list_all()
        .map(|work| work.unwrap().id.clone())
        .collect()
        .await;
    assert_eq!(ids, vec!["w1", "w2"]);
}

#[tokio::test]
async fn soft_delete_stamps_removed_column() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("folio.db");
    let repo = open(&path, RepositorySchema::new("works"));
    seed(&repo, "w1", "Essays").await;

    assert!(repo.delete(None, "w1").await.unwrap());
    assert!(repo.get("w1").await.unwrap().is_none());

    let conn = Connection::open(&path).unwrap();
    let (data, removed): (String, Option<String>) = conn
        .query_row("SELECT data, removed FROM works WHERE id = 'w1'", [], |row| {
            Ok((row.get(0)?, row.get(1)?))
        })
        .unwrap();
    assert!(data.contains("Essays"));
    assert!(removed.is_some());
}

#[tokio::test]
async fn hard_delete_drops_row() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("folio.db");
    let repo = open(&path, RepositorySchema::new("works").hard_delete());
    seed(&repo, "w1", "Essays").await;
    assert!(repo.delete(None, "w1").await.unwrap());

    let conn = Connection::open(&path).unwrap();
    let count: i64 = conn
        .query_row("SELECT COUNT(*) FROM works", [], |row| row.get(0))
        .unwrap();
    assert_eq!(count, 0);

    seed(&repo, "w1", "Essays again").await;
    assert_eq!(repo.get("w1").await.unwrap().unwrap().title, "Essays again");
}

#[tokio::test]
async fn custom_columns() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("folio.db");
    let schema = RepositorySchema::new("catalog_works")
        .with_id_column("work_id")
        .with_data_column("document")
        .with_modified_column(Some("updated_at"))
        .soft_delete("deleted_at");
    let repo = open(&path, schema);
    seed(&repo, "w1", "Essays").await;

    let conn = Connection::open(&path).unwrap();
    let updated: Option<String> = conn
        .query_row(
            "SELECT updated_at FROM catalog_works WHERE work_id = 'w1'",
            [],
            |row| row.get(0),
        )
        .unwrap();
    assert!(updated.is_some());
}

#[test]
fn invalid_schema_is_rejected_before_opening() {
    let dir = tempfile::tempdir().unwrap();
    let result = SqliteStore::open(
        dir.path().join("folio.db"),
        RepositorySchema::new("works").with_id_column("id; --"),
    );
    assert!(matches!(result, Err(folio_repo::RepoError::InvalidSchema(_))));
}
