//! Paged, cancellable listing of every active record.

use crate::shared::RepoCore;
use crate::{Document, RepoError, RepoResult};
use futures::stream::{self, BoxStream, StreamExt};
use std::collections::VecDeque;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Records in id order. Yields one `Interrupted` error and then ends if
/// the cancellation token fires.
pub type RecordStream<R> = BoxStream<'static, RepoResult<Arc<R>>>;

struct Cursor<R, D: Document> {
    core: Arc<RepoCore<R, D>>,
    cancel: CancellationToken,
    /// Last id fetched; the next page starts after it.
    last_id: Option<String>,
    buffered: VecDeque<String>,
    exhausted: bool,
    finished: bool,
}

pub(crate) fn list_all<R, D>(core: Arc<RepoCore<R, D>>, cancel: CancellationToken) -> RecordStream<R>
where
    R: Send + Sync + 'static,
    D: Document,
{
    let cursor = Cursor {
        core,
        cancel,
        last_id: None,
        buffered: VecDeque::new(),
        exhausted: false,
        finished: false,
    };
    stream::unfold(cursor, |mut cursor| async move {
        let item = cursor.next_record().await?;
        Some((item, cursor))
    })
    .boxed()
}

impl<R, D> Cursor<R, D>
where
    R: Send + Sync + 'static,
    D: Document,
{
    async fn next_record(&mut self) -> Option<RepoResult<Arc<R>>> {
        loop {
            if self.finished {
                return None;
            }
            if self.cancel.is_cancelled() {
                return self.fail(RepoError::Interrupted);
            }
            if let Err(e) = self.core.ensure_open() {
                return self.fail(e);
            }
            if let Some(document) = self.buffered.pop_front() {
                return Some(self.core.parse_record(&document));
            }
            if self.exhausted {
                return None;
            }
            if let Err(e) = self.fetch_page().await {
                return self.fail(e);
            }
        }
    }

    async fn fetch_page(&mut self) -> RepoResult<()> {
        let (after, limit) = (self.last_id.clone(), self.core.config.page_size);
        let cancel = self.cancel.clone();
        let page = self
            .core
            .blocking(move |store| store.page(after.as_deref(), limit, &cancel))
            .await?;
        if page.len() < limit {
            self.exhausted = true;
        }
        if let Some((id, _)) = page.last() {
            self.last_id = Some(id.clone());
        }
        self.buffered
            .extend(page.into_iter().map(|(_, document)| document));
        Ok(())
    }

    fn fail(&mut self, error: RepoError) -> Option<RepoResult<Arc<R>>> {
        self.finished = true;
        Some(Err(error))
    }
}
