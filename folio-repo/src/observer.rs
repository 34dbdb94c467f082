//! Hooks notified around the commit of each update.

use crate::context::UpdateContext;
use async_trait::async_trait;
use folio_types::Registration;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, Weak};
use uuid::Uuid;

/// Notified about an update either before or after it is committed.
///
/// Before-commit observers can veto the update by returning `Err`; the
/// record is then left untouched and the update resolves as canceled. An
/// `Err` from an after-commit observer is logged and recorded on the
/// context but does not fail the update.
///
/// Observers may await [`UpdateContext::original`] and
/// [`UpdateContext::modified`]; both are ready by the time observers run.
#[async_trait]
pub trait UpdateObserver<D: Send + Sync + 'static>: Send + Sync {
    async fn on_update(&self, context: &UpdateContext<D>) -> anyhow::Result<()>;
}

/// Adapts a synchronous closure into an [`UpdateObserver`].
pub struct FnObserver<F>(F);

/// Wraps `f` so it can be registered as an observer.
pub fn observer_fn<D, F>(f: F) -> FnObserver<F>
where
    D: Send + Sync + 'static,
    F: Fn(&UpdateContext<D>) -> anyhow::Result<()> + Send + Sync,
{
    FnObserver(f)
}

#[async_trait]
impl<D, F> UpdateObserver<D> for FnObserver<F>
where
    D: Send + Sync + 'static,
    F: Fn(&UpdateContext<D>) -> anyhow::Result<()> + Send + Sync,
{
    async fn on_update(&self, context: &UpdateContext<D>) -> anyhow::Result<()> {
        (self.0)(context)
    }
}

type Observers<D> = RwLock<HashMap<Uuid, Arc<dyn UpdateObserver<D>>>>;

/// Set of observers that can be added and removed while updates run.
pub(crate) struct ObserverSet<D: Send + Sync + 'static> {
    observers: Arc<Observers<D>>,
}

impl<D: Send + Sync + 'static> ObserverSet<D> {
    pub(crate) fn new() -> Self {
        Self {
            observers: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub(crate) fn add(&self, observer: Arc<dyn UpdateObserver<D>>) -> Registration {
        let key = Uuid::new_v4();
        self.observers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key, observer);

        let weak: Weak<Observers<D>> = Arc::downgrade(&self.observers);
        Registration::new(move || {
            if let Some(observers) = weak.upgrade() {
                observers
                    .write()
                    .unwrap_or_else(PoisonError::into_inner)
                    .remove(&key);
            }
        })
    }

    /// Observers registered right now. Updates notify this snapshot, so a
    /// registration racing an update may or may not see it.
    pub(crate) fn snapshot(&self) -> Vec<Arc<dyn UpdateObserver<D>>> {
        self.observers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect()
    }

    pub(crate) fn len(&self) -> usize {
        self.observers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}
