//! Edit commands: record changes, then execute once.

use crate::changes::ChangeSet;
use crate::context::{ActionType, UpdateContext, UpdateStatus};
use crate::{Document, RepoError, RepoResult};
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{ready, Context, Poll};
use tokio::task::JoinHandle;

pub(crate) type Transform<D> = Box<dyn FnOnce(Option<Arc<D>>) -> RepoResult<D> + Send>;

type Validator<D> = Box<dyn FnOnce(&D) -> Result<(), String> + Send>;

/// Runs a submitted update in the background.
pub(crate) trait UpdateExecutor<D: Document>: Send + Sync {
    fn submit(
        self: Arc<Self>,
        context: Arc<UpdateContext<D>>,
        transform: Transform<D>,
    ) -> RepoResult<PendingUpdate<D>>;
}

/// A create or edit of a single record.
///
/// Changes are recorded with [`change`](Self::change) and applied when
/// [`execute`](Self::execute) runs. A command executes at most once.
pub struct EditCommand<D: Document> {
    context: Arc<UpdateContext<D>>,
    changes: ChangeSet<D>,
    validators: Vec<Validator<D>>,
    executor: Arc<dyn UpdateExecutor<D>>,
    executed: bool,
}

impl<D: Document> EditCommand<D> {
    pub(crate) fn new(context: Arc<UpdateContext<D>>, executor: Arc<dyn UpdateExecutor<D>>) -> Self {
        Self {
            context,
            changes: ChangeSet::new(),
            validators: Vec::new(),
            executor,
            executed: false,
        }
    }

    /// Id of the record this command writes.
    pub fn id(&self) -> &str {
        self.context.id()
    }

    pub fn action(&self) -> ActionType {
        self.context.action()
    }

    pub fn context(&self) -> &Arc<UpdateContext<D>> {
        &self.context
    }

    pub fn status(&self) -> UpdateStatus {
        self.context.status()
    }

    /// The record as loaded when the command was built. `None` for creates.
    pub fn initial_state(&self) -> Option<&Arc<D>> {
        self.context.initial_state()
    }

    pub fn change(&mut self, name: impl Into<String>, f: impl FnOnce(&mut D) + Send + 'static) -> &mut Self {
        self.changes.add(name, f);
        self
    }

    pub fn try_change(
        &mut self,
        name: impl Into<String>,
        f: impl FnOnce(&mut D) -> Result<(), String> + Send + 'static,
    ) -> &mut Self {
        self.changes.try_add(name, f);
        self
    }

    /// Adds a check run against the fully changed record before anything
    /// is written.
    pub fn validate_with(
        &mut self,
        f: impl FnOnce(&D) -> Result<(), String> + Send + 'static,
    ) -> &mut Self {
        self.validators.push(Box::new(f));
        self
    }

    pub fn change_names(&self) -> Vec<&str> {
        self.changes.names()
    }

    pub fn is_executed(&self) -> bool {
        self.executed
    }

    /// Submits the recorded changes.
    ///
    /// The update runs on the tokio runtime and proceeds whether or not the
    /// returned future is awaited. Fails immediately with `AlreadyExecuted`
    /// on a second call.
    pub fn execute(&mut self) -> RepoResult<PendingUpdate<D>> {
        if self.executed {
            return Err(RepoError::AlreadyExecuted(self.id().to_string()));
        }
        self.executed = true;

        let changes = std::mem::take(&mut self.changes);
        let validators = std::mem::take(&mut self.validators);
        let transform: Transform<D> = Box::new(move |original| {
            let mut dto = original.map(|o| D::clone(&o)).unwrap_or_default();
            changes.apply(&mut dto)?;
            for validate in validators {
                validate(&dto).map_err(|reason| RepoError::InvalidChange {
                    change: "validate".into(),
                    reason,
                })?;
            }
            Ok(dto)
        });

        self.executor
            .clone()
            .submit(self.context.clone(), transform)
            .inspect_err(|_| self.context.set_status(UpdateStatus::Error))
    }
}

impl<D: Document> fmt::Debug for EditCommand<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EditCommand")
            .field("id", &self.id())
            .field("action", &self.action())
            .field("changes", &self.changes)
            .field("executed", &self.executed)
            .finish()
    }
}

/// Completion of an executed command. Resolves to the stored document.
///
/// Dropping it does not cancel the update.
pub struct PendingUpdate<D: Send + Sync + 'static> {
    context: Arc<UpdateContext<D>>,
    handle: JoinHandle<RepoResult<Arc<D>>>,
}

impl<D: Send + Sync + 'static> PendingUpdate<D> {
    pub(crate) fn new(context: Arc<UpdateContext<D>>, handle: JoinHandle<RepoResult<Arc<D>>>) -> Self {
        Self { context, handle }
    }

    pub fn context(&self) -> &Arc<UpdateContext<D>> {
        &self.context
    }

    pub fn id(&self) -> &str {
        self.context.id()
    }
}

impl<D: Send + Sync + 'static> Future for PendingUpdate<D> {
    type Output = RepoResult<Arc<D>>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let joined = ready!(Pin::new(&mut self.handle).poll(cx));
        Poll::Ready(joined.unwrap_or_else(|e| {
            self.context.set_status(UpdateStatus::Error);
            Err(RepoError::worker(e))
        }))
    }
}

/// Turns raw edit commands into the command type a repository hands out.
///
/// Implement this to wrap [`EditCommand`] in a domain-specific API, e.g.
/// typed setters that record named changes.
pub trait EditCommandFactory<D: Document>: Send + Sync + 'static {
    type Command: Send;

    fn create(&self, command: EditCommand<D>) -> Self::Command;

    fn edit(&self, command: EditCommand<D>) -> Self::Command {
        self.create(command)
    }
}

/// Hands out [`EditCommand`]s unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct BasicCommandFactory;

impl<D: Document> EditCommandFactory<D> for BasicCommandFactory {
    type Command = EditCommand<D>;

    fn create(&self, command: EditCommand<D>) -> EditCommand<D> {
        command
    }
}
