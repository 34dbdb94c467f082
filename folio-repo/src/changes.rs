use crate::{RepoError, RepoResult};
use std::fmt;

type ApplyFn<D> = Box<dyn FnOnce(&mut D) -> Result<(), String> + Send>;

struct Change<D> {
    name: String,
    apply: ApplyFn<D>,
}

/// Ordered, named changes to a document.
///
/// Changes are recorded while a command is being built and applied, in
/// order, to a copy of the original record when the command executes. The
/// first change that fails aborts the update; nothing is written.
pub struct ChangeSet<D> {
    changes: Vec<Change<D>>,
}

impl<D> ChangeSet<D> {
    pub fn new() -> Self {
        Self {
            changes: Vec::new(),
        }
    }

    /// Records an infallible change.
    pub fn add(&mut self, name: impl Into<String>, change: impl FnOnce(&mut D) + Send + 'static) {
        self.try_add(name, move |dto| {
            change(dto);
            Ok(())
        });
    }

    /// Records a change that can refuse to apply.
    pub fn try_add(
        &mut self,
        name: impl Into<String>,
        change: impl FnOnce(&mut D) -> Result<(), String> + Send + 'static,
    ) {
        self.changes.push(Change {
            name: name.into(),
            apply: Box::new(change),
        });
    }

    /// Change names in the order they were recorded.
    pub fn names(&self) -> Vec<&str> {
        self.changes.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn apply(self, dto: &mut D) -> RepoResult<()> {
        for change in self.changes {
            (change.apply)(dto).map_err(|reason| RepoError::InvalidChange {
                change: change.name,
                reason,
            })?;
        }
        Ok(())
    }
}

impl<D> Default for ChangeSet<D> {
    fn default() -> Self {
        Self::new()
    }
}

impl<D> fmt::Debug for ChangeSet<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}
