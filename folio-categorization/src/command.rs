//! Scheme edit commands and node mutators.

use crate::edits::{attach, detach, expect_child, node_mut, relocate};
use crate::model::{NodeDto, SchemeDto};
use crate::validate::validate_tree;
use folio_repo::{EditCommand, EditCommandFactory, PendingUpdate, RepoResult, UpdateContext};
use folio_types::{EntryReference, IdFactory};
use std::fmt;
use std::sync::Arc;

/// Edit command for one categorization scheme.
///
/// Every method records a named change; nothing is applied until
/// [`execute`](Self::execute). Changes apply in the order they were
/// recorded, and the resulting tree is validated before it is written.
pub struct SchemeCommand {
    command: EditCommand<SchemeDto>,
    root: String,
    node_ids: Arc<dyn IdFactory>,
}

impl SchemeCommand {
    fn new(mut command: EditCommand<SchemeDto>, root: String, node_ids: Arc<dyn IdFactory>) -> Self {
        command.validate_with(|scheme| validate_tree(scheme).map_err(|v| v.to_string()));
        Self {
            command,
            root,
            node_ids,
        }
    }

    /// Id of the scheme.
    pub fn id(&self) -> &str {
        self.command.id()
    }

    pub fn context(&self) -> &Arc<UpdateContext<SchemeDto>> {
        self.command.context()
    }

    pub fn set_key(&mut self, key: &str) -> &mut Self {
        let key = key.to_string();
        self.command.try_change("key", move |scheme| {
            if key.trim().is_empty() {
                return Err("scheme key must not be empty".into());
            }
            scheme.key = key;
            Ok(())
        });
        self
    }

    pub fn set_label(&mut self, label: &str) -> &mut Self {
        let label = label.to_string();
        self.command.change("label", move |scheme| scheme.label = label);
        self
    }

    pub fn set_description(&mut self, description: &str) -> &mut Self {
        let description = description.to_string();
        self.command
            .change("description", move |scheme| scheme.description = description);
        self
    }

    /// Mutator for the root node.
    pub fn root(&mut self) -> NodeMutator<'_> {
        let id = self.root.clone();
        NodeMutator { command: self, id }
    }

    /// Mutator for any node of the scheme. Changes recorded through it fail
    /// at execute time if the node does not exist by then.
    pub fn node(&mut self, id: &str) -> NodeMutator<'_> {
        NodeMutator {
            command: self,
            id: id.to_string(),
        }
    }

    /// Moves `id` and its subtree to position `index` under `new_parent`.
    pub fn move_node(&mut self, id: &str, new_parent: &str, index: usize) -> &mut Self {
        let (id, new_parent) = (id.to_string(), new_parent.to_string());
        self.command
            .try_change(format!("nodes.{id}.parent"), move |scheme| {
                relocate(scheme, &id, &new_parent, index)
            });
        self
    }

    pub fn change_names(&self) -> Vec<&str> {
        self.command.change_names()
    }

    pub fn execute(&mut self) -> RepoResult<PendingUpdate<SchemeDto>> {
        self.command.execute()
    }
}

impl fmt::Debug for SchemeCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchemeCommand")
            .field("command", &self.command)
            .field("root", &self.root)
            .finish()
    }
}

/// Records changes against one node of a [`SchemeCommand`].
pub struct NodeMutator<'a> {
    command: &'a mut SchemeCommand,
    id: String,
}

impl NodeMutator<'_> {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn set_label(&mut self, label: &str) -> &mut Self {
        let (id, label) = (self.id.clone(), label.to_string());
        self.record("label", move |scheme| {
            node_mut(scheme, &id)?.label = label;
            Ok(())
        })
    }

    pub fn set_description(&mut self, description: &str) -> &mut Self {
        let (id, description) = (self.id.clone(), description.to_string());
        self.record("description", move |scheme| {
            node_mut(scheme, &id)?.description = description;
            Ok(())
        })
    }

    /// Associates the node with an entry. The reference must name both an
    /// id and a type.
    pub fn associate_entry(&mut self, entry: EntryReference) -> &mut Self {
        let id = self.id.clone();
        self.record("entry", move |scheme| {
            entry.validate().map_err(|e| e.to_string())?;
            node_mut(scheme, &id)?.entry = Some(entry);
            Ok(())
        })
    }

    pub fn clear_entry(&mut self) -> &mut Self {
        let id = self.id.clone();
        self.record("entry", move |scheme| {
            node_mut(scheme, &id)?.entry = None;
            Ok(())
        })
    }

    /// Appends a new child labelled `label` and returns its mutator.
    pub fn add(&mut self, label: &str) -> NodeMutator<'_> {
        self.create_child(label, None)
    }

    /// Inserts a new child at `index` and returns its mutator. Fails at
    /// execute time if `index` is past the end of the child list.
    pub fn insert(&mut self, label: &str, index: usize) -> NodeMutator<'_> {
        self.create_child(label, Some(index))
    }

    /// Mutator for the existing child `child_id`.
    pub fn edit(&mut self, child_id: &str) -> NodeMutator<'_> {
        let (parent, child) = (self.id.clone(), child_id.to_string());
        self.command
            .command
            .try_change(format!("nodes.{parent}.children.{child}"), move |scheme| {
                expect_child(scheme, &parent, &child)
            });
        NodeMutator {
            command: &mut *self.command,
            id: child_id.to_string(),
        }
    }

    /// Removes the child `child_id` together with its subtree.
    pub fn remove_child(&mut self, child_id: &str) -> &mut Self {
        let (parent, child) = (self.id.clone(), child_id.to_string());
        self.record("children", move |scheme| detach(scheme, &parent, &child))
    }

    fn create_child(&mut self, label: &str, index: Option<usize>) -> NodeMutator<'_> {
        let child = self.command.node_ids.next_id();
        let (parent, label) = (self.id.clone(), label.to_string());
        let created = child.clone();
        self.command
            .command
            .try_change(format!("nodes.{parent}.children"), move |scheme| {
                attach(scheme, &parent, created, label, index)
            });
        NodeMutator {
            command: &mut *self.command,
            id: child,
        }
    }

    fn record(
        &mut self,
        field: &str,
        f: impl FnOnce(&mut SchemeDto) -> Result<(), String> + Send + 'static,
    ) -> &mut Self {
        let name = format!("nodes.{}.{field}", self.id);
        self.command.command.try_change(name, f);
        self
    }
}

impl fmt::Debug for NodeMutator<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeMutator")
            .field("scheme", &self.command.id())
            .field("node", &self.id)
            .finish()
    }
}

/// Hands out [`SchemeCommand`]s. New schemes get their id stamped and a
/// root node created.
#[derive(Clone)]
pub struct SchemeCommandFactory {
    node_ids: Arc<dyn IdFactory>,
}

impl SchemeCommandFactory {
    /// `node_ids` supplies ids for new nodes; they must not repeat within
    /// a scheme.
    pub fn new(node_ids: Arc<dyn IdFactory>) -> Self {
        Self { node_ids }
    }
}

impl EditCommandFactory<SchemeDto> for SchemeCommandFactory {
    type Command = SchemeCommand;

    fn create(&self, mut command: EditCommand<SchemeDto>) -> SchemeCommand {
        let id = command.id().to_string();
        let root = self.node_ids.next_id();
        let root_node = NodeDto::new(root.clone(), None, "");
        command.change("id", move |scheme| scheme.id = id);
        command.change("root", move |scheme| {
            scheme.root = root_node.id.clone();
            scheme.nodes.insert(root_node.id.clone(), root_node);
        });
        SchemeCommand::new(command, root, self.node_ids.clone())
    }

    fn edit(&self, command: EditCommand<SchemeDto>) -> SchemeCommand {
        let root = command
            .initial_state()
            .map(|scheme| scheme.root.clone())
            .unwrap_or_default();
        SchemeCommand::new(command, root, self.node_ids.clone())
    }
}

impl fmt::Debug for SchemeCommandFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchemeCommandFactory").finish_non_exhaustive()
    }
}
