//! Read model over a stored scheme.

use crate::model::{NodeDto, SchemeDto};
use crate::validate::validate_tree;
use folio_repo::{RepoError, RepoResult};
use folio_resolver::ResolverRegistry;
use folio_types::EntryReference;
use std::collections::HashMap;

/// A node of a [`TreeCategorization`].
#[derive(Debug, Clone, PartialEq)]
pub struct TreeNode {
    id: String,
    parent_id: Option<String>,
    children: Vec<String>,
    label: String,
    description: String,
    entry: Option<EntryReference>,
}

impl TreeNode {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn parent_id(&self) -> Option<&str> {
        self.parent_id.as_deref()
    }

    pub fn child_ids(&self) -> &[String] {
        &self.children
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn entry(&self) -> Option<&EntryReference> {
        self.entry.as_ref()
    }

    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }

    /// Token for the associated entry, if there is one.
    pub fn entry_token(&self, resolvers: &ResolverRegistry) -> RepoResult<Option<String>> {
        self.entry
            .as_ref()
            .map(|entry| resolvers.tokenize(entry))
            .transpose()
            .map_err(RepoError::from)
    }
}

impl From<NodeDto> for TreeNode {
    fn from(dto: NodeDto) -> Self {
        Self {
            id: dto.id,
            parent_id: dto.parent_id,
            children: dto.children,
            label: dto.label,
            description: dto.description,
            entry: dto.entry,
        }
    }
}

/// A categorization scheme whose nodes form a single rooted tree.
#[derive(Debug, Clone)]
pub struct TreeCategorization {
    id: String,
    key: String,
    label: String,
    description: String,
    root: String,
    nodes: HashMap<String, TreeNode>,
}

impl TreeCategorization {
    /// Builds the read model, refusing documents that are not a tree.
    pub fn from_dto(dto: SchemeDto) -> RepoResult<Self> {
        validate_tree(&dto).map_err(|violation| {
            RepoError::Storage(format!("scheme '{}' is not a valid tree: {violation}", dto.id))
        })?;
        Ok(Self {
            id: dto.id,
            key: dto.key,
            label: dto.label,
            description: dto.description,
            root: dto.root,
            nodes: dto
                .nodes
                .into_iter()
                .map(|(id, node)| (id, TreeNode::from(node)))
                .collect(),
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn root_node(&self) -> &TreeNode {
        // from_dto guarantees the root is present
        &self.nodes[self.root.as_str()]
    }

    /// The node with `id`, or `NotFound` if this scheme has no such node.
    pub fn node(&self, id: &str) -> RepoResult<&TreeNode> {
        self.nodes
            .get(id)
            .ok_or_else(|| RepoError::NotFound(format!("node '{id}' in scheme '{}'", self.id)))
    }

    /// All nodes in preorder: each node, then each of its children's
    /// subtrees in list order. Every call starts a fresh walk from the root.
    pub fn nodes(&self) -> Preorder<'_> {
        Preorder {
            scheme: self,
            stack: vec![self.root.as_str()],
        }
    }

    pub fn children(&self, id: &str) -> RepoResult<Vec<&TreeNode>> {
        self.node(id)?
            .children
            .iter()
            .map(|child| self.node(child))
            .collect()
    }

    /// Parent of `id`; `None` for the root.
    pub fn parent(&self, id: &str) -> RepoResult<Option<&TreeNode>> {
        self.node(id)?
            .parent_id
            .as_deref()
            .map(|parent| self.node(parent))
            .transpose()
    }

    /// Nodes associated with `entry`, in preorder.
    pub fn nodes_for_entry<'a>(
        &'a self,
        entry: &'a EntryReference,
    ) -> impl Iterator<Item = &'a TreeNode> + 'a {
        self.nodes().filter(move |node| node.entry.as_ref() == Some(entry))
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Always false: a scheme has at least its root.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// Lazy preorder walk over a [`TreeCategorization`].
#[derive(Debug, Clone)]
pub struct Preorder<'a> {
    scheme: &'a TreeCategorization,
    stack: Vec<&'a str>,
}

impl<'a> Iterator for Preorder<'a> {
    type Item = &'a TreeNode;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.scheme.nodes.get(self.stack.pop()?)?;
        // Reverse so the first child comes off the stack first
        self.stack.extend(node.children.iter().rev().map(String::as_str));
        Some(node)
    }
}
