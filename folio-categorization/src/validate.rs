//! Structural checks for stored schemes.

use crate::model::SchemeDto;
use std::collections::HashSet;
use thiserror::Error;

/// A way in which a scheme fails to be a single rooted tree.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TreeViolation {
    #[error("root node '{0}' is missing")]
    MissingRoot(String),

    #[error("root node '{0}' has a parent")]
    RootHasParent(String),

    #[error("node stored under '{key}' has id '{id}'")]
    MismatchedKey { key: String, id: String },

    #[error("node '{0}' has no parent")]
    Orphan(String),

    #[error("node '{node}' names missing parent '{parent}'")]
    MissingParent { node: String, parent: String },

    #[error("node '{parent}' does not list its child '{node}'")]
    NotListed { node: String, parent: String },

    #[error("node '{parent}' lists missing child '{child}'")]
    MissingChild { parent: String, child: String },

    #[error("node '{child}' is listed under '{listed}' but its parent is {actual:?}")]
    WrongParent {
        child: String,
        listed: String,
        actual: Option<String>,
    },

    #[error("node '{child}' is listed more than once under '{parent}'")]
    DuplicateChild { parent: String, child: String },

    #[error("node '{0}' is not reachable from the root")]
    Unreachable(String),
}

/// Checks that `scheme` is a single rooted tree.
///
/// The root must exist and have no parent. Every other node must name an
/// existing parent that lists it exactly once, every listed child must name
/// the listing node as its parent, and every node must be reachable from
/// the root.
pub fn validate_tree(scheme: &SchemeDto) -> Result<(), TreeViolation> {
    let root = scheme
        .nodes
        .get(&scheme.root)
        .ok_or_else(|| TreeViolation::MissingRoot(scheme.root.clone()))?;
    if root.parent_id.is_some() {
        return Err(TreeViolation::RootHasParent(root.id.clone()));
    }

    for (key, node) in &scheme.nodes {
        if *key != node.id {
            return Err(TreeViolation::MismatchedKey {
                key: key.clone(),
                id: node.id.clone(),
            });
        }

        let mut seen = HashSet::new();
        for child in &node.children {
            if !seen.insert(child.as_str()) {
                return Err(TreeViolation::DuplicateChild {
                    parent: key.clone(),
                    child: child.clone(),
                });
            }
            let listed = scheme.nodes.get(child).ok_or_else(|| TreeViolation::MissingChild {
                parent: key.clone(),
                child: child.clone(),
            })?;
            if listed.parent_id.as_ref() != Some(key) {
                return Err(TreeViolation::WrongParent {
                    child: child.clone(),
                    listed: key.clone(),
                    actual: listed.parent_id.clone(),
                });
            }
        }

        if *key == scheme.root {
            continue;
        }
        let parent_id = node
            .parent_id
            .as_ref()
            .ok_or_else(|| TreeViolation::Orphan(key.clone()))?;
        let parent = scheme
            .nodes
            .get(parent_id)
            .ok_or_else(|| TreeViolation::MissingParent {
                node: key.clone(),
                parent: parent_id.clone(),
            })?;
        if !parent.children.contains(key) {
            return Err(TreeViolation::NotListed {
                node: key.clone(),
                parent: parent_id.clone(),
            });
        }
    }

    // Local checks pass for a detached cycle, so walk from the root.
    let mut reached = HashSet::new();
    let mut stack = vec![scheme.root.as_str()];
    while let Some(current) = stack.pop() {
        if !reached.insert(current) {
            continue;
        }
        if let Some(node) = scheme.nodes.get(current) {
            stack.extend(node.children.iter().map(String::as_str));
        }
    }
    if let Some(stray) = scheme.nodes.keys().find(|id| !reached.contains(id.as_str())) {
        return Err(TreeViolation::Unreachable(stray.clone()));
    }

    Ok(())
}
