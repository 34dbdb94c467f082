//! Whole-document edits recorded by scheme commands.
//!
//! Each function takes the scheme being built and either changes it or
//! explains why it cannot. A failed edit abandons the command, so partial
//! changes to the scheme never reach storage.

use crate::model::{NodeDto, SchemeDto};
use std::collections::HashSet;

pub(crate) type EditResult = Result<(), String>;

pub(crate) fn node_mut<'a>(scheme: &'a mut SchemeDto, id: &str) -> Result<&'a mut NodeDto, String> {
    scheme
        .nodes
        .get_mut(id)
        .ok_or_else(|| format!("node '{id}' does not exist"))
}

/// Ids of the subtree rooted at `id`, in preorder.
pub(crate) fn subtree(scheme: &SchemeDto, id: &str) -> Vec<String> {
    let mut visited = HashSet::new();
    let mut order = Vec::new();
    let mut stack = vec![id];
    while let Some(current) = stack.pop() {
        if !visited.insert(current) {
            continue;
        }
        order.push(current.to_string());
        if let Some(node) = scheme.nodes.get(current) {
            stack.extend(node.children.iter().rev().map(String::as_str));
        }
    }
    order
}

/// Creates node `child` under `parent`, at `index` or after the last child.
pub(crate) fn attach(
    scheme: &mut SchemeDto,
    parent: &str,
    child: String,
    label: String,
    index: Option<usize>,
) -> EditResult {
    if scheme.nodes.contains_key(&child) {
        return Err(format!("node '{child}' already exists"));
    }
    let siblings = &mut node_mut(scheme, parent)?.children;
    let index = index.unwrap_or(siblings.len());
    if index > siblings.len() {
        return Err(format!(
            "index {index} is past the {} children of '{parent}'",
            siblings.len()
        ));
    }
    siblings.insert(index, child.clone());
    let node = NodeDto::new(child.clone(), Some(parent.to_string()), label);
    scheme.nodes.insert(child, node);
    Ok(())
}

/// Removes `child` and its whole subtree from `parent`.
pub(crate) fn detach(scheme: &mut SchemeDto, parent: &str, child: &str) -> EditResult {
    let siblings = &mut node_mut(scheme, parent)?.children;
    let position = siblings
        .iter()
        .position(|c| c == child)
        .ok_or_else(|| format!("'{child}' is not a child of '{parent}'"))?;
    siblings.remove(position);
    for id in subtree(scheme, child) {
        scheme.nodes.remove(&id);
    }
    Ok(())
}

/// Moves `id` (with its subtree) under `new_parent` at `index`.
///
/// The index counts children of the new parent after `id` has left its old
/// place, so moving within one parent behaves like remove-then-insert.
pub(crate) fn relocate(scheme: &mut SchemeDto, id: &str, new_parent: &str, index: usize) -> EditResult {
    if id == scheme.root {
        return Err("the root node cannot be moved".into());
    }
    if !scheme.nodes.contains_key(new_parent) {
        return Err(format!("node '{new_parent}' does not exist"));
    }
    let old_parent = node_mut(scheme, id)?
        .parent_id
        .clone()
        .ok_or_else(|| format!("node '{id}' has no parent"))?;
    if subtree(scheme, id).iter().any(|n| n == new_parent) {
        return Err(format!("'{new_parent}' lies inside the subtree of '{id}'"));
    }

    let siblings = &mut node_mut(scheme, &old_parent)?.children;
    let position = siblings
        .iter()
        .position(|c| c == id)
        .ok_or_else(|| format!("'{id}' is not listed under its parent '{old_parent}'"))?;
    siblings.remove(position);

    let siblings = &mut node_mut(scheme, new_parent)?.children;
    if index > siblings.len() {
        return Err(format!(
            "index {index} is past the {} children of '{new_parent}'",
            siblings.len()
        ));
    }
    siblings.insert(index, id.to_string());
    node_mut(scheme, id)?.parent_id = Some(new_parent.to_string());
    Ok(())
}

/// Fails unless `child` is listed under `parent`.
pub(crate) fn expect_child(scheme: &SchemeDto, parent: &str, child: &str) -> EditResult {
    let listed = scheme
        .nodes
        .get(parent)
        .ok_or_else(|| format!("node '{parent}' does not exist"))?
        .children
        .iter()
        .any(|c| c == child);
    if listed {
        Ok(())
    } else {
        Err(format!("'{child}' is not a child of '{parent}'"))
    }
}
