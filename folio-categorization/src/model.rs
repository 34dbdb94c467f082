//! Stored form of a categorization scheme.

use folio_types::EntryReference;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A categorization scheme as persisted.
///
/// `nodes` holds every node of the tree, including the root, keyed by node
/// id. Child lists on the nodes are authoritative for structure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SchemeDto {
    pub id: String,
    /// Application-facing name, unique among schemes.
    pub key: String,
    pub label: String,
    #[serde(default)]
    pub description: String,
    /// Id of the root node.
    pub root: String,
    #[serde(default)]
    pub nodes: BTreeMap<String, NodeDto>,
}

/// One node of a scheme.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeDto {
    pub id: String,
    /// `None` only for the root.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    #[serde(default)]
    pub children: Vec<String>,
    pub label: String,
    #[serde(default)]
    pub description: String,
    /// Entry this node stands for, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entry: Option<EntryReference>,
}

impl NodeDto {
    pub fn new(id: impl Into<String>, parent_id: Option<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            parent_id,
            label: label.into(),
            ..Self::default()
        }
    }
}
