//! Hierarchical categorization schemes for Folio.
//!
//! A scheme is one document: a [`SchemeDto`] holding every node of a rooted
//! tree keyed by node id. Structural edits (adding, inserting, moving and
//! removing nodes) are recorded as named changes on a [`SchemeCommand`] and
//! applied together when the command executes. After all changes apply the
//! tree is checked with [`validate_tree`]; a violation rejects the whole
//! command before anything is written.
//!
//! Reads go through [`TreeCategorization`], which indexes the nodes and
//! walks them in preorder.

mod command;
mod edits;
mod model;
mod service;
mod tree;
mod validate;

pub use command::{NodeMutator, SchemeCommand, SchemeCommandFactory};
pub use model::{NodeDto, SchemeDto};
pub use service::{CategorizationService, SchemeRepository};
pub use tree::{Preorder, TreeCategorization, TreeNode};
pub use validate::{validate_tree, TreeViolation};
