//! Tree materialization: building, flattening and subtree deletion.

mod arena;
mod builder;
mod delete;
mod flatten;

pub(crate) use arena::CommentArena;
pub use builder::{BuildStrategy, TreeBuilder};
pub use delete::{DeletedSubtree, SubtreeDeleter};
pub use flatten::{flatten, flatten_records};

use crate::{CommentId, entity::comment};
use serde::{Deserialize, Serialize};

/// A comment in tree form, owning its replies.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentNode {
    #[serde(flatten)]
    pub comment: comment::Model,
    /// Number of ancestors; top-level comments are at depth 0
    pub depth: usize,
    /// Direct replies in discovery order
    pub replies: Vec<CommentNode>,
}

/// A comment in flat form, positioned by its dotted sibling-rank path.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlatComment {
    #[serde(flatten)]
    pub comment: comment::Model,
    pub depth: usize,
    /// 1-based sibling ranks from the root, e.g. `"1.2.3"`
    pub path: String,
}

impl CommentNode {
    pub fn new(comment: comment::Model, depth: usize) -> Self {
        Self {
            comment,
            depth,
            replies: Vec::new(),
        }
    }

    pub fn id(&self) -> CommentId {
        self.comment.id
    }

    /// Number of comments in this subtree, the node itself included
    pub fn subtree_len(&self) -> usize {
        let mut len = 0;
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            len += 1;
            stack.extend(node.replies.iter());
        }
        len
    }

    /// Every `(parent, child)` edge of this subtree
    pub fn edges(&self) -> Vec<(CommentId, CommentId)> {
        let mut edges = Vec::new();
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            for reply in &node.replies {
                edges.push((node.id(), reply.id()));
                stack.push(reply);
            }
        }
        edges
    }
}

impl Drop for CommentNode {
    // the derived drop recurses once per level
    fn drop(&mut self) {
        let mut stack = std::mem::take(&mut self.replies);
        while let Some(mut node) = stack.pop() {
            stack.append(&mut node.replies);
        }
    }
}

impl FlatComment {
    pub fn id(&self) -> CommentId {
        self.comment.id
    }

    /// Path of the parent entry, `None` for top-level comments
    pub fn parent_path(&self) -> Option<&str> {
        self.path.rsplit_once('.').map(|(parent, _)| parent)
    }
}

/// Total number of comments in a forest
pub fn forest_len(roots: &[CommentNode]) -> usize {
    roots.iter().map(CommentNode::subtree_len).sum()
}
