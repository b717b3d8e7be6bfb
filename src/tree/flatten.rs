use super::{CommentArena, CommentNode, FlatComment, builder::assemble_breadth_first};
use crate::{PostId, entity::comment, error::Result};

/// Pre-order listing of a forest, annotated with depth and dotted path.
///
/// A root's path is its 1-based rank among the roots; a reply's path is its
/// parent's path followed by its 1-based rank among its siblings, in the
/// order the replies appear in the tree. Depth is counted during the walk, the
/// `depth` stored on the input nodes is not consulted.
pub fn flatten(roots: &[CommentNode]) -> Vec<FlatComment> {
    let mut flat = Vec::with_capacity(super::forest_len(roots));
    let mut stack: Vec<(&CommentNode, usize, String)> = roots
        .iter()
        .enumerate()
        .rev()
        .map(|(rank, node)| (node, 0, (rank + 1).to_string()))
        .collect();

    while let Some((node, depth, path)) = stack.pop() {
        for (rank, reply) in node.replies.iter().enumerate().rev() {
            stack.push((reply, depth + 1, format!("{path}.{}", rank + 1)));
        }
        flat.push(FlatComment {
            comment: node.comment.clone(),
            depth,
            path,
        });
    }

    flat
}

/// Flatten an unordered record set of one post
pub fn flatten_records(post_id: PostId, records: Vec<comment::Model>) -> Result<Vec<FlatComment>> {
    let arena = CommentArena::new(post_id, records)?;
    Ok(flatten(&assemble_breadth_first(&arena)))
}
