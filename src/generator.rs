//! Seeded comment-forest generator for tests and benchmarks.

use crate::{CommentId, PostId, UserId, entity::comment};
use rand::{Rng, SeedableRng, rngs::StdRng};
use sea_orm::{ConnectionTrait, DbErr, EntityTrait, TransactionSession, TransactionTrait};
use std::collections::{HashMap, VecDeque};

/// Rows per `INSERT`; six columns each keeps well under SQLite's bind limit
const INSERT_CHUNK: usize = 500;

/// Shape of a generated forest
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TreeShape {
    pub top_level: usize,
    /// Number of levels, top-level comments included
    pub max_depth: usize,
    /// Each comment above the last level gets between one and this many replies
    pub replies_per_comment: usize,
    pub seed: u64,
}

impl Default for TreeShape {
    fn default() -> Self {
        Self {
            top_level: 10,
            max_depth: 5,
            replies_per_comment: 3,
            seed: 42,
        }
    }
}

/// Generate a forest for `post_id` with ids counting up from `first_id`.
///
/// Comments are emitted breadth-first, so every parent precedes its replies
/// and the output can be inserted in order. The same shape and seed always
/// produce the same forest.
pub fn generate_comment_tree(
    post_id: PostId,
    author_id: UserId,
    first_id: CommentId,
    shape: TreeShape,
) -> Vec<comment::Model> {
    let mut rng = StdRng::seed_from_u64(shape.seed);
    let mut next_id = first_id;
    let mut comments = Vec::new();
    let mut queue = VecDeque::new();

    for i in 0..shape.top_level {
        let top = comment::Model {
            id: next_id,
            post_id,
            author_id,
            content: format!("Top-level comment {}", i + 1),
            parent_id: None,
            attachment_url: None,
        };
        next_id += 1;
        queue.push_back((top.id, 1));
        comments.push(top);
    }

    while let Some((parent_id, level)) = queue.pop_front() {
        if level >= shape.max_depth || shape.replies_per_comment == 0 {
            continue;
        }
        let replies = rng.random_range(1..=shape.replies_per_comment);
        for i in 0..replies {
            let reply = comment::Model {
                id: next_id,
                post_id,
                author_id,
                content: format!("Reply {} at depth {level} to comment {parent_id}", i + 1),
                parent_id: Some(parent_id),
                attachment_url: None,
            };
            next_id += 1;
            queue.push_back((reply.id, level + 1));
            comments.push(reply);
        }
    }

    comments
}

/// Insert generated comments with their preassigned ids, in one transaction.
///
/// Parents must precede their replies, as [`generate_comment_tree`] emits them.
pub async fn insert_comments<C>(db: &C, comments: &[comment::Model]) -> Result<(), DbErr>
where
    C: ConnectionTrait + TransactionTrait,
{
    let txn = db.begin().await?;
    for chunk in comments.chunks(INSERT_CHUNK) {
        comment::Entity::insert_many(chunk.iter().cloned().map(comment::ActiveModel::from))
            .exec(&txn)
            .await?;
    }
    txn.commit().await
}

/// Count the descendants of `parent_id` (every comment for `None`) by
/// recursing over the parent index.
pub fn count_recursive(comments: &[comment::Model], parent_id: Option<CommentId>) -> usize {
    fn count(index: &HashMap<Option<CommentId>, Vec<CommentId>>, parent_id: Option<CommentId>) -> usize {
        index.get(&parent_id).map_or(0, |children| {
            children
                .iter()
                .map(|&child| 1 + count(index, Some(child)))
                .sum()
        })
    }
    count(&parent_index(comments), parent_id)
}

/// Same as [`count_recursive`], walking the index with a queue
pub fn count_iterative(comments: &[comment::Model], parent_id: Option<CommentId>) -> usize {
    let index = parent_index(comments);
    let mut queue = VecDeque::from([parent_id]);
    let mut count = 0;
    while let Some(parent_id) = queue.pop_front() {
        if let Some(children) = index.get(&parent_id) {
            count += children.len();
            queue.extend(children.iter().map(|&child| Some(child)));
        }
    }
    count
}

fn parent_index(comments: &[comment::Model]) -> HashMap<Option<CommentId>, Vec<CommentId>> {
    let mut index: HashMap<_, Vec<_>> = HashMap::new();
    for comment in comments {
        index.entry(comment.parent_id).or_default().push(comment.id);
    }
    index
}
