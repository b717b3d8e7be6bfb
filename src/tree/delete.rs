use super::CommentArena;
use crate::{CommentId, PostId, error::Result, store::CommentStore};

/// Outcome of a successful subtree deletion.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeletedSubtree {
    pub post_id: PostId,
    /// Ids of the subtree when the deletion ran, deepest first; the target
    /// comes last
    pub targeted: Vec<CommentId>,
    /// Records the store reported removed. Falls short of `targeted` when
    /// part of the subtree was already gone.
    pub affected: u64,
}

impl DeletedSubtree {
    pub fn root(&self) -> Option<CommentId> {
        self.targeted.last().copied()
    }

    /// Number of targeted descendants, the target excluded
    pub fn descendants(&self) -> usize {
        self.targeted.len().saturating_sub(1)
    }

    /// Every targeted record was removed by this deletion
    pub fn is_complete(&self) -> bool {
        self.affected == self.targeted.len() as u64
    }
}

/// Removes a comment together with every transitive reply.
#[derive(Debug)]
pub struct SubtreeDeleter<'a, S: ?Sized> {
    store: &'a S,
}

impl<'a, S> SubtreeDeleter<'a, S>
where
    S: CommentStore + ?Sized,
{
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// `Ok(None)` when `comment_id` does not exist.
    ///
    /// Descendants are discovered through the same `parent -> children` index
    /// the tree builder uses and removed in one batch, children before their
    /// parents, so no surviving record refers to a removed one.
    pub async fn delete(&self, comment_id: CommentId) -> Result<Option<DeletedSubtree>> {
        let Some(target) = self.store.find_by_id(comment_id).await? else {
            tracing::debug!(comment_id, "nothing to delete");
            return Ok(None);
        };

        let records = self.store.fetch_all_by_post(target.post_id).await?;
        let arena = CommentArena::new(target.post_id, records)?;
        let Some(pos) = arena.position(comment_id) else {
            // removed between the two reads
            return Ok(None);
        };

        let targeted: Vec<CommentId> = arena
            .subtree(pos)
            .into_iter()
            .rev()
            .map(|pos| arena.get(pos).id)
            .collect();
        let affected = self.store.delete_batch(&targeted).await?;

        if affected == 0 {
            return Ok(None);
        }
        let deleted = DeletedSubtree {
            post_id: arena.post_id(),
            targeted,
            affected,
        };
        if !deleted.is_complete() {
            tracing::warn!(
                comment_id,
                expected = deleted.targeted.len(),
                affected,
                "subtree changed while it was being deleted"
            );
        }
        tracing::debug!(comment_id, post_id = deleted.post_id, affected, "deleted comment subtree");

        Ok(Some(deleted))
    }
}
