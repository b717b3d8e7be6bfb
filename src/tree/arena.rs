use crate::{
    CommentId, PostId,
    entity::comment,
    error::{RelationError, Result},
};
use std::collections::{HashMap, VecDeque};

/// Comments of one post, indexed by position, with a `parent -> children`
/// index built once on construction.
///
/// Records are ordered by id, so roots and siblings always come out in
/// creation order regardless of the order the store returned them in.
#[derive(Debug)]
pub(crate) struct CommentArena {
    post_id: PostId,
    nodes: Vec<comment::Model>,
    positions: HashMap<CommentId, usize>,
    roots: Vec<usize>,
    children: Vec<Vec<usize>>,
}

impl CommentArena {
    /// Index `records`, rejecting any that break the forest invariant
    pub fn new(post_id: PostId, mut records: Vec<comment::Model>) -> Result<Self> {
        records.sort_unstable_by_key(|c| c.id);
        records.dedup_by_key(|c| c.id);

        let positions: HashMap<CommentId, usize> = records
            .iter()
            .enumerate()
            .map(|(pos, c)| (c.id, pos))
            .collect();
        let mut roots = Vec::new();
        let mut children = vec![Vec::new(); records.len()];

        for (pos, record) in records.iter().enumerate() {
            if record.post_id != post_id {
                return Err(violation(RelationError::CrossPost {
                    comment_id: record.id,
                    expected: post_id,
                    found: record.post_id,
                }));
            }
            match record.parent_id {
                None => roots.push(pos),
                Some(parent_id) => match positions.get(&parent_id) {
                    Some(&parent) => children[parent].push(pos),
                    None => {
                        return Err(violation(RelationError::MissingParent {
                            comment_id: record.id,
                            parent_id,
                            post_id,
                        }));
                    }
                },
            }
        }

        let arena = Self {
            post_id,
            nodes: records,
            positions,
            roots,
            children,
        };
        arena.check_acyclic()?;
        Ok(arena)
    }

    /// Every node with a parent in the arena is reachable from a root unless
    /// the parent chain loops back on itself.
    fn check_acyclic(&self) -> Result<()> {
        let mut reached = vec![false; self.nodes.len()];
        let mut stack = self.roots.clone();
        while let Some(pos) = stack.pop() {
            reached[pos] = true;
            stack.extend_from_slice(&self.children[pos]);
        }
        let comment_ids: Vec<CommentId> = reached
            .iter()
            .zip(&self.nodes)
            .filter(|(reached, _)| !**reached)
            .map(|(_, c)| c.id)
            .collect();

        if comment_ids.is_empty() {
            Ok(())
        } else {
            Err(violation(RelationError::Cycle {
                post_id: self.post_id,
                comment_ids,
            }))
        }
    }

    pub fn post_id(&self) -> PostId {
        self.post_id
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn roots(&self) -> &[usize] {
        &self.roots
    }

    pub fn children(&self, pos: usize) -> &[usize] {
        &self.children[pos]
    }

    pub fn get(&self, pos: usize) -> &comment::Model {
        &self.nodes[pos]
    }

    pub fn position(&self, id: CommentId) -> Option<usize> {
        self.positions.get(&id).copied()
    }

    /// `pos` and all its transitive descendants, in breadth-first order
    pub fn subtree(&self, pos: usize) -> Vec<usize> {
        let mut order = Vec::new();
        let mut queue = VecDeque::from([pos]);
        while let Some(current) = queue.pop_front() {
            order.push(current);
            queue.extend(self.children[current].iter().copied());
        }
        order
    }

    /// Number of levels; 0 for an empty arena
    pub fn height(&self) -> usize {
        let mut height = 0;
        let mut level = self.roots.clone();
        while !level.is_empty() {
            height += 1;
            level = level
                .iter()
                .flat_map(|&pos| self.children[pos].iter().copied())
                .collect();
        }
        height
    }
}

fn violation(err: RelationError) -> crate::Error {
    tracing::warn!(%err, "comment forest invariant violated");
    err.into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn comment(id: CommentId, parent_id: Option<CommentId>) -> comment::Model {
        comment::Model {
            id,
            post_id: 1,
            author_id: 1,
            content: format!("comment {id}"),
            parent_id,
            attachment_url: None,
        }
    }

    #[test]
    fn indexes_children_in_id_order() {
        let arena = CommentArena::new(
            1,
            vec![
                comment(4, Some(1)),
                comment(2, Some(1)),
                comment(1, None),
                comment(3, None),
            ],
        )
        .unwrap();

        let ids = |positions: &[usize]| -> Vec<CommentId> {
            positions.iter().map(|&p| arena.get(p).id).collect()
        };
        assert_eq!(ids(arena.roots()), vec![1, 3]);
        assert_eq!(ids(arena.children(arena.position(1).unwrap())), vec![2, 4]);
        assert_eq!(ids(&arena.subtree(arena.position(1).unwrap())), vec![1, 2, 4]);
    }

    #[test]
    fn rejects_orphaned_reply() {
        let err = CommentArena::new(1, vec![comment(1, None), comment(2, Some(9))]).unwrap_err();
        assert!(matches!(
            err,
            crate::Error::InvalidRelation(RelationError::MissingParent {
                comment_id: 2,
                parent_id: 9,
                post_id: 1
            })
        ));
    }

    #[test]
    fn rejects_foreign_post() {
        let mut stray = comment(2, None);
        stray.post_id = 7;
        let err = CommentArena::new(1, vec![comment(1, None), stray]).unwrap_err();
        assert!(matches!(
            err,
            crate::Error::InvalidRelation(RelationError::CrossPost {
                comment_id: 2,
                expected: 1,
                found: 7
            })
        ));
    }

    #[test]
    fn rejects_cycle() {
        let err = CommentArena::new(
            1,
            vec![
                comment(1, None),
                comment(2, Some(3)),
                comment(3, Some(2)),
                comment(4, Some(4)),
            ],
        )
        .unwrap_err();
        match err {
            crate::Error::InvalidRelation(RelationError::Cycle { comment_ids, .. }) => {
                assert_eq!(comment_ids, vec![2, 3, 4])
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
