use super::{CommentArena, CommentNode};
use crate::{PostId, error::Result, store::CommentStore};
use serde::{Deserialize, Serialize};
use std::{collections::VecDeque, fmt, str::FromStr};

/// How a comment tree is constructed from the stored parent relation.
///
/// Both strategies produce the same nodes, edges and sibling order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildStrategy {
    /// Fetch through one recursive query when the store supports it, then
    /// build by depth-first recursive descent; forests deeper than the
    /// descent limit are assembled breadth-first
    Recursive,
    /// Fetch the flat set in one round trip and build breadth-first with an
    /// explicit queue; call-stack usage does not grow with tree depth
    Iterative,
}

impl BuildStrategy {
    /// Recursive when the store can push the traversal into a single
    /// recursive query, iterative otherwise
    pub fn preferred<S>(store: &S) -> Self
    where
        S: CommentStore + ?Sized,
    {
        if store.supports_recursive_query() {
            Self::Recursive
        } else {
            Self::Iterative
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Recursive => "recursive",
            Self::Iterative => "iterative",
        }
    }
}

impl fmt::Display for BuildStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BuildStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "recursive" => Ok(Self::Recursive),
            "iterative" => Ok(Self::Iterative),
            other => Err(format!("unknown build strategy: {other}")),
        }
    }
}

/// Builds per-post comment trees from a [`CommentStore`].
#[derive(Debug)]
pub struct TreeBuilder<'a, S: ?Sized> {
    store: &'a S,
}

impl<'a, S> TreeBuilder<'a, S>
where
    S: CommentStore + ?Sized,
{
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Top-level comments of `post_id`, each carrying its full subtree.
    /// An unknown post yields an empty forest.
    pub async fn build(&self, post_id: PostId, strategy: BuildStrategy) -> Result<Vec<CommentNode>> {
        let roots = match strategy {
            BuildStrategy::Recursive => self.build_recursive(post_id).await?,
            BuildStrategy::Iterative => self.build_iterative(post_id).await?,
        };
        tracing::debug!(post_id, %strategy, top_level = roots.len(), "built comment tree");
        Ok(roots)
    }

    pub async fn build_recursive(&self, post_id: PostId) -> Result<Vec<CommentNode>> {
        let records = if self.store.supports_recursive_query() {
            self.store.fetch_all_recursive(post_id).await?
        } else {
            self.store.fetch_all_by_post(post_id).await?
        };
        let arena = CommentArena::new(post_id, records)?;
        Ok(descend_forest(&arena))
    }

    pub async fn build_iterative(&self, post_id: PostId) -> Result<Vec<CommentNode>> {
        let records = self.store.fetch_all_by_post(post_id).await?;
        let arena = CommentArena::new(post_id, records)?;
        Ok(assemble_breadth_first(&arena))
    }

    /// Two-level view: top-level comments with their direct replies, or the
    /// top-level comments alone
    pub async fn threads(&self, post_id: PostId, include_replies: bool) -> Result<Vec<CommentNode>> {
        let records = self.store.fetch_by_post(post_id, include_replies).await?;
        let arena = CommentArena::new(post_id, records)?;
        Ok(assemble_breadth_first(&arena))
    }
}

/// Deepest forest built by recursive descent; deeper ones are assembled
/// breadth-first so the call stack stays bounded
const MAX_DESCENT_DEPTH: usize = 512;

pub(crate) fn descend_forest(arena: &CommentArena) -> Vec<CommentNode> {
    let height = arena.height();
    if height > MAX_DESCENT_DEPTH {
        tracing::debug!(post_id = arena.post_id(), height, "forest too deep to descend, assembling breadth-first");
        return assemble_breadth_first(arena);
    }
    arena
        .roots()
        .iter()
        .map(|&pos| descend(arena, pos, 0))
        .collect()
}

fn descend(arena: &CommentArena, pos: usize, depth: usize) -> CommentNode {
    CommentNode {
        comment: arena.get(pos).clone(),
        depth,
        replies: arena
            .children(pos)
            .iter()
            .map(|&child| descend(arena, child, depth + 1))
            .collect(),
    }
}

pub(crate) fn assemble_breadth_first(arena: &CommentArena) -> Vec<CommentNode> {
    let mut order = Vec::with_capacity(arena.len());
    let mut depths = vec![0; arena.len()];
    let mut queue: VecDeque<usize> = arena.roots().iter().copied().collect();

    while let Some(pos) = queue.pop_front() {
        order.push(pos);
        for &child in arena.children(pos) {
            depths[child] = depths[pos] + 1;
            queue.push_back(child);
        }
    }

    // walking the discovery order backwards finishes every reply before its
    // parent claims it
    let mut built: Vec<Option<CommentNode>> = (0..arena.len()).map(|_| None).collect();
    for &pos in order.iter().rev() {
        let replies = arena
            .children(pos)
            .iter()
            .filter_map(|&child| built[child].take())
            .collect();
        built[pos] = Some(CommentNode {
            comment: arena.get(pos).clone(),
            depth: depths[pos],
            replies,
        });
    }

    arena
        .roots()
        .iter()
        .filter_map(|&pos| built[pos].take())
        .collect()
}
