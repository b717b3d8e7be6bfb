use crate::{CommentId, PostId};
use sea_orm::{DbErr, SqlErr};
use thiserror::Error;

/// Result type of every comment-tree operation
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// An error from an unsuccessful comment-tree operation.
///
/// A missing comment is not an error: lookups return `Option` and deletions
/// return `false`, leaving the caller to decide what "not found" means.
#[derive(Error, Debug)]
pub enum Error {
    /// The backing store failed to respond or to confirm an operation
    #[error("Store Unavailable: {0}")]
    StoreUnavailable(#[source] DbErr),
    /// Stored or requested data violates the per-post forest invariant
    #[error("Invalid Relation: {0}")]
    InvalidRelation(#[from] RelationError),
}

/// A violation of the per-post forest invariant.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RelationError {
    /// A reply points at a parent that is not part of the same post
    #[error("comment {comment_id} replies to {parent_id}, which is not a comment of post {post_id}")]
    MissingParent {
        comment_id: CommentId,
        parent_id: CommentId,
        post_id: PostId,
    },
    /// A new reply names a parent that is not a comment of its post
    #[error("cannot reply to {parent_id}, which is not a comment of post {post_id}")]
    UnknownParent { parent_id: CommentId, post_id: PostId },
    /// A record was returned for a post other than the one requested
    #[error("comment {comment_id} belongs to post {found}, expected post {expected}")]
    CrossPost {
        comment_id: CommentId,
        expected: PostId,
        found: PostId,
    },
    /// Some comments cannot be reached from any top-level comment
    #[error("{} comment(s) of post {post_id} are caught in a parent cycle: {comment_ids:?}", .comment_ids.len())]
    Cycle {
        post_id: PostId,
        comment_ids: Vec<CommentId>,
    },
    /// The database rejected a write on a foreign key
    #[error("foreign key violation: {0}")]
    ForeignKey(String),
}

impl From<DbErr> for Error {
    fn from(err: DbErr) -> Self {
        match err.sql_err() {
            Some(SqlErr::ForeignKeyConstraintViolation(message)) => {
                Self::InvalidRelation(RelationError::ForeignKey(message))
            }
            _ => Self::StoreUnavailable(err),
        }
    }
}

impl Error {
    pub fn is_invalid_relation(&self) -> bool {
        matches!(self, Self::InvalidRelation(_))
    }

    pub fn is_store_unavailable(&self) -> bool {
        matches!(self, Self::StoreUnavailable(_))
    }
}
