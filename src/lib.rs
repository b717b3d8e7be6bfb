#![deny(
    missing_debug_implementations,
    clippy::print_stderr,
    clippy::print_stdout
)]

//! # comment-tree
//!
//! Materializes per-post comment forests stored as a flat, self-referencing
//! `comment` table.
//!
//! Given the `parent_id` relation, the crate produces
//!
//! 1. a nested tree of [`CommentNode`]s, built either by recursive descent or by
//!    an iterative breadth-first walk ([`BuildStrategy`]),
//! 2. a flattened pre-order listing of [`FlatComment`]s annotated with depth and
//!    a dotted path such as `"1.2.3"`,
//! 3. cascading deletion of a comment together with its whole subtree.
//!
//! Views are memoized per post in a [`TreeCache`] and invalidated by every
//! mutation routed through [`CommentService`].
//!
//! ```no_run
//! use comment_tree::{CommentService, DatabaseStore, TreeConfig};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = TreeConfig::from_env()?;
//! let db = config.connect().await?;
//! let service = CommentService::from_config(DatabaseStore::from_config(db, &config), &config);
//!
//! for entry in service.flat_comments(1).await?.iter() {
//!     println!("{} {}", entry.path, entry.comment.content);
//! }
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod config;
pub mod entity;
pub mod error;
pub mod generator;
pub mod service;
pub mod store;
pub mod tree;

pub use cache::{CacheBackend, CacheableView, CachedView, MemoryCache, TreeCache, ViewKind};
pub use config::{ConfigError, TreeConfig};
pub use error::{Error, RelationError, Result};
pub use generator::{TreeShape, generate_comment_tree};
pub use service::CommentService;
pub use store::{CommentStore, DatabaseStore, NewComment};
pub use tree::{
    BuildStrategy, CommentNode, DeletedSubtree, FlatComment, SubtreeDeleter, TreeBuilder, flatten,
    flatten_records, forest_len,
};

/// Primary key of a comment.
pub type CommentId = i32;
/// Primary key of a post.
pub type PostId = i32;
/// Primary key of a user.
pub type UserId = i32;
