// Store backends
pub mod postgres; // Production backend over sqlx
pub mod memory;   // In-process backend used by tests and local runs

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};

use crate::error::FeedResult;
use crate::feed::compiler::{CountPlan, PagePlan};
use crate::models::{EdgeKind, PostId, PostRow, UserId};

pub use memory::MemoryStore;
pub use postgres::PostgresFeedStore;

/// The relational capability the feed core reads through. All methods are
/// reads; edge creation and deletion belong to mutation actions outside
/// this core. Backends must execute the page and count plans against the
/// same logical snapshot semantics: identical predicates, identical rows.
#[async_trait]
pub trait FeedStore: Send + Sync {
    /// Execute the page plan: filtered, ordered, paginated posts joined with
    /// their author profiles.
    async fn fetch_page(&self, plan: &PagePlan) -> FeedResult<Vec<PostRow>>;

    /// Execute the count plan: how many posts match the filters, across all
    /// pages.
    async fn count(&self, plan: &CountPlan) -> FeedResult<u64>;

    /// Grouped edge counts for a batch of posts, one round-trip per call.
    /// Posts absent from the result have zero edges of this kind.
    async fn edge_counts(
        &self,
        kind: EdgeKind,
        post_ids: &[PostId],
    ) -> FeedResult<HashMap<PostId, u64>>;

    /// Which of the given posts carry an edge of this kind from this user.
    /// One round-trip per call, used for viewer-own like/bookmark state.
    async fn edges_of_user(
        &self,
        kind: EdgeKind,
        user_id: UserId,
        post_ids: &[PostId],
    ) -> FeedResult<HashSet<PostId>>;
}
