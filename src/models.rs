// Domain types for the feed core. Posts and profiles are read-only here;
// engagement edges are created and destroyed by mutation actions outside
// this crate, which only counts and filters on them.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Post identifier
pub type PostId = i64;

/// User / profile identifier
pub type UserId = i64;

/// Timestamp in milliseconds since Unix epoch, assigned by the store
pub type FeedTime = i64;

/// Current time in milliseconds since Unix epoch
pub fn current_time_millis() -> FeedTime {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_millis() as i64
}

/// A user-authored content item (log or showcase entry). The body is opaque
/// to this layer; `created_at` is the sole sort key, ties broken by `id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub id: PostId,
    pub author_id: UserId,
    pub body: String,
    pub forum_id: Option<i64>,
    pub created_at: FeedTime,
}

/// A user's public identity. Read-only join target of the page plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub id: UserId,
    pub display_name: String,
    pub handle: String,
    pub avatar_url: Option<String>,
}

/// Kind of a directed `(user, post)` engagement edge.
///
/// The store guarantees at most one `Like` and one `Bookmark` edge per
/// `(user, post)` pair; `Comment` edges are unbounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EdgeKind {
    Like,
    Comment,
    Bookmark,
}

impl EdgeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EdgeKind::Like => "like",
            EdgeKind::Comment => "comment",
            EdgeKind::Bookmark => "bookmark",
        }
    }
}

impl fmt::Display for EdgeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One row of the page plan: a post joined with its author profile.
#[derive(Debug, Clone, PartialEq)]
pub struct PostRow {
    pub post: Post,
    pub author: Profile,
}

/// A post enriched with its author profile and engagement aggregates.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeedPost {
    pub post: Post,
    pub author: Profile,
    pub like_count: u64,
    pub comment_count: u64,
    pub bookmark_count: u64,
    pub viewer_has_liked: bool,
    pub viewer_has_bookmarked: bool,
}

/// The page of enriched posts plus the total match count across all pages.
///
/// Invariants: `posts.len() <= page_size`; ordered by `(created_at desc,
/// id desc)`; `total_count` does not depend on the pagination window.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryResult {
    pub posts: Vec<FeedPost>,
    pub total_count: u64,
}
