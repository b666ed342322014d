//! Engagement aggregation for one page of posts. The resolver answers in a
//! bounded number of store round-trips regardless of page size: one grouped
//! count per edge kind plus up to two viewer membership probes, all issued
//! concurrently. A failed batch degrades its counts to zero and is logged;
//! it never fails the page.

use std::collections::{HashMap, HashSet};
use tracing::error;

use crate::error::FeedResult;
use crate::models::{EdgeKind, PostId, QueryResult, UserId};
use crate::store::FeedStore;

#[derive(Debug, Default)]
pub struct EngagementSummary {
    like_counts: HashMap<PostId, u64>,
    comment_counts: HashMap<PostId, u64>,
    bookmark_counts: HashMap<PostId, u64>,
    viewer_liked: HashSet<PostId>,
    viewer_bookmarked: HashSet<PostId>,
}

impl EngagementSummary {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Resolve counts and viewer state for a page worth of post ids.
    pub async fn resolve(
        store: &dyn FeedStore,
        post_ids: &[PostId],
        viewer: Option<UserId>,
    ) -> Self {
        if post_ids.is_empty() {
            return Self::empty();
        }

        let (likes, comments, bookmarks) = futures::join!(
            store.edge_counts(EdgeKind::Like, post_ids),
            store.edge_counts(EdgeKind::Comment, post_ids),
            store.edge_counts(EdgeKind::Bookmark, post_ids),
        );

        let (viewer_liked, viewer_bookmarked) = match viewer {
            Some(user_id) => {
                let (liked, bookmarked) = futures::join!(
                    store.edges_of_user(EdgeKind::Like, user_id, post_ids),
                    store.edges_of_user(EdgeKind::Bookmark, user_id, post_ids),
                );
                (
                    membership_or_empty(EdgeKind::Like, liked),
                    membership_or_empty(EdgeKind::Bookmark, bookmarked),
                )
            }
            None => (HashSet::new(), HashSet::new()),
        };

        Self {
            like_counts: counts_or_zero(EdgeKind::Like, likes),
            comment_counts: counts_or_zero(EdgeKind::Comment, comments),
            bookmark_counts: counts_or_zero(EdgeKind::Bookmark, bookmarks),
            viewer_liked,
            viewer_bookmarked,
        }
    }

    pub fn like_count(&self, post_id: PostId) -> u64 {
        self.like_counts.get(&post_id).copied().unwrap_or(0)
    }

    pub fn comment_count(&self, post_id: PostId) -> u64 {
        self.comment_counts.get(&post_id).copied().unwrap_or(0)
    }

    pub fn bookmark_count(&self, post_id: PostId) -> u64 {
        self.bookmark_counts.get(&post_id).copied().unwrap_or(0)
    }

    pub fn viewer_has_liked(&self, post_id: PostId) -> bool {
        self.viewer_liked.contains(&post_id)
    }

    pub fn viewer_has_bookmarked(&self, post_id: PostId) -> bool {
        self.viewer_bookmarked.contains(&post_id)
    }
}

fn counts_or_zero(
    kind: EdgeKind,
    result: FeedResult<HashMap<PostId, u64>>,
) -> HashMap<PostId, u64> {
    match result {
        Ok(counts) => counts,
        Err(e) => {
            error!("engagement count batch for kind {} failed: {}", kind, e);
            HashMap::new()
        }
    }
}

fn membership_or_empty(kind: EdgeKind, result: FeedResult<HashSet<PostId>>) -> HashSet<PostId> {
    match result {
        Ok(posts) => posts,
        Err(e) => {
            error!("viewer {} state batch failed: {}", kind, e);
            HashSet::new()
        }
    }
}

/// Overwrite the viewer-own like/bookmark flags of an assembled result with
/// fresh store state. Aggregate counts may be served stale from a cache;
/// the requesting user's own engagement state must not be.
pub async fn refresh_viewer_state(
    store: &dyn FeedStore,
    result: &mut QueryResult,
    viewer: Option<UserId>,
) {
    let post_ids: Vec<PostId> = result.posts.iter().map(|p| p.post.id).collect();

    let (liked, bookmarked) = match viewer {
        Some(user_id) if !post_ids.is_empty() => {
            let (liked, bookmarked) = futures::join!(
                store.edges_of_user(EdgeKind::Like, user_id, &post_ids),
                store.edges_of_user(EdgeKind::Bookmark, user_id, &post_ids),
            );
            (
                membership_or_empty(EdgeKind::Like, liked),
                membership_or_empty(EdgeKind::Bookmark, bookmarked),
            )
        }
        _ => (HashSet::new(), HashSet::new()),
    };

    for post in &mut result.posts {
        post.viewer_has_liked = liked.contains(&post.post.id);
        post.viewer_has_bookmarked = bookmarked.contains(&post.post.id);
    }
}
