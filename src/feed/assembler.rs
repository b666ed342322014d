//! Joins page rows with the aggregation summary into the public result
//! shape. Input order is the page plan's order and is preserved exactly;
//! the assembler never re-sorts.

use crate::feed::aggregation::EngagementSummary;
use crate::models::{FeedPost, PostRow, QueryResult};

pub fn assemble(rows: Vec<PostRow>, summary: &EngagementSummary, total_count: u64) -> QueryResult {
    let posts = rows
        .into_iter()
        .map(|row| {
            let post_id = row.post.id;
            FeedPost {
                post: row.post,
                author: row.author,
                like_count: summary.like_count(post_id),
                comment_count: summary.comment_count(post_id),
                bookmark_count: summary.bookmark_count(post_id),
                viewer_has_liked: summary.viewer_has_liked(post_id),
                viewer_has_bookmarked: summary.viewer_has_bookmarked(post_id),
            }
        })
        .collect();

    QueryResult { posts, total_count }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Post, Profile};

    fn row(id: i64) -> PostRow {
        PostRow {
            post: Post {
                id,
                author_id: 1,
                body: format!("post {}", id),
                forum_id: None,
                created_at: 1000 + id,
            },
            author: Profile {
                id: 1,
                display_name: "Ada".to_string(),
                handle: "ada".to_string(),
                avatar_url: None,
            },
        }
    }

    #[test]
    fn preserves_page_order() {
        let rows = vec![row(9), row(3), row(7)];
        let result = assemble(rows, &EngagementSummary::empty(), 3);
        let ids: Vec<i64> = result.posts.iter().map(|p| p.post.id).collect();
        assert_eq!(ids, vec![9, 3, 7]);
    }

    #[test]
    fn empty_page_keeps_total_count() {
        let result = assemble(Vec::new(), &EngagementSummary::empty(), 17);
        assert!(result.posts.is_empty());
        assert_eq!(result.total_count, 17);
    }

    #[test]
    fn missing_aggregates_resolve_to_zero() {
        let result = assemble(vec![row(5)], &EngagementSummary::empty(), 1);
        let post = &result.posts[0];
        assert_eq!(post.like_count, 0);
        assert_eq!(post.comment_count, 0);
        assert_eq!(post.bookmark_count, 0);
        assert!(!post.viewer_has_liked);
        assert!(!post.viewer_has_bookmarked);
    }
}
