// In-memory backend. Interprets compiled plans with the same predicate,
// ordering and pagination semantics as the Postgres backend; tests and
// local runs use it in place of a live database.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use tokio::sync::RwLock;

use crate::error::{FeedError, FeedResult};
use crate::feed::compiler::{CountPlan, PagePlan};
use crate::feed::options::FilterSet;
use crate::models::{EdgeKind, Post, PostId, PostRow, Profile, UserId};
use crate::store::FeedStore;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct StoredEdge {
    user_id: UserId,
    post_id: PostId,
    kind: EdgeKind,
}

#[derive(Default)]
struct MemoryState {
    posts: Vec<Post>,
    profiles: HashMap<UserId, Profile>,
    edges: Vec<StoredEdge>,
}

#[derive(Default)]
pub struct MemoryStore {
    state: RwLock<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_profile(&self, profile: Profile) {
        let mut state = self.state.write().await;
        state.profiles.insert(profile.id, profile);
    }

    /// Seed a post. The author profile must already exist; the page plan's
    /// inner join makes an authorless post unrepresentable, and the memory
    /// backend mirrors that.
    pub async fn add_post(&self, post: Post) -> FeedResult<()> {
        let mut state = self.state.write().await;
        if !state.profiles.contains_key(&post.author_id) {
            return Err(FeedError::Internal(format!(
                "post {} references unknown author {}",
                post.id, post.author_id
            )));
        }
        state.posts.push(post);
        Ok(())
    }

    /// Seed an engagement edge. Duplicate like/bookmark edges for the same
    /// (user, post) pair are ignored, matching the store invariant.
    pub async fn add_edge(&self, user_id: UserId, post_id: PostId, kind: EdgeKind) {
        let edge = StoredEdge {
            user_id,
            post_id,
            kind,
        };
        let mut state = self.state.write().await;
        if kind != EdgeKind::Comment && state.edges.contains(&edge) {
            return;
        }
        state.edges.push(edge);
    }

    pub async fn remove_edges(&self, user_id: UserId, post_id: PostId, kind: EdgeKind) {
        let mut state = self.state.write().await;
        state
            .edges
            .retain(|e| !(e.user_id == user_id && e.post_id == post_id && e.kind == kind));
    }
}

fn matches(filters: &FilterSet, post: &Post, edges: &[StoredEdge]) -> bool {
    if let Some(author_id) = filters.author_id {
        if post.author_id != author_id {
            return false;
        }
    }
    for (kind, user_id) in filters.engagement_predicates() {
        let engaged = edges
            .iter()
            .any(|e| e.kind == kind && e.user_id == user_id && e.post_id == post.id);
        if !engaged {
            return false;
        }
    }
    if let Some(ref text) = filters.search_text {
        if !post.body.to_lowercase().contains(&text.to_lowercase()) {
            return false;
        }
    }
    true
}

#[async_trait]
impl FeedStore for MemoryStore {
    async fn fetch_page(&self, plan: &PagePlan) -> FeedResult<Vec<PostRow>> {
        let state = self.state.read().await;

        let mut matched: Vec<&Post> = state
            .posts
            .iter()
            .filter(|post| matches(&plan.filters, post, &state.edges))
            .collect();
        matched.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.id.cmp(&a.id))
        });

        matched
            .into_iter()
            .skip(plan.offset as usize)
            .take(plan.limit as usize)
            .map(|post| {
                let author = state.profiles.get(&post.author_id).ok_or_else(|| {
                    FeedError::Internal(format!(
                        "post {} references unknown author {}",
                        post.id, post.author_id
                    ))
                })?;
                Ok(PostRow {
                    post: post.clone(),
                    author: author.clone(),
                })
            })
            .collect()
    }

    async fn count(&self, plan: &CountPlan) -> FeedResult<u64> {
        let state = self.state.read().await;
        let total = state
            .posts
            .iter()
            .filter(|post| matches(&plan.filters, post, &state.edges))
            .count();
        Ok(total as u64)
    }

    async fn edge_counts(
        &self,
        kind: EdgeKind,
        post_ids: &[PostId],
    ) -> FeedResult<HashMap<PostId, u64>> {
        let wanted: HashSet<PostId> = post_ids.iter().copied().collect();
        let state = self.state.read().await;

        let mut counts: HashMap<PostId, u64> = HashMap::new();
        for edge in &state.edges {
            if edge.kind == kind && wanted.contains(&edge.post_id) {
                *counts.entry(edge.post_id).or_insert(0) += 1;
            }
        }
        Ok(counts)
    }

    async fn edges_of_user(
        &self,
        kind: EdgeKind,
        user_id: UserId,
        post_ids: &[PostId],
    ) -> FeedResult<HashSet<PostId>> {
        let wanted: HashSet<PostId> = post_ids.iter().copied().collect();
        let state = self.state.read().await;

        Ok(state
            .edges
            .iter()
            .filter(|e| e.kind == kind && e.user_id == user_id && wanted.contains(&e.post_id))
            .map(|e| e.post_id)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn post(id: PostId, author_id: UserId, body: &str, created_at: i64) -> Post {
        Post {
            id,
            author_id,
            body: body.to_string(),
            forum_id: None,
            created_at,
        }
    }

    fn profile(id: UserId) -> Profile {
        Profile {
            id,
            display_name: format!("user {}", id),
            handle: format!("user{}", id),
            avatar_url: None,
        }
    }

    #[tokio::test]
    async fn post_without_author_profile_is_rejected() {
        let store = MemoryStore::new();
        let result = store.add_post(post(1, 99, "orphan", 1000)).await;
        assert!(matches!(result, Err(FeedError::Internal(_))));
    }

    #[tokio::test]
    async fn duplicate_like_edges_collapse() {
        let store = MemoryStore::new();
        store.add_profile(profile(1)).await;
        store.add_post(post(10, 1, "hello", 1000)).await.unwrap();

        store.add_edge(2, 10, EdgeKind::Like).await;
        store.add_edge(2, 10, EdgeKind::Like).await;
        store.add_edge(2, 10, EdgeKind::Comment).await;
        store.add_edge(2, 10, EdgeKind::Comment).await;

        let likes = store.edge_counts(EdgeKind::Like, &[10]).await.unwrap();
        let comments = store.edge_counts(EdgeKind::Comment, &[10]).await.unwrap();
        assert_eq!(likes.get(&10), Some(&1));
        assert_eq!(comments.get(&10), Some(&2));
    }

    #[tokio::test]
    async fn search_is_case_insensitive_substring() {
        let store = MemoryStore::new();
        store.add_profile(profile(1)).await;
        store
            .add_post(post(1, 1, "Weekly Climbing Meetup", 1000))
            .await
            .unwrap();
        store.add_post(post(2, 1, "chess night", 1001)).await.unwrap();

        let plan = PagePlan {
            filters: FilterSet {
                search_text: Some("climbing".to_string()),
                ..Default::default()
            },
            limit: 10,
            offset: 0,
        };
        let rows = store.fetch_page(&plan).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].post.id, 1);
    }
}
