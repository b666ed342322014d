// Postgres backend - renders compiled plans into SQL against the posts,
// profiles and engagement_edges tables. Engagement filters become EXISTS
// semi-joins; page and count share one clause builder so their predicates
// cannot drift apart.

use async_trait::async_trait;
use sqlx::{PgPool, Row};
use std::collections::{HashMap, HashSet};

use crate::error::{FeedError, FeedResult};
use crate::feed::compiler::{CountPlan, PagePlan};
use crate::feed::options::FilterSet;
use crate::models::{
    current_time_millis, EdgeKind, Post, PostId, PostRow, Profile, UserId,
};
use crate::store::FeedStore;

pub struct PostgresFeedStore {
    pool: PgPool,
}

/// WHERE clauses for a filter set, in canonical bind order: author, then
/// engagement semi-joins, then search. Edge kinds are inlined as literals
/// (closed enum); user ids and the search pattern are bound.
fn filter_clauses(filters: &FilterSet, param_index: &mut usize) -> Vec<String> {
    let mut clauses = Vec::new();

    if filters.author_id.is_some() {
        *param_index += 1;
        clauses.push(format!("p.author_id = ${}", param_index));
    }

    for (kind, _) in filters.engagement_predicates() {
        *param_index += 1;
        clauses.push(format!(
            "EXISTS (SELECT 1 FROM engagement_edges e WHERE e.post_id = p.id AND e.kind = '{}' AND e.user_id = ${})",
            kind.as_str(),
            param_index
        ));
    }

    if filters.search_text.is_some() {
        *param_index += 1;
        clauses.push(format!("p.body ILIKE ${}", param_index));
    }

    clauses
}

/// Escape LIKE metacharacters so search text matches as a literal substring.
fn like_pattern(text: &str) -> String {
    let escaped = text
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}

fn bind_filters<'q>(
    mut query: sqlx::query::Query<'q, sqlx::Postgres, sqlx::postgres::PgArguments>,
    filters: &'q FilterSet,
) -> sqlx::query::Query<'q, sqlx::Postgres, sqlx::postgres::PgArguments> {
    if let Some(author_id) = filters.author_id {
        query = query.bind(author_id);
    }
    for (_, user_id) in filters.engagement_predicates() {
        query = query.bind(user_id);
    }
    if let Some(ref text) = filters.search_text {
        query = query.bind(like_pattern(text));
    }
    query
}

fn where_sql(clauses: &[String]) -> String {
    if clauses.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", clauses.join(" AND "))
    }
}

impl PostgresFeedStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Health check to verify database connectivity
    pub async fn health_check(&self) -> FeedResult<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| {
                FeedError::StoreUnavailable(format!("health check failed: {}", e))
            })?;
        Ok(())
    }

    /// Initialize feed tables. The partial unique index enforces the
    /// at-most-one like/bookmark edge per (user, post) invariant; comment
    /// edges stay unbounded.
    pub async fn initialize(&self) -> FeedResult<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS profiles (
                id BIGINT PRIMARY KEY,
                display_name VARCHAR(128) NOT NULL,
                handle VARCHAR(64) NOT NULL UNIQUE,
                avatar_url TEXT
            )
        "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| FeedError::Internal(format!("Failed to create profiles table: {}", e)))?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS posts (
                id BIGSERIAL PRIMARY KEY,
                author_id BIGINT NOT NULL REFERENCES profiles(id),
                body TEXT NOT NULL,
                forum_id BIGINT,
                created_at BIGINT NOT NULL
            )
        "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| FeedError::Internal(format!("Failed to create posts table: {}", e)))?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS engagement_edges (
                id BIGSERIAL PRIMARY KEY,
                user_id BIGINT NOT NULL,
                post_id BIGINT NOT NULL,
                kind VARCHAR(16) NOT NULL,
                body TEXT,
                created_at BIGINT NOT NULL
            )
        "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| {
            FeedError::Internal(format!("Failed to create engagement_edges table: {}", e))
        })?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_posts_feed_order ON posts(created_at DESC, id DESC)",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| FeedError::Internal(format!("Failed to create feed order index: {}", e)))?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_posts_author ON posts(author_id)")
            .execute(&self.pool)
            .await
            .map_err(|e| FeedError::Internal(format!("Failed to create author index: {}", e)))?;

        sqlx::query(
            "CREATE UNIQUE INDEX IF NOT EXISTS idx_edges_single_per_pair ON engagement_edges(user_id, post_id, kind) WHERE kind IN ('like', 'bookmark')",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| FeedError::Internal(format!("Failed to create edge uniqueness index: {}", e)))?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_edges_post_kind ON engagement_edges(post_id, kind)",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| FeedError::Internal(format!("Failed to create edge post index: {}", e)))?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_edges_user_kind ON engagement_edges(user_id, kind, post_id)",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| FeedError::Internal(format!("Failed to create edge user index: {}", e)))?;

        Ok(())
    }

    // Write helpers for the mutation actions that live outside the feed
    // core. The server binary and seeding use these; query_feed never does.

    pub async fn upsert_profile(&self, profile: &Profile) -> FeedResult<()> {
        sqlx::query(
            r#"
            INSERT INTO profiles (id, display_name, handle, avatar_url)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (id) DO UPDATE
            SET display_name = EXCLUDED.display_name,
                handle = EXCLUDED.handle,
                avatar_url = EXCLUDED.avatar_url
        "#,
        )
        .bind(profile.id)
        .bind(&profile.display_name)
        .bind(&profile.handle)
        .bind(&profile.avatar_url)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            FeedError::Internal(format!("Failed to upsert profile {}: {}", profile.id, e))
        })?;
        Ok(())
    }

    pub async fn create_post(
        &self,
        author_id: UserId,
        body: &str,
        forum_id: Option<i64>,
    ) -> FeedResult<Post> {
        let created_at = current_time_millis();
        let row = sqlx::query(
            "INSERT INTO posts (author_id, body, forum_id, created_at) VALUES ($1, $2, $3, $4) RETURNING id",
        )
        .bind(author_id)
        .bind(body)
        .bind(forum_id)
        .bind(created_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| FeedError::Internal(format!("Failed to create post: {}", e)))?;

        Ok(Post {
            id: row.get("id"),
            author_id,
            body: body.to_string(),
            forum_id,
            created_at,
        })
    }

    pub async fn add_edge(
        &self,
        user_id: UserId,
        post_id: PostId,
        kind: EdgeKind,
        body: Option<&str>,
    ) -> FeedResult<()> {
        sqlx::query(
            "INSERT INTO engagement_edges (user_id, post_id, kind, body, created_at) VALUES ($1, $2, $3, $4, $5) ON CONFLICT DO NOTHING",
        )
        .bind(user_id)
        .bind(post_id)
        .bind(kind.as_str())
        .bind(body)
        .bind(current_time_millis())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            FeedError::Internal(format!(
                "Failed to add {} edge ({}, {}): {}",
                kind, user_id, post_id, e
            ))
        })?;
        Ok(())
    }

    pub async fn remove_edges(
        &self,
        user_id: UserId,
        post_id: PostId,
        kind: EdgeKind,
    ) -> FeedResult<bool> {
        let result = sqlx::query(
            "DELETE FROM engagement_edges WHERE user_id = $1 AND post_id = $2 AND kind = $3",
        )
        .bind(user_id)
        .bind(post_id)
        .bind(kind.as_str())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            FeedError::Internal(format!(
                "Failed to remove {} edges ({}, {}): {}",
                kind, user_id, post_id, e
            ))
        })?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl FeedStore for PostgresFeedStore {
    async fn fetch_page(&self, plan: &PagePlan) -> FeedResult<Vec<PostRow>> {
        let mut param_index = 0;
        let clauses = filter_clauses(&plan.filters, &mut param_index);

        let mut sql = format!(
            "SELECT p.id, p.author_id, p.body, p.forum_id, p.created_at, \
             pr.display_name, pr.handle, pr.avatar_url \
             FROM posts p JOIN profiles pr ON pr.id = p.author_id{}",
            where_sql(&clauses)
        );
        sql.push_str(" ORDER BY p.created_at DESC, p.id DESC");
        sql.push_str(&format!(" LIMIT ${}", param_index + 1));
        sql.push_str(&format!(" OFFSET ${}", param_index + 2));

        let query = bind_filters(sqlx::query(&sql), &plan.filters)
            .bind(plan.limit as i64)
            .bind(plan.offset as i64);

        let rows = query.fetch_all(&self.pool).await.map_err(|e| {
            FeedError::StoreUnavailable(format!(
                "page query failed ({}): {}",
                plan.filters, e
            ))
        })?;

        Ok(rows
            .into_iter()
            .map(|row| PostRow {
                post: Post {
                    id: row.get("id"),
                    author_id: row.get("author_id"),
                    body: row.get("body"),
                    forum_id: row.get("forum_id"),
                    created_at: row.get("created_at"),
                },
                author: Profile {
                    id: row.get("author_id"),
                    display_name: row.get("display_name"),
                    handle: row.get("handle"),
                    avatar_url: row.get("avatar_url"),
                },
            })
            .collect())
    }

    async fn count(&self, plan: &CountPlan) -> FeedResult<u64> {
        let mut param_index = 0;
        let clauses = filter_clauses(&plan.filters, &mut param_index);
        let sql = format!(
            "SELECT COUNT(*) AS total FROM posts p{}",
            where_sql(&clauses)
        );

        let row = bind_filters(sqlx::query(&sql), &plan.filters)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                FeedError::StoreUnavailable(format!(
                    "count query failed ({}): {}",
                    plan.filters, e
                ))
            })?;

        Ok(row.get::<i64, _>("total") as u64)
    }

    async fn edge_counts(
        &self,
        kind: EdgeKind,
        post_ids: &[PostId],
    ) -> FeedResult<HashMap<PostId, u64>> {
        if post_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let rows = sqlx::query(
            "SELECT post_id, COUNT(*) AS cnt FROM engagement_edges WHERE kind = $1 AND post_id = ANY($2) GROUP BY post_id",
        )
        .bind(kind.as_str())
        .bind(post_ids)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            FeedError::StoreUnavailable(format!("{} count batch failed: {}", kind, e))
        })?;

        Ok(rows
            .into_iter()
            .map(|row| (row.get::<i64, _>("post_id"), row.get::<i64, _>("cnt") as u64))
            .collect())
    }

    async fn edges_of_user(
        &self,
        kind: EdgeKind,
        user_id: UserId,
        post_ids: &[PostId],
    ) -> FeedResult<HashSet<PostId>> {
        if post_ids.is_empty() {
            return Ok(HashSet::new());
        }

        let rows = sqlx::query(
            "SELECT post_id FROM engagement_edges WHERE kind = $1 AND user_id = $2 AND post_id = ANY($3)",
        )
        .bind(kind.as_str())
        .bind(user_id)
        .bind(post_ids)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            FeedError::StoreUnavailable(format!(
                "viewer {} state batch for user {} failed: {}",
                kind, user_id, e
            ))
        })?;

        Ok(rows.into_iter().map(|row| row.get("post_id")).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_filters_renders_no_where_clause() {
        let mut param_index = 0;
        let clauses = filter_clauses(&FilterSet::default(), &mut param_index);
        assert!(clauses.is_empty());
        assert_eq!(where_sql(&clauses), "");
        assert_eq!(param_index, 0);
    }

    #[test]
    fn engagement_filter_renders_semi_join() {
        let filters = FilterSet {
            liked_by: Some(7),
            ..Default::default()
        };
        let mut param_index = 0;
        let clauses = filter_clauses(&filters, &mut param_index);
        assert_eq!(clauses.len(), 1);
        assert!(clauses[0].contains("EXISTS"));
        assert!(clauses[0].contains("e.kind = 'like'"));
        assert!(clauses[0].contains("e.user_id = $1"));
    }

    #[test]
    fn combined_filters_number_params_in_bind_order() {
        let filters = FilterSet {
            author_id: Some(1),
            liked_by: Some(2),
            commented_by: Some(3),
            bookmarked_by: Some(4),
            search_text: Some("hello".to_string()),
        };
        let mut param_index = 0;
        let clauses = filter_clauses(&filters, &mut param_index);
        assert_eq!(param_index, 5);
        assert_eq!(clauses[0], "p.author_id = $1");
        assert!(clauses[1].contains("e.kind = 'like'") && clauses[1].contains("$2"));
        assert!(clauses[2].contains("e.kind = 'comment'") && clauses[2].contains("$3"));
        assert!(clauses[3].contains("e.kind = 'bookmark'") && clauses[3].contains("$4"));
        assert_eq!(clauses[4], "p.body ILIKE $5");
    }

    #[test]
    fn like_pattern_escapes_metacharacters() {
        assert_eq!(like_pattern("50%_done\\"), "%50\\%\\_done\\\\%");
        assert_eq!(like_pattern("plain"), "%plain%");
    }
}
