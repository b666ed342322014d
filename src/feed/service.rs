//! `query_feed` orchestration: validate and compile, issue the page and
//! count plans concurrently, resolve engagement aggregates for the page's
//! post ids in bounded batches, assemble, memoize.

use std::sync::Arc;
use tracing::{debug, instrument};

use crate::error::FeedResult;
use crate::feed::aggregation::{refresh_viewer_state, EngagementSummary};
use crate::feed::assembler::assemble;
use crate::feed::cache::{CacheConfig, FeedCache};
use crate::feed::compiler::compile;
use crate::feed::options::QueryOptions;
use crate::models::{PostId, QueryResult};
use crate::store::FeedStore;

pub struct FeedService {
    store: Arc<dyn FeedStore>,
    cache: FeedCache,
}

impl FeedService {
    pub fn new(store: Arc<dyn FeedStore>) -> Self {
        Self::with_cache(store, CacheConfig::default())
    }

    pub fn with_cache(store: Arc<dyn FeedStore>, config: CacheConfig) -> Self {
        Self {
            store,
            cache: FeedCache::new(config),
        }
    }

    /// Assemble one page of the feed. Each call is an independent unit of
    /// work: no state survives it and nothing is mutated, so dropping the
    /// returned future cancels the in-flight sub-queries with no cleanup.
    #[instrument(skip(self))]
    pub async fn query_feed(&self, options: QueryOptions) -> FeedResult<QueryResult> {
        let plans = compile(&options)?;

        if let Some(mut hit) = self.cache.lookup(&options) {
            debug!("cache hit, refreshing viewer-own engagement state");
            refresh_viewer_state(self.store.as_ref(), &mut hit, options.viewing_user_id).await;
            return Ok(hit);
        }

        let (rows, total_count) = tokio::try_join!(
            self.store.fetch_page(&plans.page),
            self.store.count(&plans.count),
        )?;

        let post_ids: Vec<PostId> = rows.iter().map(|row| row.post.id).collect();
        let summary =
            EngagementSummary::resolve(self.store.as_ref(), &post_ids, options.viewing_user_id)
                .await;

        let result = assemble(rows, &summary, total_count);
        debug!(
            posts = result.posts.len(),
            total_count = result.total_count,
            "feed page assembled"
        );

        self.cache.insert(&options, &result);
        Ok(result)
    }
}
