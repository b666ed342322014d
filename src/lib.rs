// Feed Query - Content feed query & aggregation core

// Feed pipeline - options, query compilation, aggregation, assembly, caching
pub mod feed;

// Store backends - the relational capability the feed core reads through
pub mod store;

// Domain types shared across the pipeline
pub mod models;

// Common utilities
pub mod error;

// Re-exports for convenience
pub use error::{FeedError, FeedResult};
pub use feed::cache::CacheConfig;
pub use feed::options::{FilterSet, QueryOptions};
pub use feed::service::FeedService;
pub use models::{EdgeKind, FeedPost, Post, PostRow, Profile, QueryResult};
