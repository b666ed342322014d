// Feed pipeline modules
pub mod options;     // QueryOptions and the filter predicate set
pub mod compiler;    // FilterSet + pagination window -> page/count plans
pub mod aggregation; // Batched per-post engagement counts and viewer state
pub mod assembler;   // Page rows + aggregates -> QueryResult
pub mod cache;       // Fingerprint-keyed memo shim (pass-through by default)
pub mod service;     // query_feed orchestration

pub use compiler::{compile, CountPlan, FeedPlans, PagePlan};
pub use options::{FilterSet, QueryOptions};
pub use service::FeedService;
