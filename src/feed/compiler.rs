//! Query compilation: one `FilterSet` plus a pagination window becomes a
//! page plan and a count plan. Both plans hold the same predicate set by
//! construction, so the count can never disagree with the rows reachable
//! across pages for the same filters.

use crate::error::{FeedError, FeedResult};
use crate::feed::options::{FilterSet, QueryOptions};

/// Apply all filters, order by `(created_at desc, id desc)`, skip
/// `(page - 1) * page_size` rows, take `page_size`.
#[derive(Debug, Clone)]
pub struct PagePlan {
    pub filters: FilterSet,
    pub limit: u32,
    pub offset: u64,
}

/// Apply the same filters, return the row count only. No ordering, no limit.
#[derive(Debug, Clone)]
pub struct CountPlan {
    pub filters: FilterSet,
}

#[derive(Debug, Clone)]
pub struct FeedPlans {
    pub page: PagePlan,
    pub count: CountPlan,
}

/// Compile options into executable plans. Pagination is validated here,
/// before any store I/O is issued.
pub fn compile(options: &QueryOptions) -> FeedResult<FeedPlans> {
    if options.page < 1 {
        return Err(FeedError::InvalidPagination(format!(
            "page must be >= 1, got {}",
            options.page
        )));
    }
    if options.page_size < 1 {
        return Err(FeedError::InvalidPagination(
            "page_size must be > 0".to_string(),
        ));
    }

    let filters = FilterSet::from_options(options);
    let offset = (options.page as u64 - 1) * options.page_size as u64;

    Ok(FeedPlans {
        page: PagePlan {
            filters: filters.clone(),
            limit: options.page_size,
            offset,
        },
        count: CountPlan { filters },
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_zero_rejected() {
        let options = QueryOptions {
            page: 0,
            ..Default::default()
        };
        assert!(matches!(
            compile(&options),
            Err(FeedError::InvalidPagination(_))
        ));
    }

    #[test]
    fn zero_page_size_rejected() {
        let options = QueryOptions {
            page_size: 0,
            ..Default::default()
        };
        assert!(matches!(
            compile(&options),
            Err(FeedError::InvalidPagination(_))
        ));
    }

    #[test]
    fn offset_skips_prior_pages() {
        let options = QueryOptions {
            page: 3,
            page_size: 10,
            ..Default::default()
        };
        let plans = compile(&options).unwrap();
        assert_eq!(plans.page.offset, 20);
        assert_eq!(plans.page.limit, 10);
    }

    #[test]
    fn page_and_count_plans_share_filters() {
        let options = QueryOptions {
            author_id: Some(42),
            search_text: Some("meetup".to_string()),
            liked_by_user_id: Some(7),
            ..Default::default()
        };
        let plans = compile(&options).unwrap();
        assert_eq!(plans.page.filters, plans.count.filters);
    }
}
