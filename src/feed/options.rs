//! Ways a feed query can be narrowed. Filter semantics work like SQL: an
//! unset field applies no filter, set fields combine by logical AND. There
//! is no OR across filter dimensions.

use serde::Deserialize;
use std::fmt;

use crate::models::{EdgeKind, UserId};

pub const DEFAULT_PAGE: u32 = 1;
pub const DEFAULT_PAGE_SIZE: u32 = 20;

/// Per-call query input. `viewing_user_id` only decides whether the viewer's
/// own like/bookmark state is resolved; it never restricts visibility.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct QueryOptions {
    pub page: u32,
    pub page_size: u32,
    pub author_id: Option<UserId>,
    pub liked_by_user_id: Option<UserId>,
    pub commented_by_user_id: Option<UserId>,
    pub bookmarked_by_user_id: Option<UserId>,
    pub search_text: Option<String>,
    pub viewing_user_id: Option<UserId>,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            page: DEFAULT_PAGE,
            page_size: DEFAULT_PAGE_SIZE,
            author_id: None,
            liked_by_user_id: None,
            commented_by_user_id: None,
            bookmarked_by_user_id: None,
            search_text: None,
            viewing_user_id: None,
        }
    }
}

/// The filter predicate set. Pure data; construction never fails and an
/// empty set means "all posts". Identity-based engagement predicates
/// (`liked_by`, `commented_by`, `bookmarked_by`) compile to semi-joins
/// against the edge relation; `search_text` is a case-insensitive substring
/// predicate on the post body, composable with every identity predicate.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct FilterSet {
    pub author_id: Option<UserId>,
    pub liked_by: Option<UserId>,
    pub commented_by: Option<UserId>,
    pub bookmarked_by: Option<UserId>,
    pub search_text: Option<String>,
}

impl FilterSet {
    /// Normalize options into a predicate set. Blank search text is fixed to
    /// "no filter" here at the boundary rather than at call sites.
    pub fn from_options(options: &QueryOptions) -> Self {
        let search_text = options
            .search_text
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string);

        Self {
            author_id: options.author_id,
            liked_by: options.liked_by_user_id,
            commented_by: options.commented_by_user_id,
            bookmarked_by: options.bookmarked_by_user_id,
            search_text,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.author_id.is_none()
            && self.liked_by.is_none()
            && self.commented_by.is_none()
            && self.bookmarked_by.is_none()
            && self.search_text.is_none()
    }

    /// Active engagement predicates in canonical order. Both SQL rendering
    /// and the in-memory interpreter iterate this, so the two backends can
    /// never disagree on which semi-joins apply.
    pub fn engagement_predicates(&self) -> Vec<(EdgeKind, UserId)> {
        let mut predicates = Vec::new();
        if let Some(user_id) = self.liked_by {
            predicates.push((EdgeKind::Like, user_id));
        }
        if let Some(user_id) = self.commented_by {
            predicates.push((EdgeKind::Comment, user_id));
        }
        if let Some(user_id) = self.bookmarked_by {
            predicates.push((EdgeKind::Bookmark, user_id));
        }
        predicates
    }
}

/// Compact rendering used as filter context on store failures.
impl fmt::Display for FilterSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("unfiltered");
        }
        let mut parts = Vec::new();
        if let Some(id) = self.author_id {
            parts.push(format!("author={}", id));
        }
        for (kind, user_id) in self.engagement_predicates() {
            parts.push(format!("{}_by={}", kind, user_id));
        }
        if let Some(ref text) = self.search_text {
            parts.push(format!("search={:?}", text));
        }
        f.write_str(&parts.join(" "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_fixed_at_boundary() {
        let options = QueryOptions::default();
        assert_eq!(options.page, 1);
        assert_eq!(options.page_size, 20);
        assert!(FilterSet::from_options(&options).is_empty());
    }

    #[test]
    fn blank_search_text_is_no_filter() {
        let options = QueryOptions {
            search_text: Some("   ".to_string()),
            ..Default::default()
        };
        assert!(FilterSet::from_options(&options).is_empty());
    }

    #[test]
    fn engagement_predicates_in_canonical_order() {
        let options = QueryOptions {
            liked_by_user_id: Some(7),
            commented_by_user_id: Some(8),
            bookmarked_by_user_id: Some(9),
            ..Default::default()
        };
        let filters = FilterSet::from_options(&options);
        assert_eq!(
            filters.engagement_predicates(),
            vec![
                (EdgeKind::Like, 7),
                (EdgeKind::Comment, 8),
                (EdgeKind::Bookmark, 9)
            ]
        );
    }

    #[test]
    fn display_names_active_predicates() {
        let filters = FilterSet {
            author_id: Some(3),
            search_text: Some("rust".to_string()),
            ..Default::default()
        };
        assert_eq!(filters.to_string(), "author=3 search=\"rust\"");
        assert_eq!(FilterSet::default().to_string(), "unfiltered");
    }
}
