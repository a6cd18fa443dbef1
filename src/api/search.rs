//! Search service.

use std::fmt;

use reqwest::header::{HeaderValue, ACCEPT};
use serde::de::DeserializeOwned;

use crate::auth::Session;
use crate::client::config::TEXT_MATCH_MEDIA_TYPE;
use crate::client::paginated::{Limit, SearchPageIterator};

/// Result ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    /// Ascending
    Asc,
    /// Descending
    Desc,
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        })
    }
}

/// A search query with optional sorting.
///
/// # Example
///
/// ```
/// use hubkit::api::{SearchQuery, SortOrder};
///
/// let query = SearchQuery::new("is:open label:bug")
///     .sort("created")
///     .order(SortOrder::Asc)
///     .text_match(true);
/// assert_eq!(query.q, "is:open label:bug");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchQuery {
    /// Search terms and qualifiers
    pub q: String,
    /// Sort field; server relevance when absent
    pub sort: Option<String>,
    /// Sort direction, only sent together with `sort`
    pub order: Option<SortOrder>,
    /// Request text-match metadata for each item
    pub text_match: bool,
}

impl SearchQuery {
    /// Create a query.
    pub fn new(q: impl Into<String>) -> Self {
        Self {
            q: q.into(),
            ..Default::default()
        }
    }

    /// Sort by `field`.
    pub fn sort(mut self, field: impl Into<String>) -> Self {
        self.sort = Some(field.into());
        self
    }

    /// Set the sort direction.
    pub fn order(mut self, order: SortOrder) -> Self {
        self.order = Some(order);
        self
    }

    /// Ask for text-match metadata.
    pub fn text_match(mut self, enabled: bool) -> Self {
        self.text_match = enabled;
        self
    }

    fn params(&self) -> Vec<(String, String)> {
        let mut params = vec![("q".to_string(), self.q.clone())];
        if let Some(ref sort) = self.sort {
            params.push(("sort".to_string(), sort.clone()));
            if let Some(order) = self.order {
                params.push(("order".to_string(), order.to_string()));
            }
        }
        params
    }
}

/// Service for search endpoints.
///
/// # Example
///
/// ```no_run
/// # fn example(session: hubkit::Session) -> hubkit::Result<()> {
/// use hubkit::api::SearchQuery;
///
/// let mut issues = session
///     .search()
///     .issues::<serde_json::Value>(SearchQuery::new("repo:octocat/Hello-World is:open"), -1);
/// while let Some(issue) = issues.next() {
///     println!("{}", issue?["title"]);
/// }
/// println!("{} total", issues.total_count());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct SearchService {
    session: Session,
}

impl SearchService {
    pub(crate) fn new(session: Session) -> Self {
        Self { session }
    }

    /// Search an arbitrary search endpoint (`/search/<kind>`).
    pub fn search<T: DeserializeOwned + 'static>(
        &self,
        kind: &str,
        query: SearchQuery,
        count: impl Into<Limit>,
    ) -> SearchPageIterator<T> {
        let url = self.session.build_url(&["search", kind]);
        let iter = SearchPageIterator::new(self.session.clone(), &url, count).with_params(query.params());

        if query.text_match {
            iter.with_header(ACCEPT, HeaderValue::from_static(TEXT_MATCH_MEDIA_TYPE))
        } else {
            iter
        }
    }

    /// Search issues and pull requests.
    pub fn issues<T: DeserializeOwned + 'static>(
        &self,
        query: SearchQuery,
        count: impl Into<Limit>,
    ) -> SearchPageIterator<T> {
        self.search("issues", query, count)
    }

    /// Search repositories.
    pub fn repositories<T: DeserializeOwned + 'static>(
        &self,
        query: SearchQuery,
        count: impl Into<Limit>,
    ) -> SearchPageIterator<T> {
        self.search("repositories", query, count)
    }

    /// Search users.
    pub fn users<T: DeserializeOwned + 'static>(
        &self,
        query: SearchQuery,
        count: impl Into<Limit>,
    ) -> SearchPageIterator<T> {
        self.search("users", query, count)
    }

    /// Search code.
    pub fn code<T: DeserializeOwned + 'static>(
        &self,
        query: SearchQuery,
        count: impl Into<Limit>,
    ) -> SearchPageIterator<T> {
        self.search("code", query, count)
    }

    /// Search commits.
    pub fn commits<T: DeserializeOwned + 'static>(
        &self,
        query: SearchQuery,
        count: impl Into<Limit>,
    ) -> SearchPageIterator<T> {
        self.search("commits", query, count)
    }
}
