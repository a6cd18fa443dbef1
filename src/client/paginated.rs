//! Lazy iteration over server-paginated collections.
//!
//! [`PageIterator`] yields records one at a time, fetching the next page only
//! when the records of the current page have all been yielded. Pages are
//! chained through the `rel="next"` entry of the `Link` header.
//! [`SearchPageIterator`] does the same for search endpoints, whose pages
//! wrap the records in `{"total_count": n, "items": [...]}`.

use std::collections::VecDeque;
use std::fmt;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, IF_NONE_MATCH};
use serde::de::DeserializeOwned;
use serde_json::Value;

use super::http::HttpRequest;
use crate::auth::Session;
use crate::{Error, Result};

/// Turns one decoded JSON element into a record.
pub type Deserializer<T> = Box<dyn FnMut(Value) -> Result<T> + Send>;

/// How many records an iterator may yield.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Limit {
    /// Everything the server has.
    All,
    /// Stop after this many records.
    AtMost(usize),
}

impl Limit {
    fn is_exhausted(self) -> bool {
        self == Limit::AtMost(0)
    }

    fn consume(&mut self) {
        if let Limit::AtMost(n) = self {
            *n = n.saturating_sub(1);
        }
    }
}

/// `-1` means [`Limit::All`]; other negative counts yield nothing.
impl From<i64> for Limit {
    fn from(count: i64) -> Self {
        match count {
            -1 => Limit::All,
            n => Limit::AtMost(usize::try_from(n).unwrap_or(0)),
        }
    }
}

impl From<i32> for Limit {
    fn from(count: i32) -> Self {
        Limit::from(i64::from(count))
    }
}

impl From<usize> for Limit {
    fn from(count: usize) -> Self {
        Limit::AtMost(count)
    }
}

/// JSON shape expected of each page body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PageShape {
    /// `[record, ...]`
    Plain,
    /// `[record, ...]` or `{"key": value, ...}`, the latter yielded as
    /// `["key", value]` pairs.
    Entries,
    /// `{"total_count": n, "items": [record, ...]}`
    Search,
}

/// Cursor state, reset by [`PageIterator::refresh`].
#[derive(Debug)]
struct PageState {
    remaining: Limit,
    next_url: Option<String>,
    first_page: bool,
    etag: Option<String>,
    buffer: VecDeque<Value>,
    yielded: usize,
    finished: bool,
    last_status: Option<u16>,
    last_url: Option<String>,
}

impl PageState {
    fn new(url: &str, limit: Limit) -> Self {
        Self {
            remaining: limit,
            next_url: Some(url.to_string()),
            first_page: true,
            etag: None,
            buffer: VecDeque::new(),
            yielded: 0,
            finished: false,
            last_status: None,
            last_url: None,
        }
    }
}

/// A lazy, finite-or-unbounded sequence of records from a paginated
/// endpoint.
///
/// Consuming the iterator drains it; [`refresh`](Self::refresh) starts over
/// from the first page. A failure (transport error, failure status,
/// malformed record, unexpected page shape) is yielded once and ends the
/// sequence.
///
/// # Example
///
/// ```no_run
/// # fn example(session: hubkit::Session) -> hubkit::Result<()> {
/// #[derive(serde::Deserialize)]
/// struct Issue {
///     number: u64,
///     title: String,
/// }
///
/// let url = session.build_url(&["repos", "octocat", "Hello-World", "issues"]);
/// for issue in session.iter::<Issue>(25, &url) {
///     let issue = issue?;
///     println!("#{} {}", issue.number, issue.title);
/// }
/// # Ok(())
/// # }
/// ```
pub struct PageIterator<T> {
    session: Session,
    url: String,
    limit: Limit,
    params: Vec<(String, String)>,
    headers: HeaderMap,
    conditional: Option<String>,
    shape: PageShape,
    deserialize: Deserializer<T>,
    total_count: Option<u64>,
    state: PageState,
}

impl<T: DeserializeOwned + 'static> PageIterator<T> {
    /// Iterate `url`, deserializing each element with serde.
    pub fn new(session: Session, url: &str, count: impl Into<Limit>) -> Self {
        Self::with_deserializer(session, url, count, |value| {
            serde_json::from_value(value).map_err(Into::into)
        })
    }

    /// Iterate a map-like resource: a mapping body is yielded entry by entry
    /// as `["key", value]` arrays. Array bodies are yielded as usual.
    pub fn entries(session: Session, url: &str, count: impl Into<Limit>) -> Self {
        let mut iter = Self::new(session, url, count);
        iter.shape = PageShape::Entries;
        iter
    }
}

impl<T> PageIterator<T> {
    /// Iterate `url`, turning each element into a record with `deserialize`.
    pub fn with_deserializer<F>(
        session: Session,
        url: &str,
        count: impl Into<Limit>,
        deserialize: F,
    ) -> Self
    where
        F: FnMut(Value) -> Result<T> + Send + 'static,
    {
        let limit = count.into();
        Self {
            session,
            url: url.to_string(),
            limit,
            params: Vec::new(),
            headers: HeaderMap::new(),
            conditional: None,
            shape: PageShape::Plain,
            deserialize: Box::new(deserialize),
            total_count: None,
            state: PageState::new(url, limit),
        }
    }

    /// Query parameters sent with the first page.
    pub fn with_params<K, V>(mut self, params: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.params
            .extend(params.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// Extra header sent with every page request.
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Make the first fetch conditional on `etag`: if the collection is
    /// unchanged the sequence is empty.
    pub fn with_etag(mut self, etag: impl Into<String>) -> Self {
        self.conditional = Some(etag.into());
        self
    }

    /// Start over from the first page.
    ///
    /// With `conditional`, the ETag recorded from the previous first page is
    /// sent as `If-None-Match`; an unchanged collection then yields nothing.
    pub fn refresh(&mut self, conditional: bool) -> &mut Self {
        self.conditional = if conditional {
            self.state.etag.clone()
        } else {
            None
        };
        self.state = PageState::new(&self.url, self.limit);
        self
    }

    /// ETag of the first page fetched since construction or the last refresh.
    pub fn etag(&self) -> Option<&str> {
        self.state.etag.as_deref()
    }

    /// Status of the most recent page response.
    pub fn last_status(&self) -> Option<u16> {
        self.state.last_status
    }

    /// URL of the most recent page response.
    pub fn last_url(&self) -> Option<&str> {
        self.state.last_url.as_deref()
    }

    /// How many more records the iterator may yield.
    pub fn remaining(&self) -> Limit {
        self.state.remaining
    }

    /// The starting URL.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// The session pages are fetched through.
    pub fn session(&self) -> &Session {
        &self.session
    }

    fn first_page_params(&self) -> Vec<(String, String)> {
        let mut params = self.params.clone();
        if !params.iter().any(|(k, _)| k == "per_page") {
            let max = self.session.config().max_page_size as usize;
            let size = match self.limit {
                Limit::AtMost(n) if (1..=max).contains(&n) => n,
                _ => max,
            };
            params.push(("per_page".to_string(), size.to_string()));
        }
        params
    }

    fn fetch_page(&mut self, url: &str) -> Result<()> {
        let mut request = HttpRequest::get(url);
        request.headers = self.headers.clone();

        if self.state.first_page {
            request.query = self.first_page_params();
            if let Some(ref etag) = self.conditional {
                let value = HeaderValue::from_str(etag)
                    .map_err(|_| Error::InvalidInput(format!("Invalid ETag: {etag}")))?;
                request.headers.insert(IF_NONE_MATCH, value);
            }
            self.state.first_page = false;
        }

        let response = self.session.request(&request)?;
        self.state.last_status = Some(response.status);
        self.state.last_url = Some(response.url.clone());
        if self.state.etag.is_none() {
            self.state.etag = response.etag().map(String::from);
        }

        if response.status == 304 {
            tracing::debug!(url, "collection not modified");
            if self.state.etag.is_none() {
                self.state.etag = self.conditional.clone();
            }
            return Ok(());
        }

        let response = response.error_for_status()?;
        let Some(body) = response.json_opt()? else {
            return Ok(());
        };
        let Some(items) = self.extract_items(body)? else {
            return Ok(());
        };

        self.state.next_url = response.next_link();
        tracing::debug!(
            url,
            status = response.status,
            items = items.len(),
            has_next = self.state.next_url.is_some(),
            "page fetched"
        );
        self.state.buffer.extend(items);
        Ok(())
    }

    fn extract_items(&mut self, body: Value) -> Result<Option<Vec<Value>>> {
        match (self.shape, body) {
            (_, Value::Null) => Ok(None),
            (PageShape::Plain | PageShape::Entries, Value::Array(items)) => Ok(Some(items)),
            (PageShape::Entries, Value::Object(map)) => Ok(Some(
                map.into_iter()
                    .map(|(key, value)| Value::Array(vec![Value::String(key), value]))
                    .collect(),
            )),
            (PageShape::Search, Value::Object(mut map)) => {
                if let Some(total) = map.get("total_count").and_then(Value::as_u64) {
                    self.total_count = Some(total);
                }
                match map.remove("items") {
                    None | Some(Value::Null) => Ok(None),
                    Some(Value::Array(items)) => Ok(Some(items)),
                    Some(other) => Err(Error::UnsupportedPageShape(format!(
                        "search items must be an array, got {}",
                        json_type(&other)
                    ))),
                }
            }
            (shape, other) => Err(Error::UnsupportedPageShape(format!(
                "{} page body cannot be {}",
                match shape {
                    PageShape::Search => "search",
                    _ => "list",
                },
                json_type(&other)
            ))),
        }
    }

    fn fail(&mut self, err: Error) -> Error {
        tracing::warn!(url = %self.url, yielded = self.state.yielded, error = %err, "iteration failed");
        self.state.finished = true;
        self.state.buffer.clear();
        self.state.next_url = None;
        err
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

impl<T> Iterator for PageIterator<T> {
    type Item = Result<T>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.state.finished || self.state.remaining.is_exhausted() {
                return None;
            }

            if let Some(raw) = self.state.buffer.pop_front() {
                let position = self.state.yielded + 1;
                return Some(match (self.deserialize)(raw) {
                    Ok(record) => {
                        self.state.yielded = position;
                        self.state.remaining.consume();
                        Ok(record)
                    }
                    Err(Error::MalformedBody(msg)) => Err(self.fail(Error::MalformedBody(format!(
                        "record {position}: {msg}"
                    )))),
                    Err(other) => {
                        Err(self.fail(Error::MalformedBody(format!("record {position}: {other}"))))
                    }
                });
            }

            let url = self.state.next_url.take()?;
            if let Err(e) = self.fetch_page(&url) {
                return Some(Err(self.fail(e)));
            }
        }
    }
}

impl<T> fmt::Debug for PageIterator<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PageIterator")
            .field("url", &self.url)
            .field("limit", &self.limit)
            .field("shape", &self.shape)
            .field("remaining", &self.state.remaining)
            .field("etag", &self.state.etag)
            .finish()
    }
}

/// A [`PageIterator`] over search results, which also reports the total
/// number of matches.
///
/// # Example
///
/// ```no_run
/// # fn example(session: hubkit::Session) -> hubkit::Result<()> {
/// use hubkit::api::SearchQuery;
///
/// let mut results = session
///     .search()
///     .repositories::<serde_json::Value>(SearchQuery::new("language:rust stars:>1000"), 10);
/// let first = results.next().transpose()?;
/// println!("{} matches, first: {:?}", results.total_count(), first);
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct SearchPageIterator<T> {
    inner: PageIterator<T>,
}

impl<T: DeserializeOwned + 'static> SearchPageIterator<T> {
    /// Iterate search results at `url`, deserializing each item with serde.
    pub fn new(session: Session, url: &str, count: impl Into<Limit>) -> Self {
        Self::from_pages(PageIterator::new(session, url, count))
    }
}

impl<T> SearchPageIterator<T> {
    /// Iterate search results at `url` with a custom deserializer.
    pub fn with_deserializer<F>(
        session: Session,
        url: &str,
        count: impl Into<Limit>,
        deserialize: F,
    ) -> Self
    where
        F: FnMut(Value) -> Result<T> + Send + 'static,
    {
        Self::from_pages(PageIterator::with_deserializer(session, url, count, deserialize))
    }

    fn from_pages(mut inner: PageIterator<T>) -> Self {
        inner.shape = PageShape::Search;
        Self { inner }
    }

    /// Total number of matches reported by the most recent page that
    /// carried one; `0` before the first page is fetched.
    pub fn total_count(&self) -> u64 {
        self.inner.total_count.unwrap_or(0)
    }

    /// Query parameters sent with the first page.
    pub fn with_params<K, V>(self, params: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            inner: self.inner.with_params(params),
        }
    }

    /// Extra header sent with every page request.
    pub fn with_header(self, name: HeaderName, value: HeaderValue) -> Self {
        Self {
            inner: self.inner.with_header(name, value),
        }
    }

    /// Make the first fetch conditional on `etag`.
    pub fn with_etag(self, etag: impl Into<String>) -> Self {
        Self {
            inner: self.inner.with_etag(etag),
        }
    }

    /// Start over from the first page. See [`PageIterator::refresh`].
    pub fn refresh(&mut self, conditional: bool) -> &mut Self {
        self.inner.refresh(conditional);
        self
    }

    /// ETag of the first page.
    pub fn etag(&self) -> Option<&str> {
        self.inner.etag()
    }

    /// Status of the most recent page response.
    pub fn last_status(&self) -> Option<u16> {
        self.inner.last_status()
    }

    /// How many more records the iterator may yield.
    pub fn remaining(&self) -> Limit {
        self.inner.remaining()
    }
}

impl<T> Iterator for SearchPageIterator<T> {
    type Item = Result<T>;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }
}
