//! Endpoint-specific services built on the session and iterators.

mod search;

pub use search::{SearchQuery, SearchService, SortOrder};
