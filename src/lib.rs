//! # hubkit
//!
//! Session and pagination layer for GitHub-style v3 REST APIs.
//!
//! The crate covers the parts of an API client that carry protocol state:
//!
//! - **Authentication**: basic, token or anonymous, with a transparent
//!   single retry when the server demands a two-factor one-time password
//! - **Pagination**: server-paginated collections exposed as one lazy
//!   [`Iterator`], following `Link: rel="next"` headers, bounded by an item
//!   count and refreshable with ETag-conditional requests
//! - **Errors**: HTTP failure statuses classified into a typed taxonomy
//!
//! Per-resource types are left to the caller: iterators accept any
//! `serde::Deserialize` type or a custom deserializer closure.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use hubkit::Session;
//!
//! #[derive(Debug, serde::Deserialize)]
//! struct Issue {
//!     number: u64,
//!     title: String,
//! }
//!
//! fn main() -> hubkit::Result<()> {
//!     let session = Session::new()?;
//!     session.set_token_auth("ghp_your_token");
//!
//!     // The 10 most recent issues, fetched in a single page
//!     let url = session.build_url(&["repos", "octocat", "Hello-World", "issues"]);
//!     for issue in session.iter::<Issue>(10, &url) {
//!         let issue = issue?;
//!         println!("#{} {}", issue.number, issue.title);
//!     }
//!
//!     println!("{} requests left", session.ratelimit_remaining()?);
//!     Ok(())
//! }
//! ```
//!
//! ## Conditional Refresh
//!
//! ```rust,no_run
//! # fn example(session: hubkit::Session) -> hubkit::Result<()> {
//! let url = session.build_url(&["repos", "octocat", "Hello-World", "events"]);
//! let mut events = session.iter::<serde_json::Value>(-1, &url);
//! let seen: Vec<_> = events.by_ref().collect::<hubkit::Result<_>>()?;
//!
//! // Later: yields nothing if the collection has not changed
//! let fresh: Vec<_> = events.refresh(true).collect::<hubkit::Result<_>>()?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![deny(unsafe_code)]

pub mod api;
pub mod auth;
pub mod client;
pub mod error;
pub mod models;

// Re-export primary types at crate root for convenience
pub use auth::{Credential, CredentialGuard, Session};
pub use client::{ClientConfig, HttpRequest, HttpResponse, Limit, PageIterator, SearchPageIterator};
pub use error::{classify, Error, ErrorKind, Result};
pub use models::{Lookup, RateLimit};

/// Prelude module for convenient imports.
///
/// ```rust
/// use hubkit::prelude::*;
/// ```
pub mod prelude {
    pub use crate::api::{SearchQuery, SortOrder};
    pub use crate::auth::{Credential, Session};
    pub use crate::client::{
        ClientConfig, HttpRequest, HttpResponse, Limit, PageIterator, SearchPageIterator,
    };
    pub use crate::error::{classify, Error, ErrorKind, Result};
    pub use crate::models::{Lookup, RateLimit};
}
