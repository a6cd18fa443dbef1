//! HTTP plumbing and pagination beneath the [`Session`](crate::Session).
//!
//! # Example
//!
//! ```no_run
//! use hubkit::{ClientConfig, Session};
//!
//! # fn example() -> hubkit::Result<()> {
//! let session = Session::with_config(ClientConfig::default().with_user_agent("my-app/1.0"))?;
//! let url = session.build_url(&["users", "octocat", "repos"]);
//! for repo in session.iter::<serde_json::Value>(-1, &url) {
//!     println!("{}", repo?["full_name"]);
//! }
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod http;
pub mod paginated;
pub mod url_cache;

pub use config::ClientConfig;
pub use http::{parse_link_header, HttpRequest, HttpResponse};
pub use paginated::{Deserializer, Limit, PageIterator, SearchPageIterator};
pub use url_cache::UrlCache;
