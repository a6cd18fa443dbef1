//! Data models shared by the session and iterator layers.
//!
//! - [`lookup`] - `Lookup<T>`, the result of fetching a single resource
//! - [`rate_limit`] - request quota snapshot

pub mod lookup;
pub mod rate_limit;

pub use lookup::Lookup;
pub use rate_limit::RateLimit;
