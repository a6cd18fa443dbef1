//! Authentication and session management.
//!
//! A [`Session`] carries at most one [`Credential`] at a time:
//!
//! 1. **Token** - `Authorization: token <value>`
//! 2. **Basic** - username and password
//! 3. **None** - anonymous requests
//!
//! # Token Authentication
//!
//! ```no_run
//! use hubkit::Session;
//!
//! # fn example() -> hubkit::Result<()> {
//! let session = Session::new()?;
//! session.set_token_auth(&std::env::var("GITHUB_TOKEN").unwrap_or_default());
//! # Ok(())
//! # }
//! ```
//!
//! # Two-Factor Authentication
//!
//! When basic credentials are valid but the account demands a one-time
//! password, the server answers `401` with an `X-GitHub-OTP: required`
//! header. A registered callback is then asked for the code and the request
//! is retried once:
//!
//! ```no_run
//! use hubkit::Session;
//!
//! # fn example() -> hubkit::Result<()> {
//! let session = Session::new()?;
//! session.set_basic_auth("octocat", "hunter2");
//! session.set_two_factor_callback(|| {
//!     let mut code = String::new();
//!     std::io::stdin().read_line(&mut code).ok();
//!     code.trim().to_string()
//! });
//! let user = session.fetch::<serde_json::Value>(&session.build_url(&["user"]))?;
//! # Ok(())
//! # }
//! ```

mod credential;
mod session;

pub use credential::Credential;
pub use session::{CredentialGuard, Session, TwoFactorCallback};
