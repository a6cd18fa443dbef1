//! Authenticated session: credential state, two-factor retry and dispatch.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use reqwest::Method;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::api::SearchService;
use crate::client::http::{HttpRequest, HttpResponse, Transport};
use crate::client::paginated::{Limit, PageIterator};
use crate::client::url_cache::UrlCache;
use crate::client::ClientConfig;
use crate::models::rate_limit::RateLimitResponse;
use crate::models::{Lookup, RateLimit};
use crate::Result;

use super::Credential;

/// Supplies a one-time password when the server issues a two-factor
/// challenge. Blocks until a code is available.
pub type TwoFactorCallback = Arc<dyn Fn() -> String + Send + Sync>;

/// Authenticated connection to the API.
///
/// A session owns the transport configuration, the active [`Credential`],
/// the optional two-factor callback, a request counter and the URL cache.
/// Cloning is cheap and clones share all of that state, so iterators hold
/// their own clone.
///
/// # Thread Safety
///
/// Credential changes take an internal lock, but nothing orders them
/// against in-flight requests on other threads: callers that swap
/// credentials while other threads issue requests must coordinate
/// themselves or use separate sessions.
#[derive(Clone)]
pub struct Session {
    inner: Arc<SessionInner>,
}

struct SessionInner {
    transport: Transport,
    auth: RwLock<AuthState>,
    request_count: AtomicU64,
    ratelimit_remaining: Mutex<Option<u64>>,
    url_cache: UrlCache,
}

#[derive(Default)]
struct AuthState {
    credential: Credential,
    two_factor: Option<TwoFactorCallback>,
}

impl Session {
    /// Create an anonymous session against the public API.
    pub fn new() -> Result<Self> {
        Self::with_config(ClientConfig::default())
    }

    /// Create an anonymous session with custom configuration.
    pub fn with_config(config: ClientConfig) -> Result<Self> {
        Ok(Self {
            inner: Arc::new(SessionInner {
                transport: Transport::new(config)?,
                auth: RwLock::new(AuthState::default()),
                request_count: AtomicU64::new(0),
                ratelimit_remaining: Mutex::new(None),
                url_cache: UrlCache::new(),
            }),
        })
    }

    /// Create an anonymous session for a self-hosted installation.
    pub fn enterprise(url: &str) -> Result<Self> {
        Self::with_config(ClientConfig::enterprise(url)?)
    }

    /// The configuration this session was built with.
    pub fn config(&self) -> &ClientConfig {
        self.inner.transport.config()
    }

    fn auth(&self) -> RwLockReadGuard<'_, AuthState> {
        self.inner.auth.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn auth_mut(&self) -> RwLockWriteGuard<'_, AuthState> {
        self.inner.auth.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Authenticate with username and password.
    ///
    /// Replaces any token. Does nothing if either argument is empty.
    pub fn set_basic_auth(&self, username: &str, password: &str) {
        if let Some(credential) = Credential::basic(username, password) {
            self.auth_mut().credential = credential;
        }
    }

    /// Authenticate with a token.
    ///
    /// Replaces any basic credentials. Does nothing if the token is empty.
    pub fn set_token_auth(&self, token: &str) {
        if let Some(credential) = Credential::token(token) {
            self.auth_mut().credential = credential;
        }
    }

    /// Register the callback that supplies one-time passwords.
    pub fn set_two_factor_callback<F>(&self, callback: F)
    where
        F: Fn() -> String + Send + Sync + 'static,
    {
        self.auth_mut().two_factor = Some(Arc::new(callback));
    }

    /// Whether a two-factor callback is registered.
    pub fn has_two_factor_callback(&self) -> bool {
        self.auth().two_factor.is_some()
    }

    /// A copy of the active credential.
    pub fn credential(&self) -> Credential {
        self.auth().credential.clone()
    }

    fn replace_credential(&self, credential: Credential) -> Credential {
        std::mem::replace(&mut self.auth_mut().credential, credential)
    }

    /// Swap in `credential` until the returned guard is dropped.
    pub fn temporary_credential(&self, credential: Credential) -> CredentialGuard<'_> {
        let previous = self.replace_credential(credential);
        tracing::debug!(mode = self.auth().credential.mode(), "credential swapped in");
        CredentialGuard {
            session: self,
            previous: Some(previous),
        }
    }

    /// Clear all credentials until the returned guard is dropped.
    ///
    /// Use this when following a redirect to a signed third-party URL that
    /// must not see the `Authorization` header.
    pub fn no_auth(&self) -> CredentialGuard<'_> {
        self.temporary_credential(Credential::None)
    }

    /// Run `f` with `credential` active, restoring the previous credential
    /// however `f` exits.
    pub fn with_credential<R>(&self, credential: Credential, f: impl FnOnce(&Session) -> R) -> R {
        let _guard = self.temporary_credential(credential);
        f(self)
    }

    /// Run `f` with no credentials, restoring the previous credential
    /// however `f` exits.
    pub fn without_auth<R>(&self, f: impl FnOnce(&Session) -> R) -> R {
        self.with_credential(Credential::None, f)
    }

    /// Join `segments` onto the API root.
    ///
    /// ```
    /// let session = hubkit::Session::new().unwrap();
    /// assert_eq!(
    ///     session.build_url(&["repos", "octocat", "Hello-World"]),
    ///     "https://api.github.com/repos/octocat/Hello-World",
    /// );
    /// ```
    pub fn build_url(&self, segments: &[&str]) -> String {
        self.inner.url_cache.join(&self.config().base_url, segments)
    }

    /// Join `segments` onto `base` instead of the API root.
    pub fn build_url_with_base(&self, base: &str, segments: &[&str]) -> String {
        self.inner.url_cache.join(base, segments)
    }

    /// The URL cache owned by this session.
    pub fn url_cache(&self) -> &UrlCache {
        &self.inner.url_cache
    }

    /// Number of requests actually dispatched by this session.
    pub fn request_count(&self) -> u64 {
        self.inner.request_count.load(Ordering::Relaxed)
    }

    /// Perform one exchange.
    ///
    /// If the server answers with a two-factor challenge and a callback is
    /// registered, the callback is invoked and the request is sent once
    /// more with the code attached; that second response is returned
    /// whatever it is. Failure statuses are returned as ordinary responses;
    /// only transport failures are errors.
    pub fn request(&self, request: &HttpRequest) -> Result<HttpResponse> {
        let (credential, two_factor) = {
            let auth = self.auth();
            (auth.credential.clone(), auth.two_factor.clone())
        };

        let response = self.dispatch(request, &credential, None)?;
        if !response.requires_two_factor() {
            return Ok(response);
        }

        let Some(callback) = two_factor else {
            tracing::debug!(url = %request.url, "two-factor code required but no callback registered");
            return Ok(response);
        };

        tracing::info!(url = %request.url, "two-factor code required; requesting one-time password");
        let code = callback();
        self.dispatch(request, &credential, Some(&code))
    }

    fn dispatch(
        &self,
        request: &HttpRequest,
        credential: &Credential,
        otp: Option<&str>,
    ) -> Result<HttpResponse> {
        let response = match self.inner.transport.send(request, credential, otp) {
            Ok(response) => response,
            Err(e) => {
                tracing::error!(method = %request.method, url = %request.url, error = %e, "request failed");
                return Err(e);
            }
        };
        self.inner.request_count.fetch_add(1, Ordering::Relaxed);

        tracing::debug!(
            method = %request.method,
            url = %request.url,
            status = response.status,
            auth = credential.mode(),
            "request dispatched"
        );

        if let Some(remaining) = response.ratelimit_remaining() {
            *self
                .inner
                .ratelimit_remaining
                .lock()
                .unwrap_or_else(PoisonError::into_inner) = Some(remaining);
        }

        Ok(response)
    }

    /// Make a GET request.
    pub fn get(&self, url: &str) -> Result<HttpResponse> {
        self.request(&HttpRequest::get(url))
    }

    /// Make a GET request with query parameters.
    pub fn get_with_query(&self, url: &str, query: &[(&str, &str)]) -> Result<HttpResponse> {
        let query = query
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        self.request(&HttpRequest::get(url).with_query(query))
    }

    /// Make a POST request.
    pub fn post(&self, url: &str, body: Value) -> Result<HttpResponse> {
        self.request(&HttpRequest::new(Method::POST, url).with_body(body))
    }

    /// Make a PATCH request.
    pub fn patch(&self, url: &str, body: Value) -> Result<HttpResponse> {
        self.request(&HttpRequest::new(Method::PATCH, url).with_body(body))
    }

    /// Make a PUT request, optionally with a body.
    pub fn put(&self, url: &str, body: Option<Value>) -> Result<HttpResponse> {
        let mut request = HttpRequest::new(Method::PUT, url);
        request.body = body;
        self.request(&request)
    }

    /// Make a DELETE request.
    pub fn delete(&self, url: &str) -> Result<HttpResponse> {
        self.request(&HttpRequest::new(Method::DELETE, url))
    }

    /// Fetch and deserialize a single resource.
    ///
    /// A `404` is [`Lookup::Absent`]; other failure statuses are errors.
    pub fn fetch<T: DeserializeOwned>(&self, url: &str) -> Result<Lookup<T>> {
        let response = self.get(url)?;
        response
            .lookup(200)?
            .try_map(|value| serde_json::from_value(value).map_err(Into::into))
    }

    /// Query the core request quota.
    pub fn rate_limit(&self) -> Result<RateLimit> {
        let url = self.build_url(&["rate_limit"]);
        let response = self.get(&url)?.error_for_status()?;
        let parsed: RateLimitResponse = serde_json::from_slice(&response.body)?;
        let limit = RateLimit::from(parsed);

        *self
            .inner
            .ratelimit_remaining
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(limit.remaining);
        Ok(limit)
    }

    /// Remaining request quota.
    ///
    /// Uses the value reported by the most recent response; queries the
    /// server when no response has reported one yet.
    pub fn ratelimit_remaining(&self) -> Result<u64> {
        let known = *self
            .inner
            .ratelimit_remaining
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        match known {
            Some(remaining) => Ok(remaining),
            None => Ok(self.rate_limit()?.remaining),
        }
    }

    /// Lazily iterate a paginated collection of `T`.
    pub fn iter<T: DeserializeOwned + 'static>(&self, count: impl Into<Limit>, url: &str) -> PageIterator<T> {
        PageIterator::new(self.clone(), url, count)
    }

    /// Get the search service.
    pub fn search(&self) -> SearchService {
        SearchService::new(self.clone())
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let auth = self.auth();
        f.debug_struct("Session")
            .field("base_url", &self.config().base_url)
            .field("credential", &auth.credential)
            .field("two_factor", &auth.two_factor.is_some())
            .field("request_count", &self.request_count())
            .finish()
    }
}

/// Restores the previous credential when dropped.
///
/// Returned by [`Session::temporary_credential`] and [`Session::no_auth`].
#[must_use = "the credential is restored as soon as the guard is dropped"]
pub struct CredentialGuard<'a> {
    session: &'a Session,
    previous: Option<Credential>,
}

impl CredentialGuard<'_> {
    /// The session the guard belongs to.
    pub fn session(&self) -> &Session {
        self.session
    }
}

impl Drop for CredentialGuard<'_> {
    fn drop(&mut self) {
        if let Some(previous) = self.previous.take() {
            self.session.replace_credential(previous);
            tracing::debug!(mode = self.session.auth().credential.mode(), "credential restored");
        }
    }
}
