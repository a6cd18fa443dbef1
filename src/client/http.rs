//! HTTP request/response values and the blocking transport beneath
//! [`Session`](crate::Session).

use std::collections::HashMap;

use reqwest::blocking::Client;
use reqwest::header::{
    HeaderMap, HeaderName, HeaderValue, ACCEPT, ACCEPT_CHARSET, AUTHORIZATION, ETAG, LINK,
};
use reqwest::Method;
use secrecy::ExposeSecret;
use serde_json::Value;
use url::Url;

use crate::auth::Credential;
use crate::models::Lookup;
use crate::{Error, Result};

use super::config::ClientConfig;

/// Header carrying the one-time password, and announcing that one is needed.
pub const OTP_HEADER: &str = "x-github-otp";

/// Header reporting the remaining request quota.
pub const RATELIMIT_REMAINING_HEADER: &str = "x-ratelimit-remaining";

/// An HTTP request described as plain data.
///
/// Header names are case-insensitive.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    /// HTTP method
    pub method: Method,
    /// Absolute URL
    pub url: String,
    /// Extra headers; these override the session defaults
    pub headers: HeaderMap,
    /// JSON body, sent with `Content-Type: application/json`
    pub body: Option<Value>,
    /// Query parameters appended to `url`
    pub query: Vec<(String, String)>,
}

impl HttpRequest {
    /// Create a request with no headers, body or query.
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: HeaderMap::new(),
            body: None,
            query: Vec::new(),
        }
    }

    /// Shortcut for a `GET` request.
    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::GET, url)
    }

    /// Attach a JSON body.
    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Replace the query parameters.
    pub fn with_query(mut self, query: Vec<(String, String)>) -> Self {
        self.query = query;
        self
    }

    /// Set a header.
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Set a header from strings, rejecting invalid names or values.
    pub fn try_header(self, name: &str, value: &str) -> Result<Self> {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|_| Error::InvalidInput(format!("Invalid header name: {name}")))?;
        let value = HeaderValue::from_str(value)
            .map_err(|_| Error::InvalidInput(format!("Invalid value for header {name}")))?;
        Ok(self.with_header(name, value))
    }
}

/// An HTTP response described as plain data.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    /// Status code
    pub status: u16,
    /// Response headers
    pub headers: HeaderMap,
    /// Raw body
    pub body: Vec<u8>,
    /// Final URL, after redirects
    pub url: String,
}

impl HttpResponse {
    /// Whether the status is 2xx.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// A header value, if present and valid UTF-8.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Decode the body as JSON.
    pub fn json(&self) -> Result<Value> {
        serde_json::from_slice(&self.body).map_err(|e| Error::MalformedBody(e.to_string()))
    }

    /// Decode the body as JSON, treating an empty body as absent.
    pub fn json_opt(&self) -> Result<Option<Value>> {
        if self.body.iter().all(u8::is_ascii_whitespace) {
            return Ok(None);
        }
        self.json().map(Some)
    }

    /// The `ETag` header.
    pub fn etag(&self) -> Option<&str> {
        self.headers.get(ETAG).and_then(|v| v.to_str().ok())
    }

    /// Remaining request quota reported by the server.
    pub fn ratelimit_remaining(&self) -> Option<u64> {
        self.header(RATELIMIT_REMAINING_HEADER)
            .and_then(|v| v.trim().parse().ok())
    }

    /// Whether the server demands a one-time password before it will
    /// honour otherwise valid credentials.
    pub fn requires_two_factor(&self) -> bool {
        self.status == 401
            && self
                .header(OTP_HEADER)
                .is_some_and(|v| v.trim_start().starts_with("required"))
    }

    /// Relation → absolute URL, from the `Link` header.
    ///
    /// Relative targets are resolved against the response URL.
    pub fn links(&self) -> HashMap<String, String> {
        let Some(value) = self.headers.get(LINK).and_then(|v| v.to_str().ok()) else {
            return HashMap::new();
        };

        let base = Url::parse(&self.url).ok();
        parse_link_header(value)
            .into_iter()
            .map(|(rel, target)| {
                let resolved = match (Url::parse(&target), &base) {
                    (Ok(url), _) => url.to_string(),
                    (Err(url::ParseError::RelativeUrlWithoutBase), Some(base)) => base
                        .join(&target)
                        .map(|u| u.to_string())
                        .unwrap_or(target),
                    _ => target,
                };
                (rel, resolved)
            })
            .collect()
    }

    /// URL of the next page, if the server advertised one.
    pub fn next_link(&self) -> Option<String> {
        self.links().remove("next")
    }

    /// Interpret the status as a yes/no answer.
    ///
    /// `true_code` means yes, `false_code` means no. Any other failure
    /// status is surfaced as a classified error; anything else means no.
    pub fn boolean(&self, true_code: u16, false_code: u16) -> Result<bool> {
        if self.status == true_code {
            return Ok(true);
        }
        if self.status != false_code && self.status >= 400 {
            return Err(Error::from_response(self.status, &self.body));
        }
        Ok(false)
    }

    /// Decode the body when the status is `expected`.
    ///
    /// `404` and unexpected non-failure statuses (e.g. `204`, `304`) yield
    /// [`Lookup::Absent`]; other failure statuses are classified errors.
    pub fn lookup(&self, expected: u16) -> Result<Lookup<Value>> {
        if self.boolean(expected, 404)? {
            Ok(Lookup::Found(self.json()?))
        } else {
            Ok(Lookup::Absent)
        }
    }

    /// Convert a failure status into a classified error.
    pub fn error_for_status(self) -> Result<Self> {
        if self.status >= 400 {
            Err(Error::from_response(self.status, &self.body))
        } else {
            Ok(self)
        }
    }
}

/// Parse a `Link` header into relation → target.
///
/// The first target listed for a relation wins. Targets are returned as
/// written.
pub fn parse_link_header(value: &str) -> HashMap<String, String> {
    let mut links = HashMap::new();
    let mut rest = value;

    while let Some(start) = rest.find('<') {
        let after = &rest[start + 1..];
        let Some(end) = after.find('>') else {
            break;
        };
        let target = after[..end].trim();
        let tail = &after[end + 1..];
        let params_end = tail.find('<').unwrap_or(tail.len());

        for param in tail[..params_end].split(';') {
            let param = param.trim().trim_end_matches(',').trim();
            let Some((key, val)) = param.split_once('=') else {
                continue;
            };
            if !key.trim().eq_ignore_ascii_case("rel") {
                continue;
            }
            for rel in val.trim().trim_matches('"').split_whitespace() {
                links
                    .entry(rel.to_ascii_lowercase())
                    .or_insert_with(|| target.to_string());
            }
        }

        rest = &tail[params_end..];
    }

    links
}

/// Decorates requests with the session defaults and dispatches them.
pub(crate) struct Transport {
    http: Client,
    config: ClientConfig,
}

impl Transport {
    pub(crate) fn new(config: ClientConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .build()?;

        Ok(Self { http, config })
    }

    pub(crate) fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Build the header set for one dispatch.
    ///
    /// At most one authentication mechanism is populated: when a credential
    /// is active, any caller-supplied `Authorization` header is dropped.
    pub(crate) fn build_headers(
        &self,
        request: &HttpRequest,
        credential: &Credential,
        otp: Option<&str>,
    ) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();

        headers.insert(
            ACCEPT,
            HeaderValue::from_str(&self.config.media_type)
                .map_err(|_| Error::InvalidInput("Invalid media type".to_string()))?,
        );
        headers.insert(ACCEPT_CHARSET, HeaderValue::from_static("utf-8"));
        headers.extend(request.headers.clone());

        match credential {
            Credential::None => {}
            Credential::Basic { .. } => {
                headers.remove(AUTHORIZATION);
            }
            Credential::Token(token) => {
                let mut value =
                    HeaderValue::from_str(&format!("token {}", token.expose_secret()))
                        .map_err(|_| Error::InvalidInput("Invalid token format".to_string()))?;
                value.set_sensitive(true);
                headers.insert(AUTHORIZATION, value);
            }
        }

        if let Some(code) = otp {
            headers.insert(
                HeaderName::from_static(OTP_HEADER),
                HeaderValue::from_str(code)
                    .map_err(|_| Error::InvalidInput("Invalid one-time password".to_string()))?,
            );
        }

        Ok(headers)
    }

    /// Send one request. Failure statuses come back as ordinary responses;
    /// only connection-level failures are errors.
    pub(crate) fn send(
        &self,
        request: &HttpRequest,
        credential: &Credential,
        otp: Option<&str>,
    ) -> Result<HttpResponse> {
        let headers = self.build_headers(request, credential, otp)?;

        let mut builder = self
            .http
            .request(request.method.clone(), &request.url)
            .headers(headers);

        if let Credential::Basic { username, password } = credential {
            builder = builder.basic_auth(username, Some(password.expose_secret()));
        }
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(ref body) = request.body {
            builder = builder.json(body);
        }

        let response = builder.send()?;

        let status = response.status().as_u16();
        let headers = response.headers().clone();
        let url = response.url().to_string();
        let body = response.bytes()?.to_vec();

        Ok(HttpResponse {
            status,
            headers,
            body,
            url,
        })
    }
}
