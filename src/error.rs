//! Error types for the API client.
//!
//! Every HTTP failure status is mapped onto an [`ErrorKind`] by [`classify`],
//! and surfaces to callers as [`Error::Api`] carrying the status, the
//! server-supplied message and any structured sub-errors.

use std::fmt;

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

/// A specialized `Result` type for client operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Message used when an error body carries no `message` field.
pub const NO_MESSAGE: &str = "[No message]";

/// The kind of failure, independent of its payload.
///
/// Status-derived kinds are produced by [`classify`]; the remaining kinds
/// come from the transport or from interpreting a response body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Connection-level failure (DNS, refused connection, TLS).
    Transport,
    /// 400
    BadRequest,
    /// 401
    AuthenticationFailed,
    /// 403, commonly quota exhaustion or too many failed logins.
    Forbidden,
    /// 404
    NotFound,
    /// 405
    MethodNotAllowed,
    /// 406
    NotAcceptable,
    /// 422, e.g. a duplicate resource.
    Unprocessable,
    /// Any other 4xx.
    ClientError,
    /// Any 5xx.
    ServerError,
    /// A status outside 400..=599 that a caller nonetheless asked to classify.
    UnexpectedStatus,
    /// The body was not valid JSON, or a record failed to deserialize.
    MalformedBody,
    /// A page body had a JSON shape the iterator cannot interpret.
    UnsupportedPageShape,
    /// Invalid argument supplied by the caller.
    InvalidInput,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::Transport => "transport error",
            ErrorKind::BadRequest => "bad request",
            ErrorKind::AuthenticationFailed => "authentication failed",
            ErrorKind::Forbidden => "forbidden",
            ErrorKind::NotFound => "not found",
            ErrorKind::MethodNotAllowed => "method not allowed",
            ErrorKind::NotAcceptable => "not acceptable",
            ErrorKind::Unprocessable => "unprocessable entity",
            ErrorKind::ClientError => "client error",
            ErrorKind::ServerError => "server error",
            ErrorKind::UnexpectedStatus => "unexpected status",
            ErrorKind::MalformedBody => "malformed body",
            ErrorKind::UnsupportedPageShape => "unsupported page shape",
            ErrorKind::InvalidInput => "invalid input",
        };
        f.write_str(name)
    }
}

/// Map an HTTP status code onto an error kind.
///
/// Exact matches win over the 4xx/5xx ranges. Never fails.
pub fn classify(status: u16) -> ErrorKind {
    match status {
        400 => ErrorKind::BadRequest,
        401 => ErrorKind::AuthenticationFailed,
        403 => ErrorKind::Forbidden,
        404 => ErrorKind::NotFound,
        405 => ErrorKind::MethodNotAllowed,
        406 => ErrorKind::NotAcceptable,
        422 => ErrorKind::Unprocessable,
        400..=499 => ErrorKind::ClientError,
        500..=599 => ErrorKind::ServerError,
        _ => ErrorKind::UnexpectedStatus,
    }
}

/// One entry of the structured `errors` array of an error body.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct SubError {
    /// Resource the error applies to (e.g. `"Issue"`).
    #[serde(default)]
    pub resource: Option<String>,
    /// Offending field.
    #[serde(default)]
    pub field: Option<String>,
    /// Machine-readable code such as `"already_exists"`.
    #[serde(default)]
    pub code: Option<String>,
    /// Free-form message.
    #[serde(default)]
    pub message: Option<String>,
}

impl SubError {
    fn from_value(value: &Value) -> Self {
        match value {
            Value::String(message) => SubError {
                message: Some(message.clone()),
                ..Default::default()
            },
            other => serde_json::from_value(other.clone()).unwrap_or_default(),
        }
    }
}

/// The main error type for all client operations.
#[derive(Error, Debug)]
pub enum Error {
    /// HTTP request failed before a response was received
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Server returned a failure status
    #[error("{kind} ({status}): {message}")]
    Api {
        /// Classified kind
        kind: ErrorKind,
        /// HTTP status code
        status: u16,
        /// Human-readable message from the body, or [`NO_MESSAGE`]
        message: String,
        /// Structured sub-errors, empty when the body carries none
        errors: Vec<SubError>,
    },

    /// Body was not valid JSON, or a record failed to deserialize
    #[error("Malformed body: {0}")]
    MalformedBody(String),

    /// Page body had a shape the iterator cannot interpret
    #[error("Unsupported page shape: {0}")]
    UnsupportedPageShape(String),

    /// URL parsing error
    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    /// Invalid input provided to a function
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl Error {
    /// Build a classified error from a status and raw response body.
    ///
    /// The body need not be JSON; a non-JSON body simply yields the
    /// fallback message and no sub-errors.
    pub fn from_response(status: u16, body: &[u8]) -> Self {
        let json: Value = serde_json::from_slice(body).unwrap_or(Value::Null);

        let message = json
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or(NO_MESSAGE)
            .to_string();

        let errors = json
            .get("errors")
            .and_then(Value::as_array)
            .map(|items| items.iter().map(SubError::from_value).collect())
            .unwrap_or_default();

        Error::Api {
            kind: classify(status),
            status,
            message,
            errors,
        }
    }

    /// The kind of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Transport(_) => ErrorKind::Transport,
            Error::Api { kind, .. } => *kind,
            Error::MalformedBody(_) => ErrorKind::MalformedBody,
            Error::UnsupportedPageShape(_) => ErrorKind::UnsupportedPageShape,
            Error::UrlParse(_) | Error::InvalidInput(_) => ErrorKind::InvalidInput,
        }
    }

    /// HTTP status, for status-derived errors.
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Returns `true` if this is an authentication-related error.
    pub fn is_auth_error(&self) -> bool {
        self.kind() == ErrorKind::AuthenticationFailed
    }

    /// Returns `true` if the server refused the request because the request
    /// quota is exhausted.
    pub fn is_rate_limited(&self) -> bool {
        match self {
            Error::Api {
                kind: ErrorKind::Forbidden,
                message,
                ..
            } => message.to_ascii_lowercase().contains("rate limit"),
            _ => false,
        }
    }

    /// Returns `true` if this error indicates a client-side issue.
    pub fn is_client_error(&self) -> bool {
        match self {
            Error::Api { status, .. } => (400..500).contains(status),
            Error::InvalidInput(_) | Error::UrlParse(_) => true,
            _ => false,
        }
    }

    /// Returns `true` if this error indicates a server-side issue.
    pub fn is_server_error(&self) -> bool {
        matches!(self, Error::Api { status, .. } if (500..600).contains(status))
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::MalformedBody(err.to_string())
    }
}
