//! The credential a session authenticates with.

use std::fmt;

use secrecy::SecretString;

/// Active authentication mode. At most one is in effect at a time.
#[derive(Clone, Default)]
pub enum Credential {
    /// Anonymous requests.
    #[default]
    None,
    /// HTTP Basic authentication.
    Basic {
        /// Login name
        username: String,
        /// Password
        password: SecretString,
    },
    /// `Authorization: token <value>`.
    Token(SecretString),
}

impl Credential {
    /// Basic credentials, or `None` if either part is empty.
    pub fn basic(username: impl Into<String>, password: impl Into<String>) -> Option<Self> {
        let username = username.into();
        let password = password.into();
        if username.is_empty() || password.is_empty() {
            return None;
        }
        Some(Credential::Basic {
            username,
            password: SecretString::from(password),
        })
    }

    /// Token credentials, or `None` if the token is empty.
    pub fn token(token: impl Into<String>) -> Option<Self> {
        let token = token.into();
        if token.is_empty() {
            return None;
        }
        Some(Credential::Token(SecretString::from(token)))
    }

    /// Whether this credential sends no authentication.
    pub fn is_none(&self) -> bool {
        matches!(self, Credential::None)
    }

    /// Short name of the mode, safe to log.
    pub fn mode(&self) -> &'static str {
        match self {
            Credential::None => "none",
            Credential::Basic { .. } => "basic",
            Credential::Token(_) => "token",
        }
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Credential::None => f.write_str("None"),
            Credential::Basic { username, .. } => f
                .debug_struct("Basic")
                .field("username", username)
                .field("password", &"[REDACTED]")
                .finish(),
            Credential::Token(_) => f.debug_tuple("Token").field(&"[REDACTED]").finish(),
        }
    }
}
