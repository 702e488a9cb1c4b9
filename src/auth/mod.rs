//! Authentication for GitHub
//!
//! Credentials travel as an explicit [`AuthContext`] value. Nothing in the
//! crate reads a token from ambient state once a context has been built.

mod github;

pub use github::{OAuthApp, get_github_auth, test_github_auth};

use std::fmt;

/// Source of authentication token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthSource {
    /// Token from the gh CLI
    Cli,
    /// Token from environment variable
    EnvVar,
    /// Token from an OAuth code exchange
    OAuth,
    /// Token handed in by the caller
    Explicit,
}

/// An authenticated session handle
#[derive(Clone, PartialEq, Eq)]
pub struct AuthContext {
    token: String,
    /// Where the token was obtained from
    pub source: AuthSource,
}

impl AuthContext {
    /// Wrap a token supplied by the caller
    pub fn from_token(token: impl Into<String>) -> Self {
        Self::new(token, AuthSource::Explicit)
    }

    pub(crate) fn new(token: impl Into<String>, source: AuthSource) -> Self {
        Self {
            token: token.into(),
            source,
        }
    }

    /// Raw token, for building request headers
    pub fn token(&self) -> &str {
        &self.token
    }
}

impl fmt::Debug for AuthContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthContext")
            .field("token", &"<redacted>")
            .field("source", &self.source)
            .finish()
    }
}
