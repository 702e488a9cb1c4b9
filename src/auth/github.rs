//! GitHub authentication

use crate::auth::{AuthContext, AuthSource};
use crate::error::{Error, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::env;
use tokio::process::Command;
use tracing::debug;

const OAUTH_BASE_URL: &str = "https://github.com";

/// Get GitHub authentication
///
/// Priority:
/// 1. gh CLI (`gh auth token`)
/// 2. `GITHUB_TOKEN` environment variable
/// 3. `GH_TOKEN` environment variable
pub async fn get_github_auth() -> Result<AuthContext> {
    if let Some(token) = get_gh_cli_token().await {
        return Ok(AuthContext::new(token, AuthSource::Cli));
    }

    for var in ["GITHUB_TOKEN", "GH_TOKEN"] {
        if let Ok(token) = env::var(var) {
            if !token.trim().is_empty() {
                return Ok(AuthContext::new(token.trim(), AuthSource::EnvVar));
            }
        }
    }

    Err(Error::Auth(
        "No GitHub authentication found. Run `gh auth login` or set GITHUB_TOKEN".to_string(),
    ))
}

async fn get_gh_cli_token() -> Option<String> {
    Command::new("gh")
        .arg("--version")
        .output()
        .await
        .ok()?;

    let status = Command::new("gh")
        .args(["auth", "status"])
        .output()
        .await
        .ok()?;

    if !status.status.success() {
        return None;
    }

    let output = Command::new("gh")
        .args(["auth", "token"])
        .output()
        .await
        .ok()?;

    if !output.status.success() {
        return None;
    }

    let token = String::from_utf8_lossy(&output.stdout).trim().to_string();
    if token.is_empty() {
        None
    } else {
        Some(token)
    }
}

/// A registered GitHub OAuth app
///
/// Exchanges the `code` handed to the login callback for an access token.
/// This happens once, before any pipeline run; the pipeline only ever sees
/// the resulting [`AuthContext`].
#[derive(Clone)]
pub struct OAuthApp {
    client_id: String,
    client_secret: String,
    base_url: String,
}

#[derive(Serialize)]
struct TokenExchangePayload<'a> {
    client_id: &'a str,
    client_secret: &'a str,
    code: &'a str,
}

#[derive(Deserialize)]
struct TokenExchangeResponse {
    access_token: Option<String>,
    error: Option<String>,
    error_description: Option<String>,
}

impl OAuthApp {
    /// Create an app from its credentials
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            base_url: OAUTH_BASE_URL.to_string(),
        }
    }

    /// Read `GITHUB_CLIENT_ID` / `GITHUB_CLIENT_SECRET`
    pub fn from_env() -> Result<Self> {
        let client_id = env::var("GITHUB_CLIENT_ID")
            .map_err(|_| Error::Config("GITHUB_CLIENT_ID is not set".to_string()))?;
        let client_secret = env::var("GITHUB_CLIENT_SECRET")
            .map_err(|_| Error::Config("GITHUB_CLIENT_SECRET is not set".to_string()))?;
        Ok(Self::new(client_id, client_secret))
    }

    /// Point at a different login host (GitHub Enterprise, tests)
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Exchange a login callback code for an access token
    pub async fn exchange_code(&self, code: &str) -> Result<AuthContext> {
        if code.trim().is_empty() {
            return Err(Error::Validation("OAuth code is empty".to_string()));
        }

        let url = format!("{}/login/oauth/access_token", self.base_url);
        debug!(url = %url, "exchanging OAuth code");

        let response = Client::new()
            .post(&url)
            .header("Accept", "application/json")
            .json(&TokenExchangePayload {
                client_id: &self.client_id,
                client_secret: &self.client_secret,
                code,
            })
            .send()
            .await?;

        let status = response.status();
        if status.is_server_error() {
            return Err(Error::Transient(format!("token exchange failed: HTTP {status}")));
        }

        let body: TokenExchangeResponse = response.json().await?;

        match (body.access_token, body.error) {
            (Some(token), None) if !token.is_empty() => {
                Ok(AuthContext::new(token, AuthSource::OAuth))
            }
            (_, error) => {
                let reason = body
                    .error_description
                    .or(error)
                    .unwrap_or_else(|| format!("HTTP {status}"));
                Err(Error::Auth(format!("OAuth code exchange rejected: {reason}")))
            }
        }
    }
}

/// Test GitHub authentication, returning the login
pub async fn test_github_auth(auth: &AuthContext, host: Option<&str>) -> Result<String> {
    let mut builder = octocrab::Octocrab::builder().personal_token(auth.token().to_string());

    if let Some(h) = host {
        builder = builder
            .base_uri(format!("https://{h}/api/v3"))
            .map_err(|e| Error::Config(e.to_string()))?;
    }

    let octocrab = builder.build().map_err(|e| Error::Internal(e.to_string()))?;

    let user = octocrab
        .current()
        .user()
        .await
        .map_err(|e| Error::Auth(format!("Invalid token: {e}")))?;

    Ok(user.login)
}
