//! Error types for testcase-pr
//!
//! Every failure that reaches pipeline decision logic is one of a closed set
//! of kinds ([`ErrorKind`]). Raw HTTP failures are classified once, at the
//! platform boundary, by [`HttpFailure::classify`].

use crate::types::PipelineStep;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, Error>;

/// Closed error taxonomy surfaced to callers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Credential rejected or expired
    Auth,
    /// Repository, ref or object missing
    NotFound,
    /// Ref or request already exists, or stale parent commit
    Conflict,
    /// Malformed request or input
    Validation,
    /// Explicit rate-limit signal from the platform
    RateLimited,
    /// 5xx, timeout, connection failure, or exhausted rate-limit retries
    Transient,
    /// Run cancelled by the caller
    Cancelled,
    /// Unexpected response shape or local bug
    Internal,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Auth => "Auth",
            Self::NotFound => "NotFound",
            Self::Conflict => "Conflict",
            Self::Validation => "Validation",
            Self::RateLimited => "RateLimited",
            Self::Transient => "Transient",
            Self::Cancelled => "Cancelled",
            Self::Internal => "Internal",
        };
        f.write_str(name)
    }
}

/// A failure attributed to the pipeline step at which it occurred
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[error("{step} step failed with {kind}: {message}")]
pub struct PipelineFailure {
    /// Error classification
    pub kind: ErrorKind,
    /// Step the run was trying to reach
    pub step: PipelineStep,
    /// Human-readable detail
    pub message: String,
}

impl PipelineFailure {
    /// Attribute an error to a step
    pub fn at(step: PipelineStep, error: &Error) -> Self {
        if let Error::Pipeline(inner) = error {
            return inner.clone();
        }
        Self {
            kind: error.kind(),
            step,
            message: error.to_string(),
        }
    }
}

/// Errors that can occur in testcase-pr
#[derive(Debug, Clone, Error)]
pub enum Error {
    /// Authentication error
    #[error("authentication error: {0}")]
    Auth(String),

    /// Missing repository, ref or object
    #[error("not found: {0}")]
    NotFound(String),

    /// Already exists, or stale parent
    #[error("conflict: {0}")]
    Conflict(String),

    /// Malformed input or request
    #[error("validation error: {0}")]
    Validation(String),

    /// Rate limit hit
    #[error("rate limited: {message}")]
    RateLimited {
        /// Platform message
        message: String,
        /// Seconds the platform asked us to wait, if it said
        retry_after_secs: Option<u64>,
    },

    /// Transient failure worth retrying
    #[error("transient error: {0}")]
    Transient(String),

    /// Cancelled by the caller
    #[error("run cancelled")]
    Cancelled,

    /// Invalid configuration
    #[error("configuration error: {0}")]
    Config(String),

    /// Parse error
    #[error("parse error: {0}")]
    Parse(String),

    /// Internal error
    #[error("internal error: {0}")]
    Internal(String),

    /// Step-attributed pipeline failure
    #[error(transparent)]
    Pipeline(#[from] PipelineFailure),
}

impl Error {
    /// Classify into the closed taxonomy
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Auth(_) => ErrorKind::Auth,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::Conflict(_) => ErrorKind::Conflict,
            Self::Validation(_) | Self::Config(_) | Self::Parse(_) => ErrorKind::Validation,
            Self::RateLimited { .. } => ErrorKind::RateLimited,
            Self::Transient(_) => ErrorKind::Transient,
            Self::Cancelled => ErrorKind::Cancelled,
            Self::Internal(_) => ErrorKind::Internal,
            Self::Pipeline(failure) => failure.kind,
        }
    }

    /// Whether the shared retry policy applies
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::RateLimited { .. } | Self::Transient(_))
    }

    /// Delay the platform asked for, if any
    pub const fn retry_after_secs(&self) -> Option<u64> {
        match self {
            Self::RateLimited {
                retry_after_secs, ..
            } => *retry_after_secs,
            _ => None,
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() || e.is_connect() {
            return Self::Transient(e.to_string());
        }
        if e.is_decode() {
            return Self::Internal(format!("unexpected response body: {e}"));
        }
        if let Some(status) = e.status() {
            return HttpFailure::new(status.as_u16(), e.to_string()).classify();
        }
        if e.is_builder() {
            return Self::Validation(e.to_string());
        }
        Self::Transient(e.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Self::Internal(format!("JSON error: {e}"))
    }
}

/// Message fragments the platform uses for "already exists"/"stale" on 422
const CONFLICT_MARKERS: &[&str] = &[
    "already exists",
    "not a fast forward",
    "fast-forward",
];

/// A non-success HTTP response, before classification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpFailure {
    /// HTTP status code
    pub status: u16,
    /// Message extracted from the body
    pub message: String,
    /// `Retry-After` header, in seconds
    pub retry_after_secs: Option<u64>,
    /// `x-ratelimit-remaining: 0` was present
    pub quota_exhausted: bool,
}

impl HttpFailure {
    /// Failure with no rate-limit headers
    pub fn new(status: u16, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            retry_after_secs: None,
            quota_exhausted: false,
        }
    }

    /// Map into the closed taxonomy
    pub fn classify(self) -> Error {
        let Self {
            status,
            message,
            retry_after_secs,
            quota_exhausted,
        } = self;
        let message = if message.is_empty() {
            format!("HTTP {status}")
        } else {
            message
        };
        let rate_signal = quota_exhausted || retry_after_secs.is_some();

        match status {
            401 => Error::Auth(message),
            403 | 429 if rate_signal || status == 429 => Error::RateLimited {
                message,
                retry_after_secs,
            },
            403 => Error::Auth(message),
            404 => Error::NotFound(message),
            409 => Error::Conflict(message),
            422 => {
                let lower = message.to_ascii_lowercase();
                if CONFLICT_MARKERS.iter().any(|m| lower.contains(m)) {
                    Error::Conflict(message)
                } else {
                    Error::Validation(message)
                }
            }
            408 | 500..=599 => Error::Transient(message),
            _ => Error::Validation(message),
        }
    }
}
