//! testcase-pr - publish generated unit-test suites as pull requests
//!
//! Takes a ready-made test file for a source file in a GitHub repository and
//! turns it into an open pull request, using the Git-data API directly:
//! branch, blob, tree, commit, ref update, pull request.
//!
//! The interesting part lives in [`publish`]: a strictly linear pipeline with
//! retry/backoff for transient failures and compensating branch cleanup when a
//! run fails or is cancelled.

pub mod auth;
pub mod config;
pub mod error;
pub mod platform;
pub mod publish;
pub mod types;
