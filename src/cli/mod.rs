//! CLI commands
//!
//! Command implementations for the `tcpr` binary.

mod auth;
mod path;
mod progress;
mod publish;
mod style;

pub use auth::{AuthCommand, run_auth};
pub use path::run_path;
pub use publish::{PublishOptions, run_publish};
