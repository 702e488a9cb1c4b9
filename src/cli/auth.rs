//! Auth command - test and manage authentication

use crate::cli::style::{Stylize, check};
use anstream::{eprintln, println};
use std::path::Path;
use testcase_pr::auth::{OAuthApp, get_github_auth, test_github_auth};
use testcase_pr::config::PipelineConfig;
use testcase_pr::error::Result;

/// Auth subcommands
pub enum AuthCommand {
    /// Check the ambient credential against the API
    Test,
    /// Print setup instructions
    Setup,
    /// Trade an OAuth code for a token
    Exchange(String),
}

/// Run the auth test command
pub async fn run_auth_test(config: Option<&Path>) -> Result<()> {
    let config = PipelineConfig::load(config)?;
    println!("Testing GitHub authentication...");
    let auth = get_github_auth().await?;
    let username = test_github_auth(&auth, config.api_host.as_deref()).await?;
    println!("{} Authenticated as: {}", check(), username.accent());
    println!("Token source: {}", format!("{:?}", auth.source).muted());
    if let Some(host) = &config.api_host {
        println!("Host: {host}");
    }
    Ok(())
}

/// Run the auth setup command (show instructions)
pub fn run_auth_setup() {
    println!("{}", "GitHub Authentication Setup".emphasis());
    println!("===========================");
    println!();
    println!("Option 1: GitHub CLI (recommended)");
    println!("  Install: https://cli.github.com/");
    println!("  Run: gh auth login");
    println!();
    println!("Option 2: Environment variable");
    println!("  Set GITHUB_TOKEN or GH_TOKEN");
    println!();
    println!("Option 3: OAuth app");
    println!("  Set GITHUB_CLIENT_ID and GITHUB_CLIENT_SECRET");
    println!("  Run: tcpr auth github exchange --code <code>");
    println!();
    println!("For GitHub Enterprise:");
    println!("  Set GH_HOST to your instance hostname");
}

/// Run the OAuth code exchange, printing the token on stdout
pub async fn run_auth_exchange(code: &str) -> Result<()> {
    let app = OAuthApp::from_env()?;
    let auth = app.exchange_code(code).await?;
    eprintln!("{} Code exchanged", check().for_stderr());
    println!("{}", auth.token());
    Ok(())
}

/// Wrapper for auth commands
pub async fn run_auth(command: AuthCommand, config: Option<&Path>) -> Result<()> {
    match command {
        AuthCommand::Test => run_auth_test(config).await,
        AuthCommand::Setup => {
            run_auth_setup();
            Ok(())
        }
        AuthCommand::Exchange(code) => run_auth_exchange(&code).await,
    }
}
