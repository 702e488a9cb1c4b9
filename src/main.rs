//! tcpr - publish generated unit tests as GitHub pull requests
//!
//! CLI binary around the `testcase_pr` publish pipeline.

use anyhow::Result;
use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

mod cli;

#[derive(Parser)]
#[command(name = "tcpr")]
#[command(about = "Publish generated unit tests as GitHub pull requests")]
#[command(version)]
struct Cli {
    /// Config file (defaults to the user config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// More log output (-v info, -vv debug); RUST_LOG takes precedence
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Open a pull request adding a generated test file
    Publish {
        /// Repository as owner/name or clone URL
        #[arg(long)]
        repo: String,

        /// Source file the tests were generated for
        #[arg(long)]
        file: String,

        /// File holding the generated tests; "-" reads stdin, which needs --yes
        /// since the prompt cannot share stdin with the content
        #[arg(long, default_value = "-")]
        content: String,

        /// Show what would be done without making changes
        #[arg(long)]
        dry_run: bool,

        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,

        /// Print the outcome (or failure) as JSON
        #[arg(long)]
        json: bool,

        /// Attempts per remote call, overriding config
        #[arg(long)]
        max_attempts: Option<u32>,
    },

    /// Print the test-file path derived for a source file
    Path {
        /// Source file path, relative to the repository root
        file: String,
    },

    /// Authentication management
    Auth {
        #[command(subcommand)]
        platform: AuthPlatform,
    },
}

#[derive(Subcommand)]
enum AuthPlatform {
    /// GitHub authentication
    Github {
        #[command(subcommand)]
        action: AuthAction,
    },
}

#[derive(Subcommand)]
enum AuthAction {
    /// Test authentication
    Test,
    /// Show authentication setup instructions
    Setup,
    /// Exchange an OAuth authorization code for a token
    Exchange {
        /// Code returned by the GitHub authorization redirect
        #[arg(long)]
        code: String,
    },
}

fn init_logging(verbose: u8) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| match verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        _ => EnvFilter::new("debug"),
    });

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Publish {
            repo,
            file,
            content,
            dry_run,
            yes,
            json,
            max_attempts,
        } => {
            let options = cli::PublishOptions {
                repo,
                file,
                content,
                dry_run,
                yes,
                json,
                max_attempts,
                config: cli.config,
            };
            cli::run_publish(options).await?;
        }
        Commands::Path { file } => {
            cli::run_path(cli.config.as_deref(), &file)?;
        }
        Commands::Auth { platform } => match platform {
            AuthPlatform::Github { action } => {
                let action = match action {
                    AuthAction::Test => cli::AuthCommand::Test,
                    AuthAction::Setup => cli::AuthCommand::Setup,
                    AuthAction::Exchange { code } => cli::AuthCommand::Exchange(code),
                };
                cli::run_auth(action, cli.config.as_deref()).await?;
            }
        },
    }

    Ok(())
}
