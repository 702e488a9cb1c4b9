//! Publish command - open a pull request with a generated test file

use crate::cli::progress::CliProgress;
use crate::cli::style::{Stream, Stylize, check, hyperlink_url};
use anstream::{eprintln, println};
use dialoguer::Confirm;
use std::io::{IsTerminal, Read};
use std::path::PathBuf;
use testcase_pr::auth::get_github_auth;
use testcase_pr::config::PipelineConfig;
use testcase_pr::error::{Error, PipelineFailure, Result};
use testcase_pr::platform::{create_git_data_service, parse_repo_spec};
use testcase_pr::publish::{CancelHandle, Pipeline, derive_test_path, plan_publish};
use testcase_pr::types::{PipelineStep, PublishJob};
use tracing::debug;

/// Flags of `tcpr publish`
pub struct PublishOptions {
    /// Repository spec
    pub repo: String,
    /// Source file path in the repository
    pub file: String,
    /// Content file, or "-" for stdin
    pub content: String,
    /// Plan only
    pub dry_run: bool,
    /// Skip confirmation
    pub yes: bool,
    /// JSON output
    pub json: bool,
    /// Attempts override
    pub max_attempts: Option<u32>,
    /// Config file override
    pub config: Option<PathBuf>,
}

/// Run the publish command
pub async fn run_publish(options: PublishOptions) -> Result<()> {
    let mut config = PipelineConfig::load(options.config.as_deref())?;
    if let Some(max_attempts) = options.max_attempts {
        config.max_attempts = max_attempts;
        config.validate()?;
    }
    if options.content == "-" && !options.yes && !options.dry_run {
        return Err(Error::Validation(
            "content is read from stdin, so there is no prompt; pass --yes or --content <file>"
                .to_string(),
        ));
    }

    let job = PublishJob {
        repo: parse_repo_spec(&options.repo)?,
        file_path: options.file.clone(),
        generated_content: read_content(&options.content)?,
    };
    let test_path = derive_test_path(&job.file_path, &config.test_suffix)?;

    let auth = get_github_auth().await?;
    debug!(source = ?auth.source, "using GitHub credential");
    let service = create_git_data_service(&auth, &job.repo, config.api_host.as_deref())?;

    let handle = CancelHandle::new();
    let cancel = handle.signal();

    if options.dry_run {
        let plan = plan_publish(service.as_ref(), &config, &job, &cancel).await;
        return match plan {
            Ok(plan) if options.json => {
                println!("{}", serde_json::to_string_pretty(&plan)?);
                Ok(())
            }
            Ok(plan) => {
                println!("{}", "Dry run - no changes will be made".muted());
                println!("{plan}");
                Ok(())
            }
            Err(e) => fail(e, options.json),
        };
    }

    if !options.yes && !confirm(&job, &test_path)? {
        println!("Aborted");
        return Ok(());
    }

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            handle.cancel();
        }
    });

    let progress = if options.json {
        CliProgress::quiet()
    } else {
        CliProgress::interactive()
    };

    let result = Pipeline::new(service.as_ref(), &config)
        .run(&job, &progress, &cancel)
        .await;
    progress.finish();

    match result {
        Ok(outcome) if options.json => {
            println!("{}", serde_json::to_string_pretty(&outcome)?);
            Ok(())
        }
        Ok(outcome) => {
            eprintln!(
                "{} Opened pull request for {} on {}",
                check().for_stderr(),
                outcome.test_file_path.accent().for_stderr(),
                outcome.branch.accent().for_stderr()
            );
            println!("{}", hyperlink_url(Stream::Stdout, &outcome.change_request_url));
            Ok(())
        }
        Err(e) => fail(e, options.json),
    }
}

/// Report a failure; with `--json` the `{kind, step, message}` record goes to stdout
fn fail(error: Error, json: bool) -> Result<()> {
    if json {
        let failure = PipelineFailure::at(PipelineStep::Init, &error);
        println!("{}", serde_json::to_string_pretty(&failure)?);
    }
    Err(error)
}

fn confirm(job: &PublishJob, test_path: &str) -> Result<bool> {
    if !std::io::stderr().is_terminal() {
        return Err(Error::Validation(
            "cannot prompt for confirmation without a terminal; pass --yes".to_string(),
        ));
    }

    Confirm::new()
        .with_prompt(format!(
            "Open a pull request adding {} to {}?",
            test_path, job.repo
        ))
        .default(true)
        .interact()
        .map_err(|e| Error::Internal(format!("prompt failed: {e}")))
}

fn read_content(source: &str) -> Result<String> {
    if source == "-" {
        let mut content = String::new();
        std::io::stdin()
            .read_to_string(&mut content)
            .map_err(|e| Error::Validation(format!("cannot read stdin: {e}")))?;
        return Ok(content);
    }
    std::fs::read_to_string(source)
        .map_err(|e| Error::Validation(format!("cannot read {source}: {e}")))
}
