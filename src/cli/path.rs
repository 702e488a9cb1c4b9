//! Path command - show where the test file for a source file goes

use std::path::Path;
use testcase_pr::config::PipelineConfig;
use testcase_pr::error::Result;
use testcase_pr::publish::derive_test_path;

/// Print the derived test-file path
pub fn run_path(config: Option<&Path>, file: &str) -> Result<()> {
    let config = PipelineConfig::load(config)?;
    println!("{}", derive_test_path(file, &config.test_suffix)?);
    Ok(())
}
