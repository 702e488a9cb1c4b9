//! Pipeline configuration
//!
//! Layered: built-in defaults, then an optional TOML file, then `TCPR_*`
//! environment variables. The CLI applies its flags last.

use crate::error::{Error, Result};
use crate::publish::RetryPolicy;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

/// Placeholder replaced by the source file path in message templates
pub const PATH_PLACEHOLDER: &str = "{path}";

/// Settings for a publish run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    /// Attempts per remote call, including the first
    pub max_attempts: u32,
    /// Delay before the first retry, in milliseconds
    pub base_delay_ms: u64,
    /// Factor applied to the delay after each retry
    pub backoff_multiplier: f64,
    /// Upper bound on a single retry delay, in milliseconds
    pub max_delay_ms: u64,
    /// Timeout for a single remote call, in seconds
    pub call_timeout_secs: u64,
    /// Prefix of generated branch names
    pub branch_prefix: String,
    /// Infix inserted before the extension of the test file
    pub test_suffix: String,
    /// Commit message template
    pub commit_message: String,
    /// Pull request title template
    pub title: String,
    /// Pull request body
    pub body: String,
    /// GitHub Enterprise host used when the repository spec names none
    pub api_host: Option<String>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 500,
            backoff_multiplier: 2.0,
            max_delay_ms: 10_000,
            call_timeout_secs: 30,
            branch_prefix: "test-cases".to_string(),
            test_suffix: "test".to_string(),
            commit_message: "Add unit tests for {path}".to_string(),
            title: "Add unit tests for {path}".to_string(),
            body: "This PR adds unit test cases generated automatically.".to_string(),
            api_host: None,
        }
    }
}

impl PipelineConfig {
    /// Default config file location (`<config_dir>/testcase-pr/config.toml`)
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("testcase-pr").join("config.toml"))
    }

    /// Load defaults, file and environment
    ///
    /// An explicit `path` must exist; the default location is optional.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(p) => Self::from_file(p)?,
            None => match Self::default_path() {
                Some(p) if p.is_file() => Self::from_file(&p)?,
                _ => Self::default(),
            },
        };
        config.apply_env()?;
        config.validate()?;
        Ok(config)
    }

    /// Parse a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        debug!(path = %path.display(), "loading config file");
        let text = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("cannot read {}: {e}", path.display())))?;
        toml::from_str(&text)
            .map_err(|e| Error::Config(format!("invalid config {}: {e}", path.display())))
    }

    /// Override fields from `TCPR_*` variables and `GH_HOST`
    pub fn apply_env(&mut self) -> Result<()> {
        if let Some(v) = env_parse("TCPR_MAX_ATTEMPTS")? {
            self.max_attempts = v;
        }
        if let Some(v) = env_parse("TCPR_BASE_DELAY_MS")? {
            self.base_delay_ms = v;
        }
        if let Some(v) = env_parse("TCPR_BACKOFF_MULTIPLIER")? {
            self.backoff_multiplier = v;
        }
        if let Some(v) = env_parse("TCPR_CALL_TIMEOUT_SECS")? {
            self.call_timeout_secs = v;
        }
        if let Ok(v) = env::var("TCPR_BRANCH_PREFIX") {
            self.branch_prefix = v;
        }
        if let Ok(v) = env::var("GH_HOST") {
            if !v.is_empty() && v != "github.com" {
                self.api_host = Some(v);
            }
        }
        Ok(())
    }

    /// Reject values the pipeline cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.max_attempts == 0 {
            return Err(Error::Config("max_attempts must be at least 1".to_string()));
        }
        if !self.backoff_multiplier.is_finite() || self.backoff_multiplier < 1.0 {
            return Err(Error::Config(
                "backoff_multiplier must be a finite number >= 1.0".to_string(),
            ));
        }
        if self.call_timeout_secs == 0 {
            return Err(Error::Config("call_timeout_secs must be positive".to_string()));
        }
        if self.max_delay_ms < self.base_delay_ms {
            return Err(Error::Config("max_delay_ms must be >= base_delay_ms".to_string()));
        }
        let valid_prefix = !self.branch_prefix.is_empty()
            && self
                .branch_prefix
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '/'))
            && !self.branch_prefix.starts_with('/')
            && !self.branch_prefix.ends_with('/');
        if !valid_prefix {
            return Err(Error::Config(format!(
                "invalid branch_prefix: {:?}",
                self.branch_prefix
            )));
        }
        if self.test_suffix.is_empty() || self.test_suffix.contains(['/', '.']) {
            return Err(Error::Config(format!(
                "invalid test_suffix: {:?}",
                self.test_suffix
            )));
        }
        Ok(())
    }

    /// Retry policy for remote calls
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            base_delay: Duration::from_millis(self.base_delay_ms),
            multiplier: self.backoff_multiplier,
            max_delay: Duration::from_millis(self.max_delay_ms),
            call_timeout: Duration::from_secs(self.call_timeout_secs),
        }
    }

    /// Commit message for a source file
    pub fn commit_message_for(&self, source_path: &str) -> String {
        self.commit_message.replace(PATH_PLACEHOLDER, source_path)
    }

    /// Pull request title for a source file
    pub fn title_for(&self, source_path: &str) -> String {
        self.title.replace(PATH_PLACEHOLDER, source_path)
    }
}

fn env_parse<T: std::str::FromStr>(var: &str) -> Result<Option<T>> {
    match env::var(var) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| Error::Config(format!("{var} has an invalid value: {raw:?}"))),
        Err(_) => Ok(None),
    }
}

#[cfg(test)]
#[allow(unsafe_code)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::io::Write;

    fn clear_env() {
        // SAFETY: tests touching the environment are serialized
        unsafe {
            for var in [
                "TCPR_MAX_ATTEMPTS",
                "TCPR_BASE_DELAY_MS",
                "TCPR_BACKOFF_MULTIPLIER",
                "TCPR_CALL_TIMEOUT_SECS",
                "TCPR_BRANCH_PREFIX",
                "GH_HOST",
            ] {
                env::remove_var(var);
            }
        }
    }

    #[test]
    fn test_defaults_are_valid() {
        let config = PipelineConfig::default();
        config.validate().unwrap();
        let policy = config.retry_policy();
        assert_eq!(policy.max_attempts, 3);
        assert_eq!(policy.base_delay, Duration::from_millis(500));
    }

    #[test]
    fn test_templates() {
        let config = PipelineConfig::default();
        assert_eq!(config.commit_message_for("src/util.js"), "Add unit tests for src/util.js");
        assert_eq!(config.title_for("lib/a.py"), "Add unit tests for lib/a.py");
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let bad = [
            PipelineConfig { max_attempts: 0, ..Default::default() },
            PipelineConfig { backoff_multiplier: 0.5, ..Default::default() },
            PipelineConfig { backoff_multiplier: f64::NAN, ..Default::default() },
            PipelineConfig { call_timeout_secs: 0, ..Default::default() },
            PipelineConfig { branch_prefix: String::new(), ..Default::default() },
            PipelineConfig { branch_prefix: "bad prefix".to_string(), ..Default::default() },
            PipelineConfig { test_suffix: "a.b".to_string(), ..Default::default() },
            PipelineConfig { base_delay_ms: 20_000, ..Default::default() },
        ];
        for config in bad {
            assert!(config.validate().is_err(), "{config:?} should be rejected");
        }
    }

    #[test]
    #[serial]
    fn test_load_file_then_env() {
        clear_env();
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "max_attempts = 5\nbranch_prefix = \"ai-tests\"\nbase_delay_ms = 10"
        )
        .unwrap();

        // SAFETY: serialized test
        unsafe { env::set_var("TCPR_MAX_ATTEMPTS", "4") };
        let config = PipelineConfig::load(Some(file.path())).unwrap();
        clear_env();

        assert_eq!(config.max_attempts, 4);
        assert_eq!(config.branch_prefix, "ai-tests");
        assert_eq!(config.base_delay_ms, 10);
        assert_eq!(config.call_timeout_secs, 30);
    }

    #[test]
    #[serial]
    fn test_invalid_env_value() {
        clear_env();
        // SAFETY: serialized test
        unsafe { env::set_var("TCPR_BACKOFF_MULTIPLIER", "fast") };
        let mut config = PipelineConfig::default();
        let err = config.apply_env().unwrap_err();
        clear_env();
        assert!(err.to_string().contains("TCPR_BACKOFF_MULTIPLIER"));
    }

    #[test]
    #[serial]
    fn test_gh_host_sets_api_host() {
        clear_env();
        // SAFETY: serialized test
        unsafe { env::set_var("GH_HOST", "ghe.example.com") };
        let mut config = PipelineConfig::default();
        config.apply_env().unwrap();
        clear_env();
        assert_eq!(config.api_host.as_deref(), Some("ghe.example.com"));
    }

    #[test]
    fn test_unknown_keys_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "max_atempts = 5").unwrap();
        assert!(PipelineConfig::from_file(file.path()).is_err());
    }

    #[test]
    fn test_missing_explicit_file() {
        let err = PipelineConfig::from_file(Path::new("/nonexistent/tcpr.toml")).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
