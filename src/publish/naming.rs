//! Branch names and test-file paths
//!
//! Both mappings are pure. The only randomness is the branch suffix, which
//! is generated separately so callers and tests can supply their own.

use crate::error::{Error, Result};
use crate::types::BranchProposal;
use chrono::Utc;
use uuid::Uuid;

/// Hex characters in a branch suffix (48 random bits)
pub const SUFFIX_LEN: usize = 12;

/// Build a branch name from a run timestamp and a suffix
///
/// `<prefix>-<epochMillis>-<suffix>`
pub fn branch_name(prefix: &str, run_timestamp_millis: i64, suffix: &str) -> String {
    format!("{prefix}-{run_timestamp_millis}-{suffix}")
}

/// A fresh random suffix of [`SUFFIX_LEN`] lowercase hex characters
///
/// Taken from the leading bytes of a v4 UUID, all of which are random.
pub fn random_suffix() -> String {
    let mut suffix = Uuid::new_v4().simple().to_string();
    suffix.truncate(SUFFIX_LEN);
    suffix
}

/// Birthday-bound probability that any two of `runs` suffixes collide
pub fn collision_probability(runs: u64) -> f64 {
    #[allow(clippy::cast_precision_loss)]
    let space = 16f64.powi(i32::try_from(SUFFIX_LEN).unwrap_or(i32::MAX));
    #[allow(clippy::cast_precision_loss)]
    let pairs = (runs as f64) * (runs.saturating_sub(1) as f64) / 2.0;
    1.0 - (-pairs / space).exp()
}

/// Generates branch proposals for runs
#[derive(Debug, Clone)]
pub struct BranchNamer {
    prefix: String,
}

impl BranchNamer {
    /// Namer with the given branch prefix
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    /// Propose a branch at `base_sha` using the current time and a random suffix
    pub fn propose(&self, base_sha: &str) -> BranchProposal {
        self.propose_at(Utc::now().timestamp_millis(), &random_suffix(), base_sha)
    }

    /// Propose a branch with an explicit timestamp and suffix
    pub fn propose_at(
        &self,
        run_timestamp_millis: i64,
        suffix: &str,
        base_sha: &str,
    ) -> BranchProposal {
        BranchProposal {
            name: branch_name(&self.prefix, run_timestamp_millis, suffix),
            base_sha: base_sha.to_string(),
        }
    }
}

/// Check that a repository path is relative and has no empty or dot segments
pub fn validate_repo_path(path: &str) -> Result<()> {
    if path.is_empty() {
        return Err(Error::Validation("path is empty".to_string()));
    }
    if path.starts_with('/') || path.ends_with('/') {
        return Err(Error::Validation(format!(
            "path must be relative and name a file: {path:?}"
        )));
    }
    if path.contains(['\\', '\0']) {
        return Err(Error::Validation(format!("path has invalid characters: {path:?}")));
    }
    if path
        .split('/')
        .any(|segment| segment.is_empty() || segment == "." || segment == "..")
    {
        return Err(Error::Validation(format!("path has empty or dot segments: {path:?}")));
    }
    Ok(())
}

/// Derive the sibling test-file path for a source file
///
/// `dir/name.ext` becomes `dir/name.<suffix>.ext`; a file without an
/// extension (or a dot-file) gets `.<suffix>` appended. The result always
/// differs from the input.
pub fn derive_test_path(source_path: &str, suffix: &str) -> Result<String> {
    validate_repo_path(source_path)?;

    let (dir, file) = source_path.rsplit_once('/').unwrap_or(("", source_path));

    let test_file = match file.rfind('.') {
        Some(idx) if idx > 0 => format!("{}.{suffix}{}", &file[..idx], &file[idx..]),
        _ => format!("{file}.{suffix}"),
    };

    if dir.is_empty() {
        Ok(test_file)
    } else {
        Ok(format!("{dir}/{test_file}"))
    }
}
