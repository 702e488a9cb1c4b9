//! Repository identifier parsing
//!
//! Accepts the `owner/name` form used by the invocation contract as well as
//! clone URLs, so the CLI can be pointed at a remote directly.

use crate::error::{Error, Result};
use crate::types::RepoId;
use regex::Regex;
use std::sync::OnceLock;

fn short_form() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^([A-Za-z0-9](?:[A-Za-z0-9-]*[A-Za-z0-9])?)/([A-Za-z0-9._-]+)$")
            .expect("hardcoded regex is valid")
    })
}

fn ssh_form() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^git@([^:]+):(.+?)(?:\.git)?/?$").expect("hardcoded regex is valid")
    })
}

/// Parse a repository spec
///
/// - `owner/name`
/// - `https://host/owner/name(.git)`
/// - `git@host:owner/name(.git)`
///
/// Hosts other than github.com are kept as the Enterprise host.
pub fn parse_repo_spec(spec: &str) -> Result<RepoId> {
    let spec = spec.trim();

    if let Some(caps) = short_form().captures(spec) {
        return build(None, &caps[1], &caps[2], spec);
    }

    let (host, path) = if let Some(caps) = ssh_form().captures(spec) {
        (caps[1].to_string(), caps[2].to_string())
    } else {
        let url = url::Url::parse(spec)
            .map_err(|_| Error::Parse(format!("cannot parse repository: {spec}")))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(Error::Parse(format!("unsupported scheme in {spec}")));
        }
        let host = url
            .host_str()
            .ok_or_else(|| Error::Parse(format!("missing host in {spec}")))?
            .to_string();
        let path = url.path().trim_matches('/');
        (host, path.strip_suffix(".git").unwrap_or(path).to_string())
    };

    let parts: Vec<&str> = path.split('/').collect();
    let [owner, name] = parts.as_slice() else {
        return Err(Error::Parse(format!("expected owner/name in {spec}")));
    };

    let host = (host != "github.com" && host != "www.github.com").then_some(host);
    build(host, owner, name, spec)
}

fn build(host: Option<String>, owner: &str, name: &str, spec: &str) -> Result<RepoId> {
    if owner.is_empty() || name.is_empty() || name == "." || name == ".." {
        return Err(Error::Parse(format!("invalid repository: {spec}")));
    }
    Ok(RepoId {
        owner: owner.to_string(),
        name: name.to_string(),
        host,
    })
}
