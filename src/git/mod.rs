//! Source downloads
//!
//! Components fetch their sources with [`download`]: a clone of one
//! branch into the component's app directory. A directory that already
//! holds a repository is left untouched, so re-running install does not
//! refetch.

mod auth;

use std::borrow::Cow;
use std::path::Path;

use git2::{ErrorClass, FetchOptions, RemoteCallbacks, build::RepoBuilder};

use crate::error::{self, Result};
use auth::setup_auth_callbacks;

/// Whether `download` cloned or found an existing checkout
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fetched {
    Cloned,
    AlreadyPresent,
}

/// Clone `uri` at `branch` (remote default when `None`) into `target`
pub fn download(uri: &str, branch: Option<&str>, target: &Path) -> Result<Fetched> {
    if target.join(".git").exists() {
        tracing::info!(target = %target.display(), "source already present, not downloading");
        return Ok(Fetched::AlreadyPresent);
    }
    if let Some(parent) = target.parent() {
        std::fs::create_dir_all(parent)?;
    }

    tracing::info!(%uri, branch = branch.unwrap_or("(default)"), target = %target.display(), "downloading");
    let mut callbacks = RemoteCallbacks::new();
    setup_auth_callbacks(&mut callbacks);
    let mut fetch_options = FetchOptions::new();
    fetch_options.remote_callbacks(callbacks);

    let mut builder = RepoBuilder::new();
    builder.fetch_options(fetch_options);
    if let Some(branch) = branch {
        builder.branch(branch);
    }

    builder
        .clone(normalize_url(uri).as_ref(), target)
        .map_err(|e| match branch {
            Some(branch) if e.class() == ErrorClass::Reference => {
                error::checkout_failed(branch, e.message())
            }
            _ => error::clone_failed(uri, interpret_git_error(&e)),
        })?;
    Ok(Fetched::Cloned)
}

/// Rewrite URLs libgit2 does not accept as written
///
/// SCP-style `git@host:path` becomes `ssh://git@host/path`, and relative
/// `file://` URLs become absolute.
fn normalize_url(url: &str) -> Cow<'_, str> {
    if let Some(after) = url.strip_prefix("file://") {
        if !after.is_empty() && !after.starts_with('/') {
            return Cow::Owned(format!("file:///{}", after.replace('\\', "/")));
        }
        return Cow::Borrowed(url);
    }
    if url.starts_with("git@") {
        if let Some((host, path)) = url.split_once(':') {
            let path = path.strip_prefix('/').unwrap_or(path);
            return Cow::Owned(format!("ssh://{host}/{path}"));
        }
    }
    Cow::Borrowed(url)
}

/// Short description of a clone failure
fn interpret_git_error(err: &git2::Error) -> String {
    let message = err.message().to_lowercase();
    let matches = |needles: &[&str]| needles.iter().any(|n| message.contains(n));
    if matches(&["not found", "404", "too many redirects", "authentication replays"]) {
        "Repository not found".to_string()
    } else if matches(&["authentication", "credentials"]) {
        "Authentication failed".to_string()
    } else if matches(&["permission denied", "access denied"]) {
        "Permission denied".to_string()
    } else if matches(&["connection", "network", "timeout", "timed out"]) {
        "Network error".to_string()
    } else {
        match err.class() {
            ErrorClass::Http => format!("HTTP error: {}", err.message()),
            ErrorClass::Ssh => format!("SSH error: {}", err.message()),
            _ => err.message().to_string(),
        }
    }
}
