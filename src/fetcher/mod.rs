//! Local snapshots of upstream repositories.
//!
//! Snapshots are cached under `<cache-root>/<host>/<path-without-.git>` and reused across runs. A cached
//! snapshot is updated in place unless the caller forces a fresh clone.

mod git;

use crate::Result;
use chrono::{DateTime, Utc};
use ohno::IntoAppError;
use std::fs;
use std::path::{Path, PathBuf};
use url::Url;

pub(crate) const LOG_TARGET: &str = "   fetcher";

/// What to fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    pub repo_url: String,

    /// Revision to pin; `None` tracks the remote head
    pub commit: Option<String>,

    pub shallow: bool,
    pub depth: u32,

    /// Discard any cached snapshot first
    pub force: bool,
}

impl FetchRequest {
    /// A shallow, depth-1 request for the remote head.
    #[must_use]
    pub fn new(repo_url: impl Into<String>) -> Self {
        Self {
            repo_url: repo_url.into(),
            commit: None,
            shallow: true,
            depth: 1,
            force: false,
        }
    }
}

/// A local working tree and the revision it reflects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub repo_path: PathBuf,
    pub commit: String,
    pub timestamp: DateTime<Utc>,
}

/// Produces snapshots with the `git` executable.
#[derive(Debug, Clone)]
pub struct GitFetcher {
    cache_dir: PathBuf,
}

impl GitFetcher {
    #[must_use]
    pub fn new(cache_dir: impl Into<PathBuf>) -> Self {
        Self { cache_dir: cache_dir.into() }
    }

    #[must_use]
    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Where the snapshot of `repo_url` lives.
    #[must_use]
    pub fn repo_dir(&self, repo_url: &str) -> PathBuf {
        match Url::parse(repo_url) {
            Ok(url) => {
                let host = url.host_str().filter(|h| !h.is_empty()).unwrap_or("local");
                let mut dir = self.cache_dir.join(sanitize_path_component(host));

                let segments: Vec<&str> = url.path_segments().map(|s| s.filter(|p| !p.is_empty()).collect()).unwrap_or_default();
                let last = segments.len().saturating_sub(1);
                for (i, segment) in segments.iter().enumerate() {
                    let segment = if i == last { segment.trim_end_matches(".git") } else { segment };
                    if !segment.is_empty() {
                        dir.push(sanitize_path_component(segment));
                    }
                }

                dir
            }
            Err(e) => {
                log::debug!(target: LOG_TARGET, "Could not parse repository URL '{repo_url}' ({e}), using a flat cache path");
                self.cache_dir.join(sanitize_path_component(repo_url.trim_end_matches(".git")))
            }
        }
    }

    /// Open, update or clone the requested snapshot.
    pub async fn fetch(&self, request: &FetchRequest) -> Result<Snapshot> {
        let start_time = std::time::Instant::now();
        let repo_path = self.repo_dir(&request.repo_url);
        let depth = request.shallow.then_some(request.depth.max(1));

        if request.force && repo_path.exists() {
            log::info!(target: LOG_TARGET, "Discarding cached snapshot '{}'", repo_path.display());
            fs::remove_dir_all(&repo_path)
                .into_app_err_with(|| format!("could not remove cached snapshot '{}'", repo_path.display()))?;
        }

        if repo_path.join(".git").exists() {
            log::info!(target: LOG_TARGET, "Using cached snapshot of '{}'", request.repo_url);

            if request.commit.is_none()
                && let Err(e) = git::pull(&repo_path).await
            {
                log::warn!(target: LOG_TARGET, "Could not update '{}', using the cached revision: {e}", request.repo_url);
            }
        } else {
            if repo_path.exists() {
                log::warn!(target: LOG_TARGET, "Cached path '{}' exists but is not a git repository, re-cloning", repo_path.display());
                fs::remove_dir_all(&repo_path)
                    .into_app_err_with(|| format!("could not remove corrupt cached snapshot '{}'", repo_path.display()))?;
            }

            if let Some(parent) = repo_path.parent() {
                fs::create_dir_all(parent).into_app_err_with(|| format!("could not create directory '{}'", parent.display()))?;
            }

            git::clone_repo(&repo_path, &request.repo_url, depth).await?;
        }

        if let Some(commit) = request.commit.as_deref().filter(|c| !c.is_empty()) {
            git::checkout(&repo_path, commit, depth).await?;
        }

        let commit = git::head_commit(&repo_path).await?;
        let timestamp = git::head_timestamp(&repo_path).await?;

        log::debug!(target: LOG_TARGET,
            "Prepared snapshot of '{}' at {commit} in {:.3}s",
            request.repo_url,
            start_time.elapsed().as_secs_f64()
        );

        Ok(Snapshot {
            repo_path,
            commit,
            timestamp,
        })
    }
}

/// Make `s` safe to use as a single path component.
///
/// Parent-directory sequences and characters that are special on common filesystems are replaced by `_`.
#[must_use]
pub fn sanitize_path_component(s: &str) -> String {
    s.replace("..", "__").replace(['/', '\\', ':', '*', '?', '"', '<', '>', '|', '@'], "_")
}
