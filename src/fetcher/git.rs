use super::LOG_TARGET;
use crate::Result;
use chrono::{DateTime, Utc};
use ohno::{IntoAppError, bail};
use std::path::Path;
use std::process::{Output, Stdio};
use tokio::process::Command;

pub(super) async fn clone_repo(repo_path: &Path, repo_url: &str, depth: Option<u32>) -> Result<()> {
    let path_str = path_str(repo_path)?;
    log::info!(target: LOG_TARGET, "Cloning '{repo_url}'");

    let depth_str = depth.map(|d| d.to_string());
    let mut args = vec!["clone", "--single-branch", "--no-tags"];
    if let Some(depth) = &depth_str {
        args.extend(["--depth", depth.as_str()]);
    }
    args.extend([repo_url, path_str]);

    let output = run_git(&args).await?;
    check_git_output(&output, "git clone")
}

/// Fast-forward the working tree to the remote head.
pub(super) async fn pull(repo_path: &Path) -> Result<()> {
    let path_str = path_str(repo_path)?;
    let output = run_git(&["-C", path_str, "pull", "--ff-only", "--no-tags"]).await?;
    check_git_output(&output, "git pull")
}

/// Check out `commit`, fetching it first when a shallow history does not contain it.
pub(super) async fn checkout(repo_path: &Path, commit: &str, depth: Option<u32>) -> Result<()> {
    let path_str = path_str(repo_path)?;

    let output = run_git(&["-C", path_str, "checkout", "--quiet", commit]).await?;
    if output.status.success() {
        return Ok(());
    }

    log::debug!(target: LOG_TARGET, "Commit '{commit}' not present locally, fetching it");

    let depth_str = depth.unwrap_or(1).to_string();
    let output = run_git(&["-C", path_str, "fetch", "--quiet", "--depth", &depth_str, "origin", commit]).await?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        bail!("commit '{commit}' could not be fetched: {}", stderr.trim());
    }

    let output = run_git(&["-C", path_str, "checkout", "--quiet", commit]).await?;
    check_git_output(&output, "git checkout")
}

/// The commit id of `HEAD`.
pub(super) async fn head_commit(repo_path: &Path) -> Result<String> {
    let path_str = path_str(repo_path)?;
    let output = run_git(&["-C", path_str, "rev-parse", "HEAD"]).await?;
    check_git_output(&output, "git rev-parse")?;

    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

/// The committer timestamp of `HEAD`.
pub(super) async fn head_timestamp(repo_path: &Path) -> Result<DateTime<Utc>> {
    let path_str = path_str(repo_path)?;
    let output = run_git(&["-C", path_str, "log", "-1", "--format=%cI"]).await?;
    check_git_output(&output, "git log")?;

    parse_timestamp(&String::from_utf8_lossy(&output.stdout))
}

fn parse_timestamp(text: &str) -> Result<DateTime<Utc>> {
    let text = text.trim();
    DateTime::parse_from_rfc3339(text)
        .map(|t| t.with_timezone(&Utc))
        .into_app_err_with(|| format!("could not parse commit timestamp '{text}'"))
}

fn path_str(repo_path: &Path) -> Result<&str> {
    repo_path.to_str().into_app_err("invalid UTF-8 in repository path")
}

fn check_git_output(output: &Output, operation: &str) -> Result<()> {
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        bail!("{operation} failed: {}", stderr.trim());
    }
    Ok(())
}

/// Run git to completion. Dropping the returned future kills the child process.
async fn run_git(args: &[&str]) -> Result<Output> {
    let child = Command::new("git")
        .args(args)
        .env("GIT_TERMINAL_PROMPT", "0")
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .into_app_err("could not spawn git command")?;

    child
        .wait_with_output()
        .await
        .into_app_err_with(|| format!("'git {}' failed to run", args.join(" ")))
}
