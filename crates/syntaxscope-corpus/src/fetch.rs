//! Local checkout of the tldr-pages repository.

use crate::CorpusError;
use std::path::Path;
use std::process::Command;

pub const TLDR_REPO_URL: &str = "https://github.com/tldr-pages/tldr.git";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    Cloned,
    Updated,
    /// The update failed; an earlier checkout is used as-is.
    Stale,
}

/// Clone `url` into `dir`, or pull `origin main` when `dir` already exists.
pub fn fetch_corpus(url: &str, dir: &Path) -> Result<FetchOutcome, CorpusError> {
    if dir.exists() {
        tracing::info!(dir = %dir.display(), "updating existing corpus checkout");
        let mut cmd = Command::new("git");
        cmd.arg("-C").arg(dir).args(["pull", "origin", "main"]);
        run_git(cmd, "pull")?;
        return Ok(FetchOutcome::Updated);
    }

    if let Some(parent) = dir.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|source| CorpusError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }

    tracing::info!(url, dir = %dir.display(), "cloning corpus");
    let mut cmd = Command::new("git");
    cmd.args(["clone", "--depth=1", url]).arg(dir);
    run_git(cmd, "clone")?;
    Ok(FetchOutcome::Cloned)
}

/// Like [`fetch_corpus`], but a failed update of an existing checkout falls
/// back to that checkout. A failed initial clone is still an error.
pub fn ensure_corpus(url: &str, dir: &Path) -> Result<FetchOutcome, CorpusError> {
    let existed = dir.join("pages").is_dir();
    match fetch_corpus(url, dir) {
        Ok(outcome) => Ok(outcome),
        Err(err) if existed => {
            tracing::warn!(error = %err, dir = %dir.display(), "corpus update failed, using existing checkout");
            Ok(FetchOutcome::Stale)
        }
        Err(err) => Err(err),
    }
}

fn run_git(mut cmd: Command, action: &'static str) -> Result<(), CorpusError> {
    let out = cmd
        .output()
        .map_err(|source| CorpusError::GitSpawn { action, source })?;
    if !out.status.success() {
        return Err(CorpusError::Git {
            action,
            stderr: String::from_utf8_lossy(&out.stderr).trim().to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failed_update_of_existing_checkout_is_stale_not_fatal() {
        // A directory with `pages/` but no git metadata: `git pull` fails (or
        // git is missing), and the checkout is reused either way.
        let dir = tempfile::tempdir().unwrap();
        let repo = dir.path().join("repo");
        std::fs::create_dir_all(repo.join("pages/common")).unwrap();

        let outcome = ensure_corpus("file:///nonexistent/tldr.git", &repo).unwrap();
        assert_eq!(outcome, FetchOutcome::Stale);
    }

    #[test]
    fn failed_initial_clone_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let repo = dir.path().join("fresh");
        assert!(ensure_corpus("file:///nonexistent/tldr.git", &repo).is_err());
    }
}
