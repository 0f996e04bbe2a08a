use crate::error::{Error, Result};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use tokio::process::Command;
use tracing::debug;

/// Which diff the change pack is generated from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum DiffMode {
    /// Staged changes if any exist, otherwise everything against HEAD
    #[default]
    Auto,
    Staged,
    Head,
    Worktree,
}

impl fmt::Display for DiffMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            DiffMode::Auto => "auto",
            DiffMode::Staged => "staged",
            DiffMode::Head => "head",
            DiffMode::Worktree => "worktree",
        };
        f.write_str(label)
    }
}

/// Thin wrapper around `git diff` for one repository.
#[derive(Debug, Clone)]
pub struct GitClient {
    repo_path: PathBuf,
}

impl GitClient {
    pub fn new(repo_path: impl Into<PathBuf>) -> Self {
        Self {
            repo_path: repo_path.into(),
        }
    }

    pub async fn is_git_repo(&self) -> bool {
        self.run(&["rev-parse", "--is-inside-work-tree"]).await.is_ok()
    }

    /// Changed paths in git's output order, blank lines dropped.
    pub async fn changed_files(&self, mode: DiffMode) -> Result<Vec<String>> {
        let mode = self.resolve(mode).await?;
        let mut args = vec!["diff", "--name-only"];
        args.extend(mode_args(mode));

        let out = self.run(&args).await?;
        Ok(out
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect())
    }

    pub async fn diff_text(&self, mode: DiffMode) -> Result<String> {
        let mode = self.resolve(mode).await?;
        let mut args = vec!["diff"];
        args.extend(mode_args(mode));
        self.run(&args).await
    }

    /// `Auto` becomes `Staged` when anything is staged, else `Head`.
    async fn resolve(&self, mode: DiffMode) -> Result<DiffMode> {
        if mode != DiffMode::Auto {
            return Ok(mode);
        }
        let staged = self.run(&["diff", "--name-only", "--staged"]).await?;
        let resolved = if staged.trim().is_empty() {
            DiffMode::Head
        } else {
            DiffMode::Staged
        };
        debug!(resolved = %resolved, "Resolved auto diff mode");
        Ok(resolved)
    }

    async fn run(&self, args: &[&str]) -> Result<String> {
        let output = Command::new("git")
            .args(args)
            .current_dir(&self.repo_path)
            .output()
            .await
            .map_err(|e| Error::Git(format!("Failed to run git {}: {}", args.join(" "), e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::Git(format!(
                "git {} failed: {}",
                args.join(" "),
                stderr.trim()
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

fn mode_args(mode: DiffMode) -> &'static [&'static str] {
    match mode {
        DiffMode::Staged => &["--staged"],
        DiffMode::Head => &["HEAD"],
        DiffMode::Worktree | DiffMode::Auto => &[],
    }
}
