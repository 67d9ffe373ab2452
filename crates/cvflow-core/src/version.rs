//! git の状態からビルドバージョンを導出
//!
//! バージョン文字列は `{branch}-{YYYY-MM-DD}-{short_hash}` 形式です。
//! ブランチ名は CI が提供する環境変数を優先し、無ければチェックアウト中のブランチを使います。

use crate::error::{CoreError, Result};
use chrono::{DateTime, FixedOffset, NaiveDate};
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Command;

const SHORT_HASH_LEN: usize = 7;

/// ビルドバージョン
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Version {
    pub branch: String,
    pub commit_date: NaiveDate,
    pub commit_hash: String,
}

impl Version {
    pub fn new(
        branch: impl Into<String>,
        commit_date: NaiveDate,
        commit_hash: impl Into<String>,
    ) -> Self {
        Self {
            branch: branch.into(),
            commit_date,
            commit_hash: commit_hash.into(),
        }
    }

    pub fn short_hash(&self) -> &str {
        let end = self
            .commit_hash
            .char_indices()
            .nth(SHORT_HASH_LEN)
            .map_or(self.commit_hash.len(), |(idx, _)| idx);
        &self.commit_hash[..end]
    }

    /// Dockerタグとして使える形式
    ///
    /// `feature/foo` のようなブランチ名はタグに使えない文字を `-` に置き換えます。
    pub fn tag(&self) -> String {
        self.to_string()
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-') {
                    c
                } else {
                    '-'
                }
            })
            .collect()
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}-{}-{}",
            self.branch,
            self.commit_date.format("%Y-%m-%d"),
            self.short_hash()
        )
    }
}

/// HEAD コミットの情報
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeadCommit {
    pub hash: String,
    pub authored_at: DateTime<FixedOffset>,
}

/// `git` コマンド経由のリポジトリアクセス
#[derive(Debug, Clone)]
pub struct GitRepo {
    root: PathBuf,
}

impl GitRepo {
    pub fn open(root: &Path) -> Result<Self> {
        let repo = Self {
            root: root.to_path_buf(),
        };
        let inside = repo.git(&["rev-parse", "--is-inside-work-tree"])?;
        if inside != "true" {
            return Err(CoreError::Git(format!(
                "{} は git の作業ツリーではありません",
                root.display()
            )));
        }
        Ok(repo)
    }

    fn git(&self, args: &[&str]) -> Result<String> {
        tracing::debug!("git {}", args.join(" "));
        let output = Command::new("git")
            .args(args)
            .current_dir(&self.root)
            .output()
            .map_err(|e| CoreError::Git(format!("failed to run git: {e}")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(CoreError::Git(format!(
                "git {} failed: {}",
                args.join(" "),
                stderr.trim()
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    /// チェックアウト中のブランチ名。detached HEAD の場合は `None`
    pub fn current_branch(&self) -> Result<Option<String>> {
        let name = self.git(&["rev-parse", "--abbrev-ref", "HEAD"])?;
        if name.is_empty() || name == "HEAD" {
            Ok(None)
        } else {
            Ok(Some(name))
        }
    }

    pub fn head_commit(&self) -> Result<HeadCommit> {
        let output = self.git(&["log", "-1", "--format=%H%n%aI"])?;
        let mut lines = output.lines();
        let hash = lines
            .next()
            .filter(|hash| !hash.is_empty())
            .ok_or_else(|| CoreError::Git("git log returned empty output".to_string()))?
            .to_string();
        let raw_date = lines.next().unwrap_or_default();
        let authored_at = DateTime::parse_from_rfc3339(raw_date)
            .map_err(|e| CoreError::InvalidCommitDate(format!("{raw_date}: {e}")))?;

        Ok(HeadCommit { hash, authored_at })
    }
}

/// ブランチ名を決定する
///
/// 空でない上書き値があればそれを、無ければチェックアウト中のブランチを使います。
pub fn select_branch(
    override_branch: Option<String>,
    checked_out: Option<String>,
    env_var: &str,
) -> Result<String> {
    override_branch
        .filter(|branch| !branch.trim().is_empty())
        .or(checked_out)
        .ok_or_else(|| CoreError::DetachedHead {
            env_var: env_var.to_string(),
        })
}

/// リポジトリと環境変数からバージョンを解決
#[derive(Debug, Clone)]
pub struct VersionResolver {
    repo: GitRepo,
    branch_env_var: String,
}

impl VersionResolver {
    pub fn new(repo: GitRepo, branch_env_var: impl Into<String>) -> Self {
        Self {
            repo,
            branch_env_var: branch_env_var.into(),
        }
    }

    pub fn current_branch(&self) -> Result<String> {
        let override_branch = std::env::var(&self.branch_env_var).ok();
        if let Some(branch) = &override_branch {
            tracing::debug!("Branch override from {}: {}", self.branch_env_var, branch);
        }
        let checked_out = match override_branch.as_deref() {
            Some(branch) if !branch.trim().is_empty() => None,
            _ => self.repo.current_branch()?,
        };
        select_branch(override_branch, checked_out, &self.branch_env_var)
    }

    pub fn resolve(&self) -> Result<Version> {
        let branch = self.current_branch()?;
        let head = self.repo.head_commit()?;
        let version = Version::new(branch, head.authored_at.date_naive(), head.hash);
        tracing::debug!("Resolved version: {}", version);
        Ok(version)
    }
}
