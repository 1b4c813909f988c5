//! `git` command-line backend for both collaborator traits.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use crate::error::VcsError;
use crate::vcs::{DestinationRepository, DestinationStatus, SourceRepository, VcsResult};

/// Format of one commit log line, parsed by [`crate::history::Commit::parse`].
const LOG_FORMAT: &str = "--pretty=format:%H (%P): %s";

/// A repository driven through the `git` binary.
///
/// Arguments are passed as argv entries, never through a shell.
#[derive(Debug, Clone)]
pub struct GitCli {
    repo: PathBuf,
}

impl GitCli {
    pub fn new(repo: impl Into<PathBuf>) -> Self {
        Self { repo: repo.into() }
    }

    pub fn path(&self) -> &Path {
        &self.repo
    }

    /// Run `git args...` in the repository and return its stdout.
    async fn run(&self, args: &[&str]) -> VcsResult<String> {
        let command = format!("git {}", args.join(" "));
        debug!(repo = %self.repo.display(), command = %command, "running git");

        let output = Command::new("git")
            .args(args)
            .current_dir(&self.repo)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|source| VcsError::Spawn {
                command: command.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(VcsError::CommandFailed {
                command,
                status: output.status.code().unwrap_or(-1),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// Split a `for-each-ref` line into `(branch, hash)`.
pub(crate) fn parse_tip_line(line: &str) -> Option<(String, String)> {
    let (name, hash) = line.trim().rsplit_once(' ')?;
    if name.is_empty() || hash.is_empty() {
        return None;
    }
    Some((name.to_string(), hash.to_string()))
}

/// Extract every `(hash, tag)` pair from a `%H %D` log line.
///
/// The decoration list mixes branches and tags; only `tag: name` entries count.
pub(crate) fn parse_tag_line(line: &str) -> Vec<(String, String)> {
    let Some((hash, decorations)) = line.trim().split_once(' ') else {
        return Vec::new();
    };
    decorations
        .split(", ")
        .filter_map(|d| d.trim().strip_prefix("tag: "))
        .map(|tag| (hash.to_string(), tag.to_string()))
        .collect()
}

#[async_trait]
impl SourceRepository for GitCli {
    async fn commit_log(&self) -> VcsResult<Vec<String>> {
        let out = self
            .run(&["log", "--branches", "--date-order", "--reverse", LOG_FORMAT])
            .await?;
        Ok(out
            .lines()
            .filter(|l| !l.trim().is_empty())
            .map(str::to_string)
            .collect())
    }

    async fn branch_tips(&self) -> VcsResult<Vec<(String, String)>> {
        let out = self
            .run(&[
                "for-each-ref",
                "--format=%(refname:short) %(objectname)",
                "refs/heads",
            ])
            .await?;
        Ok(out.lines().filter_map(parse_tip_line).collect())
    }

    async fn tags(&self) -> VcsResult<Vec<(String, String)>> {
        let out = self
            .run(&["log", "--tags", "--no-walk", "--pretty=format:%H %D"])
            .await?;
        Ok(out.lines().flat_map(parse_tag_line).collect())
    }

    async fn format_patch(&self, hash: &str) -> VcsResult<String> {
        self.run(&["format-patch", "-1", "--stdout", hash]).await
    }
}

#[async_trait]
impl DestinationRepository for GitCli {
    async fn check_patch(&self, patch: &Path) -> VcsResult<()> {
        let patch = patch.to_string_lossy();
        self.run(&["apply", "--check", &patch]).await.map(drop)
    }

    async fn apply_patch(&self, patch: &Path) -> VcsResult<()> {
        let patch = patch.to_string_lossy();
        self.run(&["am", &patch]).await.map(drop)
    }

    async fn checkout(&self, branch: &str) -> VcsResult<()> {
        self.run(&["checkout", branch, "--"]).await.map(drop)
    }

    async fn create_branch(&self, branch: &str) -> VcsResult<()> {
        self.run(&["checkout", "-b", branch]).await.map(drop)
    }

    async fn merge_no_ff(&self, branch: &str, message: &str) -> VcsResult<()> {
        self.run(&["merge", "--no-ff", branch, "-m", message])
            .await
            .map(drop)
    }

    async fn delete_branch(&self, branch: &str) -> VcsResult<()> {
        self.run(&["branch", "-d", branch]).await.map(drop)
    }

    async fn tag_head(&self, name: &str) -> VcsResult<()> {
        self.run(&["tag", name]).await.map(drop)
    }

    async fn init(&self) -> VcsResult<()> {
        tokio::fs::create_dir_all(&self.repo)
            .await
            .map_err(|source| VcsError::CreateDirectory {
                path: self.repo.clone(),
                source,
            })?;
        self.run(&["init"]).await.map(drop)
    }

    async fn inspect(&self) -> VcsResult<DestinationStatus> {
        if !tokio::fs::try_exists(&self.repo).await.unwrap_or(false) {
            return Ok(DestinationStatus::missing());
        }

        // A directory nested inside some other work tree is not a repository
        // of its own.
        let is_repository = matches!(
            self.run(&["rev-parse", "--show-prefix"]).await,
            Ok(prefix) if prefix.trim().is_empty()
        );
        if !is_repository {
            return Ok(DestinationStatus {
                exists: true,
                is_repository: false,
                clean: false,
            });
        }

        let status = self.run(&["status", "--porcelain"]).await?;
        Ok(DestinationStatus {
            exists: true,
            is_repository: true,
            clean: status.trim().is_empty(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::process::Command as StdCommand;

    fn run_git(repo_dir: &Path, args: &[&str], date: &str) {
        let output = StdCommand::new("git")
            .args(args)
            .current_dir(repo_dir)
            .env("GIT_AUTHOR_DATE", date)
            .env("GIT_COMMITTER_DATE", date)
            .output()
            .unwrap();
        assert!(
            output.status.success(),
            "git {:?} failed: {}",
            args,
            String::from_utf8_lossy(&output.stderr)
        );
    }

    fn make_git_repo() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        let date = "2024-01-01T00:00:00Z";
        run_git(dir.path(), &["init"], date);
        run_git(dir.path(), &["symbolic-ref", "HEAD", "refs/heads/main"], date);
        run_git(dir.path(), &["config", "user.name", "test-user"], date);
        run_git(dir.path(), &["config", "user.email", "test@example.com"], date);
        dir
    }

    fn commit_file(repo: &Path, file: &str, message: &str, date: &str) {
        std::fs::write(repo.join(file), message).unwrap();
        run_git(repo, &["add", file], date);
        run_git(repo, &["commit", "-m", message], date);
    }

    #[test]
    fn test_parse_tip_line() {
        assert_eq!(
            parse_tip_line("feature/x 0123abcd"),
            Some(("feature/x".to_string(), "0123abcd".to_string()))
        );
        assert_eq!(parse_tip_line("lonely"), None);
    }

    #[test]
    fn test_parse_tag_line_keeps_only_tags() {
        let pairs = parse_tag_line("abc123 HEAD -> main, tag: v1.0, tag: stable, origin/main");
        assert_eq!(
            pairs,
            vec![
                ("abc123".to_string(), "v1.0".to_string()),
                ("abc123".to_string(), "stable".to_string()),
            ]
        );
        assert!(parse_tag_line("abc123 main").is_empty());
        assert!(parse_tag_line("abc123").is_empty());
    }

    #[tokio::test]
    async fn test_commit_log_is_oldest_first() {
        let repo = make_git_repo();
        commit_file(repo.path(), "a.txt", "first", "2024-01-01T00:00:01Z");
        commit_file(repo.path(), "b.txt", "second", "2024-01-01T00:00:02Z");

        let git = GitCli::new(repo.path());
        let log = git.commit_log().await.unwrap();
        assert_eq!(log.len(), 2);
        assert!(log[0].ends_with("(): first"), "got {}", log[0]);
        assert!(log[1].ends_with("): second"));

        let tips = git.branch_tips().await.unwrap();
        assert_eq!(tips.len(), 1);
        assert_eq!(tips[0].0, "main");
        assert!(log[1].starts_with(&tips[0].1));
    }

    #[tokio::test]
    async fn test_tags_lists_tagged_commits() {
        let repo = make_git_repo();
        commit_file(repo.path(), "a.txt", "first", "2024-01-01T00:00:01Z");
        run_git(repo.path(), &["tag", "v0.1"], "2024-01-01T00:00:01Z");

        let tags = GitCli::new(repo.path()).tags().await.unwrap();
        assert_eq!(tags.len(), 1);
        assert_eq!(tags[0].1, "v0.1");
    }

    #[tokio::test]
    async fn test_inspect_reports_states() {
        let parent = tempfile::tempdir().unwrap();
        let missing = GitCli::new(parent.path().join("nope"));
        assert_eq!(missing.inspect().await.unwrap(), DestinationStatus::missing());

        let plain = GitCli::new(parent.path());
        let status = plain.inspect().await.unwrap();
        assert!(status.exists);
        assert!(!status.is_repository);

        let repo = make_git_repo();
        let git = GitCli::new(repo.path());
        assert!(git.inspect().await.unwrap().clean);
        std::fs::write(repo.path().join("dirty.txt"), "x").unwrap();
        let status = git.inspect().await.unwrap();
        assert!(status.is_repository);
        assert!(!status.clean);
    }

    #[tokio::test]
    async fn test_init_creates_missing_directory() {
        let parent = tempfile::tempdir().unwrap();
        let git = GitCli::new(parent.path().join("fresh").join("repo"));
        git.init().await.unwrap();
        let status = git.inspect().await.unwrap();
        assert!(status.is_repository);
    }

    #[tokio::test]
    async fn test_failed_command_carries_stderr() {
        let repo = make_git_repo();
        let err = GitCli::new(repo.path())
            .checkout("does-not-exist")
            .await
            .unwrap_err();
        match err {
            VcsError::CommandFailed { command, stderr, .. } => {
                assert!(command.starts_with("git checkout"));
                assert!(!stderr.is_empty());
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
