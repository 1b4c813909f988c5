//! Replays a real repository onto a fresh one through the `git` binary.

use std::path::Path;
use std::process::Command;

use autopatch_core::{gather_history, plan, replay, CommitRange, GitCli, ReplayTask};

fn git(repo: &Path, args: &[&str], second: u32) -> String {
    let date = format!("2024-01-01T00:00:{second:02}Z");
    let output = Command::new("git")
        .args(args)
        .current_dir(repo)
        .env("GIT_AUTHOR_DATE", &date)
        .env("GIT_COMMITTER_DATE", &date)
        .output()
        .unwrap();
    assert!(
        output.status.success(),
        "git {:?} failed: {}",
        args,
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn init_repo(repo: &Path) {
    git(repo, &["init"], 0);
    git(repo, &["symbolic-ref", "HEAD", "refs/heads/main"], 0);
    git(repo, &["config", "user.name", "test-user"], 0);
    git(repo, &["config", "user.email", "test@example.com"], 0);
}

fn commit_file(repo: &Path, file: &str, message: &str, second: u32) {
    std::fs::write(repo.join(file), format!("{message}\n")).unwrap();
    git(repo, &["add", file], second);
    git(repo, &["commit", "-m", message], second);
}

/// main: A - B - D (merge), feature: A - C, with strictly increasing dates.
fn feature_repo() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    let repo = dir.path();
    init_repo(repo);
    commit_file(repo, "a.txt", "add a", 1);
    commit_file(repo, "b.txt", "add b", 2);
    git(repo, &["checkout", "-b", "feature", "HEAD~1"], 3);
    commit_file(repo, "c.txt", "add c", 3);
    git(repo, &["checkout", "main"], 4);
    git(
        repo,
        &["merge", "--no-ff", "feature", "-m", "Merge branch 'feature'"],
        4,
    );
    git(repo, &["tag", "v1.0", "HEAD~1"], 4);
    dir
}

/// feature: A - C is committed before main moves on to B, then merged.
fn early_feature_repo() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    let repo = dir.path();
    init_repo(repo);
    commit_file(repo, "a.txt", "add a", 1);
    git(repo, &["checkout", "-b", "feature"], 2);
    commit_file(repo, "c.txt", "add c", 2);
    git(repo, &["checkout", "main"], 3);
    commit_file(repo, "b.txt", "add b", 3);
    git(
        repo,
        &["merge", "--no-ff", "feature", "-m", "Merge branch 'feature'"],
        4,
    );
    dir
}

async fn replay_into_fresh_repository(
    source: &GitCli,
    tasks: &[ReplayTask],
    commits: usize,
) -> tempfile::TempDir {
    let dest_dir = tempfile::tempdir().unwrap();
    let dest_path = dest_dir.path().join("replayed");
    std::fs::create_dir(&dest_path).unwrap();
    init_repo(&dest_path);
    let dest = GitCli::new(&dest_path);

    let range = CommitRange::new(0, commits - 1).unwrap();
    let patch_file = dest_dir.path().join("staged.patch");
    let summary = replay(source, &dest, &dest_path, tasks, range, &patch_file)
        .await
        .unwrap();
    assert_eq!(summary.tasks_run, tasks.len());
    assert!(!patch_file.exists());
    dest_dir
}

#[tokio::test]
async fn reconstructs_feature_merge_from_git() {
    let repo = feature_repo();
    let graph = gather_history(&GitCli::new(repo.path())).await.unwrap();

    assert_eq!(graph.commit_count(), 4);
    assert_eq!(graph.branch_names(), vec!["main", "feature"]);
    let summary = graph.summary();
    assert_eq!(
        summary[0].commits,
        vec!["add a", "add b -> v1.0", "Merge branch 'feature'"]
    );
    assert_eq!(summary[1].commits, vec!["add c"]);
    assert!(summary[1].closed);
}

#[tokio::test]
async fn replays_feature_merge_into_fresh_repository() {
    let repo = feature_repo();
    let source = GitCli::new(repo.path());
    let graph = gather_history(&source).await.unwrap();
    let range = CommitRange::new(0, graph.commit_count() - 1).unwrap();
    let tasks = plan(&graph, range).unwrap();
    assert!(tasks
        .iter()
        .any(|t| matches!(t, ReplayTask::Merge { source, .. } if source == "feature")));

    let dest_dir = replay_into_fresh_repository(&source, &tasks, graph.commit_count()).await;
    let dest_path = dest_dir.path().join("replayed");

    let subjects = git(&dest_path, &["log", "--topo-order", "--format=%s", "main"], 9);
    let subjects: Vec<&str> = subjects.lines().collect();
    assert_eq!(
        subjects,
        vec!["Merge branch 'feature'", "add c", "add b", "add a"]
    );

    let branches = git(&dest_path, &["branch", "--format=%(refname:short)"], 9);
    assert_eq!(branches.trim(), "main");

    let tags = git(&dest_path, &["tag", "--list"], 9);
    assert_eq!(tags.trim(), "v1.0");

    for file in ["a.txt", "b.txt", "c.txt"] {
        assert!(dest_path.join(file).exists(), "{file} missing");
    }
}

#[tokio::test]
async fn replays_feature_committed_before_trunk_work() {
    let repo = early_feature_repo();
    let source = GitCli::new(repo.path());
    let graph = gather_history(&source).await.unwrap();

    assert_eq!(graph.branch_names(), vec!["main", "feature"]);
    let summary = graph.summary();
    assert_eq!(
        summary[0].commits,
        vec!["add a", "add b", "Merge branch 'feature'"]
    );
    assert_eq!(summary[1].commits, vec!["add c"]);
    assert_eq!(summary[1].source.as_deref(), Some("main"));
    assert!(summary[1].closed);

    let range = CommitRange::new(0, graph.commit_count() - 1).unwrap();
    let tasks = plan(&graph, range).unwrap();
    let dest_dir = replay_into_fresh_repository(&source, &tasks, graph.commit_count()).await;
    let dest_path = dest_dir.path().join("replayed");

    // The merge is replayed as soon as the feature is done, before B.
    let subjects = git(&dest_path, &["log", "--topo-order", "--format=%s", "main"], 9);
    let subjects: Vec<&str> = subjects.lines().collect();
    assert_eq!(
        subjects,
        vec!["add b", "Merge branch 'feature'", "add c", "add a"]
    );

    let branches = git(&dest_path, &["branch", "--format=%(refname:short)"], 9);
    assert_eq!(branches.trim(), "main");
    for file in ["a.txt", "b.txt", "c.txt"] {
        assert!(dest_path.join(file).exists(), "{file} missing");
    }
}
