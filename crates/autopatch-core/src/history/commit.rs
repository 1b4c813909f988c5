//! A single commit parsed from the flattened log.

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use crate::error::GraphError;

static MERGED_BRANCH_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"'(.+)'").expect("static regex is valid"));

/// A commit as it appears in the `%H (%P): %s` log format.
///
/// Everything except `tag` is fixed at parse time. The tag is attached
/// afterwards from the repository's tag list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Commit {
    /// Zero-based position in the log, oldest first.
    pub number: usize,
    pub hash: String,
    pub parent_hashes: Vec<String>,
    pub message: String,
    pub tag: Option<String>,
}

impl Commit {
    /// Build a commit directly from its parts.
    pub fn new(
        number: usize,
        hash: impl Into<String>,
        parent_hashes: Vec<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            number,
            hash: hash.into(),
            parent_hashes,
            message: message.into(),
            tag: None,
        }
    }

    /// Parse one log line of the form `hash (parent parent ...): message`.
    ///
    /// The message is everything after the first `": "`; the parent list may
    /// be empty for a root commit.
    pub fn parse(number: usize, line: &str) -> Result<Self, GraphError> {
        let malformed = || GraphError::MalformedLogLine {
            number,
            line: line.to_string(),
        };

        let (hashes, message) = match line.find(": ") {
            Some(pos) => (&line[..pos], &line[pos + 2..]),
            None => (line, ""),
        };

        let open = hashes.find(" (").ok_or_else(malformed)?;
        let close = hashes.rfind(')').filter(|&c| c > open).ok_or_else(malformed)?;

        let hash = hashes[..open].trim();
        if hash.is_empty() || hash.contains(char::is_whitespace) {
            return Err(malformed());
        }

        let parent_hashes = hashes[open + 2..close]
            .split_whitespace()
            .map(str::to_string)
            .collect();

        Ok(Self::new(number, hash, parent_hashes, message))
    }

    pub fn is_root(&self) -> bool {
        self.parent_hashes.is_empty()
    }

    pub fn is_merge(&self) -> bool {
        self.parent_hashes.len() > 1
    }

    /// Branch name quoted in a conventional `Merge branch 'name'` message.
    ///
    /// Takes the text between the first and the last single quote.
    pub fn merged_branch_name(&self) -> Option<&str> {
        MERGED_BRANCH_NAME
            .captures(&self.message)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_root_commit() {
        let commit = Commit::parse(0, "aaa (): Initial commit").unwrap();
        assert_eq!(commit.number, 0);
        assert_eq!(commit.hash, "aaa");
        assert!(commit.parent_hashes.is_empty());
        assert!(commit.is_root());
        assert!(!commit.is_merge());
        assert_eq!(commit.message, "Initial commit");
        assert!(commit.tag.is_none());
    }

    #[test]
    fn test_parse_merge_commit_keeps_parent_order() {
        let commit = Commit::parse(7, "ddd (bbb ccc): Merge branch 'feature'").unwrap();
        assert_eq!(commit.parent_hashes, vec!["bbb", "ccc"]);
        assert!(commit.is_merge());
        assert_eq!(commit.merged_branch_name(), Some("feature"));
    }

    #[test]
    fn test_message_may_contain_separator() {
        let commit = Commit::parse(1, "bbb (aaa): fix: handle a: b").unwrap();
        assert_eq!(commit.message, "fix: handle a: b");
    }

    #[test]
    fn test_empty_message() {
        let commit = Commit::parse(1, "bbb (aaa): ").unwrap();
        assert_eq!(commit.message, "");
        assert_eq!(commit.parent_hashes, vec!["aaa"]);
    }

    #[test]
    fn test_line_without_parent_list_is_malformed() {
        let err = Commit::parse(4, "just-some-text").unwrap_err();
        assert!(matches!(err, GraphError::MalformedLogLine { number: 4, .. }));
    }

    #[test]
    fn test_merged_branch_name_spans_first_to_last_quote() {
        let commit = Commit::new(
            0,
            "x",
            vec!["a".into(), "b".into()],
            "Merge branch 'release/1.0' into 'main'",
        );
        assert_eq!(commit.merged_branch_name(), Some("release/1.0' into 'main"));
    }

    #[test]
    fn test_merged_branch_name_absent() {
        let commit = Commit::new(0, "x", vec![], "Merge remote tracking branch");
        assert_eq!(commit.merged_branch_name(), None);
        let commit = Commit::new(0, "x", vec![], "it's done");
        assert_eq!(commit.merged_branch_name(), None);
    }
}
