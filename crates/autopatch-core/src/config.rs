//! Run configuration built from flat `key=value` parameters.
//!
//! The configuration is built once at startup and passed by reference to
//! whatever needs it.

use std::path::{Path, PathBuf};

use tracing::warn;

use crate::error::ConfigError;

/// Default name of the transient patch file, placed in the temp directory.
pub const DEFAULT_PATCH_FILE: &str = "autopatch.patch";

/// A raw parameter value: `true`/`false` become flags, the rest stays text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamValue {
    Flag(bool),
    Text(String),
}

impl ParamValue {
    pub fn parse(raw: &str) -> Self {
        match raw {
            "true" => ParamValue::Flag(true),
            "false" => ParamValue::Flag(false),
            other => ParamValue::Text(other.to_string()),
        }
    }

    fn into_text(self, key: &'static str, expected: &'static str) -> Result<String, ConfigError> {
        match self {
            ParamValue::Text(text) if !text.is_empty() => Ok(text),
            ParamValue::Text(text) => Err(ConfigError::InvalidValue {
                key,
                expected,
                value: text,
            }),
            ParamValue::Flag(flag) => Err(ConfigError::InvalidValue {
                key,
                expected,
                value: flag.to_string(),
            }),
        }
    }
}

/// Which commits to replay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    /// Every commit of the named branch.
    Branch(String),
    /// One commit, or `count` commits starting at it.
    Commit { hash: String, count: Option<usize> },
    /// From one commit to another, both inclusive.
    HashRange { start: String, end: String },
}

/// Validated configuration for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatcherConfig {
    pub source: PathBuf,
    pub dest: Option<PathBuf>,
    pub selection: Option<Selection>,
    pub patch_file: PathBuf,
}

#[derive(Default)]
struct RawParams {
    source: Option<ParamValue>,
    dest: Option<ParamValue>,
    branch: Option<ParamValue>,
    commit: Option<ParamValue>,
    count: Option<ParamValue>,
    start_commit: Option<ParamValue>,
    end_commit: Option<ParamValue>,
    patch_file: Option<ParamValue>,
}

impl PatcherConfig {
    /// Build from `key=value` arguments. Arguments without `=` and unknown
    /// keys are skipped with a warning; a repeated key keeps its last value.
    pub fn from_params<I, S>(params: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut raw = RawParams::default();
        for param in params {
            let param = param.as_ref();
            let Some((key, value)) = param.split_once('=') else {
                warn!(argument = %param, "ignoring argument without '='");
                continue;
            };
            let value = ParamValue::parse(value);
            let slot = match key {
                "source" => &mut raw.source,
                "dest" => &mut raw.dest,
                "branch" => &mut raw.branch,
                "commit" => &mut raw.commit,
                "count" => &mut raw.count,
                "startCommit" => &mut raw.start_commit,
                "endCommit" => &mut raw.end_commit,
                "patchFile" => &mut raw.patch_file,
                _ => {
                    warn!(key = %key, "ignoring unknown parameter");
                    continue;
                }
            };
            *slot = Some(value);
        }

        let source = raw
            .source
            .ok_or(ConfigError::MissingParameter("source"))?
            .into_text("source", "a path")?;
        let dest = raw
            .dest
            .map(|v| v.into_text("dest", "a path"))
            .transpose()?;
        let patch_file = match raw.patch_file {
            Some(value) => {
                let path = PathBuf::from(value.into_text("patchFile", "a path")?);
                std::path::absolute(&path).unwrap_or(path)
            }
            None => std::env::temp_dir().join(DEFAULT_PATCH_FILE),
        };
        let selection = Self::selection(
            raw.branch,
            raw.commit,
            raw.count,
            raw.start_commit,
            raw.end_commit,
        )?;

        Ok(Self {
            source: PathBuf::from(source),
            dest: dest.map(PathBuf::from),
            selection,
            patch_file,
        })
    }

    fn selection(
        branch: Option<ParamValue>,
        commit: Option<ParamValue>,
        count: Option<ParamValue>,
        start: Option<ParamValue>,
        end: Option<ParamValue>,
    ) -> Result<Option<Selection>, ConfigError> {
        let mut modes = Vec::new();
        if branch.is_some() {
            modes.push("branch");
        }
        if commit.is_some() {
            modes.push("commit");
        }
        if start.is_some() || end.is_some() {
            modes.push("startCommit/endCommit");
        }
        if modes.len() > 1 {
            return Err(ConfigError::ConflictingSelection(modes.join(", ")));
        }

        if count.is_some() && commit.is_none() {
            return Err(ConfigError::MissingParameter("commit"));
        }

        if let Some(branch) = branch {
            return Ok(Some(Selection::Branch(
                branch.into_text("branch", "a branch name")?,
            )));
        }

        if let Some(commit) = commit {
            let hash = commit.into_text("commit", "a commit hash")?;
            let count = count.map(parse_count).transpose()?;
            return Ok(Some(Selection::Commit { hash, count }));
        }

        match (start, end) {
            (None, None) => Ok(None),
            (Some(_), None) => Err(ConfigError::MissingParameter("endCommit")),
            (None, Some(_)) => Err(ConfigError::MissingParameter("startCommit")),
            (Some(start), Some(end)) => Ok(Some(Selection::HashRange {
                start: start.into_text("startCommit", "a commit hash")?,
                end: end.into_text("endCommit", "a commit hash")?,
            })),
        }
    }

    /// Destination path; required once a replay is actually requested.
    pub fn require_dest(&self) -> Result<&Path, ConfigError> {
        self.dest
            .as_deref()
            .ok_or(ConfigError::MissingParameter("dest"))
    }
}

fn parse_count(value: ParamValue) -> Result<usize, ConfigError> {
    let text = value.into_text("count", "a positive integer")?;
    match text.parse::<usize>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(ConfigError::InvalidValue {
            key: "count",
            expected: "a positive integer",
            value: text,
        }),
    }
}
