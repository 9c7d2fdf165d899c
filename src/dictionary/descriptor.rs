use crate::error::LoadError;
use regex::Regex;
use std::path::{Path, PathBuf};

// Source-control directories are never part of an API tree.
const ALWAYS_EXCLUDED_DIRS: &[&str] = &[".git", ".svn"];

/// How matched files combine into the result.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum LoadMode {
    /// One entry per file, keyed by its entry key. A missing root yields an
    /// empty dictionary.
    Optional,
    /// The contents of every file deep-merged into one object, in walk order.
    /// A missing root is a `DirectoryNotFound` error unless `allow_missing`
    /// was set.
    Aggregate,
}

/// One category load: where to look, which files count, and how deep.
#[derive(Clone, Debug)]
pub struct CategoryDescriptor {
    root: PathBuf,
    filter: Regex,
    max_depth: usize,
    mode: LoadMode,
    required: bool,
    exclude_dirs: Vec<String>,
}

impl CategoryDescriptor {
    pub fn new(root: impl Into<PathBuf>, filter: Regex, max_depth: usize, mode: LoadMode) -> Self {
        Self {
            root: root.into(),
            filter,
            max_depth,
            mode,
            required: mode == LoadMode::Aggregate,
            exclude_dirs: ALWAYS_EXCLUDED_DIRS.iter().map(|s| s.to_string()).collect(),
        }
    }

    pub fn optional(root: impl Into<PathBuf>, filter: Regex, max_depth: usize) -> Self {
        Self::new(root, filter, max_depth, LoadMode::Optional)
    }

    pub fn aggregate(root: impl Into<PathBuf>, filter: Regex, max_depth: usize) -> Self {
        Self::new(root, filter, max_depth, LoadMode::Aggregate)
    }

    /// Skip any directory with this name while walking.
    pub fn excluding(mut self, dir_name: impl Into<String>) -> Self {
        self.exclude_dirs.push(dir_name.into());
        self
    }

    /// Treat a missing root as empty even in aggregate mode.
    pub fn allow_missing(mut self) -> Self {
        self.required = false;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn filter(&self) -> &Regex {
        &self.filter
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    pub fn mode(&self) -> LoadMode {
        self.mode
    }

    pub fn is_required(&self) -> bool {
        self.required
    }

    pub fn is_excluded_dir(&self, name: &str) -> bool {
        self.exclude_dirs.iter().any(|dir| dir == name)
    }

    /// Stem of `basename` when it passes the filter.
    ///
    /// The first capture group is the stem; without one, the basename minus
    /// its last extension is used.
    pub fn match_stem(&self, basename: &str) -> Option<String> {
        let captures = self.filter.captures(basename)?;
        if let Some(group) = captures.get(1) {
            return Some(group.as_str().to_string());
        }
        let stem = basename
            .rsplit_once('.')
            .map(|(stem, _)| stem)
            .unwrap_or(basename);
        Some(stem.to_string())
    }
}

/// Filter matching `<stem>.<suffix>` for any of `suffixes`, capturing the stem.
pub fn extension_filter(suffixes: &[&str]) -> Result<Regex, LoadError> {
    let alternatives = suffixes
        .iter()
        .map(|suffix| regex::escape(suffix))
        .collect::<Vec<_>>()
        .join("|");
    let pattern = format!(r"^(.+)\.(?:{alternatives})$");
    Regex::new(&pattern).map_err(|source| LoadError::InvalidFilter { pattern, source })
}
