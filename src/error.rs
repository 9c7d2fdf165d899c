//! Error types surfaced by the dictionary builder and the assembler.
//!
//! Builder failures are typed so callers can tell a missing required
//! directory apart from a file that would not load. The assembler wraps them
//! per namespace and reports every failed namespace at once.

use std::fmt;
use std::path::PathBuf;

/// Failure of a single directory dictionary load.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    /// A required directory does not exist.
    #[error("directory not found: {}", path.display())]
    DirectoryNotFound { path: PathBuf },

    /// A matched file could not be read, parsed, or resolved to an export.
    #[error("failed to load {}: {cause}", path.display())]
    LoadFailure {
        path: PathBuf,
        #[source]
        cause: LoadCause,
    },

    /// Two files in one keyed (optional) load derived the same entry key.
    #[error(
        "entry key '{key}' derived from both {} and {}",
        first.display(),
        second.display()
    )]
    MergeConflict {
        key: String,
        first: PathBuf,
        second: PathBuf,
    },

    /// The filename filter did not compile.
    #[error("invalid filename filter '{pattern}'")]
    InvalidFilter {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

/// Underlying reason a matched file failed to load.
#[derive(Debug, thiserror::Error)]
pub enum LoadCause {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Parse(#[from] serde_json::Error),

    #[error(transparent)]
    Walk(#[from] walkdir::Error),

    #[error("no export registered for module '{0}'")]
    MissingExport(String),
}

impl LoadError {
    pub(crate) fn load_failure(path: impl Into<PathBuf>, cause: impl Into<LoadCause>) -> Self {
        LoadError::LoadFailure {
            path: path.into(),
            cause: cause.into(),
        }
    }
}

/// Every namespace that failed during one assembly run, in namespace order.
#[derive(Debug)]
pub struct AssemblyError {
    pub failures: Vec<(String, LoadError)>,
}

impl AssemblyError {
    /// The failure of the first namespace (in lexicographic order) that failed.
    pub fn first(&self) -> Option<&(String, LoadError)> {
        self.failures.first()
    }

    /// Names of the namespaces that failed.
    pub fn namespaces(&self) -> impl Iterator<Item = &str> {
        self.failures.iter().map(|(name, _)| name.as_str())
    }
}

impl fmt::Display for AssemblyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} API namespace(s) failed to assemble",
            self.failures.len()
        )?;
        for (namespace, err) in &self.failures {
            write!(f, "\n  {namespace}: {err}")?;
        }
        Ok(())
    }
}

impl std::error::Error for AssemblyError {}
