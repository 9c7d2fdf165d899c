//! Conventions-based API dictionary loader.
//!
//! An application keeps one directory per API namespace under its API root,
//! each with `controllers/`, `models/`, `services/`, `policies/`, and
//! `config/` subdirectories. The crate walks those directories, loads the
//! matching files into per-namespace dictionaries, prunes what is empty, and
//! folds the rest into process-wide registries that routing and dispatch
//! read afterwards.
//!
//! Namespace listing lives here; application root discovery sits with the
//! rest of the configuration in `config`, and the loading pipeline in
//! `dictionary`, `assembler`, and `registry`.

use anyhow::{Context, Result};
use std::{fs, path::Path};

pub mod assembler;
pub mod config;
pub mod dictionary;
pub mod error;
pub mod exports;
pub mod logging;
pub mod registry;
mod schema_loader;
pub mod value;

pub use assembler::{Assembler, AssemblySummary};
pub use config::{AppConfig, PathSegments, find_app_root};
pub use dictionary::{CategoryDescriptor, DictionaryBuilder, LoadMode};
pub use error::{AssemblyError, LoadCause, LoadError};
pub use exports::ExportRegistry;
pub use registry::{ApiDictionary, Category, Registry};
pub use value::{Dictionary, Handler, LoadedValue};

/// Split a comma- or whitespace-delimited namespace list.
pub fn split_list(value: &str) -> Vec<String> {
    value
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|token| !token.is_empty())
        .map(str::to_string)
        .collect()
}

/// List API namespaces: the sorted names of the directories under `api_root`.
///
/// Hidden directories are skipped. A missing API root yields no namespaces.
pub fn list_namespaces(api_root: &Path) -> Result<Vec<String>> {
    if !api_root.is_dir() {
        return Ok(Vec::new());
    }
    let mut names = Vec::new();
    for entry in fs::read_dir(api_root)
        .with_context(|| format!("reading API root {}", api_root.display()))?
    {
        let entry = entry?;
        if !entry.path().is_dir() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.starts_with('.') {
            continue;
        }
        names.push(name);
    }
    names.sort();
    Ok(names)
}
