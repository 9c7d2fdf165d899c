use crate::dictionary::descriptor::{CategoryDescriptor, LoadMode};
use crate::error::{LoadCause, LoadError};
use crate::exports::ExportRegistry;
use crate::value::{Dictionary, LoadedValue, merge_dictionary};
use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

// Keys nest directories with this separator: `admin/Users.js` -> `admin.users`.
const KEY_SEPARATOR: &str = ".";

/// Loads category directories into dictionaries.
///
/// Data files (matching `data_extension`) are parsed as JSON; every other
/// match is an executable module resolved through the export registry.
pub struct DictionaryBuilder<'a> {
    exports: &'a ExportRegistry,
    data_extension: String,
}

impl<'a> DictionaryBuilder<'a> {
    pub fn new(exports: &'a ExportRegistry, data_extension: impl Into<String>) -> Self {
        Self {
            exports,
            data_extension: data_extension.into(),
        }
    }

    /// Walk `descriptor.root()` and load every matching file.
    ///
    /// Optional loads key each file by its entry key. Aggregate loads merge
    /// the contents of every file into one object instead; files in
    /// subdirectories land under their directory names.
    ///
    /// Fails on the first file that cannot be loaded; no partial dictionary
    /// is returned.
    pub fn load(&self, descriptor: &CategoryDescriptor) -> Result<Dictionary, LoadError> {
        let root = absolute_root(descriptor.root());
        if !root.is_dir() {
            if descriptor.is_required() {
                return Err(LoadError::DirectoryNotFound { path: root });
            }
            debug!(root = %root.display(), "directory missing; nothing to load");
            return Ok(Dictionary::new());
        }

        let mut dictionary = Dictionary::new();
        let mut origins: BTreeMap<String, PathBuf> = BTreeMap::new();

        let walker = WalkDir::new(&root)
            .follow_links(true)
            .min_depth(1)
            .max_depth(descriptor.max_depth() + 1)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| {
                !(entry.file_type().is_dir()
                    && descriptor.is_excluded_dir(&entry.file_name().to_string_lossy()))
            });

        for entry in walker {
            let entry = entry.map_err(|err| {
                let path = err.path().map(Path::to_path_buf).unwrap_or_else(|| root.clone());
                LoadError::load_failure(path, err)
            })?;
            if !entry.file_type().is_file() {
                continue;
            }

            let path = entry.path();
            let basename = entry.file_name().to_string_lossy();
            let Some(stem) = descriptor.match_stem(&basename) else {
                continue;
            };
            let dirs = relative_dirs(&root, path);

            match descriptor.mode() {
                LoadMode::Optional => {
                    let key = entry_key(dirs, &stem);
                    if let Some(first) = origins.get(&key) {
                        return Err(LoadError::MergeConflict {
                            key,
                            first: first.clone(),
                            second: path.to_path_buf(),
                        });
                    }
                    let value = self.load_file(path)?;
                    debug!(key = %key, path = %path.display(), "loaded entry");
                    origins.insert(key.clone(), path.to_path_buf());
                    dictionary.insert(key, value);
                }
                LoadMode::Aggregate => {
                    let value = self.load_file(path)?;
                    debug!(path = %path.display(), "merging file contents");
                    fold_contents(&mut dictionary, dirs, value, path);
                }
            }
        }

        debug!(
            root = %root.display(),
            entries = dictionary.len(),
            "directory dictionary built"
        );
        Ok(dictionary)
    }

    fn load_file(&self, path: &Path) -> Result<LoadedValue, LoadError> {
        if self.is_data_file(path) {
            let contents =
                fs::read_to_string(path).map_err(|err| LoadError::load_failure(path, err))?;
            let value = serde_json::from_str(&contents)
                .map_err(|err| LoadError::load_failure(path, err))?;
            return Ok(LoadedValue::Data(value));
        }

        self.exports.resolve(path).ok_or_else(|| {
            let module = path.with_extension("").display().to_string();
            LoadError::load_failure(path, LoadCause::MissingExport(module))
        })
    }

    fn is_data_file(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case(&self.data_extension))
    }
}

fn absolute_root(root: &Path) -> PathBuf {
    if let Ok(canonical) = fs::canonicalize(root) {
        return canonical;
    }
    if root.is_absolute() {
        return root.to_path_buf();
    }
    env::current_dir()
        .map(|cwd| cwd.join(root))
        .unwrap_or_else(|_| root.to_path_buf())
}

/// Directory components between `root` and the file, lower-cased.
fn relative_dirs(root: &Path, path: &Path) -> Vec<String> {
    path.parent()
        .and_then(|parent| parent.strip_prefix(root).ok())
        .map(|relative| {
            relative
                .components()
                .map(|component| component.as_os_str().to_string_lossy().to_lowercase())
                .collect()
        })
        .unwrap_or_default()
}

/// Relative directory components plus the filtered stem, joined and
/// lower-cased.
fn entry_key(mut dirs: Vec<String>, stem: &str) -> String {
    dirs.push(stem.to_lowercase());
    dirs.join(KEY_SEPARATOR)
}

// Only object contents can be merged; anything else is skipped.
fn fold_contents(target: &mut Dictionary, dirs: Vec<String>, value: LoadedValue, path: &Path) {
    let members = match value.into_members() {
        Ok(members) => members,
        Err(other) => {
            warn!(
                path = %path.display(),
                value = %other.describe(),
                "skipping non-object file in aggregate load"
            );
            return;
        }
    };
    let nested = dirs.into_iter().rev().fold(members, |inner, dir| {
        let mut outer = Dictionary::new();
        outer.insert(dir, LoadedValue::Object(inner));
        outer
    });
    merge_dictionary(target, nested);
}
