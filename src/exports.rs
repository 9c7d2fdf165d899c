//! Host-registered exports for executable modules.
//!
//! Source modules found on disk are never evaluated. The host registers the
//! value each module stands for under a slash-separated module id, and the
//! builder resolves matched files against those ids by path suffix, so
//! `blog/controllers/Blog` answers for `<app>/api/blog/controllers/Blog.js`.

use crate::value::{Handler, LoadedValue};
use std::collections::BTreeMap;
use std::path::{Component, Path};

#[derive(Clone, Debug, Default)]
pub struct ExportRegistry {
    exports: BTreeMap<String, LoadedValue>,
    unbound_fallback: bool,
}

impl ExportRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry that answers unregistered modules with an unbound handler
    /// instead of failing. Intended for inspecting a tree without host code.
    pub fn with_unbound_fallback() -> Self {
        Self {
            exports: BTreeMap::new(),
            unbound_fallback: true,
        }
    }

    /// Register the export for `module_id`, replacing any previous value.
    ///
    /// Leading/trailing slashes and backslashes are normalized away.
    pub fn register(&mut self, module_id: &str, export: impl Into<LoadedValue>) -> &mut Self {
        self.exports
            .insert(normalize_module_id(module_id), export.into());
        self
    }

    pub fn len(&self) -> usize {
        self.exports.len()
    }

    pub fn is_empty(&self) -> bool {
        self.exports.is_empty()
    }

    /// Resolve the export for a module file.
    ///
    /// The longest registered id that is a component-wise suffix of the
    /// file's extension-less path wins.
    pub fn resolve(&self, path: &Path) -> Option<LoadedValue> {
        let components = module_components(path);
        let mut best: Option<(usize, &LoadedValue)> = None;
        for (id, export) in &self.exports {
            let id_parts: Vec<&str> = id.split('/').collect();
            if id_parts.len() > components.len() {
                continue;
            }
            let tail = &components[components.len() - id_parts.len()..];
            if tail.iter().zip(&id_parts).all(|(a, b)| a == b)
                && best.is_none_or(|(len, _)| id_parts.len() > len)
            {
                best = Some((id_parts.len(), export));
            }
        }

        match best {
            Some((_, export)) => Some(export.clone()),
            None if self.unbound_fallback => Some(LoadedValue::Function(Handler::unbound(
                module_components(path).join("/"),
            ))),
            None => None,
        }
    }
}

fn normalize_module_id(raw: &str) -> String {
    raw.replace('\\', "/")
        .split('/')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("/")
}

fn module_components(path: &Path) -> Vec<String> {
    let stemmed = path.with_extension("");
    stemmed
        .components()
        .filter_map(|component| match component {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect()
}
