//! Values stored in API dictionaries.
//!
//! A loaded file yields either structured data parsed from disk or the
//! export the host registered for an executable module. Both travel as a
//! `LoadedValue`; the builder never interprets the shape.

use anyhow::{Result, bail};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Keyed collection produced by one category load.
pub type Dictionary = BTreeMap<String, LoadedValue>;

type HandlerFn = dyn Fn(&Value) -> Result<Value> + Send + Sync;

/// Named callable exported by an executable module.
///
/// Cloning shares the underlying function; equality is identity of that
/// shared function, not of the name.
#[derive(Clone)]
pub struct Handler {
    name: String,
    func: Arc<HandlerFn>,
}

impl Handler {
    pub fn new<F>(name: impl Into<String>, func: F) -> Self
    where
        F: Fn(&Value) -> Result<Value> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            func: Arc::new(func),
        }
    }

    /// Placeholder for a module nobody registered code for; calling it fails.
    pub fn unbound(module_id: impl Into<String>) -> Self {
        let name = module_id.into();
        let reported = name.clone();
        Self::new(name, move |_| bail!("module '{reported}' has no bound export"))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn call(&self, input: &Value) -> Result<Value> {
        (self.func)(input)
    }
}

impl PartialEq for Handler {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.func, &other.func)
    }
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[Function: {}]", self.name)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum LoadedValue {
    /// Parsed data document.
    Data(Value),
    /// Exported callable.
    Function(Handler),
    /// Exported object whose members may mix data and callables.
    Object(BTreeMap<String, LoadedValue>),
}

impl LoadedValue {
    /// True for empty objects (data or exported), which the assembler prunes.
    pub fn is_empty_object(&self) -> bool {
        match self {
            LoadedValue::Data(Value::Object(map)) => map.is_empty(),
            LoadedValue::Object(map) => map.is_empty(),
            _ => false,
        }
    }

    /// Member lookup on either object form.
    pub fn get(&self, key: &str) -> Option<LoadedValue> {
        match self {
            LoadedValue::Data(Value::Object(map)) => map.get(key).cloned().map(LoadedValue::Data),
            LoadedValue::Object(map) => map.get(key).cloned(),
            _ => None,
        }
    }

    /// Members of either object form, or the value itself when it has none.
    pub fn into_members(self) -> Result<Dictionary, LoadedValue> {
        match self {
            LoadedValue::Data(Value::Object(map)) => Ok(lift_members(map)),
            LoadedValue::Object(map) => Ok(map),
            other => Err(other),
        }
    }

    /// Deep-merge `source` into `self`.
    ///
    /// Objects merge member by member, recursively; data objects and exported
    /// objects interoperate. Every other pairing (scalars, arrays, nulls,
    /// functions) is replaced by the source.
    pub fn merge(&mut self, source: LoadedValue) {
        match (self, source) {
            (
                LoadedValue::Data(target @ Value::Object(_)),
                LoadedValue::Data(source @ Value::Object(_)),
            ) => {
                merge_json(target, source);
            }
            (LoadedValue::Object(target), LoadedValue::Object(source)) => {
                merge_dictionary(target, source);
            }
            (LoadedValue::Object(target), LoadedValue::Data(Value::Object(source))) => {
                merge_dictionary(target, lift_members(source));
            }
            (target @ LoadedValue::Data(Value::Object(_)), LoadedValue::Object(source)) => {
                let LoadedValue::Data(Value::Object(members)) = std::mem::replace(
                    target,
                    LoadedValue::Object(BTreeMap::new()),
                ) else {
                    unreachable!("pattern guarantees a data object");
                };
                let mut lifted = lift_members(members);
                merge_dictionary(&mut lifted, source);
                *target = LoadedValue::Object(lifted);
            }
            (target, source) => *target = source,
        }
    }

    /// JSON rendering for inspection; functions render as `[Function: name]`.
    pub fn describe(&self) -> Value {
        match self {
            LoadedValue::Data(value) => value.clone(),
            LoadedValue::Function(handler) => Value::String(format!("{handler:?}")),
            LoadedValue::Object(map) => Value::Object(
                map.iter()
                    .map(|(key, value)| (key.clone(), value.describe()))
                    .collect(),
            ),
        }
    }
}

impl From<Value> for LoadedValue {
    fn from(value: Value) -> Self {
        LoadedValue::Data(value)
    }
}

impl From<Handler> for LoadedValue {
    fn from(handler: Handler) -> Self {
        LoadedValue::Function(handler)
    }
}

/// Deep-merge every entry of `source` into `target`, inserting new keys.
pub fn merge_dictionary(target: &mut Dictionary, source: Dictionary) {
    for (key, value) in source {
        match target.get_mut(&key) {
            Some(existing) => existing.merge(value),
            None => {
                target.insert(key, value);
            }
        }
    }
}

fn merge_json(target: &mut Value, source: Value) {
    match (target, source) {
        (Value::Object(target), Value::Object(source)) => {
            for (key, value) in source {
                match target.get_mut(&key) {
                    Some(existing) => merge_json(existing, value),
                    None => {
                        target.insert(key, value);
                    }
                }
            }
        }
        (target, source) => *target = source,
    }
}

fn lift_members(members: serde_json::Map<String, Value>) -> Dictionary {
    members
        .into_iter()
        .map(|(key, value)| (key, LoadedValue::Data(value)))
        .collect()
}
