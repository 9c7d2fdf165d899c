//! Process-wide tables that assembled API namespaces fold into.
//!
//! The registry keeps each namespace's own dictionary alongside the merged
//! controller, service, model, policy, and route tables that routing and
//! dispatch read once assembly finishes. Merges are additive: a later
//! namespace overwrites an earlier one's colliding keys.

use crate::value::{Dictionary, LoadedValue, merge_dictionary};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use tracing::warn;

// The routes table is read from this key of a namespace's config.
const ROUTES_KEY: &str = "routes";

/// Conventional subdirectory role inside an API namespace.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum Category {
    Controllers,
    Models,
    Services,
    Policies,
    Config,
}

impl Category {
    pub const ALL: [Category; 5] = [
        Category::Controllers,
        Category::Models,
        Category::Services,
        Category::Policies,
        Category::Config,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Controllers => "controllers",
            Category::Models => "models",
            Category::Services => "services",
            Category::Policies => "policies",
            Category::Config => "config",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything one API namespace contributed, keyed by category.
///
/// Empty categories are dropped by `prune`, so `get` returning `None` means
/// the namespace had nothing for that role.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ApiDictionary {
    name: String,
    categories: BTreeMap<Category, Dictionary>,
}

impl ApiDictionary {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            categories: BTreeMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn insert(&mut self, category: Category, dictionary: Dictionary) {
        self.categories.insert(category, dictionary);
    }

    pub fn get(&self, category: Category) -> Option<&Dictionary> {
        self.categories.get(&category)
    }

    pub fn categories(&self) -> impl Iterator<Item = (Category, &Dictionary)> {
        self.categories.iter().map(|(category, dict)| (*category, dict))
    }

    /// Drop categories with no entries.
    pub fn prune(&mut self) {
        self.categories.retain(|_, dictionary| !dictionary.is_empty());
    }

    pub fn is_empty(&self) -> bool {
        self.categories.values().all(Dictionary::is_empty)
    }

    /// Route table declared by this namespace's `config.routes`, if it is an
    /// object.
    fn routes(&self) -> Option<Dictionary> {
        let routes = self.get(Category::Config)?.get(ROUTES_KEY)?;
        match routes {
            LoadedValue::Data(Value::Object(members)) => Some(
                members
                    .iter()
                    .map(|(key, value)| (key.clone(), LoadedValue::Data(value.clone())))
                    .collect(),
            ),
            LoadedValue::Object(members) => Some(members.clone()),
            other => {
                warn!(
                    namespace = %self.name,
                    value = %other.describe(),
                    "ignoring non-object routes config"
                );
                None
            }
        }
    }

    fn describe(&self) -> Value {
        Value::Object(
            self.categories()
                .map(|(category, dictionary)| {
                    (category.as_str().to_string(), describe_dictionary(dictionary))
                })
                .collect(),
        )
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Registry {
    apis: BTreeMap<String, ApiDictionary>,
    controllers: Dictionary,
    services: Dictionary,
    models: Dictionary,
    policies: Dictionary,
    routes: Dictionary,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one assembled namespace into the registry.
    ///
    /// Empty categories are pruned first; a namespace left with nothing is
    /// removed from `apis` and contributes nothing. Returns whether the
    /// namespace was kept.
    pub fn absorb(&mut self, mut api: ApiDictionary) -> bool {
        api.prune();
        if api.is_empty() {
            self.apis.remove(api.name());
            return false;
        }

        if let Some(controllers) = api.get(Category::Controllers) {
            merge_dictionary(&mut self.controllers, controllers.clone());
        }
        if let Some(services) = api.get(Category::Services) {
            merge_dictionary(&mut self.services, services.clone());
        }
        if let Some(models) = api.get(Category::Models) {
            merge_dictionary(&mut self.models, models.clone());
        }
        if let Some(policies) = api.get(Category::Policies) {
            merge_dictionary(&mut self.policies, policies.clone());
        }
        if let Some(routes) = api.routes() {
            merge_dictionary(&mut self.routes, routes);
        }

        self.apis.insert(api.name().to_string(), api);
        true
    }

    pub fn api(&self, name: &str) -> Option<&ApiDictionary> {
        self.apis.get(name)
    }

    pub fn apis(&self) -> impl Iterator<Item = &ApiDictionary> {
        self.apis.values()
    }

    pub fn controllers(&self) -> &Dictionary {
        &self.controllers
    }

    pub fn services(&self) -> &Dictionary {
        &self.services
    }

    pub fn models(&self) -> &Dictionary {
        &self.models
    }

    pub fn policies(&self) -> &Dictionary {
        &self.policies
    }

    pub fn routes(&self) -> &Dictionary {
        &self.routes
    }

    /// JSON view of every table, for inspection output.
    pub fn summary(&self) -> Value {
        let apis: Map<String, Value> = self
            .apis
            .iter()
            .map(|(name, api)| (name.clone(), api.describe()))
            .collect();
        let mut root = Map::new();
        root.insert("api".to_string(), Value::Object(apis));
        root.insert(
            "controllers".to_string(),
            describe_dictionary(&self.controllers),
        );
        root.insert("services".to_string(), describe_dictionary(&self.services));
        root.insert("models".to_string(), describe_dictionary(&self.models));
        root.insert("policies".to_string(), describe_dictionary(&self.policies));
        root.insert("routes".to_string(), describe_dictionary(&self.routes));
        Value::Object(root)
    }
}

fn describe_dictionary(dictionary: &Dictionary) -> Value {
    Value::Object(
        dictionary
            .iter()
            .map(|(key, value)| (key.clone(), value.describe()))
            .collect(),
    )
}
