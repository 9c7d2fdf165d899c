//! Builds per-namespace API dictionaries and folds them into a `Registry`.
//!
//! Every namespace is assembled in parallel, and inside a namespace the five
//! category loads (plus the two halves of models and config) fan out as well.
//! Results are gathered in namespace order and merged on the calling thread,
//! so the registry needs no locking and collisions resolve the same way on
//! every run: the lexicographically later namespace wins.

use crate::config::{AppConfig, ENVIRONMENTS_DIR};
use crate::dictionary::{CategoryDescriptor, DictionaryBuilder, extension_filter};
use crate::error::{AssemblyError, LoadError};
use crate::exports::ExportRegistry;
use crate::list_namespaces;
use crate::registry::{ApiDictionary, Category, Registry};
use crate::value::{Dictionary, merge_dictionary};
use rayon::prelude::*;
use std::collections::BTreeSet;
use tracing::{debug, info, warn};

// Controllers, models, services, and policies are read one level deep;
// config two levels, with the environments subtree loaded separately.
// Config is aggregated: file contents merge into one object per namespace.
const CATEGORY_DEPTH: usize = 1;
const CONFIG_DEPTH: usize = 2;
const MODEL_SETTINGS_SUFFIX: &str = "settings";

/// Which namespaces made it into the registry after `build_all`.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct AssemblySummary {
    /// Namespaces merged into the registry.
    pub assembled: Vec<String>,
    /// Namespaces that loaded cleanly but had nothing in any category.
    pub pruned: Vec<String>,
}

pub struct Assembler {
    config: AppConfig,
    exports: ExportRegistry,
}

impl Assembler {
    pub fn new(config: AppConfig, exports: ExportRegistry) -> Self {
        Self { config, exports }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Namespaces to assemble, sorted and de-duplicated.
    ///
    /// Uses the configured set when present, otherwise every directory under
    /// the API root.
    pub fn namespaces(&self) -> Vec<String> {
        let names: BTreeSet<String> = match &self.config.namespaces {
            Some(configured) => configured.iter().cloned().collect(),
            None => match list_namespaces(&self.config.api_root()) {
                Ok(found) => found.into_iter().collect(),
                Err(err) => {
                    warn!(
                        api_root = %self.config.api_root().display(),
                        "unable to list API namespaces: {err:#}"
                    );
                    BTreeSet::new()
                }
            },
        };
        names.into_iter().collect()
    }

    /// Assemble every namespace and merge the results into `registry`.
    ///
    /// Namespaces that fail leave the registry untouched for their own
    /// entries; the others are still merged. All failures are returned
    /// together.
    pub fn build_all(&self, registry: &mut Registry) -> Result<AssemblySummary, AssemblyError> {
        let namespaces = self.namespaces();
        info!(
            count = namespaces.len(),
            environment = %self.config.environment,
            "assembling API namespaces"
        );

        let results: Vec<(String, Result<ApiDictionary, LoadError>)> = namespaces
            .par_iter()
            .map(|namespace| (namespace.clone(), self.assemble_namespace(namespace)))
            .collect();

        let mut summary = AssemblySummary::default();
        let mut failures = Vec::new();
        for (namespace, result) in results {
            match result {
                Ok(api) => {
                    if registry.absorb(api) {
                        info!(namespace = %namespace, "API namespace assembled");
                        summary.assembled.push(namespace);
                    } else {
                        debug!(namespace = %namespace, "API namespace empty; pruned");
                        summary.pruned.push(namespace);
                    }
                }
                Err(err) => {
                    warn!(namespace = %namespace, "API namespace failed: {err}");
                    failures.push((namespace, err));
                }
            }
        }

        if failures.is_empty() {
            Ok(summary)
        } else {
            Err(AssemblyError { failures })
        }
    }

    /// Load every category for one namespace.
    pub fn assemble_namespace(&self, namespace: &str) -> Result<ApiDictionary, LoadError> {
        let ((controllers, models), ((services, policies), config)) = rayon::join(
            || {
                rayon::join(
                    || self.load_controllers(namespace),
                    || self.load_models(namespace),
                )
            },
            || {
                rayon::join(
                    || {
                        rayon::join(
                            || self.load_services(namespace),
                            || self.load_policies(namespace),
                        )
                    },
                    || self.load_config(namespace),
                )
            },
        );

        let mut api = ApiDictionary::new(namespace);
        api.insert(Category::Controllers, controllers?);
        api.insert(Category::Models, models?);
        api.insert(Category::Services, services?);
        api.insert(Category::Policies, policies?);
        api.insert(Category::Config, config?);
        Ok(api)
    }

    fn builder(&self) -> DictionaryBuilder<'_> {
        DictionaryBuilder::new(&self.exports, self.config.data_extension.as_str())
    }

    fn module_descriptor(
        &self,
        namespace: &str,
        segment: &str,
    ) -> Result<CategoryDescriptor, LoadError> {
        Ok(CategoryDescriptor::optional(
            self.config.category_dir(namespace, segment),
            extension_filter(&[self.config.module_extension.as_str()])?,
            CATEGORY_DEPTH,
        ))
    }

    fn load_controllers(&self, namespace: &str) -> Result<Dictionary, LoadError> {
        let descriptor = self.module_descriptor(namespace, &self.config.paths.controllers)?;
        self.builder().load(&descriptor)
    }

    fn load_services(&self, namespace: &str) -> Result<Dictionary, LoadError> {
        let descriptor = self.module_descriptor(namespace, &self.config.paths.services)?;
        self.builder().load(&descriptor)
    }

    // Policies are declared aggregate by convention, yet an API without a
    // policies directory is normal; a missing directory is tolerated.
    fn load_policies(&self, namespace: &str) -> Result<Dictionary, LoadError> {
        let descriptor = self.module_descriptor(namespace, &self.config.paths.policies)?;
        self.builder().load(&descriptor)
    }

    /// `*.settings.<data>` merged with `*.<module>`; module exports win.
    fn load_models(&self, namespace: &str) -> Result<Dictionary, LoadError> {
        let root = self.config.category_dir(namespace, &self.config.paths.models);
        let settings_suffix = format!("{MODEL_SETTINGS_SUFFIX}.{}", self.config.data_extension);
        let settings = CategoryDescriptor::optional(
            &root,
            extension_filter(&[settings_suffix.as_str()])?,
            CATEGORY_DEPTH,
        );
        let functions = CategoryDescriptor::optional(
            &root,
            extension_filter(&[self.config.module_extension.as_str()])?,
            CATEGORY_DEPTH,
        );

        let (settings, functions) = rayon::join(
            || self.builder().load(&settings),
            || self.builder().load(&functions),
        );
        let mut models = settings?;
        merge_dictionary(&mut models, functions?);
        Ok(models)
    }

    /// Common config merged with the active environment's; environment wins.
    ///
    /// The common `config/` directory is required. A namespace with no
    /// directory for the active environment gets common config only.
    fn load_config(&self, namespace: &str) -> Result<Dictionary, LoadError> {
        let filter = extension_filter(&[
            self.config.module_extension.as_str(),
            self.config.data_extension.as_str(),
        ])?;
        let common = CategoryDescriptor::aggregate(
            self.config.category_dir(namespace, &self.config.paths.config),
            filter.clone(),
            CONFIG_DEPTH,
        )
        .excluding(ENVIRONMENTS_DIR);
        let specific = CategoryDescriptor::aggregate(
            self.config.environment_config_dir(namespace),
            filter,
            CONFIG_DEPTH,
        )
        .allow_missing();

        let (common, specific) = rayon::join(
            || self.builder().load(&common),
            || self.builder().load(&specific),
        );
        let mut config = common?;
        merge_dictionary(&mut config, specific?);
        Ok(config)
    }
}
