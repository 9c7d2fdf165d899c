//! Application configuration consumed by the assembler.
//!
//! Config files are JSON, validated against `schema/app_config.schema.json`
//! before deserialization. Every field has a default so an application that
//! follows the stock layout needs no file at all. A couple of environment
//! variables override the file for per-process tweaks; the result is checked
//! against the same schema, since environment and namespace names become
//! path components.

use crate::schema_loader::load_embedded_schema;
use crate::split_list;
use anyhow::{Context, Result, anyhow, ensure};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::env;
use std::fs::{self, File};
use std::io::BufReader;
use std::path::{Path, PathBuf};

const CONFIG_SCHEMA: &str = include_str!("../schema/app_config.schema.json");

/// Conventional config filename looked up at the application root.
pub const CONFIG_FILE_NAME: &str = "api-registry.json";
/// Replaces `environment` when set.
pub const ENV_ENVIRONMENT: &str = "API_REGISTRY_ENV";
/// Replaces `namespaces` when set (comma or whitespace separated).
pub const ENV_NAMESPACES: &str = "API_REGISTRY_NAMESPACES";
/// Names the application root for `find_app_root`.
pub const ENV_ROOT: &str = "API_REGISTRY_ROOT";

// Environment-specific config lives under `<config>/environments/<env>`.
pub(crate) const ENVIRONMENTS_DIR: &str = "environments";

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    pub app_path: PathBuf,
    pub environment: String,
    pub paths: PathSegments,
    /// Explicit namespace set; `None` discovers every directory under the
    /// API root.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub namespaces: Option<Vec<String>>,
    pub module_extension: String,
    pub data_extension: String,
}

/// Directory names for each conventional role.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct PathSegments {
    pub api: String,
    pub controllers: String,
    pub models: String,
    pub services: String,
    pub policies: String,
    pub config: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            app_path: PathBuf::from("."),
            environment: "development".to_string(),
            paths: PathSegments::default(),
            namespaces: None,
            module_extension: "js".to_string(),
            data_extension: "json".to_string(),
        }
    }
}

impl Default for PathSegments {
    fn default() -> Self {
        Self {
            api: "api".to_string(),
            controllers: "controllers".to_string(),
            models: "models".to_string(),
            services: "services".to_string(),
            policies: "policies".to_string(),
            config: "config".to_string(),
        }
    }
}

impl AppConfig {
    /// Defaults rooted at `app_path`.
    pub fn for_root(app_path: impl Into<PathBuf>) -> Self {
        Self {
            app_path: app_path.into(),
            ..Self::default()
        }
    }

    /// Read, validate, and deserialize a config file.
    ///
    /// A relative `app_path` resolves against the file's directory.
    pub fn load(path: &Path) -> Result<Self> {
        let file =
            File::open(path).with_context(|| format!("opening config {}", path.display()))?;
        let value: Value = serde_json::from_reader(BufReader::new(file))
            .with_context(|| format!("parsing config {}", path.display()))?;

        check_schema(&value, &format!("config {}", path.display()))?;

        let mut config: AppConfig = serde_json::from_value(value)
            .with_context(|| format!("deserializing config {}", path.display()))?;
        if config.app_path.is_relative() {
            let base = path.parent().unwrap_or_else(|| Path::new("."));
            config.app_path = base.join(&config.app_path);
        }
        Ok(config)
    }

    /// Load `<root>/api-registry.json` when present, otherwise defaults for
    /// `root`.
    pub fn load_for_root(root: &Path) -> Result<Self> {
        let candidate = root.join(CONFIG_FILE_NAME);
        if candidate.is_file() {
            Self::load(&candidate)
        } else {
            Ok(Self::for_root(root))
        }
    }

    /// Apply `API_REGISTRY_ENV` / `API_REGISTRY_NAMESPACES` overrides, then
    /// validate the result.
    pub fn apply_env(mut self) -> Result<Self> {
        if let Ok(environment) = env::var(ENV_ENVIRONMENT) {
            let environment = environment.trim();
            if !environment.is_empty() {
                self.environment = environment.to_string();
            }
        }
        if let Ok(raw) = env::var(ENV_NAMESPACES) {
            let namespaces = split_list(&raw);
            if !namespaces.is_empty() {
                self.namespaces = Some(namespaces);
            }
        }
        self.validate()
            .with_context(|| format!("applying {ENV_ENVIRONMENT}/{ENV_NAMESPACES}"))?;
        Ok(self)
    }

    /// Check the effective settings against the config schema.
    ///
    /// Catches environment or namespace names that would step outside the
    /// API root once joined onto it.
    pub fn validate(&self) -> Result<()> {
        let value = serde_json::to_value(self).context("serializing config")?;
        check_schema(&value, "effective config")
    }

    /// `<app_path>/<api>`
    pub fn api_root(&self) -> PathBuf {
        self.app_path.join(&self.paths.api)
    }

    /// `<app_path>/<api>/<namespace>/<segment>`
    pub fn category_dir(&self, namespace: &str, segment: &str) -> PathBuf {
        self.api_root().join(namespace).join(segment)
    }

    /// `<app_path>/<api>/<namespace>/<config>/environments/<environment>`
    pub fn environment_config_dir(&self, namespace: &str) -> PathBuf {
        self.category_dir(namespace, &self.paths.config)
            .join(ENVIRONMENTS_DIR)
            .join(&self.environment)
    }
}

fn check_schema(value: &Value, subject: &str) -> Result<()> {
    let schema = load_embedded_schema("app_config.schema.json", CONFIG_SCHEMA)?;
    schema.validate(value, subject)
}

fn looks_like_app_root(dir: &Path) -> bool {
    dir.join(CONFIG_FILE_NAME).is_file() || dir.join(PathSegments::default().api).is_dir()
}

fn nearest_app_root(start: &Path) -> Option<&Path> {
    start.ancestors().find(|dir| looks_like_app_root(dir))
}

/// Locate the application root when none was given.
///
/// `API_REGISTRY_ROOT`, when set, must name a directory holding
/// `api-registry.json` or `api/`. Otherwise the nearest such directory at or
/// above the current directory is used.
pub fn find_app_root() -> Result<PathBuf> {
    if let Some(hint) = env::var_os(ENV_ROOT).filter(|hint| !hint.is_empty()) {
        let root = fs::canonicalize(&hint)
            .with_context(|| format!("resolving {ENV_ROOT}={}", Path::new(&hint).display()))?;
        ensure!(
            looks_like_app_root(&root),
            "{ENV_ROOT} points at {}, which has neither {CONFIG_FILE_NAME} nor an api/ directory",
            root.display()
        );
        return Ok(root);
    }

    let cwd = env::current_dir().context("reading current directory")?;
    nearest_app_root(&cwd).map(Path::to_path_buf).ok_or_else(|| {
        anyhow!(
            "no application root at or above {}; set {ENV_ROOT} or pass --root",
            cwd.display()
        )
    })
}
