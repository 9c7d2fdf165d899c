use anyhow::{Context, Result};
use api_registry::AppConfig;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Throwaway application tree laid out under a temp dir.
pub struct AppFixture {
    temp: TempDir,
}

impl AppFixture {
    pub fn new() -> Result<Self> {
        Ok(Self {
            temp: TempDir::new().context("failed to allocate app dir")?,
        })
    }

    pub fn root(&self) -> &Path {
        self.temp.path()
    }

    /// Write `contents` at `<root>/api/<relative>`, creating parents.
    pub fn write_api(&self, relative: &str, contents: &str) -> Result<PathBuf> {
        let path = self.root().join("api").join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }
        fs::write(&path, contents).with_context(|| format!("writing {}", path.display()))?;
        Ok(path)
    }

    /// Create `<root>/api/<relative>` as an empty directory.
    pub fn mkdir_api(&self, relative: &str) -> Result<()> {
        let path = self.root().join("api").join(relative);
        fs::create_dir_all(&path).with_context(|| format!("creating {}", path.display()))
    }

    /// Create the required config directory plus the (optional) directory
    /// for `environment`.
    pub fn scaffold(&self, namespace: &str, environment: &str) -> Result<()> {
        self.mkdir_api(&format!("{namespace}/config/environments/{environment}"))
    }

    pub fn config(&self, environment: &str) -> AppConfig {
        let mut config = AppConfig::for_root(self.root());
        config.environment = environment.to_string();
        config
    }
}
