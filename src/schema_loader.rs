//! JSON Schema compilation and validation shared by config loading.
//!
//! Schemas are compiled once per load and every violation is reported
//! together, one per line, so a bad config file surfaces all of its problems
//! at once.

use anyhow::{Context, Result, anyhow, bail};
use jsonschema::JSONSchema;
use serde_json::Value;

/// A compiled schema plus the title it declared, if any.
pub(crate) struct SchemaLoadResult {
    pub schema_id: Option<String>,
    pub compiled: JSONSchema,
}

/// Compile a schema bundled with the crate.
pub(crate) fn load_embedded_schema(label: &str, source: &str) -> Result<SchemaLoadResult> {
    let raw: Value =
        serde_json::from_str(source).with_context(|| format!("parsing schema {label}"))?;
    let compiled =
        JSONSchema::compile(&raw).map_err(|err| anyhow!("compiling schema {label}: {err}"))?;
    let schema_id = raw.get("title").and_then(Value::as_str).map(str::to_string);
    Ok(SchemaLoadResult {
        schema_id,
        compiled,
    })
}

impl SchemaLoadResult {
    /// Validate `instance`, collecting every violation into one error.
    pub(crate) fn validate(&self, instance: &Value, subject: &str) -> Result<()> {
        if let Err(errors) = self.compiled.validate(instance) {
            let details = errors
                .map(|err| err.to_string())
                .collect::<Vec<_>>()
                .join("\n");
            bail!(
                "{subject} failed schema validation against {}:\n{}",
                self.schema_id.as_deref().unwrap_or("<anonymous schema>"),
                details
            );
        }
        Ok(())
    }
}
