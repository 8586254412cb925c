use crate::error::{Result, YamlLsError};
use crate::schema::{SchemaConfiguration, SchemaMergePolicy};
use crate::syntax::CustomTagSpec;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

const DEFAULT_FETCH_TIMEOUT_MS: u64 = 5000;

/// Language service configuration. Field names follow the camelCase keys
/// editors send under `yaml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LanguageSettings {
    pub schemas: Vec<SchemaConfiguration>,
    pub custom_tags: Vec<CustomTagEntry>,
    pub validate: bool,
    pub hover: bool,
    pub disable_additional_properties: bool,
    pub schema_merge_policy: SchemaMergePolicy,
    pub schema_fetch_timeout_ms: u64,
}

impl Default for LanguageSettings {
    fn default() -> Self {
        Self {
            schemas: Vec::new(),
            custom_tags: Vec::new(),
            validate: true,
            hover: true,
            disable_additional_properties: false,
            schema_merge_policy: SchemaMergePolicy::default(),
            schema_fetch_timeout_ms: DEFAULT_FETCH_TIMEOUT_MS,
        }
    }
}

/// A custom tag, written either as `"!Tag kind"` or as `{tag, kind}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CustomTagEntry {
    Declaration(String),
    Spec(CustomTagSpec),
}

impl LanguageSettings {
    /// Read settings from a JSON value. Accepts the settings object itself or
    /// one wrapped in a `yaml` section, as sent by editors.
    pub fn from_json(value: &serde_json::Value) -> Result<Self> {
        let section = value.get("yaml").unwrap_or(value);
        if section.is_null() {
            return Ok(Self::default());
        }
        Ok(serde_json::from_value(section.clone())?)
    }

    /// Load settings from a JSON or YAML file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let value: serde_json::Value = serde_yaml::from_str(&content)?;
        Self::from_json(&value)
    }

    pub fn with_schema<I, S>(mut self, uri: impl Into<String>, file_match: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.schemas.push(SchemaConfiguration::new(uri, file_match));
        self
    }

    pub fn with_custom_tag(mut self, declaration: impl Into<String>) -> Self {
        self.custom_tags
            .push(CustomTagEntry::Declaration(declaration.into()));
        self
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.schema_fetch_timeout_ms)
    }

    /// Check every custom tag declaration, failing on the first bad one.
    pub fn validate_custom_tags(&self) -> Result<Vec<CustomTagSpec>> {
        self.custom_tags
            .iter()
            .map(|entry| match entry {
                CustomTagEntry::Declaration(text) => CustomTagSpec::parse(text),
                CustomTagEntry::Spec(spec) if spec.tag.trim().is_empty() => Err(
                    YamlLsError::InvalidSettings("empty custom tag".to_string()),
                ),
                CustomTagEntry::Spec(spec) => Ok(spec.clone()),
            })
            .collect()
    }

    /// Declared custom tags. Malformed declarations are logged and skipped.
    pub fn custom_tag_specs(&self) -> Vec<CustomTagSpec> {
        self.custom_tags
            .iter()
            .filter_map(|entry| match entry {
                CustomTagEntry::Declaration(text) => match CustomTagSpec::parse(text) {
                    Ok(spec) => Some(spec),
                    Err(err) => {
                        tracing::warn!("Ignoring custom tag: {}", err);
                        None
                    }
                },
                CustomTagEntry::Spec(spec) => Some(spec.clone()),
            })
            .collect()
    }
}
