use super::{SchemaDocument, SchemaFetcher};
use crate::error::{Result, YamlLsError};
use dashmap::DashMap;
use futures::future::join_all;
use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use percent_encoding::percent_decode_str;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tower_lsp::lsp_types::Url;

/// A schema ready for validation.
pub type ResolvedSchema = Arc<SchemaDocument>;

/// One `schemas` entry from the settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaConfiguration {
    pub uri: String,
    #[serde(default)]
    pub file_match: Vec<String>,
    /// Inline schema content, used instead of fetching `uri`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<serde_json::Value>,
}

impl SchemaConfiguration {
    pub fn new<I, S>(uri: impl Into<String>, file_match: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            uri: uri.into(),
            file_match: file_match.into_iter().map(Into::into).collect(),
            schema: None,
        }
    }
}

/// How several matching bindings combine for one document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SchemaMergePolicy {
    /// Every matching schema applies.
    #[default]
    Union,
    /// Only the first matching binding applies.
    FirstMatch,
}

/// A configured schema binding with its compiled file matcher.
#[derive(Debug)]
pub struct SchemaBinding {
    pub uri: String,
    pub file_match: Vec<String>,
    matcher: FileMatcher,
    inline: Option<ResolvedSchema>,
}

impl SchemaBinding {
    fn new(config: &SchemaConfiguration) -> Self {
        let inline = config
            .schema
            .as_ref()
            .map(|value| Arc::new(SchemaDocument::from_value(&config.uri, value)));

        Self {
            uri: config.uri.clone(),
            file_match: config.file_match.clone(),
            matcher: FileMatcher::new(&config.file_match),
            inline,
        }
    }

    pub fn matches(&self, document_uri: &Url) -> bool {
        let path = percent_decode_str(document_uri.path()).decode_utf8_lossy();
        self.matcher.is_match(&path)
    }
}

#[derive(Debug)]
struct FileMatcher {
    include: GlobSet,
    exclude: GlobSet,
}

impl FileMatcher {
    fn new(patterns: &[String]) -> Self {
        let mut include = GlobSetBuilder::new();
        let mut exclude = GlobSetBuilder::new();

        for pattern in patterns {
            let (builder, pattern) = match pattern.strip_prefix('!') {
                Some(negated) => (&mut exclude, negated),
                None => (&mut include, pattern.as_str()),
            };
            let anchored = if pattern.starts_with('/') || pattern.starts_with("**/") {
                pattern.to_string()
            } else {
                format!("**/{}", pattern.trim_start_matches("./"))
            };

            match GlobBuilder::new(&anchored).literal_separator(true).build() {
                Ok(glob) => {
                    builder.add(glob);
                }
                Err(err) => tracing::warn!(pattern, "Ignoring invalid fileMatch pattern: {}", err),
            }
        }

        Self {
            include: include.build().unwrap_or_else(|_| GlobSet::empty()),
            exclude: exclude.build().unwrap_or_else(|_| GlobSet::empty()),
        }
    }

    fn is_match(&self, path: &str) -> bool {
        self.include.is_match(path) && !self.exclude.is_match(path)
    }
}

/// Find a `# yaml-language-server: $schema=<uri>` comment in a document.
pub fn modeline_schema(text: &str) -> Option<&str> {
    text.lines().find_map(|line| {
        let comment = line.trim_start().strip_prefix('#')?.trim_start();
        let settings = comment
            .strip_prefix("yaml-language-server")?
            .trim_start()
            .strip_prefix(':')?;
        let value = settings.split("$schema=").nth(1)?;
        let uri = value.split_whitespace().next()?;
        (!uri.is_empty()).then_some(uri)
    })
}

/// Decides which schemas apply to a document and loads them.
pub struct SchemaResolver {
    bindings: Vec<SchemaBinding>,
    merge_policy: SchemaMergePolicy,
    fetcher: Arc<dyn SchemaFetcher>,
    cache: DashMap<String, ResolvedSchema>,
    fetch_timeout: Duration,
}

impl SchemaResolver {
    pub fn new(
        configs: &[SchemaConfiguration],
        merge_policy: SchemaMergePolicy,
        fetcher: Arc<dyn SchemaFetcher>,
        fetch_timeout: Duration,
    ) -> Self {
        Self {
            bindings: configs.iter().map(SchemaBinding::new).collect(),
            merge_policy,
            fetcher,
            cache: DashMap::new(),
            fetch_timeout,
        }
    }

    pub fn bindings(&self) -> &[SchemaBinding] {
        &self.bindings
    }

    /// Schema URIs that apply to a document, in binding order.
    pub fn applicable(&self, document_uri: &Url, modeline: Option<&str>) -> Vec<String> {
        if let Some(reference) = modeline {
            let uri = match Url::parse(reference) {
                Ok(url) if url.scheme().len() > 1 => url.to_string(),
                _ => document_uri
                    .join(reference)
                    .map(|url| url.to_string())
                    .unwrap_or_else(|_| reference.to_string()),
            };
            return vec![uri];
        }

        let mut uris: Vec<String> = Vec::new();
        for binding in self.bindings.iter().filter(|b| b.matches(document_uri)) {
            if !uris.contains(&binding.uri) {
                uris.push(binding.uri.clone());
            }
        }

        if self.merge_policy == SchemaMergePolicy::FirstMatch {
            uris.truncate(1);
        }
        uris
    }

    /// Load every applicable schema. Schemas that fail to load are logged and
    /// left out.
    pub async fn resolve(&self, document_uri: &Url, modeline: Option<&str>) -> Vec<ResolvedSchema> {
        let uris = self.applicable(document_uri, modeline);
        let loads = uris.iter().map(|uri| self.load(uri));

        join_all(loads)
            .await
            .into_iter()
            .filter_map(|loaded| match loaded {
                Ok(schema) => Some(schema),
                Err(err) => {
                    tracing::warn!(document = %document_uri, "Schema unavailable: {}", err);
                    None
                }
            })
            .collect()
    }

    async fn load(&self, uri: &str) -> Result<ResolvedSchema> {
        if let Some(inline) = self
            .bindings
            .iter()
            .find(|b| b.uri == uri)
            .and_then(|b| b.inline.clone())
        {
            return Ok(inline);
        }
        if let Some(cached) = self.cache.get(uri) {
            return Ok(cached.clone());
        }

        let content = tokio::time::timeout(self.fetch_timeout, self.fetcher.fetch(uri))
            .await
            .map_err(|_| YamlLsError::SchemaFetchTimeout(uri.to_string()))??;
        let schema = Arc::new(SchemaDocument::parse(uri, &content)?);

        tracing::debug!(uri, "Schema loaded");
        self.cache.insert(uri.to_string(), schema.clone());
        Ok(schema)
    }
}
