use crate::error::{Result, YamlLsError};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::RwLock;
use tower_lsp::lsp_types::Url;

/// Loads schema text for a URI. Implementations must be safe to call from
/// several validations at once.
#[tower_lsp::async_trait]
pub trait SchemaFetcher: Send + Sync {
    async fn fetch(&self, uri: &str) -> Result<String>;
}

/// Reads schemas from the local filesystem. Accepts `file://` URIs and plain
/// paths.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileSchemaFetcher;

impl FileSchemaFetcher {
    fn path_for(uri: &str) -> Result<PathBuf> {
        match Url::parse(uri) {
            Ok(url) if url.scheme() == "file" => {
                url.to_file_path().map_err(|_| YamlLsError::SchemaFetchError {
                    uri: uri.to_string(),
                    message: "not a local file path".to_string(),
                })
            }
            // Single letters are drive prefixes, not schemes.
            Ok(url) if url.scheme().len() > 1 => Err(YamlLsError::SchemaFetchError {
                uri: uri.to_string(),
                message: format!("unsupported scheme '{}'", url.scheme()),
            }),
            _ => Ok(PathBuf::from(uri)),
        }
    }
}

#[tower_lsp::async_trait]
impl SchemaFetcher for FileSchemaFetcher {
    async fn fetch(&self, uri: &str) -> Result<String> {
        let path = Self::path_for(uri)?;
        tracing::debug!(uri, path = %path.display(), "Reading schema");
        tokio::fs::read_to_string(&path)
            .await
            .map_err(|err| YamlLsError::SchemaFetchError {
                uri: uri.to_string(),
                message: err.to_string(),
            })
    }
}

/// In-memory schemas keyed by URI.
#[derive(Debug, Default)]
pub struct MemorySchemaFetcher {
    schemas: RwLock<HashMap<String, String>>,
}

impl MemorySchemaFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_schema(self, uri: impl Into<String>, content: impl Into<String>) -> Self {
        self.insert(uri, content);
        self
    }

    pub fn insert(&self, uri: impl Into<String>, content: impl Into<String>) {
        self.schemas
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .insert(uri.into(), content.into());
    }
}

#[tower_lsp::async_trait]
impl SchemaFetcher for MemorySchemaFetcher {
    async fn fetch(&self, uri: &str) -> Result<String> {
        self.schemas
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .get(uri)
            .cloned()
            .ok_or_else(|| YamlLsError::SchemaFetchError {
                uri: uri.to_string(),
                message: "no such schema".to_string(),
            })
    }
}
