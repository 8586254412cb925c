use thiserror::Error;

#[derive(Error, Debug)]
pub enum YamlLsError {
    #[error("Failed to fetch schema {uri}: {message}")]
    SchemaFetchError { uri: String, message: String },

    #[error("Timed out fetching schema {0}")]
    SchemaFetchTimeout(String),

    #[error("Failed to parse schema {uri}: {message}")]
    SchemaParseError { uri: String, message: String },

    #[error("Invalid settings: {0}")]
    InvalidSettings(String),

    #[error("Failed to initialize logging: {0}")]
    LoggingError(String),

    #[error("Validation failed with {0} error(s)")]
    ValidationFailed(usize),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, YamlLsError>;
