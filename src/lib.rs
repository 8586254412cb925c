pub mod cli;
pub mod commands;
pub mod document;
pub mod error;
pub mod lsp;
pub mod query;
pub mod schema;
pub mod service;
pub mod syntax;
pub mod telemetry;
pub mod validation;

pub use error::{Result, YamlLsError};
pub use service::{LanguageService, LanguageSettings};
