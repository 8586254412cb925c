/// LSP (Language Server Protocol) adapter for the YAML language service
///
/// Tracks open documents, debounces validation and publishes diagnostics;
/// all language features are delegated to [`crate::service::LanguageService`].
pub mod document;
pub mod server;

// Re-export public API
pub use server::YamlLanguageServer;
