use crate::Result;
use crate::lsp::YamlLanguageServer;
use crate::schema::FileSchemaFetcher;
use std::sync::Arc;
use tower_lsp::{LspService, Server};

/// Run the language server over stdin/stdout until the client disconnects.
pub async fn execute_serve() -> Result<()> {
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "Starting YAML language server on stdio");

    let stdin = tokio::io::stdin();
    let stdout = tokio::io::stdout();

    let (service, socket) =
        LspService::new(|client| YamlLanguageServer::new(client, Arc::new(FileSchemaFetcher)));
    Server::new(stdin, stdout, socket).serve(service).await;

    tracing::info!("YAML language server stopped");
    Ok(())
}
