use crate::lsp::document::{DocumentManager, ValidationRequest};
use crate::schema::SchemaFetcher;
use crate::service::{LanguageService, LanguageSettings};
use std::sync::Arc;
use tokio::sync::mpsc;
use tower_lsp::jsonrpc::Result as RpcResult;
use tower_lsp::lsp_types::{
    DidChangeConfigurationParams, DidChangeTextDocumentParams, DidCloseTextDocumentParams,
    DidOpenTextDocumentParams, Hover, HoverParams, HoverProviderCapability, InitializeParams,
    InitializeResult, InitializedParams, MessageType, ServerCapabilities, ServerInfo,
    TextDocumentSyncCapability, TextDocumentSyncKind,
};
use tower_lsp::{Client, LanguageServer};

/// YAML Language Server
pub struct YamlLanguageServer {
    client: Client,
    document_manager: Arc<DocumentManager>,
    service: Arc<LanguageService>,
}

impl YamlLanguageServer {
    pub fn new(client: Client, fetcher: Arc<dyn SchemaFetcher>) -> Self {
        // Create validation channel
        let (validation_tx, validation_rx) = mpsc::channel::<ValidationRequest>(100);

        let document_manager = Arc::new(DocumentManager::new(validation_tx));
        let service = Arc::new(LanguageService::new(fetcher));

        // Spawn validation worker
        let client_clone = client.clone();
        let doc_manager_clone = document_manager.clone();
        let service_clone = service.clone();

        tokio::spawn(async move {
            validation_worker(validation_rx, client_clone, doc_manager_clone, service_clone).await;
        });

        Self {
            client,
            document_manager,
            service,
        }
    }

    async fn apply_settings(&self, value: &serde_json::Value) {
        match LanguageSettings::from_json(value) {
            Ok(settings) => {
                self.service.configure(settings);
                self.document_manager.revalidate_all();
            }
            Err(e) => {
                tracing::warn!("Rejected settings: {}", e);
                self.client
                    .log_message(MessageType::WARNING, format!("Invalid YAML settings: {}", e))
                    .await;
            }
        }
    }
}

#[tower_lsp::async_trait]
impl LanguageServer for YamlLanguageServer {
    async fn initialize(&self, params: InitializeParams) -> RpcResult<InitializeResult> {
        if let Some(options) = params.initialization_options {
            self.apply_settings(&options).await;
        }

        Ok(InitializeResult {
            capabilities: ServerCapabilities {
                text_document_sync: Some(TextDocumentSyncCapability::Kind(
                    TextDocumentSyncKind::FULL,
                )),
                hover_provider: Some(HoverProviderCapability::Simple(true)),
                ..Default::default()
            },
            server_info: Some(ServerInfo {
                name: env!("CARGO_PKG_NAME").to_string(),
                version: Some(env!("CARGO_PKG_VERSION").to_string()),
            }),
        })
    }

    async fn initialized(&self, _params: InitializedParams) {
        tracing::info!("LSP session initialized");
        self.client
            .log_message(MessageType::INFO, "YAML language server initialized")
            .await;
    }

    async fn shutdown(&self) -> RpcResult<()> {
        tracing::info!("LSP session shutting down");
        Ok(())
    }

    async fn did_open(&self, params: DidOpenTextDocumentParams) {
        let uri = params.text_document.uri;
        let version = params.text_document.version;
        let content = params.text_document.text;

        self.document_manager.update(uri, version, content);
    }

    async fn did_change(&self, params: DidChangeTextDocumentParams) {
        let uri = params.text_document.uri;
        let version = params.text_document.version;

        // Full sync: the last change carries the whole text
        if let Some(change) = params.content_changes.into_iter().last() {
            self.document_manager.update(uri, version, change.text);
        }
    }

    async fn did_close(&self, params: DidCloseTextDocumentParams) {
        let uri = params.text_document.uri;
        self.document_manager.remove(&uri);
        self.client.publish_diagnostics(uri, Vec::new(), None).await;
    }

    async fn did_change_configuration(&self, params: DidChangeConfigurationParams) {
        self.apply_settings(&params.settings).await;
    }

    async fn hover(&self, params: HoverParams) -> RpcResult<Option<Hover>> {
        let uri = params.text_document_position_params.text_document.uri;
        let position = params.text_document_position_params.position;

        let Some(doc) = self.document_manager.get(&uri) else {
            return Ok(None);
        };
        Ok(self.service.hover(&doc, position).await)
    }
}

/// Background worker that validates documents
async fn validation_worker(
    mut rx: mpsc::Receiver<ValidationRequest>,
    client: Client,
    doc_manager: Arc<DocumentManager>,
    service: Arc<LanguageService>,
) {
    while let Some(req) = rx.recv().await {
        // Superseded while waiting out the debounce
        if !doc_manager.is_current(&req.uri, req.version) {
            continue;
        }
        let Some(doc) = doc_manager.get(&req.uri) else {
            continue;
        };

        let diagnostics = service.validate(&doc).await;

        if !doc_manager.is_current(&req.uri, doc.version) {
            tracing::debug!(uri = %req.uri, version = doc.version, "Dropping stale diagnostics");
            continue;
        }
        client
            .publish_diagnostics(req.uri, diagnostics, Some(doc.version))
            .await;
    }
}
