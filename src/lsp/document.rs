use crate::document::TextDocument;
use dashmap::DashMap;
use tokio::sync::mpsc;
use tokio::time::{Duration, sleep};
use tower_lsp::lsp_types::Url;

const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(300);

/// Request to validate one version of a document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationRequest {
    pub uri: Url,
    pub version: i32,
}

/// Manages open documents and schedules their validation
pub struct DocumentManager {
    documents: DashMap<Url, TextDocument>,
    validation_tx: mpsc::Sender<ValidationRequest>,
    debounce: Duration,
}

impl DocumentManager {
    pub fn new(validation_tx: mpsc::Sender<ValidationRequest>) -> Self {
        Self::with_debounce(validation_tx, DEFAULT_DEBOUNCE)
    }

    pub fn with_debounce(validation_tx: mpsc::Sender<ValidationRequest>, debounce: Duration) -> Self {
        Self {
            documents: DashMap::new(),
            validation_tx,
            debounce,
        }
    }

    /// Add or update a document and schedule its validation
    pub fn update(&self, uri: Url, version: i32, text: String) {
        self.documents
            .insert(uri.clone(), TextDocument::new(uri.clone(), version, text));
        self.schedule_validation(uri, version);
    }

    /// Get a snapshot of a document
    pub fn get(&self, uri: &Url) -> Option<TextDocument> {
        self.documents.get(uri).map(|doc| doc.clone())
    }

    pub fn remove(&self, uri: &Url) {
        self.documents.remove(uri);
    }

    pub fn uris(&self) -> Vec<Url> {
        self.documents.iter().map(|entry| entry.key().clone()).collect()
    }

    /// Whether `version` is still the latest version of the document
    pub fn is_current(&self, uri: &Url, version: i32) -> bool {
        self.documents
            .get(uri)
            .is_some_and(|doc| doc.version == version)
    }

    /// Re-validate every open document, e.g. after a settings change
    pub fn revalidate_all(&self) {
        for entry in self.documents.iter() {
            self.schedule_validation(entry.key().clone(), entry.version);
        }
    }

    /// Schedule validation with debouncing. Requests for versions that have
    /// been superseded by the time the delay ends are dropped.
    fn schedule_validation(&self, uri: Url, version: i32) {
        let tx = self.validation_tx.clone();
        let debounce = self.debounce;
        tokio::spawn(async move {
            sleep(debounce).await;
            let _ = tx.send(ValidationRequest { uri, version }).await;
        });
    }
}
