//! The language service facade: configuration plus the `validate` and
//! `hover` entry points editors and the CLI call.
mod diagnostic;
mod settings;

pub use diagnostic::{SYNTAX_SOURCE, schema_source};
pub use settings::{CustomTagEntry, LanguageSettings};

use crate::document::{TextDocument, split, splitter::segment_at};
use crate::query::{describe, locate};
use crate::schema::{SchemaFetcher, SchemaResolver, modeline_schema};
use crate::syntax::{CustomTags, SyntaxErrorKind, parse};
use crate::validation::{self, ValidationOptions};
use diagnostic::PendingDiagnostic;
use std::sync::{Arc, PoisonError, RwLock};
use tower_lsp::lsp_types::{Diagnostic, Hover, HoverContents, MarkedString, Position};

/// Everything derived from one `configure` call.
struct ServiceState {
    settings: LanguageSettings,
    custom_tags: CustomTags,
    resolver: SchemaResolver,
    options: ValidationOptions,
}

impl ServiceState {
    fn new(settings: LanguageSettings, fetcher: Arc<dyn SchemaFetcher>) -> Self {
        let custom_tags = CustomTags::new(settings.custom_tag_specs());
        let resolver = SchemaResolver::new(
            &settings.schemas,
            settings.schema_merge_policy,
            fetcher,
            settings.fetch_timeout(),
        );
        let options = ValidationOptions {
            disable_additional_properties: settings.disable_additional_properties,
        };

        Self {
            settings,
            custom_tags,
            resolver,
            options,
        }
    }
}

/// YAML language service. Each instance holds its own settings; calls work on
/// a snapshot taken when they start, so a concurrent `configure` never tears
/// an in-flight call.
pub struct LanguageService {
    fetcher: Arc<dyn SchemaFetcher>,
    state: RwLock<Arc<ServiceState>>,
}

impl LanguageService {
    pub fn new(fetcher: Arc<dyn SchemaFetcher>) -> Self {
        Self::with_settings(fetcher, LanguageSettings::default())
    }

    pub fn with_settings(fetcher: Arc<dyn SchemaFetcher>, settings: LanguageSettings) -> Self {
        let state = ServiceState::new(settings, fetcher.clone());
        Self {
            fetcher,
            state: RwLock::new(Arc::new(state)),
        }
    }

    /// Replace the settings. Bindings, custom tags and cached schemas from the
    /// previous configuration are dropped.
    pub fn configure(&self, settings: LanguageSettings) {
        tracing::info!(
            schemas = settings.schemas.len(),
            custom_tags = settings.custom_tags.len(),
            "Language service configured"
        );
        let state = Arc::new(ServiceState::new(settings, self.fetcher.clone()));
        *self.state.write().unwrap_or_else(PoisonError::into_inner) = state;
    }

    pub fn settings(&self) -> LanguageSettings {
        self.snapshot().settings.clone()
    }

    fn snapshot(&self) -> Arc<ServiceState> {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Diagnose every document in the buffer, in document order. Within each
    /// document diagnostics are ordered by start position.
    pub async fn validate(&self, document: &TextDocument) -> Vec<Diagnostic> {
        let state = self.snapshot();
        if !state.settings.validate {
            return Vec::new();
        }

        let line_index = document.line_index();
        let mut diagnostics = Vec::new();

        for segment in split(&document.text) {
            if segment.is_blank() {
                continue;
            }

            let parsed = parse(&segment, &state.custom_tags);
            let mut pending: Vec<PendingDiagnostic> = parsed
                .errors
                .iter()
                .map(PendingDiagnostic::from_syntax_error)
                .collect();

            // A partial tree would only produce noise against the schema.
            let broken = parsed.errors.iter().any(|e| e.kind == SyntaxErrorKind::Parse);
            if !broken && parsed.tree.root().is_some() {
                let modeline = modeline_schema(segment.raw_text);
                let schemas = state.resolver.resolve(&document.uri, modeline).await;
                for schema in &schemas {
                    let problems = validation::validate(&parsed.tree, schema, &state.options);
                    pending.extend(
                        problems
                            .into_iter()
                            .map(|p| PendingDiagnostic::from_schema_problem(p, &schema.uri)),
                    );
                }
            }

            pending.sort_by_key(|d| d.range.start);
            diagnostics.extend(pending.into_iter().map(|d| d.into_diagnostic(&line_index)));
        }

        tracing::debug!(uri = %document.uri, count = diagnostics.len(), "Validated document");
        diagnostics
    }

    /// Hover for the node under `position`: one entry per applicable schema
    /// that describes it.
    pub async fn hover(&self, document: &TextDocument, position: Position) -> Option<Hover> {
        let state = self.snapshot();
        if !state.settings.hover {
            return None;
        }

        let line_index = document.line_index();
        let offset = line_index.offset_at(position);
        let segments = split(&document.text);
        let segment = segments.get(segment_at(&segments, offset)?)?;

        let parsed = parse(segment, &state.custom_tags);
        let node = locate(&parsed.tree, offset)?;

        let modeline = modeline_schema(segment.raw_text);
        let schemas = state.resolver.resolve(&document.uri, modeline).await;

        let mut contents: Vec<String> = Vec::new();
        for schema in &schemas {
            if let Some(text) = describe(&parsed.tree, node, schema, &state.options) {
                if !contents.contains(&text) {
                    contents.push(text);
                }
            }
        }
        if contents.is_empty() {
            return None;
        }

        Some(Hover {
            contents: HoverContents::Array(contents.into_iter().map(MarkedString::String).collect()),
            range: Some(line_index.range_of(parsed.tree.node(node).range)),
        })
    }
}
