use crate::document::{LineIndex, TextRange};
use crate::syntax::SyntaxError;
use crate::validation::SchemaProblem;
use tower_lsp::lsp_types::{Diagnostic, DiagnosticSeverity, NumberOrString};

/// Source reported for syntax and tag problems
pub const SYNTAX_SOURCE: &str = "YAML";

/// Source reported for problems found against the schema at `uri`
pub fn schema_source(uri: &str) -> String {
    format!("yaml-schema: {}", uri)
}

/// A diagnostic waiting for position conversion, kept in byte offsets so a
/// document's diagnostics can be ordered before conversion.
#[derive(Debug, Clone)]
pub(crate) struct PendingDiagnostic {
    pub range: TextRange,
    pub code: &'static str,
    pub source: String,
    pub message: String,
}

impl PendingDiagnostic {
    pub fn from_syntax_error(error: &SyntaxError) -> Self {
        Self {
            range: error.range,
            code: error.kind.code(),
            source: SYNTAX_SOURCE.to_string(),
            message: error.message.clone(),
        }
    }

    pub fn from_schema_problem(problem: SchemaProblem, schema_uri: &str) -> Self {
        Self {
            range: problem.range,
            code: problem.kind.code(),
            source: schema_source(schema_uri),
            message: problem.message,
        }
    }

    /// Convert to an LSP Diagnostic
    pub fn into_diagnostic(self, line_index: &LineIndex<'_>) -> Diagnostic {
        Diagnostic {
            range: line_index.range_of(self.range),
            severity: Some(DiagnosticSeverity::ERROR),
            code: Some(NumberOrString::String(self.code.to_string())),
            source: Some(self.source),
            message: self.message,
            ..Default::default()
        }
    }
}
