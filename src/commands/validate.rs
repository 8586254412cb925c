use crate::document::TextDocument;
use crate::schema::{FileSchemaFetcher, SchemaConfiguration};
use crate::service::{LanguageService, LanguageSettings};
use crate::{Result, YamlLsError};
use colored::*;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tower_lsp::lsp_types::{Diagnostic, Url};

/// Options collected from the `validate` subcommand
#[derive(Debug, Clone, Default)]
pub struct ValidateOptions {
    pub config: Option<PathBuf>,
    pub schema: Option<PathBuf>,
    pub custom_tags: Vec<String>,
}

pub async fn execute_validate(files: &[PathBuf], options: &ValidateOptions) -> Result<()> {
    let settings = build_settings(options)?;
    // Reject bad declarations up front instead of skipping them silently
    settings.validate_custom_tags()?;

    let service = LanguageService::with_settings(Arc::new(FileSchemaFetcher), settings);

    let mut error_count = 0;
    for path in files {
        println!("{}", format!("Validating {}...", path.display()).bright_blue());

        let document = load_document(path).await?;
        let diagnostics = service.validate(&document).await;

        if diagnostics.is_empty() {
            println!("{}", "✓ No problems found".green());
        } else {
            for diagnostic in &diagnostics {
                println!("  {}", format_diagnostic(path, diagnostic));
            }
            println!(
                "{}",
                format!("✗ {} problem(s)", diagnostics.len()).red().bold()
            );
        }
        println!();
        error_count += diagnostics.len();
    }

    if error_count > 0 {
        return Err(YamlLsError::ValidationFailed(error_count));
    }

    println!("{}", "✓ All files are valid".green().bold());
    Ok(())
}

fn build_settings(options: &ValidateOptions) -> Result<LanguageSettings> {
    let mut settings = match &options.config {
        Some(path) => LanguageSettings::from_file(path)?,
        None => LanguageSettings::default(),
    };

    if let Some(schema) = &options.schema {
        // An explicit schema applies to every file given on the command line
        settings
            .schemas
            .push(SchemaConfiguration::new(file_uri(schema)?.to_string(), ["**/*"]));
    }
    for tag in &options.custom_tags {
        settings = settings.with_custom_tag(tag.clone());
    }

    Ok(settings)
}

async fn load_document(path: &Path) -> Result<TextDocument> {
    let text = tokio::fs::read_to_string(path).await?;
    Ok(TextDocument::new(file_uri(path)?, 0, text))
}

fn file_uri(path: &Path) -> Result<Url> {
    let absolute = std::path::absolute(path)?;
    Url::from_file_path(&absolute).map_err(|_| {
        YamlLsError::InvalidSettings(format!("cannot express {} as a URI", absolute.display()))
    })
}

fn format_diagnostic(path: &Path, diagnostic: &Diagnostic) -> String {
    let start = diagnostic.range.start;
    let location = format!("{}:{}:{}", path.display(), start.line + 1, start.character + 1);
    let source = diagnostic.source.as_deref().unwrap_or("yaml-ls");

    format!(
        "{} {} {} {}",
        location.bold(),
        "error".red(),
        diagnostic.message,
        format!("({})", source).dimmed()
    )
}
