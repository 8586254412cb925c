use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "yaml-ls")]
#[command(version)]
#[command(about = "Schema-aware YAML validation and language server", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Validate YAML files against their configured schemas
    Validate {
        /// YAML files to validate
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Settings file (JSON or YAML, same keys as the editor settings)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Schema applied to every file
        #[arg(short, long)]
        schema: Option<PathBuf>,

        /// Custom tag declaration such as "!Ref sequence" (repeatable)
        #[arg(short = 't', long = "custom-tag")]
        custom_tags: Vec<String>,
    },

    /// Start the language server on stdin/stdout
    Serve,
}
