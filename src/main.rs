use clap::Parser;
use yaml_ls::{
    Result,
    cli::{Cli, Commands},
    commands::{self, validate::ValidateOptions},
    telemetry,
};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Err(e) = telemetry::init_logging() {
        eprintln!("{}", e);
    }

    match cli.command {
        Commands::Validate {
            files,
            config,
            schema,
            custom_tags,
        } => {
            let options = ValidateOptions {
                config,
                schema,
                custom_tags,
            };
            commands::execute_validate(&files, &options).await?;
        }
        Commands::Serve => {
            commands::execute_serve().await?;
        }
    }

    Ok(())
}
