//! Configuration management CLI commands.

use clap::{Args, Subcommand};

use shipping_core::AppError;
use shipping_core::config::{AppConfig, StorageEngineKind};
use shipping_data::connection::mask_password;

use crate::output::{self, OutputFormat};

/// Arguments for config commands
#[derive(Debug, Args)]
pub struct ConfigArgs {
    /// Config subcommand
    #[command(subcommand)]
    pub command: ConfigCommand,
}

/// Config subcommands
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show the effective configuration (file merged with environment)
    Show,
    /// Validate configuration file
    Validate,
}

/// Execute config commands
pub fn execute(
    args: &ConfigArgs,
    config_path: &str,
    config: &AppConfig,
    format: OutputFormat,
) -> Result<(), AppError> {
    match &args.command {
        ConfigCommand::Show => {
            let mut shown = config.clone();
            shown.database.url = mask_password(&shown.database.url);
            output::print_item(&shown, format);
        }
        ConfigCommand::Validate => {
            if config.storage.engine == StorageEngineKind::Postgres && config.database.url.is_empty() {
                let e = AppError::configuration("The postgres engine needs database.url");
                output::print_error(&format!("Configuration invalid: {}", e));
                return Err(e);
            }
            output::print_success(&format!("Configuration '{}' is valid", config_path));
            output::print_kv("Storage engine", &config.storage.engine.to_string());
            output::print_kv("Database", &mask_password(&config.database.url));
            output::print_kv("Log level", &config.logging.level);
            output::print_kv("Log format", &config.logging.format);
        }
    }

    Ok(())
}
