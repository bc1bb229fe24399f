//! CLI command definitions and dispatch.

pub mod branch;
pub mod city;
pub mod config;
pub mod order;
pub mod seed;

use clap::{Args, Parser, Subcommand};

use shipping_core::AppError;
use shipping_core::config::{AppConfig, StorageEngineKind};
use shipping_core::specification::PagingParams;
use shipping_data::connect_engine;

use crate::output::{self, OutputFormat};

/// Shipping back-office data browser
#[derive(Debug, Parser)]
#[command(name = "shipping", version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/default.toml")]
    pub config: String,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    pub format: OutputFormat,

    /// Write the demo dataset before running the command
    #[arg(long)]
    pub demo: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level commands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Branch listings
    Branch(branch::BranchArgs),
    /// City listings
    City(city::CityArgs),
    /// Order listings and counts
    Order(order::OrderArgs),
    /// Write the demo dataset
    Seed,
    /// Configuration management
    Config(config::ConfigArgs),
}

/// Paging and sorting flags shared by every `list` command
#[derive(Debug, Clone, Args)]
pub struct PagingArgs {
    /// 1-based page index
    #[arg(long, default_value_t = 1)]
    pub page: u64,

    /// Rows per page (clamped to 1..=100)
    #[arg(long, default_value_t = 10)]
    pub page_size: u64,

    /// Sort as `{field}_{asc|desc}`, e.g. `name_desc`
    #[arg(long)]
    pub sort: Option<String>,
}

impl PagingArgs {
    /// The parameter-object form of these flags.
    pub fn params(&self) -> PagingParams {
        let paging = PagingParams::new(self.page, self.page_size);
        match &self.sort {
            Some(sort) => paging.sorted(sort.clone()),
            None => paging,
        }
    }
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(&self, config: &AppConfig) -> Result<(), AppError> {
        if let Commands::Config(args) = &self.command {
            return config::execute(args, &self.config, config, self.format);
        }

        let engine = connect_engine(config).await?;
        if self.demo || matches!(self.command, Commands::Seed) {
            if config.storage.engine != StorageEngineKind::Memory {
                output::print_warning(&format!(
                    "Writing demo data into the {} engine",
                    config.storage.engine
                ));
            }
            let summary = seed::seed_demo(engine.as_ref()).await?;
            if matches!(self.command, Commands::Seed) {
                summary.print(self.format);
            }
        }

        match &self.command {
            Commands::Branch(args) => branch::execute(args, engine.as_ref(), self.format).await,
            Commands::City(args) => city::execute(args, engine.as_ref(), self.format).await,
            Commands::Order(args) => order::execute(args, engine.as_ref(), self.format).await,
            Commands::Seed | Commands::Config(_) => Ok(()),
        }
    }
}
