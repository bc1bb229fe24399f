//! Branch listing CLI commands.

use clap::{Args, Subcommand};
use serde::Serialize;
use tabled::Tabled;

use shipping_core::AppError;
use shipping_core::traits::StorageEngine;
use shipping_core::types::CityId;
use shipping_data::UnitOfWork;
use shipping_entity::{Branch, BranchParams};

use super::PagingArgs;
use crate::output::{self, OutputFormat};

/// Arguments for branch commands
#[derive(Debug, Args)]
pub struct BranchArgs {
    /// Branch subcommand
    #[command(subcommand)]
    pub command: BranchCommand,
}

/// Branch subcommands
#[derive(Debug, Subcommand)]
pub enum BranchCommand {
    /// List branches one page at a time
    List {
        /// Case-insensitive name search
        #[arg(short, long)]
        search: Option<String>,
        /// Only branches in this city
        #[arg(long)]
        city_id: Option<CityId>,
        /// Filter on the soft-delete flag
        #[arg(long)]
        deleted: Option<bool>,
        #[command(flatten)]
        paging: PagingArgs,
    },
}

/// Branch display row for table output
#[derive(Debug, Serialize, Tabled)]
struct BranchRow {
    /// Branch ID
    id: String,
    /// Name
    name: String,
    /// City name
    city: String,
    /// Soft-deleted
    deleted: bool,
    /// Created at
    created_at: String,
}

impl From<Branch> for BranchRow {
    fn from(branch: Branch) -> Self {
        Self {
            id: branch.id.to_string(),
            name: branch.name,
            city: branch.city.map(|c| c.name).unwrap_or_default(),
            deleted: branch.is_deleted,
            created_at: branch.created_at.format("%Y-%m-%d %H:%M").to_string(),
        }
    }
}

/// Execute branch commands
pub async fn execute(
    args: &BranchArgs,
    engine: &dyn StorageEngine,
    format: OutputFormat,
) -> Result<(), AppError> {
    match &args.command {
        BranchCommand::List {
            search,
            city_id,
            deleted,
            paging,
        } => {
            let params = BranchParams {
                paging: paging.params(),
                search: search.clone(),
                city_id: *city_id,
                is_deleted: *deleted,
            };

            let uow = UnitOfWork::open(engine).await?;
            let page = uow.repository::<Branch>().get_page(&params).await;
            uow.close().await?;

            output::print_page(&output::map_page(page?, BranchRow::from), format);
        }
    }

    Ok(())
}
