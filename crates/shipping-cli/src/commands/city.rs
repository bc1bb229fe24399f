//! City listing CLI commands.

use clap::{Args, Subcommand};
use serde::Serialize;
use tabled::Tabled;

use shipping_core::AppError;
use shipping_core::traits::StorageEngine;
use shipping_core::types::GovernorateId;
use shipping_data::UnitOfWork;
use shipping_entity::{City, CityParams};

use super::PagingArgs;
use crate::output::{self, OutputFormat};

/// Arguments for city commands
#[derive(Debug, Args)]
pub struct CityArgs {
    /// City subcommand
    #[command(subcommand)]
    pub command: CityCommand,
}

/// City subcommands
#[derive(Debug, Subcommand)]
pub enum CityCommand {
    /// List cities one page at a time
    List {
        /// Case-insensitive name search
        #[arg(short, long)]
        search: Option<String>,
        /// Only cities in this governorate
        #[arg(long)]
        governorate_id: Option<GovernorateId>,
        /// Filter on the soft-delete flag
        #[arg(long)]
        deleted: Option<bool>,
        /// Lowest shipping price
        #[arg(long)]
        min_price: Option<f64>,
        /// Highest shipping price
        #[arg(long)]
        max_price: Option<f64>,
        #[command(flatten)]
        paging: PagingArgs,
    },
}

/// City display row for table output
#[derive(Debug, Serialize, Tabled)]
struct CityRow {
    id: String,
    name: String,
    governorate: String,
    shipping_price: String,
    pickup_price: String,
    deleted: bool,
}

impl From<City> for CityRow {
    fn from(city: City) -> Self {
        Self {
            id: city.id.to_string(),
            name: city.name,
            governorate: city.governorate.map(|g| g.name).unwrap_or_default(),
            shipping_price: output::money(city.shipping_price),
            pickup_price: output::money(city.pickup_price),
            deleted: city.is_deleted,
        }
    }
}

/// Execute city commands
pub async fn execute(
    args: &CityArgs,
    engine: &dyn StorageEngine,
    format: OutputFormat,
) -> Result<(), AppError> {
    match &args.command {
        CityCommand::List {
            search,
            governorate_id,
            deleted,
            min_price,
            max_price,
            paging,
        } => {
            let params = CityParams {
                paging: paging.params(),
                search: search.clone(),
                governorate_id: *governorate_id,
                is_deleted: *deleted,
                min_shipping_price: *min_price,
                max_shipping_price: *max_price,
            };

            let uow = UnitOfWork::open(engine).await?;
            let page = uow.repository::<City>().get_page(&params).await;
            uow.close().await?;

            output::print_page(&output::map_page(page?, CityRow::from), format);
        }
    }

    Ok(())
}
