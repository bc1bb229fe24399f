//! Order listing CLI commands.

use chrono::{DateTime, Utc};
use clap::{Args, Subcommand};
use serde::Serialize;
use tabled::Tabled;

use shipping_core::specification::PagingParams;
use shipping_core::traits::StorageEngine;
use shipping_core::types::{BranchId, CityId, MerchantId, RepresentativeId};
use shipping_core::{AppError, CountSpecification};
use shipping_data::UnitOfWork;
use shipping_entity::{Order, OrderParams, OrderStatus};

use super::PagingArgs;
use crate::output::{self, OutputFormat};

/// Arguments for order commands
#[derive(Debug, Args)]
pub struct OrderArgs {
    /// Order subcommand
    #[command(subcommand)]
    pub command: OrderCommand,
}

/// Order subcommands
#[derive(Debug, Subcommand)]
pub enum OrderCommand {
    /// List orders one page at a time
    List {
        #[command(flatten)]
        filter: OrderFilterArgs,
        #[command(flatten)]
        paging: PagingArgs,
    },
    /// Count the orders a listing with the same filters would page through
    Count {
        #[command(flatten)]
        filter: OrderFilterArgs,
    },
}

/// Filters shared by `order list` and `order count`
#[derive(Debug, Clone, Args)]
pub struct OrderFilterArgs {
    /// Search customer name and phone
    #[arg(short, long)]
    search: Option<String>,
    /// Only this merchant's orders
    #[arg(long)]
    merchant_id: Option<MerchantId>,
    /// Only orders assigned to this representative
    #[arg(long)]
    representative_id: Option<RepresentativeId>,
    /// Only orders handled by this branch
    #[arg(long)]
    branch_id: Option<BranchId>,
    /// Only orders delivered to this city
    #[arg(long)]
    city_id: Option<CityId>,
    /// Any of these statuses (repeatable)
    #[arg(long = "status")]
    statuses: Vec<OrderStatus>,
    /// Filter on the soft-delete flag
    #[arg(long)]
    deleted: Option<bool>,
    /// Lowest total cost (inclusive)
    #[arg(long)]
    min_cost: Option<f64>,
    /// Highest total cost (inclusive)
    #[arg(long)]
    max_cost: Option<f64>,
    /// Created at or after (RFC 3339)
    #[arg(long)]
    from: Option<DateTime<Utc>>,
    /// Created at or before (RFC 3339)
    #[arg(long)]
    to: Option<DateTime<Utc>>,
}

impl OrderFilterArgs {
    fn params(&self, paging: PagingParams) -> OrderParams {
        OrderParams {
            paging,
            search: self.search.clone(),
            merchant_id: self.merchant_id,
            representative_id: self.representative_id,
            branch_id: self.branch_id,
            city_id: self.city_id,
            statuses: (!self.statuses.is_empty()).then(|| self.statuses.clone()),
            is_deleted: self.deleted,
            min_cost: self.min_cost,
            max_cost: self.max_cost,
            from_date: self.from,
            to_date: self.to,
        }
    }
}

/// Order display row for table output
#[derive(Debug, Serialize, Tabled)]
struct OrderRow {
    id: String,
    customer: String,
    phone: String,
    merchant: String,
    city: String,
    status: String,
    total_cost: String,
    created_at: String,
}

impl From<Order> for OrderRow {
    fn from(order: Order) -> Self {
        Self {
            id: order.id.to_string(),
            customer: order.customer_name,
            phone: order.customer_phone,
            merchant: order.merchant.map(|m| m.store_name).unwrap_or_default(),
            city: order.city.map(|c| c.name).unwrap_or_default(),
            status: order.status.to_string(),
            total_cost: output::money(order.total_cost),
            created_at: order.created_at.format("%Y-%m-%d %H:%M").to_string(),
        }
    }
}

/// Execute order commands
pub async fn execute(
    args: &OrderArgs,
    engine: &dyn StorageEngine,
    format: OutputFormat,
) -> Result<(), AppError> {
    match &args.command {
        OrderCommand::List { filter, paging } => {
            let params = filter.params(paging.params());

            let uow = UnitOfWork::open(engine).await?;
            let page = uow.repository::<Order>().get_page(&params).await;
            uow.close().await?;

            output::print_page(&output::map_page(page?, OrderRow::from), format);
        }
        OrderCommand::Count { filter } => {
            let spec = CountSpecification::from_params(&filter.params(PagingParams::default()))?;

            let uow = UnitOfWork::open(engine).await?;
            let count = uow.repository::<Order>().get_count(&spec).await;
            uow.close().await?;
            let count = count?;

            match format {
                OutputFormat::Table => output::print_kv("Orders", &count.to_string()),
                OutputFormat::Json => output::print_item(&serde_json::json!({ "count": count }), format),
            }
        }
    }

    Ok(())
}
