//! Demo dataset.
//!
//! Everything is written in one transaction over several saves, so a
//! failure part way leaves no partial dataset behind.

use serde::Serialize;
use tracing::info;

use shipping_core::AppError;
use shipping_core::traits::StorageEngine;
use shipping_data::UnitOfWork;
use shipping_entity::{
    Branch, City, DiscountKind, Governorate, Merchant, Order, OrderStatus, Representative,
    RepresentativeGovernorate, UserAccount, UserRole,
};

use crate::output::{self, OutputFormat};

const GEOGRAPHY: &[(&str, &[(&str, f64)])] = &[
    ("Cairo", &[("Nasr City", 50.0), ("Heliopolis", 55.0), ("Maadi", 60.0)]),
    ("Giza", &[("Dokki", 55.0), ("Sheikh Zayed", 75.0)]),
    ("Alexandria", &[("Smouha", 80.0), ("Montaza", 85.0)]),
];

const STORES: &[&str] = &["Nile Books", "Delta Electronics", "Pharos Fashion"];

const CUSTOMERS: &[&str] = &[
    "Ahmed Hassan",
    "Mona Adel",
    "Karim Fathy",
    "Salma Nabil",
    "Omar Youssef",
    "Laila Samir",
];

const ORDER_COUNT: usize = 24;

/// Rows written by [`seed_demo`]
#[derive(Debug, Default, Serialize)]
pub struct SeedSummary {
    pub governorates: usize,
    pub cities: usize,
    pub branches: usize,
    pub merchants: usize,
    pub representatives: usize,
    pub orders: usize,
}

impl SeedSummary {
    /// Print the summary in the selected format
    pub fn print(&self, format: OutputFormat) {
        match format {
            OutputFormat::Table => {
                output::print_success("Demo dataset written");
                output::print_kv("Governorates", &self.governorates.to_string());
                output::print_kv("Cities", &self.cities.to_string());
                output::print_kv("Branches", &self.branches.to_string());
                output::print_kv("Merchants", &self.merchants.to_string());
                output::print_kv("Representatives", &self.representatives.to_string());
                output::print_kv("Orders", &self.orders.to_string());
            }
            OutputFormat::Json => output::print_item(self, format),
        }
    }
}

/// Write the demo dataset through one unit of work.
pub async fn seed_demo(engine: &dyn StorageEngine) -> Result<SeedSummary, AppError> {
    let uow = UnitOfWork::open(engine).await?;
    let result = write_demo(&uow).await;
    uow.close().await?;
    result
}

async fn write_demo(uow: &UnitOfWork) -> Result<SeedSummary, AppError> {
    let tx = uow.begin_transaction().await?;
    let mut summary = SeedSummary::default();

    let mut governorates = Vec::new();
    let mut cities = Vec::new();
    for (name, city_names) in GEOGRAPHY {
        let governorate = Governorate::new(*name);
        for (city_name, price) in *city_names {
            let mut city = City::new(*city_name, governorate.id, *price);
            city.pickup_price = price / 2.0;
            cities.push(city);
        }
        governorates.push(governorate);
    }
    uow.repository::<Governorate>().add_range(&governorates)?;
    uow.repository::<City>().add_range(&cities)?;
    uow.save().await?;
    summary.governorates = governorates.len();
    summary.cities = cities.len();

    // One branch in the first city of every governorate.
    let branches: Vec<Branch> = governorates
        .iter()
        .filter_map(|g| cities.iter().find(|c| c.governorate_id == g.id))
        .map(|city| Branch::new(format!("{} Branch", city.name), city.id))
        .collect();
    uow.repository::<Branch>().add_range(&branches)?;
    uow.save().await?;
    summary.branches = branches.len();

    let mut users = Vec::new();
    let mut merchants = Vec::new();
    for (i, store) in STORES.iter().enumerate() {
        let branch = &branches[i % branches.len()];
        let user = UserAccount::new(
            format!("merchant{}", i + 1),
            format!("merchant{}@example.com", i + 1),
            UserRole::Merchant,
        );
        merchants.push(Merchant::new(user.id, *store, branch.city_id, branch.id));
        users.push(user);
    }

    let mut representatives = Vec::new();
    let mut coverage = Vec::new();
    for (i, branch) in branches.iter().enumerate() {
        let user = UserAccount::new(
            format!("rep{}", i + 1),
            format!("rep{}@example.com", i + 1),
            UserRole::Representative,
        );
        let (kind, share) = if i % 2 == 0 {
            (DiscountKind::Percentage, 20.0)
        } else {
            (DiscountKind::Fixed, 15.0)
        };
        let representative = Representative::new(user.id, branch.id, kind, share);
        coverage.push(representative.cover(governorates[i % governorates.len()].id));
        representatives.push(representative);
        users.push(user);
    }

    uow.repository::<UserAccount>().add_range(&users)?;
    uow.repository::<Merchant>().add_range(&merchants)?;
    uow.repository::<Representative>().add_range(&representatives)?;
    uow.repository::<RepresentativeGovernorate>()
        .add_range(&coverage)?;
    uow.save().await?;
    summary.merchants = merchants.len();
    summary.representatives = representatives.len();

    let orders: Vec<Order> = (0..ORDER_COUNT)
        .map(|i| {
            let merchant = &merchants[i % merchants.len()];
            let city = &cities[i % cities.len()];
            let mut order = Order::new(
                merchant,
                city,
                CUSTOMERS[i % CUSTOMERS.len()],
                format!("010{:08}", 1_000 + i),
                120.0 + 35.0 * i as f64,
            );
            order.total_weight = 0.5 + (i % 5) as f64;
            if i % 3 != 0 {
                order.assign(representatives[i % representatives.len()].id);
            }
            order.status = OrderStatus::ALL[i % OrderStatus::ALL.len()];
            order
        })
        .collect();
    uow.repository::<Order>().add_range(&orders)?;
    uow.save().await?;
    summary.orders = orders.len();

    tx.commit().await?;
    info!(
        governorates = summary.governorates,
        cities = summary.cities,
        orders = summary.orders,
        "Seeded demo dataset"
    );
    Ok(summary)
}
