//! Shared fixtures for shipping-data integration tests.

#![allow(dead_code)]

use shipping_data::{MemoryEngine, UnitOfWork};
use shipping_entity::{Branch, City, Governorate, Merchant, UserAccount, UserRole};

/// A governorate with one city.
pub struct Geography {
    pub governorate: Governorate,
    pub city: City,
}

/// A merchant with its user and branch, inside a [`Geography`].
pub struct MerchantFixture {
    pub geography: Geography,
    pub branch: Branch,
    pub user: UserAccount,
    pub merchant: Merchant,
}

/// Open a unit of work on `engine`.
pub async fn open(engine: &MemoryEngine) -> UnitOfWork {
    UnitOfWork::open(engine)
        .await
        .expect("Failed to open unit of work")
}

/// `count` names of the form `"{prefix} 01"`, sortable by name.
pub fn numbered(prefix: &str, count: usize) -> Vec<String> {
    (1..=count).map(|i| format!("{prefix} {i:02}")).collect()
}

/// Persist one governorate and one city.
pub async fn seed_geography(engine: &MemoryEngine) -> Geography {
    let governorate = Governorate::new("Cairo");
    let city = City::new("Nasr City", governorate.id, 50.0);

    let uow = open(engine).await;
    uow.repository::<Governorate>()
        .add(&governorate)
        .expect("stage governorate");
    uow.repository::<City>().add(&city).expect("stage city");
    uow.save().await.expect("save geography");
    uow.close().await.expect("close");

    Geography { governorate, city }
}

/// Persist one branch per name in `city`, in the given order.
pub async fn seed_branches(engine: &MemoryEngine, city: &City, names: &[String]) -> Vec<Branch> {
    let branches: Vec<Branch> = names
        .iter()
        .map(|name| Branch::new(name.clone(), city.id))
        .collect();

    let uow = open(engine).await;
    uow.repository::<Branch>()
        .add_range(&branches)
        .expect("stage branches");
    uow.save().await.expect("save branches");
    uow.close().await.expect("close");
    branches
}

/// Persist a full merchant graph: geography, branch, user, merchant.
pub async fn seed_merchant(engine: &MemoryEngine) -> MerchantFixture {
    let geography = seed_geography(engine).await;
    let branch = Branch::new("Downtown", geography.city.id);
    let user = UserAccount::new("store.owner", "owner@example.com", UserRole::Merchant);
    let merchant = Merchant::new(user.id, "Owner's Store", geography.city.id, branch.id);

    let uow = open(engine).await;
    uow.repository::<Branch>().add(&branch).expect("stage branch");
    uow.repository::<UserAccount>().add(&user).expect("stage user");
    uow.repository::<Merchant>()
        .add(&merchant)
        .expect("stage merchant");
    uow.save().await.expect("save merchant graph");
    uow.close().await.expect("close");

    MerchantFixture {
        geography,
        branch,
        user,
        merchant,
    }
}
