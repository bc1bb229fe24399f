//! Integration tests for `GenericRepository` over the memory engine.

mod helpers;

use shipping_core::error::ErrorKind;
use shipping_core::types::FilterField;
use shipping_core::{CountSpecification, Include, Specification};
use shipping_data::MemoryEngine;
use shipping_entity::{Branch, City, Governorate, Merchant, Order, OrderStatus, UserAccount};

#[tokio::test]
async fn test_get_by_id_after_add_and_save() {
    let engine = MemoryEngine::new();
    let geo = helpers::seed_geography(&engine).await;

    let uow = helpers::open(&engine).await;
    let city = uow
        .repository::<City>()
        .get_by_id(&geo.city.id)
        .await
        .expect("query")
        .expect("city exists");

    assert_eq!(city.name, "Nasr City");
    assert_eq!(city.governorate_id, geo.governorate.id);
    assert!(city.governorate.is_none());
}

#[tokio::test]
async fn test_get_by_id_after_delete_is_none() {
    let engine = MemoryEngine::new();
    let geo = helpers::seed_geography(&engine).await;
    let branches = helpers::seed_branches(&engine, &geo.city, &["Zamalek".to_string()]).await;

    let uow = helpers::open(&engine).await;
    let repo = uow.repository::<Branch>();
    let branch = repo.require_by_id(&branches[0].id).await.expect("load");
    repo.delete(&branch).expect("stage delete");
    assert_eq!(uow.save().await.expect("save"), 1);

    assert!(repo.get_by_id(&branch.id).await.expect("query").is_none());
    let err = repo.require_by_id(&branch.id).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::NotFound);
}

#[tokio::test]
async fn test_get_by_spec_returns_first_match_or_none() {
    let engine = MemoryEngine::new();
    let fixture = helpers::seed_merchant(&engine).await;

    let uow = helpers::open(&engine).await;
    let repo = uow.repository::<Merchant>();

    let merchant = repo
        .get_by_spec(&Merchant::for_user(fixture.user.id))
        .await
        .expect("query")
        .expect("merchant for user");
    assert_eq!(merchant.id, fixture.merchant.id);
    assert_eq!(
        merchant.user.as_ref().map(|u| u.user_name.as_str()),
        Some("store.owner")
    );

    let stranger = UserAccount::new("stranger", "stranger@example.com", shipping_entity::UserRole::Merchant);
    let missing = repo
        .get_by_spec(&Merchant::for_user(stranger.id))
        .await
        .expect("query");
    assert!(missing.is_none());
}

#[tokio::test]
async fn test_reference_and_collection_includes() {
    let engine = MemoryEngine::new();
    let geo = helpers::seed_geography(&engine).await;

    let uow = helpers::open(&engine).await;
    let second = City::new("Heliopolis", geo.governorate.id, 45.0);
    uow.repository::<City>().add(&second).expect("stage");
    uow.save().await.expect("save");

    let spec = Specification::<City>::all()
        .include(Include::reference::<Governorate>("governorate", "governorate_id"))
        .order_by("name");
    let cities = uow
        .repository::<City>()
        .get_all_by_spec(&spec)
        .await
        .expect("query");
    assert_eq!(cities.len(), 2);
    assert_eq!(cities[0].name, "Heliopolis");
    assert!(
        cities
            .iter()
            .all(|c| c.governorate.as_ref().map(|g| g.name.as_str()) == Some("Cairo"))
    );

    let spec = Specification::<Governorate>::all()
        .include(Include::collection::<City>("cities", "governorate_id"));
    let governorates = uow
        .repository::<Governorate>()
        .get_all_by_spec(&spec)
        .await
        .expect("query");
    assert_eq!(governorates.len(), 1);
    assert_eq!(governorates[0].cities.len(), 2);
}

#[tokio::test]
async fn test_order_by_included_path() {
    let engine = MemoryEngine::new();
    let geo = helpers::seed_geography(&engine).await;

    let uow = helpers::open(&engine).await;
    let other = City::new("Alexandria", geo.governorate.id, 70.0);
    uow.repository::<City>().add(&other).expect("stage");
    uow.save().await.expect("save");
    let branches = [
        Branch::new("North", geo.city.id),
        Branch::new("South", other.id),
    ];
    uow.repository::<Branch>().add_range(&branches).expect("stage");
    uow.save().await.expect("save");

    let spec = Specification::<Branch>::all()
        .include(Include::reference::<City>("city", "city_id"))
        .order_by("city.name");
    let names: Vec<String> = uow
        .repository::<Branch>()
        .get_all_by_spec(&spec)
        .await
        .expect("query")
        .into_iter()
        .map(|b| b.name)
        .collect();
    assert_eq!(names, vec!["South", "North"]);
}

#[tokio::test]
async fn test_navigation_fields_are_not_persisted() {
    let engine = MemoryEngine::new();
    let geo = helpers::seed_geography(&engine).await;

    let uow = helpers::open(&engine).await;
    let repo = uow.repository::<City>();
    let spec = Specification::<City>::matching(FilterField::eq("name", "Nasr City"))
        .include(Include::reference::<Governorate>("governorate", "governorate_id"));
    let mut city = repo.get_by_spec(&spec).await.expect("query").expect("city");
    assert!(city.governorate.is_some());

    city.shipping_price = 65.0;
    repo.update(&city).expect("stage update");
    uow.save().await.expect("save");

    let reloaded = repo.require_by_id(&geo.city.id).await.expect("reload");
    assert_eq!(reloaded.shipping_price, 65.0);
    assert!(reloaded.governorate.is_none());
}

#[tokio::test]
async fn test_update_after_add_coalesces_into_one_insert() {
    let engine = MemoryEngine::new();
    let geo = helpers::seed_geography(&engine).await;

    let uow = helpers::open(&engine).await;
    let repo = uow.repository::<Branch>();
    let mut branch = Branch::new("Maadi", geo.city.id);
    repo.add(&branch).expect("stage insert");
    branch.name = "Maadi Central".to_string();
    repo.update(&branch).expect("stage update");

    assert_eq!(uow.save().await.expect("save"), 1);
    let stored = repo.require_by_id(&branch.id).await.expect("load");
    assert_eq!(stored.name, "Maadi Central");
}

#[tokio::test]
async fn test_delete_after_add_cancels_insert() {
    let engine = MemoryEngine::new();
    let geo = helpers::seed_geography(&engine).await;

    let uow = helpers::open(&engine).await;
    let repo = uow.repository::<Branch>();
    let branch = Branch::new("Temporary", geo.city.id);
    repo.add(&branch).expect("stage insert");
    repo.delete(&branch).expect("stage delete");

    assert!(!uow.has_changes());
    assert_eq!(uow.save().await.expect("save"), 0);
    assert!(repo.get_by_id(&branch.id).await.expect("query").is_none());
}

#[tokio::test]
async fn test_unique_violation_on_save() {
    let engine = MemoryEngine::new();
    let geo = helpers::seed_geography(&engine).await;
    helpers::seed_branches(&engine, &geo.city, &["Giza".to_string()]).await;

    let uow = helpers::open(&engine).await;
    uow.repository::<Branch>()
        .add(&Branch::new("Giza", geo.city.id))
        .expect("stage");
    let err = uow.save().await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::ConstraintViolation);
}

#[tokio::test]
async fn test_missing_reference_on_save() {
    let engine = MemoryEngine::new();
    let geo = helpers::seed_geography(&engine).await;
    let detached_city = City::new("Nowhere", geo.governorate.id, 10.0);

    let uow = helpers::open(&engine).await;
    uow.repository::<Branch>()
        .add(&Branch::new("Orphan", detached_city.id))
        .expect("stage");
    let err = uow.save().await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::ConstraintViolation);
}

#[tokio::test]
async fn test_delete_of_referenced_row_is_restricted() {
    let engine = MemoryEngine::new();
    let geo = helpers::seed_geography(&engine).await;

    let uow = helpers::open(&engine).await;
    let repo = uow.repository::<Governorate>();
    let governorate = repo.require_by_id(&geo.governorate.id).await.expect("load");
    repo.delete(&governorate).expect("stage");
    let err = uow.save().await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::ConstraintViolation);
    assert!(repo.get_by_id(&geo.governorate.id).await.expect("query").is_some());
}

#[tokio::test]
async fn test_order_status_filter_and_count() {
    let engine = MemoryEngine::new();
    let fixture = helpers::seed_merchant(&engine).await;

    let uow = helpers::open(&engine).await;
    let mut orders: Vec<Order> = (0..5u32)
        .map(|i| {
            Order::new(
                &fixture.merchant,
                &fixture.geography.city,
                format!("Customer {i}"),
                format!("0100000000{i}"),
                100.0 * f64::from(i + 1),
            )
        })
        .collect();
    orders[0].status = OrderStatus::Delivered;
    orders[1].status = OrderStatus::Delivered;
    uow.repository::<Order>().add_range(&orders).expect("stage");
    uow.save().await.expect("save");

    let spec = CountSpecification::<Order>::matching(FilterField::eq("status", "delivered"));
    let delivered = uow
        .repository::<Order>()
        .get_count(&spec)
        .await
        .expect("count");
    assert_eq!(delivered, 2);
    assert_eq!(
        uow.repository::<Order>()
            .get_count(&CountSpecification::all())
            .await
            .expect("count"),
        5
    );
}

#[tokio::test]
async fn test_repeated_reads_are_identical() {
    let engine = MemoryEngine::new();
    let geo = helpers::seed_geography(&engine).await;
    helpers::seed_branches(&engine, &geo.city, &helpers::numbered("Branch", 12)).await;

    let uow = helpers::open(&engine).await;
    let repo = uow.repository::<Branch>();
    let spec = Specification::<Branch>::all().order_by_descending("created_at");
    let first: Vec<_> = repo
        .get_all_by_spec(&spec)
        .await
        .expect("query")
        .into_iter()
        .map(|b| b.id)
        .collect();
    let second: Vec<_> = repo
        .get_all_by_spec(&spec)
        .await
        .expect("query")
        .into_iter()
        .map(|b| b.id)
        .collect();
    assert_eq!(first.len(), 12);
    assert_eq!(first, second);
}
