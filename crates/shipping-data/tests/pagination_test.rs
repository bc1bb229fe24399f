//! Paging, sorting, and count pairing over the memory engine.

mod helpers;

use proptest::prelude::*;

use shipping_core::error::ErrorKind;
use shipping_core::specification::PagingParams;
use shipping_core::{CountSpecification, Specification};
use shipping_data::MemoryEngine;
use shipping_entity::{Branch, BranchParams, City, CityParams, Governorate};

fn branch_params(page_index: u64, page_size: u64) -> BranchParams {
    BranchParams {
        paging: PagingParams::new(page_index, page_size),
        ..BranchParams::default()
    }
}

#[tokio::test]
async fn test_second_page_of_twenty_five_branches() {
    let engine = MemoryEngine::new();
    let geo = helpers::seed_geography(&engine).await;
    let names = helpers::numbered("Branch", 25);
    helpers::seed_branches(&engine, &geo.city, &names).await;

    let uow = helpers::open(&engine).await;
    let params = BranchParams {
        paging: PagingParams::new(2, 10).sorted("name_asc"),
        ..BranchParams::default()
    };
    let page = uow
        .repository::<Branch>()
        .get_page(&params)
        .await
        .expect("page");

    let returned: Vec<&str> = page.items.iter().map(|b| b.name.as_str()).collect();
    let expected: Vec<&str> = names[10..20].iter().map(String::as_str).collect();
    assert_eq!(returned, expected);
    assert_eq!(page.total_items, 25);
    assert_eq!(page.total_pages, 3);
    assert!(page.has_next);
    assert!(page.has_previous);
}

#[tokio::test]
async fn test_unsorted_pages_follow_key_order() {
    let engine = MemoryEngine::new();
    let geo = helpers::seed_geography(&engine).await;
    let branches = helpers::seed_branches(&engine, &geo.city, &helpers::numbered("Branch", 25)).await;

    let mut keys: Vec<String> = branches.iter().map(|b| b.id.to_string()).collect();
    keys.sort();

    let uow = helpers::open(&engine).await;
    let items = uow
        .repository::<Branch>()
        .get_all_by_spec(&Specification::from_params(&branch_params(2, 10)).expect("spec"))
        .await
        .expect("query");
    let returned: Vec<String> = items.iter().map(|b| b.id.to_string()).collect();
    assert_eq!(returned, keys[10..20].to_vec());
}

#[tokio::test]
async fn test_soft_deleted_rows_are_filtered_and_counted() {
    let engine = MemoryEngine::new();
    let geo = helpers::seed_geography(&engine).await;

    let uow = helpers::open(&engine).await;
    let branches: Vec<Branch> = helpers::numbered("Branch", 10)
        .into_iter()
        .enumerate()
        .map(|(i, name)| {
            let mut branch = Branch::new(name, geo.city.id);
            branch.is_deleted = i < 3;
            branch
        })
        .collect();
    let repo = uow.repository::<Branch>();
    repo.add_range(&branches).expect("stage");
    uow.save().await.expect("save");

    let params = BranchParams {
        is_deleted: Some(false),
        ..branch_params(1, 10)
    };
    let spec = Specification::from_params(&params).expect("spec");
    let count = CountSpecification::from_params(&params).expect("count spec");

    let rows = repo.get_all_by_spec(&spec).await.expect("query");
    assert_eq!(rows.len(), 7);
    assert!(rows.iter().all(|b| !b.is_deleted));
    assert_eq!(repo.get_count(&count).await.expect("count"), 7);
    assert_eq!(count, spec.count_specification());
}

#[tokio::test]
async fn test_sort_descending_by_name() {
    let engine = MemoryEngine::new();
    let geo = helpers::seed_geography(&engine).await;
    let names = ["A".to_string(), "B".to_string(), "C".to_string()];
    helpers::seed_branches(&engine, &geo.city, &names).await;

    let uow = helpers::open(&engine).await;
    let params = BranchParams {
        paging: PagingParams::new(1, 10).sorted("name_desc"),
        ..BranchParams::default()
    };
    let page = uow
        .repository::<Branch>()
        .get_page(&params)
        .await
        .expect("page");
    let returned: Vec<&str> = page.items.iter().map(|b| b.name.as_str()).collect();
    assert_eq!(returned, vec!["C", "B", "A"]);
}

#[tokio::test]
async fn test_sort_by_included_city_name() {
    let engine = MemoryEngine::new();
    let geo = helpers::seed_geography(&engine).await;

    let uow = helpers::open(&engine).await;
    let alexandria = City::new("Alexandria", geo.governorate.id, 70.0);
    uow.repository::<City>().add(&alexandria).expect("stage");
    uow.save().await.expect("save");
    let branches = [
        Branch::new("First", geo.city.id),
        Branch::new("Second", alexandria.id),
        Branch::new("Third", geo.city.id),
    ];
    uow.repository::<Branch>().add_range(&branches).expect("stage");
    uow.save().await.expect("save");

    let params = BranchParams {
        paging: PagingParams::new(1, 2).sorted("city_asc"),
        ..BranchParams::default()
    };
    let page = uow
        .repository::<Branch>()
        .get_page(&params)
        .await
        .expect("page");
    assert_eq!(page.total_items, 3);
    assert_eq!(page.items.len(), 2);
    assert_eq!(page.items[0].name, "Second");
    assert_eq!(
        page.items[0].city.as_ref().map(|c| c.name.as_str()),
        Some("Alexandria")
    );
}

#[tokio::test]
async fn test_page_past_the_end_is_empty() {
    let engine = MemoryEngine::new();
    let geo = helpers::seed_geography(&engine).await;
    helpers::seed_branches(&engine, &geo.city, &helpers::numbered("Branch", 5)).await;

    let uow = helpers::open(&engine).await;
    let page = uow
        .repository::<Branch>()
        .get_page(&branch_params(4, 2))
        .await
        .expect("page");
    assert!(page.items.is_empty());
    assert_eq!(page.total_items, 5);
    assert!(!page.has_next);
}

#[tokio::test]
async fn test_inverted_range_fails_before_storage() {
    let engine = MemoryEngine::new();
    let uow = helpers::open(&engine).await;
    let params = CityParams {
        min_shipping_price: Some(100.0),
        max_shipping_price: Some(10.0),
        ..CityParams::default()
    };
    let err = uow
        .repository::<City>()
        .get_page(&params)
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::InvalidSpecification);
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("Failed to build runtime")
}

async fn seed_cities(engine: &MemoryEngine, rows: &[(bool, u32)]) {
    let governorate = Governorate::new("Giza");
    let cities: Vec<City> = rows
        .iter()
        .enumerate()
        .map(|(i, (deleted, price))| {
            let mut city = City::new(format!("City {i:02}"), governorate.id, f64::from(*price));
            city.is_deleted = *deleted;
            city
        })
        .collect();

    let uow = helpers::open(engine).await;
    uow.repository::<Governorate>()
        .add(&governorate)
        .expect("stage governorate");
    uow.repository::<City>().add_range(&cities).expect("stage cities");
    uow.save().await.expect("save");
    uow.close().await.expect("close");
}

fn city_params(
    is_deleted: Option<bool>,
    min: Option<u32>,
    max: Option<u32>,
    paging: PagingParams,
) -> CityParams {
    CityParams {
        paging,
        is_deleted,
        min_shipping_price: min.map(f64::from),
        max_shipping_price: max.map(f64::from),
        ..CityParams::default()
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn prop_count_matches_unpaged_listing(
        rows in prop::collection::vec((any::<bool>(), 0u32..200), 0..40),
        is_deleted in prop::option::of(any::<bool>()),
        min in prop::option::of(0u32..200),
        max in prop::option::of(0u32..200),
    ) {
        prop_assume!(!matches!((min, max), (Some(low), Some(high)) if low > high));

        let (listed, counted) = runtime().block_on(async {
            let engine = MemoryEngine::new();
            seed_cities(&engine, &rows).await;
            let uow = helpers::open(&engine).await;
            let params = city_params(is_deleted, min, max, PagingParams::new(1, 100));
            let page = uow.repository::<City>().get_page(&params).await.expect("page");
            (page.items.len() as u64, page.total_items)
        });

        let expected = rows
            .iter()
            .filter(|(deleted, price)| {
                is_deleted.is_none_or(|d| d == *deleted)
                    && min.is_none_or(|m| *price >= m)
                    && max.is_none_or(|m| *price <= m)
            })
            .count() as u64;
        prop_assert_eq!(listed, counted);
        prop_assert_eq!(counted, expected);
    }

    #[test]
    fn prop_page_length_is_bounded(
        total in 0usize..35,
        page_index in 1u64..8,
        page_size in 1u64..12,
    ) {
        let rows: Vec<(bool, u32)> = (0..total).map(|_| (false, 10)).collect();
        let returned = runtime().block_on(async {
            let engine = MemoryEngine::new();
            seed_cities(&engine, &rows).await;
            let uow = helpers::open(&engine).await;
            let params = city_params(None, None, None, PagingParams::new(page_index, page_size));
            uow.repository::<City>().get_page(&params).await.expect("page").items.len() as u64
        });

        let skipped = (page_index - 1) * page_size;
        let expected = page_size.min((total as u64).saturating_sub(skipped));
        prop_assert_eq!(returned, expected);
        prop_assert!(returned <= page_size);
    }
}
