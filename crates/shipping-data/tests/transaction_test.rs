//! Explicit transactions spanning several saves.

mod helpers;

use shipping_core::error::ErrorKind;
use shipping_data::{MemoryEngine, TransactionState};
use shipping_entity::{Branch, City, Governorate};

async fn governorate_count(engine: &MemoryEngine) -> usize {
    let uow = helpers::open(engine).await;
    uow.repository::<Governorate>()
        .get_all()
        .await
        .expect("query")
        .len()
}

#[tokio::test]
async fn test_rollback_undoes_saved_insert() {
    let engine = MemoryEngine::new();
    let uow = helpers::open(&engine).await;

    let tx = uow.begin_transaction().await.expect("begin");
    assert_eq!(uow.transaction_state(), TransactionState::Open(tx.id()));

    uow.repository::<Governorate>()
        .add(&Governorate::new("Sohag"))
        .expect("stage");
    assert!(uow.save().await.expect("save") > 0);

    let id = tx.id();
    tx.rollback().await.expect("rollback");
    assert_eq!(uow.transaction_state(), TransactionState::RolledBack(id));
    assert_eq!(governorate_count(&engine).await, 0);
    assert!(
        uow.repository::<Governorate>()
            .get_all()
            .await
            .expect("query")
            .is_empty()
    );
}

#[tokio::test]
async fn test_dependent_inserts_commit_or_roll_back_together() {
    for commit in [false, true] {
        let engine = MemoryEngine::new();
        let uow = helpers::open(&engine).await;
        let tx = uow.begin_transaction().await.expect("begin");

        let governorate = Governorate::new("Qena");
        uow.repository::<Governorate>().add(&governorate).expect("stage");
        uow.save().await.expect("save parent");

        let city = City::new("Qus", governorate.id, 25.0);
        uow.repository::<City>().add(&city).expect("stage");
        uow.save().await.expect("save child");

        let reader = helpers::open(&engine).await;
        assert!(
            reader
                .repository::<City>()
                .get_by_id(&city.id)
                .await
                .expect("query")
                .is_none(),
            "uncommitted writes must not be visible elsewhere"
        );

        if commit {
            tx.commit().await.expect("commit");
        } else {
            tx.rollback().await.expect("rollback");
        }

        let reader = helpers::open(&engine).await;
        let parent = reader
            .repository::<Governorate>()
            .get_by_id(&governorate.id)
            .await
            .expect("query");
        let child = reader
            .repository::<City>()
            .get_by_id(&city.id)
            .await
            .expect("query");
        assert_eq!(parent.is_some(), commit);
        assert_eq!(child.is_some(), commit);
    }
}

#[tokio::test]
async fn test_begin_while_open_is_an_error() {
    let engine = MemoryEngine::new();
    let uow = helpers::open(&engine).await;

    let tx = uow.begin_transaction().await.expect("begin");
    let err = uow.begin_transaction().await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::TransactionState);

    tx.commit().await.expect("commit");
    let next = uow.begin_transaction().await.expect("begin after commit");
    next.rollback().await.expect("rollback");
}

#[tokio::test]
async fn test_dropped_transaction_rolls_back() {
    let engine = MemoryEngine::new();
    let uow = helpers::open(&engine).await;

    let id = {
        let tx = uow.begin_transaction().await.expect("begin");
        uow.repository::<Governorate>()
            .add(&Governorate::new("Minya"))
            .expect("stage");
        uow.save().await.expect("save");
        tx.id()
    };

    assert_eq!(uow.transaction_state(), TransactionState::RolledBack(id));
    assert_eq!(governorate_count(&engine).await, 0);

    uow.repository::<Governorate>()
        .add(&Governorate::new("Minya"))
        .expect("stage");
    uow.save().await.expect("save outside transaction");
    assert_eq!(governorate_count(&engine).await, 1);
}

#[tokio::test]
async fn test_closing_with_open_transaction_rolls_back() {
    let engine = MemoryEngine::new();
    let uow = helpers::open(&engine).await;

    let tx = uow.begin_transaction().await.expect("begin");
    uow.repository::<Governorate>()
        .add(&Governorate::new("Asyut"))
        .expect("stage");
    uow.save().await.expect("save");
    uow.close().await.expect("close");

    assert_eq!(governorate_count(&engine).await, 0);
    let err = tx.commit().await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::TransactionState);
}

#[tokio::test]
async fn test_dropping_unit_of_work_rolls_back() {
    let engine = MemoryEngine::new();
    {
        let uow = helpers::open(&engine).await;
        let tx = uow.begin_transaction().await.expect("begin");
        uow.repository::<Governorate>()
            .add(&Governorate::new("Fayoum"))
            .expect("stage");
        uow.save().await.expect("save");
        drop(uow);
        let err = tx.rollback().await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::TransactionState);
    }
    assert_eq!(governorate_count(&engine).await, 0);
}

#[tokio::test]
async fn test_rollback_restores_tracked_versions() {
    let engine = MemoryEngine::new();
    let geo = helpers::seed_geography(&engine).await;
    let branches = helpers::seed_branches(&engine, &geo.city, &["Tanta".to_string()]).await;

    let uow = helpers::open(&engine).await;
    let repo = uow.repository::<Branch>();
    let mut branch = repo.require_by_id(&branches[0].id).await.expect("load");

    let tx = uow.begin_transaction().await.expect("begin");
    branch.name = "Tanta Old Town".to_string();
    repo.update(&branch).expect("stage");
    uow.save().await.expect("save");
    tx.rollback().await.expect("rollback");

    branch.name = "Tanta Station".to_string();
    repo.update(&branch).expect("stage after rollback");
    uow.save().await.expect("save against restored version");
    assert_eq!(
        repo.require_by_id(&branch.id).await.expect("load").name,
        "Tanta Station"
    );
}

#[tokio::test]
async fn test_commit_leaves_unsaved_changes_pending() {
    let engine = MemoryEngine::new();
    let uow = helpers::open(&engine).await;

    let tx = uow.begin_transaction().await.expect("begin");
    uow.repository::<Governorate>()
        .add(&Governorate::new("Beheira"))
        .expect("stage");
    let id = tx.id();
    tx.commit().await.expect("commit");

    assert_eq!(uow.transaction_state(), TransactionState::Committed(id));
    assert!(uow.has_changes());
    assert_eq!(governorate_count(&engine).await, 0);

    uow.save().await.expect("save");
    assert_eq!(governorate_count(&engine).await, 1);
}

#[tokio::test]
async fn test_reads_inside_transaction_see_own_writes() {
    let engine = MemoryEngine::new();
    let uow = helpers::open(&engine).await;

    let tx = uow.begin_transaction().await.expect("begin");
    let governorate = Governorate::new("Matrouh");
    uow.repository::<Governorate>().add(&governorate).expect("stage");
    uow.save().await.expect("save");

    let seen = uow
        .repository::<Governorate>()
        .get_by_id(&governorate.id)
        .await
        .expect("query");
    assert!(seen.is_some());
    assert_eq!(governorate_count(&engine).await, 0);

    tx.commit().await.expect("commit");
    assert_eq!(governorate_count(&engine).await, 1);
}
