// Optimistic edits: local apply, background persist, failure handling

mod common;

use common::{sample_store, Call, FakeProvider, UpdateCall};
use grid_sync::data::column_order::ColumnPins;
use grid_sync::data::model::CellValue;
use grid_sync::error::EditError;
use grid_sync::state::{NavPhase, NavigationController, NavigationDefaults, Transition};
use std::sync::Arc;

async fn mounted(fake: &FakeProvider) -> NavigationController {
    let controller = NavigationController::new(
        Arc::new(fake.clone()),
        NavigationDefaults {
            document_id: "doc".into(),
            table_id: "grid-a".into(),
        },
        ColumnPins::default(),
    );
    controller.mount().await;
    controller
}

async fn wait_for_generation(controller: &NavigationController, generation: u64) {
    while controller.generation() < generation {
        tokio::task::yield_now().await;
    }
}

fn cell(controller: &NavigationController, row: &str, column: &str) -> Option<CellValue> {
    controller.snapshot()?.cell(row, column).cloned()
}

#[tokio::test]
async fn test_edit_is_visible_before_persist_completes() {
    let fake = sample_store();
    let controller = mounted(&fake).await;
    let gate = fake.gate(Call::Update, "r1/c1");

    let handle = controller
        .edit_cell("r1", "c1", CellValue::from("Alicia"))
        .unwrap();

    assert_eq!(cell(&controller, "r1", "c1"), Some(CellValue::from("Alicia")));
    assert_eq!(controller.persist_tracker().in_flight_for("r1", "c1"), 1);
    assert!(fake.updates().is_empty());

    gate.notify_one();
    handle.await.unwrap().unwrap();

    assert_eq!(controller.persist_tracker().counts().in_flight, 0);
    assert_eq!(
        fake.updates(),
        vec![UpdateCall {
            table_id: "grid-a".into(),
            row_id: "r1".into(),
            column_id: "c1".into(),
            value: "Alicia".into(),
        }]
    );
}

#[tokio::test]
async fn test_persist_failure_keeps_local_value() {
    let fake = sample_store();
    fake.fail(Call::Update, "r1/c2");
    let controller = mounted(&fake).await;

    let handle = controller.edit_cell("r1", "c2", CellValue::from(31)).unwrap();
    let err = handle.await.unwrap().unwrap_err();
    assert_eq!(err.row_id, "r1");
    assert_eq!(err.column_id, "c2");

    assert_eq!(cell(&controller, "r1", "c2"), Some(CellValue::from(31)));

    let tracker = controller.persist_tracker();
    assert_eq!(tracker.counts().failed, 1);
    let notices = tracker.take_notices();
    assert_eq!(notices.len(), 1);
    assert_eq!(notices[0].row_id, "r1");
    assert!(tracker.take_notices().is_empty());
}

#[tokio::test]
async fn test_refresh_after_failed_persist_restores_store_value() {
    let fake = sample_store();
    fake.fail(Call::Update, "r1/c1");
    let controller = mounted(&fake).await;

    let handle = controller.edit_cell("r1", "c1", CellValue::from("Lost")).unwrap();
    assert!(handle.await.unwrap().is_err());
    assert_eq!(cell(&controller, "r1", "c1"), Some(CellValue::from("Lost")));

    controller.refresh().await;
    assert_eq!(cell(&controller, "r1", "c1"), Some(CellValue::from("Alice")));
}

#[tokio::test]
async fn test_concurrent_edits_to_different_cells() {
    let fake = sample_store();
    let controller = mounted(&fake).await;
    let before = controller.snapshot().unwrap();

    let first = controller.edit_cell("r1", "c1", CellValue::from("Ann")).unwrap();
    let second = controller.edit_cell("r2", "c2", CellValue::from(42)).unwrap();

    let after = controller.snapshot().unwrap();
    assert_eq!(after.cell("r1", "c1"), Some(&CellValue::from("Ann")));
    assert_eq!(after.cell("r2", "c2"), Some(&CellValue::from(42)));
    assert!(after.shares_columns_with(&before));

    first.await.unwrap().unwrap();
    second.await.unwrap().unwrap();
    assert_eq!(fake.updates().len(), 2);
    assert_eq!(controller.persist_tracker().counts().saved(), 2);
}

#[tokio::test]
async fn test_late_persist_does_not_clobber_newer_local_edit() {
    let fake = sample_store();
    let controller = mounted(&fake).await;
    let gate = fake.gate(Call::Update, "r1/c1");

    let first = controller.edit_cell("r1", "c1", CellValue::from("first")).unwrap();
    let second = controller.edit_cell("r1", "c1", CellValue::from("second")).unwrap();
    assert_eq!(controller.persist_tracker().in_flight_for("r1", "c1"), 2);

    second.await.unwrap().unwrap();
    gate.notify_one();
    first.await.unwrap().unwrap();

    assert_eq!(cell(&controller, "r1", "c1"), Some(CellValue::from("second")));
    let values: Vec<String> = fake.updates().into_iter().map(|u| u.value).collect();
    assert_eq!(values, vec!["second", "first"]);
}

#[tokio::test]
async fn test_clearing_a_cell_sends_empty_text() {
    let fake = sample_store();
    let controller = mounted(&fake).await;

    let handle = controller.edit_cell("r2", "c1", CellValue::from_input("  ")).unwrap();
    handle.await.unwrap().unwrap();

    assert_eq!(cell(&controller, "r2", "c1"), Some(CellValue::Empty));
    assert_eq!(fake.updates()[0].value, "");
}

#[tokio::test]
async fn test_typed_text_reaches_store_unchanged() {
    let fake = sample_store();
    let controller = mounted(&fake).await;

    let typed = ["007", "12345678901234567890", "1e3", "+5", "1.50"];
    for text in typed {
        let handle = controller.edit_cell("r1", "c1", CellValue::from_input(text)).unwrap();
        handle.await.unwrap().unwrap();
        assert_eq!(cell(&controller, "r1", "c1"), Some(CellValue::Text(text.to_string())));
    }

    let sent: Vec<String> = fake.updates().into_iter().map(|u| u.value).collect();
    assert_eq!(sent, typed);
}

#[tokio::test]
async fn test_edit_refused_while_another_table_loads() {
    let fake = sample_store();
    let controller = mounted(&fake).await;

    let gate = fake.gate(Call::Rows, "grid-b");
    let start = controller.generation();
    let switch = tokio::spawn({
        let controller = controller.clone();
        async move { controller.select_table("grid-b").await }
    });
    wait_for_generation(&controller, start + 1).await;

    assert_eq!(controller.snapshot().unwrap().table_id(), "grid-a");
    assert_eq!(
        controller.edit_cell("r1", "c1", CellValue::from("late")).unwrap_err(),
        EditError::SelectionChanged {
            shown: "grid-a".into(),
            selected: "grid-b".into(),
        }
    );
    assert_eq!(cell(&controller, "r1", "c1"), Some(CellValue::from("Alice")));

    gate.notify_one();
    assert_eq!(switch.await.unwrap(), Transition::Applied(NavPhase::Ready));
    assert_eq!(controller.snapshot().unwrap().table_id(), "grid-b");
    assert!(fake.updates().is_empty());

    let handle = controller.edit_cell("b1", "c3", CellValue::from("now")).unwrap();
    handle.await.unwrap().unwrap();
    assert_eq!(fake.updates()[0].table_id, "grid-b");
}

#[tokio::test]
async fn test_edit_rejections() {
    let fake = sample_store();
    let controller = NavigationController::new(
        Arc::new(fake.clone()),
        NavigationDefaults::default(),
        ColumnPins::default(),
    );
    assert_eq!(
        controller.edit_cell("r1", "c1", CellValue::Empty).unwrap_err(),
        EditError::NoSnapshot
    );

    let controller = mounted(&fake).await;
    assert_eq!(
        controller.edit_cell("r9", "c1", CellValue::Empty).unwrap_err(),
        EditError::UnknownRow("r9".into())
    );
    assert!(fake.updates().is_empty());
}
