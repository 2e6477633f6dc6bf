mod common;

use std::sync::atomic::{AtomicU32, Ordering};

use assert_matches::assert_matches;
use chrono::Utc;
use harvest_api::{
    db::retry_on_conflict,
    entities::gate_pass,
    errors::ServiceError,
    services::{
        codes::{format_code, next_code, GATE_PASS_PREFIX},
        dispatch::CreateGatePass,
    },
};
use sea_orm::{ActiveModelTrait, DatabaseConnection, EntityTrait, PaginatorTrait, Set};
use uuid::Uuid;

use common::{day, report, TestApp};

fn gate_pass(total_boxes: i32) -> CreateGatePass {
    CreateGatePass {
        truck_number: "KA-05-9911".to_string(),
        driver_name: "Suresh".to_string(),
        driver_phone: None,
        total_boxes,
        dispatch_date: day(4),
        notes: None,
    }
}

async fn insert_pass(
    db: &DatabaseConnection,
    batch_id: Uuid,
    created_by: Uuid,
    gate_pass_no: &str,
) -> Result<gate_pass::Model, ServiceError> {
    gate_pass::ActiveModel {
        id: Set(Uuid::new_v4()),
        gate_pass_no: Set(gate_pass_no.to_string()),
        batch_id: Set(batch_id),
        truck_number: Set("OLD-0001".to_string()),
        driver_name: Set("Legacy".to_string()),
        driver_phone: Set(None),
        total_boxes: Set(1),
        dispatch_date: Set(day(2)),
        notes: Set(None),
        received_boxes: Set(None),
        received_at: Set(None),
        received_by: Set(None),
        created_by: Set(created_by),
        created_at: Set(Utc::now()),
    }
    .insert(db)
    .await
    .map_err(ServiceError::db_error)
}

async fn harvested_batch(app: &TestApp, boxes: i32) -> Uuid {
    let batch = app.approved_batch(boxes).await;
    app.state
        .services
        .harvest
        .submit_daily_report(batch.id, report(boxes), app.vendor)
        .await
        .unwrap();
    batch.id
}

#[tokio::test]
async fn reused_gate_pass_number_is_a_retryable_duplicate() {
    let app = TestApp::new().await;
    let batch_id = harvested_batch(&app, 10).await;
    let code = format_code(GATE_PASS_PREFIX, Utc::now().date_naive(), 1);

    insert_pass(&app.db, batch_id, app.admin, &code).await.unwrap();
    let err = insert_pass(&app.db, batch_id, app.admin, &code)
        .await
        .unwrap_err();

    assert_matches!(&err, ServiceError::DuplicateCode(_));
    assert!(err.is_retryable());
    assert_eq!(err.error_code(), "DUPLICATE_CODE");
}

#[tokio::test]
async fn taken_gate_pass_numbers_are_skipped() {
    let app = TestApp::new().await;
    let batch_id = harvested_batch(&app, 30).await;
    let today = Utc::now().date_naive();

    // one existing row whose number is the one a count would hand out next
    insert_pass(&app.db, batch_id, app.admin, &format_code(GATE_PASS_PREFIX, today, 2))
        .await
        .unwrap();

    let created = app
        .state
        .services
        .dispatch
        .create_gate_pass(batch_id, gate_pass(30), app.vendor)
        .await
        .unwrap();
    assert_eq!(
        created.gate_pass.gate_pass_no,
        format_code(GATE_PASS_PREFIX, today, 3)
    );
    assert_eq!(created.batch.dispatched_boxes, 30);
}

#[tokio::test]
async fn collision_is_retried_with_a_fresh_number() {
    let app = TestApp::new().await;
    let batch_id = harvested_batch(&app, 10).await;
    let today = Utc::now().date_naive();
    let first = format_code(GATE_PASS_PREFIX, today, 1);
    insert_pass(&app.db, batch_id, app.admin, &first).await.unwrap();

    let db: &DatabaseConnection = &app.db;
    let attempts = &AtomicU32::new(0);
    let stale = first.as_str();
    let admin = app.admin;

    // the first attempt writes a number another writer already took
    let pass = retry_on_conflict("create_gate_pass", 3, move || async move {
        let code = if attempts.fetch_add(1, Ordering::SeqCst) == 0 {
            stale.to_string()
        } else {
            next_code::<gate_pass::Entity, _>(db, gate_pass::Column::GatePassNo, GATE_PASS_PREFIX, today)
                .await?
        };
        insert_pass(db, batch_id, admin, &code).await
    })
    .await
    .unwrap();

    assert_eq!(attempts.load(Ordering::SeqCst), 2);
    assert_eq!(pass.gate_pass_no, format_code(GATE_PASS_PREFIX, today, 2));
    assert_eq!(gate_pass::Entity::find().count(db).await.unwrap(), 2);
}
