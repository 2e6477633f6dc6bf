mod common;

use assert_matches::assert_matches;
use chrono::Utc;
use harvest_api::{
    entities::BatchStatus,
    errors::ServiceError,
    events::Event,
    repositories::BatchRepository,
    services::{
        box_ledger::{DISPATCH_CAPACITY_EXCEEDED, HARVEST_CAPACITY_EXCEEDED},
        dispatch::{CreateGatePass, ReceiveGatePass, GATE_PASS_ALREADY_RECEIVED},
    },
};
use uuid::Uuid;

use common::{day, report, seed_user, TestApp};

fn gate_pass(total_boxes: i32) -> CreateGatePass {
    CreateGatePass {
        truck_number: "MH-19-AB-1234".to_string(),
        driver_name: "Ravi".to_string(),
        driver_phone: None,
        total_boxes,
        dispatch_date: day(3),
        notes: None,
    }
}

#[tokio::test]
async fn batch_is_harvested_dispatched_and_delivered() {
    let mut app = TestApp::new().await;
    let batch = app.approved_batch(100).await;
    assert_eq!(batch.status, BatchStatus::Created);
    assert_eq!(batch.allocated_boxes, 100);
    assert_eq!(batch.remaining_boxes, 100);

    let harvest = &app.state.services.harvest;
    let first = harvest
        .submit_daily_report(batch.id, report(60), app.vendor)
        .await
        .unwrap();
    assert_eq!(first.batch.harvested_boxes, 60);
    assert_eq!(first.batch.remaining_boxes, 40);
    assert_eq!(first.batch.gate_pass_remaining, 60);
    assert_eq!(first.batch.status, BatchStatus::HarvestInProgress);
    assert!(first.batch.start_date.is_some());

    let second = harvest
        .submit_daily_report(batch.id, report(40), app.vendor)
        .await
        .unwrap();
    assert_eq!(second.batch.harvested_boxes, 100);
    assert_eq!(second.batch.remaining_boxes, 0);
    assert_eq!(second.batch.actual_boxes, 100);
    assert_eq!(second.batch.status, BatchStatus::HarvestCompleted);

    let dispatch = &app.state.services.dispatch;
    let created = dispatch
        .create_gate_pass(batch.id, gate_pass(100), app.vendor)
        .await
        .unwrap();
    assert!(created.gate_pass.gate_pass_no.starts_with("GP-"));
    assert_eq!(created.batch.dispatched_boxes, 100);
    assert_eq!(created.batch.gate_pass_remaining, 0);
    assert_eq!(created.batch.status, BatchStatus::DispatchCompleted);

    let batches = &app.state.services.batches;
    let in_transit = batches
        .update_batch_status(batch.id, BatchStatus::InTransit, app.vendor)
        .await
        .unwrap();
    assert_eq!(in_transit.status, BatchStatus::InTransit);
    let delivered = batches
        .update_batch_status(batch.id, BatchStatus::Delivered, app.manager)
        .await
        .unwrap();
    assert_eq!(delivered.status, BatchStatus::Delivered);

    let events = app.drain_events();
    assert!(events.iter().any(|e| matches!(
        e,
        Event::BatchStatusChanged { to: BatchStatus::HarvestCompleted, .. }
    )));
    assert!(events
        .iter()
        .any(|e| matches!(e, Event::GatePassCreated { total_boxes: 100, .. })));
}

#[tokio::test]
async fn harvest_over_capacity_is_rejected_without_side_effects() {
    let app = TestApp::new().await;
    let batch = app.approved_batch(100).await;
    let harvest = &app.state.services.harvest;

    harvest
        .submit_daily_report(batch.id, report(60), app.vendor)
        .await
        .unwrap();

    let err = harvest
        .submit_daily_report(batch.id, report(41), app.vendor)
        .await
        .unwrap_err();
    assert_matches!(
        &err,
        ServiceError::CapacityExceeded { code, remaining: 40, requested: 41, .. }
            if *code == HARVEST_CAPACITY_EXCEEDED
    );
    assert_eq!(
        err.to_string(),
        "Limit exceeded. Only 40 boxes remaining for harvest in this batch."
    );

    let after = app.state.services.batches.get_batch(batch.id).await.unwrap();
    assert_eq!(after.harvested_boxes, 60);
    assert_eq!(after.remaining_boxes, 40);
    let reports = harvest.list_batch_reports(batch.id).await.unwrap();
    assert_eq!(reports.len(), 1);
}

#[tokio::test]
async fn dispatch_cannot_exceed_harvested_boxes() {
    let app = TestApp::new().await;
    let batch = app.approved_batch(100).await;
    app.state
        .services
        .harvest
        .submit_daily_report(batch.id, report(30), app.vendor)
        .await
        .unwrap();

    let err = app
        .state
        .services
        .dispatch
        .create_gate_pass(batch.id, gate_pass(31), app.vendor)
        .await
        .unwrap_err();
    assert_matches!(
        &err,
        ServiceError::CapacityExceeded { code, remaining: 30, .. } if *code == DISPATCH_CAPACITY_EXCEEDED
    );

    let partial = app
        .state
        .services
        .dispatch
        .create_gate_pass(batch.id, gate_pass(10), app.vendor)
        .await
        .unwrap();
    assert_eq!(partial.batch.status, BatchStatus::DispatchInProgress);
    assert_eq!(partial.batch.gate_pass_remaining, 20);
}

#[tokio::test]
async fn in_transit_requires_a_completed_dispatch() {
    let app = TestApp::new().await;
    let batch = app.approved_batch(50).await;

    let err = app
        .state
        .services
        .batches
        .update_batch_status(batch.id, BatchStatus::InTransit, app.admin)
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::InvalidTransition { .. });

    let unchanged = app.state.services.batches.get_batch(batch.id).await.unwrap();
    assert_eq!(unchanged.status, BatchStatus::Created);
}

#[tokio::test]
async fn vendors_only_touch_their_own_batches() {
    let app = TestApp::new().await;
    let batch = app.approved_batch(50).await;
    let batches = &app.state.services.batches;

    let err = batches
        .update_batch_status(batch.id, BatchStatus::Cancelled, app.other_vendor)
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::Forbidden(_));

    let owner = batches
        .update_batch_status(batch.id, BatchStatus::Cancelled, app.vendor)
        .await
        .unwrap();
    assert_eq!(owner.status, BatchStatus::Cancelled);

    let supervisor = batches
        .update_batch_status(batch.id, BatchStatus::InProgress, app.supervisor)
        .await
        .unwrap();
    assert_eq!(supervisor.status, BatchStatus::InProgress);
}

#[tokio::test]
async fn unknown_or_inactive_callers_are_refused() {
    let app = TestApp::new().await;
    let batch = app.approved_batch(50).await;
    let batches = &app.state.services.batches;

    let err = batches
        .update_batch_status(batch.id, BatchStatus::InProgress, Uuid::new_v4())
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::NotFound(_));

    let retired = seed_user(&app.db, "Ex Admin", harvest_api::entities::UserRole::Admin, false).await;
    let err = batches
        .update_batch_status(batch.id, BatchStatus::InProgress, retired)
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::Forbidden(_));
}

#[tokio::test]
async fn stale_ledger_write_is_a_concurrent_modification() {
    let app = TestApp::new().await;
    let batch = app.approved_batch(100).await;
    let db = &*app.db;

    let (_, mut first) = BatchRepository::load_ledger(db, batch.id).await.unwrap();
    let (_, mut second) = BatchRepository::load_ledger(db, batch.id).await.unwrap();
    let today = Utc::now().date_naive();

    first.record_harvest(10, today).unwrap();
    BatchRepository::save_ledger(db, &first, Utc::now()).await.unwrap();

    second.record_harvest(20, today).unwrap();
    let err = BatchRepository::save_ledger(db, &second, Utc::now())
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::ConcurrentModification(id) if id == batch.id);
    assert!(err.is_retryable());

    let stored = app.state.services.batches.get_batch(batch.id).await.unwrap();
    assert_eq!(stored.harvested_boxes, 10);
    assert_eq!(stored.version, batch.version + 1);
}

#[tokio::test]
async fn gate_pass_receipt_records_shortage_once() {
    let mut app = TestApp::new().await;
    let batch = app.approved_batch(40).await;
    app.state
        .services
        .harvest
        .submit_daily_report(batch.id, report(40), app.vendor)
        .await
        .unwrap();
    let created = app
        .state
        .services
        .dispatch
        .create_gate_pass(batch.id, gate_pass(40), app.vendor)
        .await
        .unwrap();
    app.drain_events();

    let dispatch = app.state.services.dispatch.clone();
    let received = dispatch
        .receive_gate_pass(created.gate_pass.id, ReceiveGatePass { received_boxes: 37 }, app.manager)
        .await
        .unwrap();
    assert_eq!(received.received_boxes, Some(37));
    assert_eq!(received.shortage, Some(3));
    assert_eq!(received.received_by, Some(app.manager));

    let again = dispatch
        .receive_gate_pass(created.gate_pass.id, ReceiveGatePass { received_boxes: 40 }, app.manager)
        .await
        .unwrap_err();
    assert_matches!(
        again,
        ServiceError::BusinessRule { code, .. } if code == GATE_PASS_ALREADY_RECEIVED
    );
    assert!(dispatch.list_pending_gate_passes().await.unwrap().is_empty());

    // receipt leaves the batch counters alone
    let after = app.state.services.batches.get_batch(batch.id).await.unwrap();
    assert_eq!(after.dispatched_boxes, 40);
    assert_eq!(after.status, BatchStatus::DispatchCompleted);

    let events = app.drain_events();
    assert!(events
        .iter()
        .any(|e| matches!(e, Event::GatePassShortage { shortage: 3, .. })));
}

#[tokio::test]
async fn only_store_staff_sign_for_gate_passes() {
    let app = TestApp::new().await;
    let batch = app.approved_batch(15).await;
    let services = &app.state.services;
    services
        .harvest
        .submit_daily_report(batch.id, report(15), app.vendor)
        .await
        .unwrap();
    let created = services
        .dispatch
        .create_gate_pass(batch.id, gate_pass(15), app.vendor)
        .await
        .unwrap();

    for caller in [app.vendor, app.supervisor] {
        let err = services
            .dispatch
            .receive_gate_pass(created.gate_pass.id, ReceiveGatePass { received_boxes: 15 }, caller)
            .await
            .unwrap_err();
        assert_matches!(err, ServiceError::Forbidden(_));
    }
    assert_eq!(services.dispatch.list_pending_gate_passes().await.unwrap().len(), 1);

    let received = services
        .dispatch
        .receive_gate_pass(
            created.gate_pass.id,
            ReceiveGatePass { received_boxes: 15 },
            app.store_keeper,
        )
        .await
        .unwrap();
    assert_eq!(received.received_by, Some(app.store_keeper));
    assert_eq!(received.shortage, Some(0));
}
