mod common;

use assert_matches::assert_matches;
use harvest_api::{
    entities::{ItemCategory, PaymentStatus, TransportType},
    errors::ServiceError,
    events::Event,
    services::{
        costing::AddTransportCost,
        harvest::SubmitDailyReport,
        inventory::{AddStock, AllocateMaterial, CreateItem, DUPLICATE_ITEM_CODE},
    },
};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use common::{day, report, TestApp};

fn boxes_item(code: &str, unit_cost: Decimal, initial_quantity: i32) -> CreateItem {
    CreateItem {
        item_code: code.to_string(),
        item_name: "Corrugated box 13kg".to_string(),
        category: ItemCategory::Box,
        unit_of_measure: "pcs".to_string(),
        unit_cost,
        initial_quantity: Some(initial_quantity),
    }
}

fn outward(total_cost: Decimal) -> AddTransportCost {
    AddTransportCost {
        cost_type: TransportType::Outward,
        total_cost,
        vendor_name: Some("Konkan Logistics".to_string()),
        vehicle_number: None,
        driver_name: None,
        distance_km: None,
        notes: None,
    }
}

#[tokio::test]
async fn costs_roll_up_across_material_labor_and_transport() {
    let mut app = TestApp::new().await;
    let batch = app.approved_batch(100).await;
    let services = &app.state.services;

    let harvested = services
        .harvest
        .submit_daily_report(
            batch.id,
            SubmitDailyReport {
                labor_cost: Some(dec!(300.00)),
                ..report(100)
            },
            app.vendor,
        )
        .await
        .unwrap();
    assert_eq!(harvested.report.labor_cost_per_box, Some(dec!(3.00)));
    assert_eq!(harvested.report.payment_status, Some(PaymentStatus::Pending));

    let item = services
        .inventory
        .create_item(boxes_item("BOX-13KG", dec!(2.00), 80), app.manager)
        .await
        .unwrap();
    let allocation = services
        .inventory
        .allocate_to_batch(
            batch.id,
            AllocateMaterial {
                item_id: item.id,
                quantity: 50,
                notes: None,
            },
            app.manager,
        )
        .await
        .unwrap();
    assert_eq!(allocation.item.available_quantity, 30);
    assert_eq!(allocation.item.reserved_quantity, 50);

    let transport = services
        .costs
        .add_transport_cost(batch.id, outward(dec!(100.00)), app.manager)
        .await
        .unwrap();
    assert_eq!(transport.transport_cost.cost_per_box, dec!(1.00));

    let costs = services.costs.get_batch_cost(batch.id).await.unwrap();
    assert_eq!(costs.box_count, 100);
    assert_eq!(costs.material_cost_total, dec!(100.00));
    assert_eq!(costs.material_cost_per_box, dec!(1.00));
    assert_eq!(costs.labor_cost_total, dec!(300.00));
    assert_eq!(costs.labor_cost_per_box, dec!(3.00));
    assert_eq!(costs.outward_transport_per_box, dec!(1.00));
    assert_eq!(costs.inward_transport_cost, Decimal::ZERO);
    assert_eq!(costs.total_cost, dec!(500.00));
    assert_eq!(costs.final_cost_per_box, dec!(5.00));

    let by_code = services
        .costs
        .get_batch_cost_by_code(&batch.batch_code)
        .await
        .unwrap();
    assert_eq!(by_code.total_cost, dec!(500.00));

    let events = app.drain_events();
    assert!(events.iter().any(|e| matches!(
        e,
        Event::CostsRecalculated { final_cost_per_box, .. } if *final_cost_per_box == dec!(5.00)
    )));
}

#[tokio::test]
async fn recalculation_is_idempotent() {
    let app = TestApp::new().await;
    let batch = app.approved_batch(40).await;
    let costs = &app.state.services.costs;

    costs
        .add_transport_cost(
            batch.id,
            AddTransportCost {
                cost_type: TransportType::Inward,
                ..outward(dec!(130.00))
            },
            app.admin,
        )
        .await
        .unwrap();

    let first = costs.recalculate_costs(batch.id, app.manager).await.unwrap();
    let second = costs.recalculate_costs(batch.id, app.admin).await.unwrap();

    // no harvest yet, so the estimate is the divisor
    assert_eq!(first.box_count, 40);
    assert_eq!(first.inward_transport_per_box, dec!(3.25));
    assert_eq!(first.total_cost, second.total_cost);
    assert_eq!(first.final_cost_per_box, second.final_cost_per_box);
    assert_eq!(first.inward_transport_per_box, second.inward_transport_per_box);
    assert_eq!(costs.list_transport_costs(batch.id).await.unwrap().len(), 1);
}

#[tokio::test]
async fn batch_without_costs_reports_a_zero_snapshot() {
    let app = TestApp::new().await;
    let batch = app.approved_batch(10).await;

    let costs = app.state.services.costs.get_batch_cost(batch.id).await.unwrap();
    assert_eq!(costs.total_cost, Decimal::ZERO);
    assert_eq!(costs.final_cost_per_box, Decimal::ZERO);
    assert!(costs.calculated_at.is_none());
}

#[tokio::test]
async fn labor_cost_without_packed_boxes_is_invalid() {
    let app = TestApp::new().await;
    let batch = app.approved_batch(10).await;

    let err = app
        .state
        .services
        .harvest
        .submit_daily_report(
            batch.id,
            SubmitDailyReport {
                labor_cost: Some(dec!(50.00)),
                ..report(0)
            },
            app.vendor,
        )
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::ValidationError(_));
    assert!(app
        .state
        .services
        .harvest
        .reports_on(day(1))
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn allocation_beyond_available_stock_is_refused() {
    let app = TestApp::new().await;
    let batch = app.approved_batch(10).await;
    let inventory = &app.state.services.inventory;

    let item = inventory
        .create_item(boxes_item("BOX-5KG", dec!(1.50), 5), app.admin)
        .await
        .unwrap();
    let err = inventory
        .allocate_to_batch(
            batch.id,
            AllocateMaterial {
                item_id: item.id,
                quantity: 6,
                notes: None,
            },
            app.manager,
        )
        .await
        .unwrap_err();
    assert_matches!(&err, ServiceError::InsufficientStock(_));
    assert_eq!(
        err.to_string(),
        "Insufficient stock available. Available: 5, Requested: 6"
    );

    let restocked = inventory
        .add_stock(item.id, AddStock { quantity: 10 }, app.store_keeper)
        .await
        .unwrap();
    assert_eq!(restocked.total_quantity, 15);
    assert_eq!(restocked.available_quantity, 15);

    inventory
        .allocate_to_batch(
            batch.id,
            AllocateMaterial {
                item_id: item.id,
                quantity: 6,
                notes: Some("second try".to_string()),
            },
            app.manager,
        )
        .await
        .unwrap();
    assert_eq!(inventory.list_batch_allocations(batch.id).await.unwrap().len(), 1);
}

#[tokio::test]
async fn item_codes_are_unique() {
    let app = TestApp::new().await;
    let inventory = &app.state.services.inventory;

    inventory
        .create_item(boxes_item("TAPE", dec!(0.40), 0), app.manager)
        .await
        .unwrap();
    let err = inventory
        .create_item(boxes_item("TAPE", dec!(0.45), 0), app.manager)
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::BusinessRule { code, .. } if code == DUPLICATE_ITEM_CODE);
    assert_eq!(inventory.list_items().await.unwrap().len(), 1);
}

#[tokio::test]
async fn labor_cost_per_box_follows_the_stored_total() {
    let app = TestApp::new().await;
    let batch = app.approved_batch(10).await;

    let harvested = app
        .state
        .services
        .harvest
        .submit_daily_report(
            batch.id,
            SubmitDailyReport {
                labor_cost: Some(dec!(1.005)),
                ..report(2)
            },
            app.vendor,
        )
        .await
        .unwrap();

    assert_eq!(harvested.report.labor_cost, Some(dec!(1.01)));
    assert_eq!(harvested.report.labor_cost_per_box, Some(dec!(0.51)));
}

#[tokio::test]
async fn cost_and_stock_changes_are_limited_by_role() {
    let app = TestApp::new().await;
    let batch = app.approved_batch(20).await;
    let services = &app.state.services;

    let err = services
        .costs
        .add_transport_cost(batch.id, outward(dec!(999.00)), app.other_vendor)
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::Forbidden(_));
    assert!(services
        .costs
        .list_transport_costs(batch.id)
        .await
        .unwrap()
        .is_empty());

    for caller in [app.vendor, app.supervisor, app.store_keeper] {
        let err = services
            .inventory
            .create_item(boxes_item("CLIP", dec!(0.10), 100), caller)
            .await
            .unwrap_err();
        assert_matches!(err, ServiceError::Forbidden(_));
    }
    assert!(services.inventory.list_items().await.unwrap().is_empty());

    let item = services
        .inventory
        .create_item(boxes_item("CLIP", dec!(0.10), 100), app.admin)
        .await
        .unwrap();

    let err = services
        .inventory
        .add_stock(item.id, AddStock { quantity: 5 }, app.vendor)
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::Forbidden(_));
    let restocked = services
        .inventory
        .add_stock(item.id, AddStock { quantity: 5 }, app.store_keeper)
        .await
        .unwrap();
    assert_eq!(restocked.total_quantity, 105);

    let err = services
        .inventory
        .allocate_to_batch(
            batch.id,
            AllocateMaterial {
                item_id: item.id,
                quantity: 10,
                notes: None,
            },
            app.vendor,
        )
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::Forbidden(_));
    let untouched = services.inventory.get_item(item.id).await.unwrap();
    assert_eq!(untouched.reserved_quantity, 0);

    let err = services
        .costs
        .recalculate_costs(batch.id, app.vendor)
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::Forbidden(_));
}
