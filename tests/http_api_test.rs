mod common;

use axum::http::{Method, StatusCode};
use serde_json::json;

use common::TestApp;

#[tokio::test]
async fn health_endpoints_respond() {
    let app = TestApp::new().await;

    let (status, body) = app.request(Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "up");

    let (status, body) = app.request(Method::GET, "/health/ready", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ready");
}

#[tokio::test]
async fn mutations_require_a_caller() {
    let app = TestApp::new().await;
    let batch = app.approved_batch(10).await;

    let (status, body) = app
        .request(
            Method::PUT,
            &format!("/api/v1/batches/{}/status", batch.id),
            None,
            Some(json!({ "status": "CANCELLED" })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "UNAUTHORIZED");
}

#[tokio::test]
async fn harvest_and_dispatch_over_http() {
    let app = TestApp::new().await;
    let batch = app.approved_batch(100).await;
    let reports = format!("/api/v1/batches/{}/reports", batch.id);

    let (status, body) = app
        .request(
            Method::POST,
            &reports,
            Some(app.vendor),
            Some(json!({
                "report_date": "2024-03-01",
                "boxes_packed": 60,
                "boxes_wasted": 2,
                "labor_count": 6
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["batch"]["remaining_boxes"], 40);
    assert_eq!(body["data"]["batch"]["status"], "HARVEST_IN_PROGRESS");

    let (status, body) = app
        .request(
            Method::POST,
            &reports,
            Some(app.vendor),
            Some(json!({
                "report_date": "2024-03-02",
                "boxes_packed": 41,
                "boxes_wasted": 0,
                "labor_count": 6
            })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "HARVEST_CAPACITY_EXCEEDED");
    assert_eq!(
        body["message"],
        "Limit exceeded. Only 40 boxes remaining for harvest in this batch."
    );

    let (status, body) = app
        .request(
            Method::POST,
            &format!("/api/v1/batches/{}/gate-passes", batch.id),
            Some(app.vendor),
            Some(json!({
                "truck_number": "KA-01-7788",
                "driver_name": "Imran",
                "total_boxes": 60,
                "dispatch_date": "2024-03-02"
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["batch"]["gate_pass_remaining"], 0);

    let (status, body) = app
        .request(
            Method::GET,
            &format!("/api/v1/batches/by-code/{}", batch.batch_code),
            None,
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["dispatched_boxes"], 60);
    assert_eq!(body["data"]["actual_boxes"], 60);
}

#[tokio::test]
async fn missing_batch_is_a_404_with_error_body() {
    let app = TestApp::new().await;

    let (status, body) = app
        .request(
            Method::GET,
            &format!("/api/v1/batches/{}", uuid::Uuid::new_v4()),
            None,
            None,
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "RESOURCE_NOT_FOUND");
    assert!(body["timestamp"].is_string());
}

#[tokio::test]
async fn inspection_decision_is_tagged_by_outcome() {
    let app = TestApp::new().await;

    let (status, body) = app
        .request(
            Method::POST,
            "/api/v1/inspections",
            Some(app.vendor),
            Some(json!({ "farm_id": app.farm, "estimated_boxes": 25 })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let inspection_id = body["data"]["id"].as_str().unwrap().to_string();

    let (status, body) = app
        .request(
            Method::POST,
            &format!("/api/v1/inspections/{}/decision", inspection_id),
            Some(app.manager),
            Some(json!({ "approved": true })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["outcome"], "approved");
    assert_eq!(body["data"]["batch"]["allocated_boxes"], 25);
}

#[tokio::test]
async fn catalogue_and_farm_writes_need_an_authorized_caller() {
    let app = TestApp::new().await;
    let item = json!({
        "item_code": "BOX-13KG",
        "item_name": "Corrugated box",
        "category": "BOX",
        "unit_of_measure": "pcs",
        "unit_cost": "2.00"
    });

    let (status, _) = app
        .request(Method::POST, "/api/v1/inventory/items", None, Some(item.clone()))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = app
        .request(Method::POST, "/api/v1/inventory/items", Some(app.vendor), Some(item.clone()))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "FORBIDDEN");

    let (status, _) = app
        .request(Method::POST, "/api/v1/inventory/items", Some(app.manager), Some(item))
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let farm = json!({ "farmer_name": "Lakeside", "location": "Raver" });
    let (status, _) = app
        .request(Method::POST, "/api/v1/farms", Some(app.vendor), Some(farm.clone()))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app
        .request(Method::POST, "/api/v1/farms", Some(app.admin), Some(farm))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["status"], "ACTIVE");

    let farm_id = body["data"]["id"].as_str().unwrap().to_string();
    let (status, body) = app
        .request(Method::GET, &format!("/api/v1/farms/{}", farm_id), None, None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["farmer_name"], "Lakeside");
}
