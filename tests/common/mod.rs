#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
    Router,
};
use chrono::{NaiveDate, Utc};
use harvest_api::{
    config::AppConfig,
    db,
    entities::{user, UserRole},
    events::{Event, EventSender},
    services::{
        batches::BatchView,
        farms::RegisterFarm,
        harvest::SubmitDailyReport,
        inspections::{DecideInspection, InspectionDecision, SubmitInspection},
    },
    AppState,
};
use http_body_util::BodyExt;
use sea_orm::{ActiveModelTrait, DatabaseConnection, Set};
use serde_json::Value;
use tokio::sync::mpsc;
use tower::ServiceExt;
use uuid::Uuid;

/// Application state over a private in-memory SQLite database, seeded with
/// one user per role and a single farm registered by the admin.
pub struct TestApp {
    pub state: AppState,
    pub db: Arc<DatabaseConnection>,
    pub events: mpsc::Receiver<Event>,
    pub admin: Uuid,
    pub manager: Uuid,
    pub supervisor: Uuid,
    pub vendor: Uuid,
    pub other_vendor: Uuid,
    pub store_keeper: Uuid,
    pub farm: Uuid,
}

impl TestApp {
    pub async fn new() -> Self {
        let mut cfg = AppConfig::new(
            "sqlite::memory:".to_string(),
            "127.0.0.1".to_string(),
            18_080,
            "test".to_string(),
        );
        // one connection keeps every query on the same in-memory database
        cfg.db_max_connections = 1;
        cfg.db_min_connections = 1;

        let pool = db::establish_connection_from_app_config(&cfg)
            .await
            .expect("failed to create test database");
        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations in tests");

        let db = Arc::new(pool);
        let (tx, events) = mpsc::channel(256);
        let state = AppState::new(db.clone(), cfg, EventSender::new(tx));

        let admin = seed_user(&db, "Ada Admin", UserRole::Admin, true).await;
        let manager = seed_user(&db, "Mo Manager", UserRole::Manager, true).await;
        let supervisor = seed_user(&db, "Sam Supervisor", UserRole::Supervisor, true).await;
        let vendor = seed_user(&db, "Val Vendor", UserRole::Vendor, true).await;
        let other_vendor = seed_user(&db, "Otto Vendor", UserRole::Vendor, true).await;
        let store_keeper = seed_user(&db, "Stu Storekeeper", UserRole::StoreKeeper, true).await;
        let farm = state
            .services
            .farms
            .create_farm(farm_named("Green Valley"), admin)
            .await
            .expect("register farm")
            .id;

        Self {
            state,
            db,
            events,
            admin,
            manager,
            supervisor,
            vendor,
            other_vendor,
            store_keeper,
            farm,
        }
    }

    pub fn router(&self) -> Router {
        harvest_api::app_router(self.state.clone())
    }

    /// Submits an inspection for the seeded farm as the vendor and has the
    /// admin approve it.
    pub async fn approved_batch(&self, estimated_boxes: i32) -> BatchView {
        let inspection = self
            .state
            .services
            .inspections
            .submit_inspection(
                SubmitInspection {
                    farm_id: self.farm,
                    estimated_boxes,
                    notes: None,
                },
                self.vendor,
            )
            .await
            .expect("submit inspection");

        let decision = self
            .state
            .services
            .inspections
            .approve_inspection(
                inspection.id,
                DecideInspection {
                    approved: true,
                    rejection_reason: None,
                },
                self.admin,
            )
            .await
            .expect("approve inspection");

        match decision {
            InspectionDecision::Approved { batch, .. } => batch,
            other => panic!("expected approval, got {:?}", other),
        }
    }

    /// Everything published so far.
    pub fn drain_events(&mut self) -> Vec<Event> {
        let mut seen = Vec::new();
        while let Ok(event) = self.events.try_recv() {
            seen.push(event);
        }
        seen
    }

    /// Sends a request through the full router and decodes the JSON body.
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        caller: Option<Uuid>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(id) = caller {
            builder = builder.header("x-user-id", id.to_string());
        }
        let request = match body {
            Some(json) => builder
                .header("content-type", "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, json)
    }
}

pub fn report(boxes_packed: i32) -> SubmitDailyReport {
    SubmitDailyReport {
        report_date: day(1),
        boxes_packed,
        boxes_wasted: 0,
        labor_count: 4,
        notes: None,
        labor_cost: None,
    }
}

pub fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
}

pub async fn seed_user(db: &DatabaseConnection, name: &str, role: UserRole, active: bool) -> Uuid {
    let id = Uuid::new_v4();
    user::ActiveModel {
        id: Set(id),
        full_name: Set(name.to_string()),
        email: Set(format!("{}@example.com", id)),
        role: Set(role),
        is_active: Set(active),
        created_at: Set(Utc::now()),
    }
    .insert(db)
    .await
    .expect("seed user");
    id
}

pub fn farm_named(farmer_name: &str) -> RegisterFarm {
    RegisterFarm {
        farmer_name: farmer_name.to_string(),
        location: Some("Jalgaon".to_string()),
        produce_type: Some("Banana".to_string()),
    }
}
