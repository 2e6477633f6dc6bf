use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::db::retry_on_conflict;
use crate::entities::{gate_pass, UserRole};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::repositories::BatchRepository;
use crate::services::batches::BatchView;
use crate::services::codes::{next_code, GATE_PASS_PREFIX};
use crate::services::{authorize, resolve_caller};

pub const GATE_PASS_ALREADY_RECEIVED: &str = "GATE_PASS_ALREADY_RECEIVED";

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateGatePass {
    #[validate(length(min = 1, max = 50))]
    pub truck_number: String,
    #[validate(length(min = 1, max = 255))]
    pub driver_name: String,
    #[validate(length(max = 20))]
    pub driver_phone: Option<String>,
    #[validate(range(min = 1))]
    pub total_boxes: i32,
    pub dispatch_date: NaiveDate,
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct ReceiveGatePass {
    #[validate(range(min = 0))]
    pub received_boxes: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct GatePassView {
    pub id: Uuid,
    pub gate_pass_no: String,
    pub batch_id: Uuid,
    pub truck_number: String,
    pub driver_name: String,
    pub driver_phone: Option<String>,
    pub total_boxes: i32,
    pub dispatch_date: NaiveDate,
    pub notes: Option<String>,
    pub received_boxes: Option<i32>,
    pub received_at: Option<DateTime<Utc>>,
    pub received_by: Option<Uuid>,
    /// Boxes sent minus boxes received; negative for a surplus.
    pub shortage: Option<i32>,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
}

impl From<gate_pass::Model> for GatePassView {
    fn from(model: gate_pass::Model) -> Self {
        Self {
            shortage: model.shortage(),
            id: model.id,
            gate_pass_no: model.gate_pass_no,
            batch_id: model.batch_id,
            truck_number: model.truck_number,
            driver_name: model.driver_name,
            driver_phone: model.driver_phone,
            total_boxes: model.total_boxes,
            dispatch_date: model.dispatch_date,
            notes: model.notes,
            received_boxes: model.received_boxes,
            received_at: model.received_at,
            received_by: model.received_by,
            created_by: model.created_by,
            created_at: model.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct GatePassOutcome {
    pub gate_pass: GatePassView,
    pub batch: BatchView,
}

#[derive(Clone)]
pub struct DispatchService {
    db_pool: Arc<DatabaseConnection>,
    event_sender: EventSender,
    max_retries: u32,
}

impl DispatchService {
    pub fn new(db_pool: Arc<DatabaseConnection>, event_sender: EventSender, max_retries: u32) -> Self {
        Self {
            db_pool,
            event_sender,
            max_retries,
        }
    }

    /// Issues a gate pass for `total_boxes` of the batch's undispatched boxes.
    #[instrument(skip(self, request), fields(total_boxes = request.total_boxes))]
    pub async fn create_gate_pass(
        &self,
        batch_id: Uuid,
        request: CreateGatePass,
        caller_id: Uuid,
    ) -> Result<GatePassOutcome, ServiceError> {
        request.validate()?;

        let req = &request;
        let (outcome, events) = retry_on_conflict("create_gate_pass", self.max_retries, move || {
            self.try_create(batch_id, req, caller_id)
        })
        .await?;

        metrics::counter!("harvest_api.dispatch.gate_passes", 1);
        info!(
            gate_pass_no = %outcome.gate_pass.gate_pass_no,
            dispatched = outcome.batch.dispatched_boxes,
            gate_pass_remaining = outcome.batch.gate_pass_remaining,
            status = %outcome.batch.status,
            "Gate pass created"
        );
        for event in events {
            self.event_sender.notify(event);
        }
        Ok(outcome)
    }

    async fn try_create(
        &self,
        batch_id: Uuid,
        request: &CreateGatePass,
        caller_id: Uuid,
    ) -> Result<(GatePassOutcome, Vec<Event>), ServiceError> {
        let txn = self.db_pool.begin().await.map_err(ServiceError::db_error)?;

        let caller = resolve_caller(&txn, caller_id).await?;
        let (_, mut ledger) = BatchRepository::load_ledger(&txn, batch_id).await?;
        let status_before = ledger.status;
        ledger.record_dispatch(request.total_boxes)?;

        let now = Utc::now();
        let gate_pass_no = next_code::<gate_pass::Entity, _>(
            &txn,
            gate_pass::Column::GatePassNo,
            GATE_PASS_PREFIX,
            now.date_naive(),
        )
        .await?;

        let pass = gate_pass::ActiveModel {
            id: Set(Uuid::new_v4()),
            gate_pass_no: Set(gate_pass_no),
            batch_id: Set(batch_id),
            truck_number: Set(request.truck_number.trim().to_string()),
            driver_name: Set(request.driver_name.trim().to_string()),
            driver_phone: Set(request.driver_phone.clone()),
            total_boxes: Set(request.total_boxes),
            dispatch_date: Set(request.dispatch_date),
            notes: Set(request.notes.clone()),
            received_boxes: Set(None),
            received_at: Set(None),
            received_by: Set(None),
            created_by: Set(caller.id),
            created_at: Set(now),
        }
        .insert(&txn)
        .await
        .map_err(ServiceError::db_error)?;

        BatchRepository::save_ledger(&txn, &ledger, now).await?;
        let batch = BatchView::load(&txn, batch_id).await?;

        txn.commit().await.map_err(ServiceError::db_error)?;

        let mut events = vec![Event::GatePassCreated {
            gate_pass_id: pass.id,
            gate_pass_no: pass.gate_pass_no.clone(),
            batch_id,
            total_boxes: pass.total_boxes,
        }];
        if status_before != ledger.status {
            events.push(Event::BatchStatusChanged {
                batch_id,
                from: status_before,
                to: ledger.status,
            });
        }

        Ok((
            GatePassOutcome {
                gate_pass: pass.into(),
                batch,
            },
            events,
        ))
    }

    /// Records what actually arrived. Batch counters are left alone; a
    /// shortage is logged and announced. Store keepers, admins and managers
    /// may sign for a gate pass.
    #[instrument(skip(self, request), fields(received_boxes = request.received_boxes))]
    pub async fn receive_gate_pass(
        &self,
        gate_pass_id: Uuid,
        request: ReceiveGatePass,
        caller_id: Uuid,
    ) -> Result<GatePassView, ServiceError> {
        request.validate()?;

        let txn = self.db_pool.begin().await.map_err(ServiceError::db_error)?;
        let caller = authorize(&txn, caller_id, UserRole::handles_stock, "receive gate passes").await?;

        let pass = gate_pass::Entity::find_by_id(gate_pass_id)
            .one(&txn)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| ServiceError::not_found("Gate pass", "id", gate_pass_id))?;

        if pass.is_received() {
            return Err(already_received(&pass.gate_pass_no));
        }

        let receipt = gate_pass::ActiveModel {
            received_boxes: Set(Some(request.received_boxes)),
            received_at: Set(Some(Utc::now())),
            received_by: Set(Some(caller.id)),
            ..Default::default()
        };
        let result = gate_pass::Entity::update_many()
            .set(receipt)
            .filter(gate_pass::Column::Id.eq(gate_pass_id))
            .filter(gate_pass::Column::ReceivedAt.is_null())
            .exec(&txn)
            .await
            .map_err(ServiceError::db_error)?;
        if result.rows_affected == 0 {
            return Err(already_received(&pass.gate_pass_no));
        }

        let pass = gate_pass::Entity::find_by_id(gate_pass_id)
            .one(&txn)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| ServiceError::not_found("Gate pass", "id", gate_pass_id))?;

        txn.commit().await.map_err(ServiceError::db_error)?;

        self.event_sender.notify(Event::GatePassReceived {
            gate_pass_id,
            batch_id: pass.batch_id,
            received_boxes: request.received_boxes,
        });

        match pass.shortage() {
            Some(shortage) if shortage > 0 => {
                metrics::counter!("harvest_api.dispatch.shortages", 1);
                warn!(
                    gate_pass_no = %pass.gate_pass_no,
                    batch_id = %pass.batch_id,
                    sent = pass.total_boxes,
                    received = request.received_boxes,
                    shortage,
                    "Gate pass received short"
                );
                self.event_sender.notify(Event::GatePassShortage {
                    gate_pass_id,
                    gate_pass_no: pass.gate_pass_no.clone(),
                    batch_id: pass.batch_id,
                    total_boxes: pass.total_boxes,
                    received_boxes: request.received_boxes,
                    shortage,
                });
            }
            Some(shortage) if shortage < 0 => info!(
                gate_pass_no = %pass.gate_pass_no,
                surplus = -shortage,
                "Gate pass received with surplus"
            ),
            _ => info!(gate_pass_no = %pass.gate_pass_no, "Gate pass received in full"),
        }

        Ok(pass.into())
    }

    #[instrument(skip(self))]
    pub async fn get_gate_pass(&self, gate_pass_id: Uuid) -> Result<GatePassView, ServiceError> {
        gate_pass::Entity::find_by_id(gate_pass_id)
            .one(&*self.db_pool)
            .await
            .map_err(ServiceError::db_error)?
            .map(GatePassView::from)
            .ok_or_else(|| ServiceError::not_found("Gate pass", "id", gate_pass_id))
    }

    #[instrument(skip(self))]
    pub async fn list_batch_gate_passes(&self, batch_id: Uuid) -> Result<Vec<GatePassView>, ServiceError> {
        let db = &*self.db_pool;
        BatchRepository::find(db, batch_id).await?;

        let passes = gate_pass::Entity::find()
            .filter(gate_pass::Column::BatchId.eq(batch_id))
            .order_by_asc(gate_pass::Column::DispatchDate)
            .order_by_asc(gate_pass::Column::CreatedAt)
            .all(db)
            .await
            .map_err(ServiceError::db_error)?;
        Ok(passes.into_iter().map(Into::into).collect())
    }

    /// Gate passes still waiting for a receipt, newest dispatch first.
    #[instrument(skip(self))]
    pub async fn list_pending_gate_passes(&self) -> Result<Vec<GatePassView>, ServiceError> {
        let passes = gate_pass::Entity::find()
            .filter(gate_pass::Column::ReceivedAt.is_null())
            .order_by_desc(gate_pass::Column::DispatchDate)
            .order_by_desc(gate_pass::Column::CreatedAt)
            .all(&*self.db_pool)
            .await
            .map_err(ServiceError::db_error)?;
        Ok(passes.into_iter().map(Into::into).collect())
    }

    #[instrument(skip(self))]
    pub async fn gate_passes_on(&self, date: NaiveDate) -> Result<Vec<GatePassView>, ServiceError> {
        let passes = gate_pass::Entity::find()
            .filter(gate_pass::Column::DispatchDate.eq(date))
            .order_by_asc(gate_pass::Column::CreatedAt)
            .all(&*self.db_pool)
            .await
            .map_err(ServiceError::db_error)?;
        Ok(passes.into_iter().map(Into::into).collect())
    }
}

fn already_received(gate_pass_no: &str) -> ServiceError {
    ServiceError::business(
        GATE_PASS_ALREADY_RECEIVED,
        format!("Gate pass {} has already been received", gate_pass_no),
    )
}
