use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::{ConnectionTrait, DatabaseConnection, TransactionTrait};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::db::retry_on_conflict;
use crate::entities::{batch, BatchStatus, UserRole};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::repositories::BatchRepository;
use crate::services::box_ledger::{BoxLedger, StatusChange};
use crate::services::resolve_caller;

/// Batch as returned to clients. Counters are normalized and `actual_boxes`
/// is summed from the harvest reports at read time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct BatchView {
    pub id: Uuid,
    pub batch_code: String,
    pub inspection_id: Option<Uuid>,
    pub farm_id: Uuid,
    pub vendor_id: Uuid,
    pub status: BatchStatus,
    pub estimated_boxes: i32,
    pub allocated_boxes: i32,
    pub harvested_boxes: i32,
    pub remaining_boxes: i32,
    pub actual_boxes: i32,
    pub dispatched_boxes: i32,
    pub gate_pass_remaining: i32,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub notes: Option<String>,
    pub version: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl BatchView {
    pub fn new(model: &batch::Model, actual_boxes: i32) -> Self {
        let ledger = BoxLedger::from_model(model);
        Self {
            id: model.id,
            batch_code: model.batch_code.clone(),
            inspection_id: model.inspection_id,
            farm_id: model.farm_id,
            vendor_id: model.vendor_id,
            status: ledger.status,
            estimated_boxes: ledger.estimated,
            allocated_boxes: ledger.allocated,
            harvested_boxes: ledger.harvested,
            remaining_boxes: ledger.remaining(),
            actual_boxes,
            dispatched_boxes: ledger.dispatched,
            gate_pass_remaining: ledger.gate_pass_remaining(),
            start_date: ledger.start_date,
            end_date: model.end_date,
            notes: model.notes.clone(),
            version: model.version,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }

    /// Reads the batch back on `conn` and builds its view.
    pub(crate) async fn load<C: ConnectionTrait>(conn: &C, batch_id: Uuid) -> Result<Self, ServiceError> {
        let model = BatchRepository::find(conn, batch_id).await?;
        let actual = BatchRepository::sum_boxes_packed(conn, batch_id).await?;
        Ok(Self::new(&model, actual))
    }
}

/// Request body for an explicit status change.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UpdateBatchStatus {
    pub status: BatchStatus,
}

#[derive(Clone)]
pub struct BatchService {
    db_pool: Arc<DatabaseConnection>,
    event_sender: EventSender,
    max_retries: u32,
}

impl BatchService {
    pub fn new(db_pool: Arc<DatabaseConnection>, event_sender: EventSender, max_retries: u32) -> Self {
        Self {
            db_pool,
            event_sender,
            max_retries,
        }
    }

    #[instrument(skip(self))]
    pub async fn get_batch(&self, batch_id: Uuid) -> Result<BatchView, ServiceError> {
        BatchView::load(&*self.db_pool, batch_id).await
    }

    #[instrument(skip(self))]
    pub async fn get_batch_by_code(&self, batch_code: &str) -> Result<BatchView, ServiceError> {
        let db = &*self.db_pool;
        let model = BatchRepository::find_by_code(db, batch_code).await?;
        let actual = BatchRepository::sum_boxes_packed(db, model.id).await?;
        Ok(BatchView::new(&model, actual))
    }

    /// Moves a batch to `status` on behalf of `caller_id`.
    ///
    /// Vendors may only touch their own batches; admins and managers may
    /// touch any batch.
    #[instrument(skip(self))]
    pub async fn update_batch_status(
        &self,
        batch_id: Uuid,
        status: BatchStatus,
        caller_id: Uuid,
    ) -> Result<BatchView, ServiceError> {
        let (view, change) = retry_on_conflict("update_batch_status", self.max_retries, move || {
            self.try_update_status(batch_id, status, caller_id)
        })
        .await?;

        if change.is_change() {
            info!(from = %change.from, to = %change.to, "Batch status updated");
            self.event_sender.notify(Event::BatchStatusChanged {
                batch_id,
                from: change.from,
                to: change.to,
            });
        }
        Ok(view)
    }

    async fn try_update_status(
        &self,
        batch_id: Uuid,
        status: BatchStatus,
        caller_id: Uuid,
    ) -> Result<(BatchView, StatusChange), ServiceError> {
        let txn = self.db_pool.begin().await.map_err(ServiceError::db_error)?;

        let caller = resolve_caller(&txn, caller_id).await?;
        let (model, mut ledger) = BatchRepository::load_ledger(&txn, batch_id).await?;

        if caller.role == UserRole::Vendor && model.vendor_id != caller.id {
            warn!(vendor_id = %model.vendor_id, "Vendor attempted to update another vendor's batch");
            return Err(ServiceError::Forbidden(
                "You are not authorized to update this batch.".to_string(),
            ));
        }

        let now = Utc::now();
        let change = ledger.request_status(status, now.date_naive())?;
        BatchRepository::save_ledger(&txn, &ledger, now).await?;

        let view = BatchView::load(&txn, batch_id).await?;
        txn.commit().await.map_err(ServiceError::db_error)?;
        Ok((view, change))
    }
}
