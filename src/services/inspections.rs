use std::sync::Arc;

use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    IntoActiveModel, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::db::retry_on_conflict;
use crate::entities::{batch, farm, farm_inspection, FarmStatus, InspectionStatus, UserRole};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::services::batches::BatchView;
use crate::services::box_ledger::BoxLedger;
use crate::services::codes::{next_code, BATCH_PREFIX};
use crate::services::farms::find_farm;
use crate::services::{authorize, resolve_caller};

pub const INSPECTION_ALREADY_DECIDED: &str = "INSPECTION_ALREADY_DECIDED";

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct SubmitInspection {
    pub farm_id: Uuid,
    #[validate(range(min = 1))]
    pub estimated_boxes: i32,
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct DecideInspection {
    pub approved: bool,
    #[validate(length(max = 1000))]
    pub rejection_reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct InspectionView {
    pub id: Uuid,
    pub farm_id: Uuid,
    pub vendor_id: Uuid,
    pub estimated_boxes: i32,
    pub notes: Option<String>,
    pub status: InspectionStatus,
    pub approved_by: Option<Uuid>,
    pub approved_at: Option<DateTime<Utc>>,
    pub rejection_reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<farm_inspection::Model> for InspectionView {
    fn from(model: farm_inspection::Model) -> Self {
        Self {
            id: model.id,
            farm_id: model.farm_id,
            vendor_id: model.vendor_id,
            estimated_boxes: model.estimated_boxes,
            notes: model.notes,
            status: model.status,
            approved_by: model.approved_by,
            approved_at: model.approved_at,
            rejection_reason: model.rejection_reason,
            created_at: model.created_at,
        }
    }
}

/// Result of deciding an inspection. Both arms are successful outcomes.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum InspectionDecision {
    Approved {
        inspection: InspectionView,
        batch: BatchView,
    },
    Rejected {
        inspection: InspectionView,
    },
}

impl InspectionDecision {
    pub fn inspection(&self) -> &InspectionView {
        match self {
            InspectionDecision::Approved { inspection, .. }
            | InspectionDecision::Rejected { inspection } => inspection,
        }
    }
}

#[derive(Clone)]
pub struct InspectionService {
    db_pool: Arc<DatabaseConnection>,
    event_sender: EventSender,
    max_retries: u32,
}

impl InspectionService {
    pub fn new(db_pool: Arc<DatabaseConnection>, event_sender: EventSender, max_retries: u32) -> Self {
        Self {
            db_pool,
            event_sender,
            max_retries,
        }
    }

    /// Files an inspection for a farm; the caller is recorded as its vendor.
    #[instrument(skip(self, request), fields(farm_id = %request.farm_id))]
    pub async fn submit_inspection(
        &self,
        request: SubmitInspection,
        caller_id: Uuid,
    ) -> Result<InspectionView, ServiceError> {
        request.validate()?;

        let txn = self.db_pool.begin().await.map_err(ServiceError::db_error)?;
        let vendor = resolve_caller(&txn, caller_id).await?;
        let farm = find_farm(&txn, request.farm_id).await?;

        let now = Utc::now();
        let inspection = farm_inspection::ActiveModel {
            id: Set(Uuid::new_v4()),
            farm_id: Set(farm.id),
            vendor_id: Set(vendor.id),
            estimated_boxes: Set(request.estimated_boxes),
            notes: Set(request.notes.clone()),
            status: Set(InspectionStatus::Pending),
            approved_by: Set(None),
            approved_at: Set(None),
            rejection_reason: Set(None),
            created_at: Set(now),
        }
        .insert(&txn)
        .await
        .map_err(ServiceError::db_error)?;

        set_farm_status(&txn, farm, FarmStatus::InspectionPending, now).await?;
        txn.commit().await.map_err(ServiceError::db_error)?;

        info!(inspection_id = %inspection.id, "Inspection submitted");
        self.event_sender.notify(Event::InspectionSubmitted {
            inspection_id: inspection.id,
            farm_id: inspection.farm_id,
            vendor_id: inspection.vendor_id,
            estimated_boxes: inspection.estimated_boxes,
        });
        Ok(inspection.into())
    }

    /// Approves or rejects a pending inspection.
    ///
    /// Approval opens a batch sized to the inspection's estimate and marks
    /// the farm ready for harvest. Rejection records the reason and marks the
    /// farm rejected. Only admins and managers decide inspections.
    #[instrument(skip(self, request), fields(approved = request.approved))]
    pub async fn approve_inspection(
        &self,
        inspection_id: Uuid,
        request: DecideInspection,
        caller_id: Uuid,
    ) -> Result<InspectionDecision, ServiceError> {
        request.validate()?;

        let req = &request;
        let decision = retry_on_conflict("approve_inspection", self.max_retries, move || {
            self.try_decide(inspection_id, req, caller_id)
        })
        .await?;

        match &decision {
            InspectionDecision::Approved { inspection, batch } => {
                metrics::counter!("harvest_api.inspections.approved", 1);
                info!(batch_code = %batch.batch_code, "Inspection approved");
                self.event_sender.notify(Event::InspectionApproved {
                    inspection_id: inspection.id,
                    batch_id: batch.id,
                    batch_code: batch.batch_code.clone(),
                    vendor_id: inspection.vendor_id,
                });
            }
            InspectionDecision::Rejected { inspection } => {
                metrics::counter!("harvest_api.inspections.rejected", 1);
                info!("Inspection rejected");
                self.event_sender.notify(Event::InspectionRejected {
                    inspection_id: inspection.id,
                    vendor_id: inspection.vendor_id,
                    reason: inspection.rejection_reason.clone(),
                });
            }
        }
        Ok(decision)
    }

    async fn try_decide(
        &self,
        inspection_id: Uuid,
        request: &DecideInspection,
        caller_id: Uuid,
    ) -> Result<InspectionDecision, ServiceError> {
        let txn = self.db_pool.begin().await.map_err(ServiceError::db_error)?;

        let approver = authorize(&txn, caller_id, UserRole::is_elevated, "decide inspections").await?;

        let inspection = farm_inspection::Entity::find_by_id(inspection_id)
            .one(&txn)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| ServiceError::not_found("Inspection", "id", inspection_id))?;
        if inspection.status != InspectionStatus::Pending {
            return Err(already_decided(&inspection));
        }

        let now = Utc::now();
        let decided_status = if request.approved {
            InspectionStatus::Approved
        } else {
            InspectionStatus::Rejected
        };
        let decision = farm_inspection::ActiveModel {
            status: Set(decided_status),
            approved_by: Set(Some(approver.id)),
            approved_at: Set(Some(now)),
            rejection_reason: Set(if request.approved {
                None
            } else {
                request.rejection_reason.clone()
            }),
            ..Default::default()
        };
        let result = farm_inspection::Entity::update_many()
            .set(decision)
            .filter(farm_inspection::Column::Id.eq(inspection_id))
            .filter(farm_inspection::Column::Status.eq(InspectionStatus::Pending))
            .exec(&txn)
            .await
            .map_err(ServiceError::db_error)?;
        if result.rows_affected == 0 {
            return Err(already_decided(&inspection));
        }

        let farm = find_farm(&txn, inspection.farm_id).await?;
        let decided = farm_inspection::Entity::find_by_id(inspection_id)
            .one(&txn)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| ServiceError::not_found("Inspection", "id", inspection_id))?;

        if !request.approved {
            set_farm_status(&txn, farm, FarmStatus::InspectionRejected, now).await?;
            txn.commit().await.map_err(ServiceError::db_error)?;
            return Ok(InspectionDecision::Rejected {
                inspection: decided.into(),
            });
        }

        set_farm_status(&txn, farm, FarmStatus::ReadyForHarvest, now).await?;

        let today = now.date_naive();
        let batch_code = next_code::<batch::Entity, _>(&txn, batch::Column::BatchCode, BATCH_PREFIX, today).await?;
        let ledger = BoxLedger::opening(Uuid::new_v4(), decided.estimated_boxes, today);

        let mut new_batch = batch::ActiveModel {
            id: Set(ledger.batch_id),
            batch_code: Set(batch_code),
            inspection_id: Set(Some(decided.id)),
            farm_id: Set(decided.farm_id),
            vendor_id: Set(decided.vendor_id),
            created_by: Set(approver.id),
            estimated_boxes: Set(ledger.estimated),
            end_date: Set(None),
            notes: Set(None),
            created_at: Set(now),
            ..Default::default()
        };
        ledger.apply_to(&mut new_batch, now);
        new_batch.version = Set(ledger.version);

        let created = new_batch.insert(&txn).await.map_err(ServiceError::db_error)?;
        txn.commit().await.map_err(ServiceError::db_error)?;

        Ok(InspectionDecision::Approved {
            inspection: decided.into(),
            batch: BatchView::new(&created, 0),
        })
    }

    /// Inspections awaiting a decision, oldest first.
    #[instrument(skip(self))]
    pub async fn list_pending_inspections(&self) -> Result<Vec<InspectionView>, ServiceError> {
        let rows = farm_inspection::Entity::find()
            .filter(farm_inspection::Column::Status.eq(InspectionStatus::Pending))
            .order_by_asc(farm_inspection::Column::CreatedAt)
            .all(&*self.db_pool)
            .await
            .map_err(ServiceError::db_error)?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    #[instrument(skip(self))]
    pub async fn get_inspection(&self, inspection_id: Uuid) -> Result<InspectionView, ServiceError> {
        farm_inspection::Entity::find_by_id(inspection_id)
            .one(&*self.db_pool)
            .await
            .map_err(ServiceError::db_error)?
            .map(InspectionView::from)
            .ok_or_else(|| ServiceError::not_found("Inspection", "id", inspection_id))
    }
}

async fn set_farm_status<C: ConnectionTrait>(
    conn: &C,
    farm: farm::Model,
    status: FarmStatus,
    now: DateTime<Utc>,
) -> Result<(), ServiceError> {
    let mut active = farm.into_active_model();
    active.status = Set(status);
    active.updated_at = Set(now);
    active.update(conn).await.map_err(ServiceError::db_error)?;
    Ok(())
}

fn already_decided(inspection: &farm_inspection::Model) -> ServiceError {
    ServiceError::business(
        INSPECTION_ALREADY_DECIDED,
        format!("Inspection {} has already been decided", inspection.id),
    )
}
