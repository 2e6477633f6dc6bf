//! Batch cost roll-up.
//!
//! The snapshot in `batch_costs` is always rebuilt from the live cost facts
//! (allocations, transport costs, labor costs) and overwritten in place, so
//! recalculating twice with the same facts gives the same numbers.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    IntoActiveModel, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::db::retry_on_conflict;
use crate::entities::{
    batch_cost, inventory_allocation, inventory_item, labor_cost, transport_cost, TransportType,
};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::repositories::BatchRepository;
use crate::services::box_ledger::BoxLedger;
use crate::entities::UserRole;
use crate::services::{authorize, validate_money};

/// Two decimal places, halves rounded away from zero.
pub fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// `total / box_count` rounded to money precision; zero when there are no boxes.
pub fn per_box(total: Decimal, box_count: i32) -> Decimal {
    if box_count <= 0 {
        return Decimal::ZERO;
    }
    round_money(total / Decimal::from(box_count))
}

/// Raw cost totals for one batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CostInputs {
    pub material_total: Decimal,
    pub labor_total: Decimal,
    pub inward_transport: Decimal,
    pub outward_transport: Decimal,
}

/// Computed cost breakdown; mirrors a `batch_costs` row without identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CostBreakdown {
    pub material_cost_total: Decimal,
    pub labor_cost_total: Decimal,
    pub inward_transport_cost: Decimal,
    pub outward_transport_cost: Decimal,
    pub material_cost_per_box: Decimal,
    pub labor_cost_per_box: Decimal,
    pub inward_transport_per_box: Decimal,
    pub outward_transport_per_box: Decimal,
    pub total_cost: Decimal,
    pub final_cost_per_box: Decimal,
    pub box_count: i32,
}

impl CostBreakdown {
    pub fn compute(inputs: &CostInputs, box_count: i32) -> Self {
        let material = round_money(inputs.material_total);
        let labor = round_money(inputs.labor_total);
        let inward = round_money(inputs.inward_transport);
        let outward = round_money(inputs.outward_transport);
        let total = material + outward + labor + inward;

        Self {
            material_cost_total: material,
            labor_cost_total: labor,
            inward_transport_cost: inward,
            outward_transport_cost: outward,
            material_cost_per_box: per_box(material, box_count),
            labor_cost_per_box: per_box(labor, box_count),
            inward_transport_per_box: per_box(inward, box_count),
            outward_transport_per_box: per_box(outward, box_count),
            total_cost: total,
            final_cost_per_box: per_box(total, box_count),
            box_count,
        }
    }

    fn apply_to(&self, model: &mut batch_cost::ActiveModel, now: DateTime<Utc>) {
        model.material_cost_total = Set(self.material_cost_total);
        model.labor_cost_total = Set(self.labor_cost_total);
        model.inward_transport_cost = Set(self.inward_transport_cost);
        model.outward_transport_cost = Set(self.outward_transport_cost);
        model.material_cost_per_box = Set(self.material_cost_per_box);
        model.labor_cost_per_box = Set(self.labor_cost_per_box);
        model.inward_transport_per_box = Set(self.inward_transport_per_box);
        model.outward_transport_per_box = Set(self.outward_transport_per_box);
        model.total_cost = Set(self.total_cost);
        model.final_cost_per_box = Set(self.final_cost_per_box);
        model.box_count = Set(self.box_count);
        model.calculated_at = Set(now);
    }
}

/// Cost snapshot as returned to API clients. `calculated_at` is empty until
/// the first roll-up has run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct BatchCostView {
    pub batch_id: Uuid,
    pub material_cost_total: Decimal,
    pub labor_cost_total: Decimal,
    pub inward_transport_cost: Decimal,
    pub outward_transport_cost: Decimal,
    pub material_cost_per_box: Decimal,
    pub labor_cost_per_box: Decimal,
    pub inward_transport_per_box: Decimal,
    pub outward_transport_per_box: Decimal,
    pub total_cost: Decimal,
    pub final_cost_per_box: Decimal,
    pub box_count: i32,
    pub calculated_at: Option<DateTime<Utc>>,
}

impl BatchCostView {
    fn empty(batch_id: Uuid) -> Self {
        Self {
            batch_id,
            material_cost_total: Decimal::ZERO,
            labor_cost_total: Decimal::ZERO,
            inward_transport_cost: Decimal::ZERO,
            outward_transport_cost: Decimal::ZERO,
            material_cost_per_box: Decimal::ZERO,
            labor_cost_per_box: Decimal::ZERO,
            inward_transport_per_box: Decimal::ZERO,
            outward_transport_per_box: Decimal::ZERO,
            total_cost: Decimal::ZERO,
            final_cost_per_box: Decimal::ZERO,
            box_count: 0,
            calculated_at: None,
        }
    }
}

impl From<batch_cost::Model> for BatchCostView {
    fn from(model: batch_cost::Model) -> Self {
        Self {
            batch_id: model.batch_id,
            material_cost_total: model.material_cost_total,
            labor_cost_total: model.labor_cost_total,
            inward_transport_cost: model.inward_transport_cost,
            outward_transport_cost: model.outward_transport_cost,
            material_cost_per_box: model.material_cost_per_box,
            labor_cost_per_box: model.labor_cost_per_box,
            inward_transport_per_box: model.inward_transport_per_box,
            outward_transport_per_box: model.outward_transport_per_box,
            total_cost: model.total_cost,
            final_cost_per_box: model.final_cost_per_box,
            box_count: model.box_count,
            calculated_at: Some(model.calculated_at),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct AddTransportCost {
    pub cost_type: TransportType,
    #[validate(custom = "validate_money")]
    pub total_cost: Decimal,
    #[validate(length(max = 255))]
    pub vendor_name: Option<String>,
    #[validate(length(max = 50))]
    pub vehicle_number: Option<String>,
    #[validate(length(max = 255))]
    pub driver_name: Option<String>,
    #[validate(custom = "validate_money")]
    pub distance_km: Option<Decimal>,
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct TransportCostView {
    pub id: Uuid,
    pub batch_id: Uuid,
    pub cost_type: TransportType,
    pub total_cost: Decimal,
    pub cost_per_box: Decimal,
    pub vendor_name: Option<String>,
    pub vehicle_number: Option<String>,
    pub driver_name: Option<String>,
    pub distance_km: Option<Decimal>,
    pub notes: Option<String>,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
}

impl From<transport_cost::Model> for TransportCostView {
    fn from(model: transport_cost::Model) -> Self {
        Self {
            id: model.id,
            batch_id: model.batch_id,
            cost_type: model.cost_type,
            total_cost: model.total_cost,
            cost_per_box: model.cost_per_box,
            vendor_name: model.vendor_name,
            vehicle_number: model.vehicle_number,
            driver_name: model.driver_name,
            distance_km: model.distance_km,
            notes: model.notes,
            created_by: model.created_by,
            created_at: model.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TransportCostOutcome {
    pub transport_cost: TransportCostView,
    pub costs: BatchCostView,
}

pub(crate) fn recalculated_event(snapshot: &batch_cost::Model) -> Event {
    Event::CostsRecalculated {
        batch_id: snapshot.batch_id,
        total_cost: snapshot.total_cost,
        final_cost_per_box: snapshot.final_cost_per_box,
        calculated_at: snapshot.calculated_at,
    }
}

/// Reads every cost fact recorded against the batch.
pub async fn gather_inputs<C: ConnectionTrait>(
    conn: &C,
    batch_id: Uuid,
) -> Result<CostInputs, ServiceError> {
    let allocations = inventory_allocation::Entity::find()
        .filter(inventory_allocation::Column::BatchId.eq(batch_id))
        .find_also_related(inventory_item::Entity)
        .all(conn)
        .await
        .map_err(ServiceError::db_error)?;

    let mut inputs = CostInputs::default();
    for (allocation, item) in allocations {
        match item {
            Some(item) => {
                inputs.material_total += Decimal::from(allocation.quantity) * item.unit_cost
            }
            None => warn!(
                allocation_id = %allocation.id,
                item_id = %allocation.item_id,
                "Allocation references a missing item; excluded from material cost"
            ),
        }
    }

    let transport = transport_cost::Entity::find()
        .filter(transport_cost::Column::BatchId.eq(batch_id))
        .all(conn)
        .await
        .map_err(ServiceError::db_error)?;
    for cost in transport {
        match cost.cost_type {
            TransportType::Inward => inputs.inward_transport += cost.total_cost,
            TransportType::Outward => inputs.outward_transport += cost.total_cost,
        }
    }

    inputs.labor_total = labor_cost::Entity::find()
        .filter(labor_cost::Column::BatchId.eq(batch_id))
        .all(conn)
        .await
        .map_err(ServiceError::db_error)?
        .into_iter()
        .map(|l| l.total_amount)
        .sum();

    Ok(inputs)
}

/// Rebuilds and stores the batch's cost snapshot on `conn`. Call it inside
/// the transaction that changed the facts so both commit together.
pub async fn recalculate_in<C: ConnectionTrait>(
    conn: &C,
    ledger: &BoxLedger,
    now: DateTime<Utc>,
) -> Result<batch_cost::Model, ServiceError> {
    let inputs = gather_inputs(conn, ledger.batch_id).await?;
    let breakdown = CostBreakdown::compute(&inputs, ledger.box_count());

    let existing = batch_cost::Entity::find()
        .filter(batch_cost::Column::BatchId.eq(ledger.batch_id))
        .one(conn)
        .await
        .map_err(ServiceError::db_error)?;

    let snapshot = match existing {
        Some(row) => {
            let mut active = row.into_active_model();
            breakdown.apply_to(&mut active, now);
            active.update(conn).await.map_err(ServiceError::db_error)?
        }
        None => {
            let mut active = batch_cost::ActiveModel {
                id: Set(Uuid::new_v4()),
                batch_id: Set(ledger.batch_id),
                ..Default::default()
            };
            breakdown.apply_to(&mut active, now);
            active.insert(conn).await.map_err(ServiceError::db_error)?
        }
    };

    metrics::counter!("harvest_api.costs.recalculated", 1);
    Ok(snapshot)
}

#[derive(Clone)]
pub struct CostService {
    db_pool: Arc<DatabaseConnection>,
    event_sender: EventSender,
    max_retries: u32,
}

impl CostService {
    pub fn new(db_pool: Arc<DatabaseConnection>, event_sender: EventSender, max_retries: u32) -> Self {
        Self {
            db_pool,
            event_sender,
            max_retries,
        }
    }

    /// Recomputes the batch's cost snapshot from its current facts. Admins
    /// and managers only.
    #[instrument(skip(self))]
    pub async fn recalculate_costs(
        &self,
        batch_id: Uuid,
        caller_id: Uuid,
    ) -> Result<BatchCostView, ServiceError> {
        let snapshot = retry_on_conflict("recalculate_costs", self.max_retries, move || {
            self.try_recalculate(batch_id, caller_id)
        })
        .await?;

        info!(
            batch_id = %batch_id,
            total_cost = %snapshot.total_cost,
            final_cost_per_box = %snapshot.final_cost_per_box,
            "Batch costs recalculated"
        );
        self.event_sender.notify(recalculated_event(&snapshot));
        Ok(snapshot.into())
    }

    async fn try_recalculate(
        &self,
        batch_id: Uuid,
        caller_id: Uuid,
    ) -> Result<batch_cost::Model, ServiceError> {
        let txn = self.db_pool.begin().await.map_err(ServiceError::db_error)?;
        authorize(&txn, caller_id, UserRole::is_elevated, "recalculate batch costs").await?;
        let (_, ledger) = BatchRepository::load_ledger(&txn, batch_id).await?;
        let snapshot = recalculate_in(&txn, &ledger, Utc::now()).await?;
        txn.commit().await.map_err(ServiceError::db_error)?;
        Ok(snapshot)
    }

    /// Records an inward or outward transport cost and rolls the batch's
    /// costs up in the same transaction. Admins and managers only.
    #[instrument(skip(self, request), fields(cost_type = %request.cost_type))]
    pub async fn add_transport_cost(
        &self,
        batch_id: Uuid,
        request: AddTransportCost,
        caller_id: Uuid,
    ) -> Result<TransportCostOutcome, ServiceError> {
        request.validate()?;

        let req = &request;
        let (outcome, snapshot) = retry_on_conflict("add_transport_cost", self.max_retries, move || {
            self.try_add_transport(batch_id, req, caller_id)
        })
        .await?;

        info!(
            transport_cost_id = %outcome.transport_cost.id,
            cost_per_box = %outcome.transport_cost.cost_per_box,
            "Transport cost recorded"
        );
        self.event_sender.notify(recalculated_event(&snapshot));
        Ok(outcome)
    }

    async fn try_add_transport(
        &self,
        batch_id: Uuid,
        request: &AddTransportCost,
        caller_id: Uuid,
    ) -> Result<(TransportCostOutcome, batch_cost::Model), ServiceError> {
        let txn = self.db_pool.begin().await.map_err(ServiceError::db_error)?;

        let caller = authorize(&txn, caller_id, UserRole::is_elevated, "record transport costs").await?;
        let (_, ledger) = BatchRepository::load_ledger(&txn, batch_id).await?;

        let now = Utc::now();
        let total = round_money(request.total_cost);
        let cost = transport_cost::ActiveModel {
            id: Set(Uuid::new_v4()),
            batch_id: Set(batch_id),
            cost_type: Set(request.cost_type),
            total_cost: Set(total),
            cost_per_box: Set(per_box(total, ledger.box_count())),
            vendor_name: Set(request.vendor_name.clone()),
            vehicle_number: Set(request.vehicle_number.clone()),
            driver_name: Set(request.driver_name.clone()),
            distance_km: Set(request.distance_km),
            notes: Set(request.notes.clone()),
            created_by: Set(caller.id),
            created_at: Set(now),
        }
        .insert(&txn)
        .await
        .map_err(ServiceError::db_error)?;

        let snapshot = recalculate_in(&txn, &ledger, now).await?;
        txn.commit().await.map_err(ServiceError::db_error)?;

        let outcome = TransportCostOutcome {
            transport_cost: cost.into(),
            costs: snapshot.clone().into(),
        };
        Ok((outcome, snapshot))
    }

    #[instrument(skip(self))]
    pub async fn list_transport_costs(&self, batch_id: Uuid) -> Result<Vec<TransportCostView>, ServiceError> {
        let db = &*self.db_pool;
        BatchRepository::find(db, batch_id).await?;
        let rows = transport_cost::Entity::find()
            .filter(transport_cost::Column::BatchId.eq(batch_id))
            .order_by_asc(transport_cost::Column::CreatedAt)
            .all(db)
            .await
            .map_err(ServiceError::db_error)?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Stored snapshot, or an all-zero one if costs were never rolled up.
    #[instrument(skip(self))]
    pub async fn get_batch_cost(&self, batch_id: Uuid) -> Result<BatchCostView, ServiceError> {
        let db = &*self.db_pool;
        BatchRepository::find(db, batch_id).await?;
        self.snapshot_for(batch_id).await
    }

    #[instrument(skip(self))]
    pub async fn get_batch_cost_by_code(&self, batch_code: &str) -> Result<BatchCostView, ServiceError> {
        let batch = BatchRepository::find_by_code(&*self.db_pool, batch_code).await?;
        self.snapshot_for(batch.id).await
    }

    async fn snapshot_for(&self, batch_id: Uuid) -> Result<BatchCostView, ServiceError> {
        let stored = batch_cost::Entity::find()
            .filter(batch_cost::Column::BatchId.eq(batch_id))
            .one(&*self.db_pool)
            .await
            .map_err(ServiceError::db_error)?;
        Ok(stored
            .map(BatchCostView::from)
            .unwrap_or_else(|| BatchCostView::empty(batch_id)))
    }
}
