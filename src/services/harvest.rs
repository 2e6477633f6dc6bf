use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::db::retry_on_conflict;
use crate::entities::{daily_harvest_report, labor_cost, PaymentStatus};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::repositories::BatchRepository;
use crate::services::batches::BatchView;
use crate::services::costing::{self, per_box, round_money, BatchCostView};
use crate::services::{resolve_caller, validate_money};

/// A day's harvest for one batch.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct SubmitDailyReport {
    pub report_date: NaiveDate,
    #[validate(range(min = 0))]
    pub boxes_packed: i32,
    #[validate(range(min = 0))]
    #[serde(default)]
    pub boxes_wasted: i32,
    #[validate(range(min = 0))]
    #[serde(default)]
    pub labor_count: i32,
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
    /// Total labor cost for the day, spread over the boxes packed.
    #[validate(custom = "validate_money")]
    pub labor_cost: Option<Decimal>,
}

impl SubmitDailyReport {
    fn has_labor_cost(&self) -> bool {
        self.labor_cost.map_or(false, |c| c > Decimal::ZERO)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct DailyReportView {
    pub id: Uuid,
    pub batch_id: Uuid,
    pub report_date: NaiveDate,
    pub boxes_packed: i32,
    pub boxes_wasted: i32,
    pub labor_count: i32,
    pub notes: Option<String>,
    pub labor_cost: Option<Decimal>,
    pub labor_cost_per_box: Option<Decimal>,
    pub payment_status: Option<PaymentStatus>,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
}

impl DailyReportView {
    fn new(report: daily_harvest_report::Model, labor: Option<labor_cost::Model>) -> Self {
        Self {
            id: report.id,
            batch_id: report.batch_id,
            report_date: report.report_date,
            boxes_packed: report.boxes_packed,
            boxes_wasted: report.boxes_wasted,
            labor_count: report.labor_count,
            notes: report.notes,
            labor_cost: labor.as_ref().map(|l| l.total_amount),
            labor_cost_per_box: labor.as_ref().map(|l| l.cost_per_box),
            payment_status: labor.map(|l| l.payment_status),
            created_by: report.created_by,
            created_at: report.created_at,
        }
    }
}

/// Everything a harvest submission changed.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct HarvestOutcome {
    pub report: DailyReportView,
    pub batch: BatchView,
    pub costs: BatchCostView,
}

#[derive(Clone)]
pub struct HarvestService {
    db_pool: Arc<DatabaseConnection>,
    event_sender: EventSender,
    max_retries: u32,
}

impl HarvestService {
    pub fn new(db_pool: Arc<DatabaseConnection>, event_sender: EventSender, max_retries: u32) -> Self {
        Self {
            db_pool,
            event_sender,
            max_retries,
        }
    }

    /// Records a daily harvest report against a batch.
    ///
    /// The report, the optional labor cost, the batch counters and the cost
    /// snapshot are written in one transaction; a capacity failure leaves
    /// all of them untouched.
    #[instrument(skip(self, request), fields(boxes_packed = request.boxes_packed))]
    pub async fn submit_daily_report(
        &self,
        batch_id: Uuid,
        request: SubmitDailyReport,
        caller_id: Uuid,
    ) -> Result<HarvestOutcome, ServiceError> {
        request.validate()?;
        if request.has_labor_cost() && request.boxes_packed == 0 {
            return Err(ServiceError::ValidationError(
                "labor_cost requires at least one packed box".to_string(),
            ));
        }

        let req = &request;
        let (outcome, events) = retry_on_conflict("submit_daily_report", self.max_retries, move || {
            self.try_submit(batch_id, req, caller_id)
        })
        .await?;

        metrics::counter!("harvest_api.harvest.reports", 1);
        metrics::counter!("harvest_api.harvest.boxes_packed", request.boxes_packed as u64);
        info!(
            batch_id = %batch_id,
            report_id = %outcome.report.id,
            harvested = outcome.batch.harvested_boxes,
            remaining = outcome.batch.remaining_boxes,
            status = %outcome.batch.status,
            "Daily harvest report recorded"
        );
        for event in events {
            self.event_sender.notify(event);
        }
        Ok(outcome)
    }

    async fn try_submit(
        &self,
        batch_id: Uuid,
        request: &SubmitDailyReport,
        caller_id: Uuid,
    ) -> Result<(HarvestOutcome, Vec<Event>), ServiceError> {
        let txn = self.db_pool.begin().await.map_err(ServiceError::db_error)?;

        let caller = resolve_caller(&txn, caller_id).await?;
        let (_, mut ledger) = BatchRepository::load_ledger(&txn, batch_id).await?;
        let status_before = ledger.status;

        let now = Utc::now();
        ledger.record_harvest(request.boxes_packed, now.date_naive())?;

        let report = daily_harvest_report::ActiveModel {
            id: Set(Uuid::new_v4()),
            batch_id: Set(batch_id),
            report_date: Set(request.report_date),
            boxes_packed: Set(request.boxes_packed),
            boxes_wasted: Set(request.boxes_wasted),
            labor_count: Set(request.labor_count),
            notes: Set(request.notes.clone()),
            created_by: Set(caller.id),
            created_at: Set(now),
        }
        .insert(&txn)
        .await
        .map_err(ServiceError::db_error)?;

        let labor = match request.labor_cost.map(round_money) {
            // per-box value is derived from the stored total so the two agree
            Some(total) if total > Decimal::ZERO => Some(
                labor_cost::ActiveModel {
                    id: Set(Uuid::new_v4()),
                    batch_id: Set(batch_id),
                    report_id: Set(Some(report.id)),
                    total_amount: Set(total),
                    cost_per_box: Set(per_box(total, request.boxes_packed)),
                    payment_status: Set(PaymentStatus::Pending),
                    created_by: Set(caller.id),
                    created_at: Set(now),
                }
                .insert(&txn)
                .await
                .map_err(ServiceError::db_error)?,
            ),
            _ => None,
        };

        // reports are the source of truth for harvested boxes
        let packed_total = BatchRepository::sum_boxes_packed(&txn, batch_id).await?;
        ledger.reconcile_harvested(packed_total)?;
        BatchRepository::save_ledger(&txn, &ledger, now).await?;

        let snapshot = costing::recalculate_in(&txn, &ledger, now).await?;
        let batch = BatchView::load(&txn, batch_id).await?;

        txn.commit().await.map_err(ServiceError::db_error)?;

        let mut events = vec![Event::HarvestReported {
            batch_id,
            report_id: report.id,
            boxes_packed: report.boxes_packed,
            harvested_boxes: ledger.harvested,
            remaining_boxes: ledger.remaining(),
        }];
        if status_before != ledger.status {
            events.push(Event::BatchStatusChanged {
                batch_id,
                from: status_before,
                to: ledger.status,
            });
        }
        events.push(costing::recalculated_event(&snapshot));

        let outcome = HarvestOutcome {
            report: DailyReportView::new(report, labor),
            batch,
            costs: snapshot.into(),
        };
        Ok((outcome, events))
    }

    /// Reports for a batch in report-date order, with their labor costs.
    #[instrument(skip(self))]
    pub async fn list_batch_reports(&self, batch_id: Uuid) -> Result<Vec<DailyReportView>, ServiceError> {
        let db = &*self.db_pool;
        BatchRepository::find(db, batch_id).await?;

        let rows = daily_harvest_report::Entity::find()
            .filter(daily_harvest_report::Column::BatchId.eq(batch_id))
            .order_by_asc(daily_harvest_report::Column::ReportDate)
            .order_by_asc(daily_harvest_report::Column::CreatedAt)
            .find_also_related(labor_cost::Entity)
            .all(db)
            .await
            .map_err(ServiceError::db_error)?;

        Ok(rows
            .into_iter()
            .map(|(report, labor)| DailyReportView::new(report, labor))
            .collect())
    }

    /// Every report filed for `date`, across batches.
    #[instrument(skip(self))]
    pub async fn reports_on(&self, date: NaiveDate) -> Result<Vec<DailyReportView>, ServiceError> {
        let rows = daily_harvest_report::Entity::find()
            .filter(daily_harvest_report::Column::ReportDate.eq(date))
            .order_by_asc(daily_harvest_report::Column::CreatedAt)
            .find_also_related(labor_cost::Entity)
            .all(&*self.db_pool)
            .await
            .map_err(ServiceError::db_error)?;

        Ok(rows
            .into_iter()
            .map(|(report, labor)| DailyReportView::new(report, labor))
            .collect())
    }
}
