use chrono::{DateTime, Utc};
use sea_orm::{
    sea_query::Expr, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QuerySelect,
};
use tracing::debug;
use uuid::Uuid;

use crate::entities::batch::{self, Column, Entity as Batch, Model as BatchModel};
use crate::entities::daily_harvest_report;
use crate::errors::ServiceError;
use crate::services::box_ledger::BoxLedger;

/// Batch reads and version-checked writes.
///
/// Every function takes the connection explicitly so the same call works on
/// the pool or on an open transaction.
#[derive(Debug, Clone, Copy, Default)]
pub struct BatchRepository;

impl BatchRepository {
    pub async fn find<C: ConnectionTrait>(conn: &C, id: Uuid) -> Result<BatchModel, ServiceError> {
        Batch::find_by_id(id)
            .one(conn)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| ServiceError::not_found("Batch", "id", id))
    }

    pub async fn find_by_code<C: ConnectionTrait>(
        conn: &C,
        batch_code: &str,
    ) -> Result<BatchModel, ServiceError> {
        Batch::find()
            .filter(Column::BatchCode.eq(batch_code))
            .one(conn)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| ServiceError::not_found("Batch", "code", batch_code))
    }

    /// Loads a batch together with its normalized ledger.
    pub async fn load_ledger<C: ConnectionTrait>(
        conn: &C,
        id: Uuid,
    ) -> Result<(BatchModel, BoxLedger), ServiceError> {
        let model = Self::find(conn, id).await?;
        let ledger = BoxLedger::from_model(&model);
        Ok((model, ledger))
    }

    /// Writes the ledger back if the stored version still matches the one it
    /// was loaded at. A stale ledger yields `ConcurrentModification`.
    pub async fn save_ledger<C: ConnectionTrait>(
        conn: &C,
        ledger: &BoxLedger,
        now: DateTime<Utc>,
    ) -> Result<(), ServiceError> {
        ledger.check_invariants()?;

        let mut changes = batch::ActiveModel::default();
        ledger.apply_to(&mut changes, now);

        let result = Batch::update_many()
            .set(changes)
            .filter(Column::Id.eq(ledger.batch_id))
            .filter(Column::Version.eq(ledger.version))
            .exec(conn)
            .await
            .map_err(ServiceError::db_error)?;

        if result.rows_affected == 0 {
            debug!(batch_id = %ledger.batch_id, version = ledger.version, "Stale batch version");
            return Err(ServiceError::ConcurrentModification(ledger.batch_id));
        }
        Ok(())
    }

    /// Sum of boxes packed across every daily report of the batch.
    pub async fn sum_boxes_packed<C: ConnectionTrait>(
        conn: &C,
        batch_id: Uuid,
    ) -> Result<i32, ServiceError> {
        let total: Option<Option<i64>> = daily_harvest_report::Entity::find()
            .select_only()
            .column_as(
                Expr::col(daily_harvest_report::Column::BoxesPacked).sum(),
                "total",
            )
            .filter(daily_harvest_report::Column::BatchId.eq(batch_id))
            .into_tuple::<Option<i64>>()
            .one(conn)
            .await
            .map_err(ServiceError::db_error)?;

        let total = total.flatten().unwrap_or(0);
        i32::try_from(total).map_err(|_| {
            ServiceError::InternalError(format!(
                "Packed box total {} for batch {} does not fit a box counter",
                total, batch_id
            ))
        })
    }
}
