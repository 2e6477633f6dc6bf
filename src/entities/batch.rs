use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Lifecycle status of a batch.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
    ToSchema,
    strum::Display,
    strum::EnumString,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum BatchStatus {
    #[sea_orm(string_value = "CREATED")]
    Created,
    #[sea_orm(string_value = "IN_PROGRESS")]
    InProgress,
    #[sea_orm(string_value = "HARVEST_IN_PROGRESS")]
    HarvestInProgress,
    #[sea_orm(string_value = "HARVEST_COMPLETED")]
    HarvestCompleted,
    #[sea_orm(string_value = "DISPATCH_IN_PROGRESS")]
    DispatchInProgress,
    #[sea_orm(string_value = "DISPATCH_COMPLETED")]
    DispatchCompleted,
    #[sea_orm(string_value = "IN_TRANSIT")]
    InTransit,
    #[sea_orm(string_value = "DELIVERED")]
    Delivered,
    #[sea_orm(string_value = "COMPLETED")]
    Completed,
    #[sea_orm(string_value = "CANCELLED")]
    Cancelled,
}

/// Batch row. Counter columns are nullable because rows written before the
/// dispatch counters existed carry NULLs; they are normalized on load by
/// [`crate::services::box_ledger::BoxLedger::from_model`].
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "batches")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub batch_code: String,
    pub inspection_id: Option<Uuid>,
    pub farm_id: Uuid,
    pub vendor_id: Uuid,
    pub created_by: Uuid,
    pub status: BatchStatus,
    pub estimated_boxes: i32,
    pub allocated_boxes: Option<i32>,
    pub harvested_boxes: Option<i32>,
    pub remaining_boxes: Option<i32>,
    pub actual_boxes: Option<i32>,
    pub dispatched_boxes: Option<i32>,
    pub gate_pass_remaining: Option<i32>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub notes: Option<String>,
    pub version: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::daily_harvest_report::Entity")]
    DailyHarvestReports,
    #[sea_orm(has_many = "super::gate_pass::Entity")]
    GatePasses,
    #[sea_orm(has_one = "super::batch_cost::Entity")]
    BatchCost,
}

impl Related<super::daily_harvest_report::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::DailyHarvestReports.def()
    }
}

impl Related<super::gate_pass::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::GatePasses.def()
    }
}

impl Related<super::batch_cost::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::BatchCost.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn status_text_matches_stored_value() {
        assert_eq!(BatchStatus::HarvestInProgress.to_string(), "HARVEST_IN_PROGRESS");
        assert_eq!(
            BatchStatus::from_str("DISPATCH_COMPLETED").unwrap(),
            BatchStatus::DispatchCompleted
        );
        assert_eq!(
            serde_json::to_string(&BatchStatus::InTransit).unwrap(),
            "\"IN_TRANSIT\""
        );
    }
}
