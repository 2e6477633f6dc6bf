use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Derived per-batch cost snapshot, overwritten on every roll-up.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "batch_costs")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
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
    pub calculated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::batch::Entity",
        from = "Column::BatchId",
        to = "super::batch::Column::Id"
    )]
    Batch,
}

impl Related<super::batch::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Batch.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
