use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "gate_passes")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
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
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
}

impl Model {
    pub fn is_received(&self) -> bool {
        self.received_at.is_some()
    }

    /// Boxes lost between dispatch and receipt. Negative on surplus,
    /// `None` until the gate pass is received.
    pub fn shortage(&self) -> Option<i32> {
        self.received_boxes.map(|received| self.total_boxes - received)
    }
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
