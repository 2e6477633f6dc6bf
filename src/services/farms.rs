use std::sync::Arc;

use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryOrder, Set,
    TransactionTrait,
};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::entities::{farm, FarmStatus, UserRole};
use crate::errors::ServiceError;
use crate::services::authorize;

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct RegisterFarm {
    #[validate(length(min = 1, max = 255))]
    pub farmer_name: String,
    #[validate(length(max = 500))]
    pub location: Option<String>,
    #[validate(length(max = 100))]
    pub produce_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct FarmView {
    pub id: Uuid,
    pub farmer_name: String,
    pub location: Option<String>,
    pub produce_type: Option<String>,
    pub status: FarmStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<farm::Model> for FarmView {
    fn from(model: farm::Model) -> Self {
        Self {
            id: model.id,
            farmer_name: model.farmer_name,
            location: model.location,
            produce_type: model.produce_type,
            status: model.status,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

pub(crate) async fn find_farm<C: ConnectionTrait>(
    conn: &C,
    farm_id: Uuid,
) -> Result<farm::Model, ServiceError> {
    farm::Entity::find_by_id(farm_id)
        .one(conn)
        .await
        .map_err(ServiceError::db_error)?
        .ok_or_else(|| ServiceError::not_found("Farm", "id", farm_id))
}

/// Farm registry. Farms start `ACTIVE` and are moved along by inspections.
#[derive(Clone)]
pub struct FarmService {
    db_pool: Arc<DatabaseConnection>,
}

impl FarmService {
    pub fn new(db_pool: Arc<DatabaseConnection>) -> Self {
        Self { db_pool }
    }

    /// Registers a farm. Admins and managers only.
    #[instrument(skip(self, request), fields(farmer_name = %request.farmer_name))]
    pub async fn create_farm(
        &self,
        request: RegisterFarm,
        caller_id: Uuid,
    ) -> Result<FarmView, ServiceError> {
        request.validate()?;

        let txn = self.db_pool.begin().await.map_err(ServiceError::db_error)?;
        let caller = authorize(&txn, caller_id, UserRole::is_elevated, "register farms").await?;

        let now = Utc::now();
        let farm = farm::ActiveModel {
            id: Set(Uuid::new_v4()),
            farmer_name: Set(request.farmer_name.trim().to_string()),
            location: Set(request.location.clone()),
            produce_type: Set(request.produce_type.clone()),
            status: Set(FarmStatus::Active),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&txn)
        .await
        .map_err(ServiceError::db_error)?;

        txn.commit().await.map_err(ServiceError::db_error)?;

        info!(farm_id = %farm.id, created_by = %caller.id, "Farm registered");
        Ok(farm.into())
    }

    #[instrument(skip(self))]
    pub async fn get_farm(&self, farm_id: Uuid) -> Result<FarmView, ServiceError> {
        Ok(find_farm(&*self.db_pool, farm_id).await?.into())
    }

    #[instrument(skip(self))]
    pub async fn list_farms(&self) -> Result<Vec<FarmView>, ServiceError> {
        let farms = farm::Entity::find()
            .order_by_asc(farm::Column::FarmerName)
            .all(&*self.db_pool)
            .await
            .map_err(ServiceError::db_error)?;
        Ok(farms.into_iter().map(Into::into).collect())
    }
}
