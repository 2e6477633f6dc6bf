use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection,
    EntityTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::db::retry_on_conflict;
use crate::entities::{inventory_allocation, inventory_item, inventory_stock, ItemCategory, UserRole};
use crate::errors::ServiceError;
use crate::events::EventSender;
use crate::repositories::BatchRepository;
use crate::services::costing::{self, BatchCostView};
use crate::services::{authorize, validate_money};

pub const DUPLICATE_ITEM_CODE: &str = "DUPLICATE_ITEM_CODE";

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateItem {
    #[validate(length(min = 1, max = 50))]
    pub item_code: String,
    #[validate(length(min = 1, max = 255))]
    pub item_name: String,
    pub category: ItemCategory,
    #[validate(length(min = 1, max = 20))]
    pub unit_of_measure: String,
    #[validate(custom = "validate_money")]
    pub unit_cost: Decimal,
    #[validate(range(min = 0))]
    pub initial_quantity: Option<i32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct AddStock {
    #[validate(range(min = 1))]
    pub quantity: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct AllocateMaterial {
    pub item_id: Uuid,
    #[validate(range(min = 1))]
    pub quantity: i32,
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ItemView {
    pub id: Uuid,
    pub item_code: String,
    pub item_name: String,
    pub category: ItemCategory,
    pub unit_of_measure: String,
    pub unit_cost: Decimal,
    pub total_quantity: i32,
    pub available_quantity: i32,
    pub reserved_quantity: i32,
    pub created_at: DateTime<Utc>,
}

impl ItemView {
    fn new(item: inventory_item::Model, stock: &inventory_stock::Model) -> Self {
        Self {
            id: item.id,
            item_code: item.item_code,
            item_name: item.item_name,
            category: item.category,
            unit_of_measure: item.unit_of_measure,
            unit_cost: item.unit_cost,
            total_quantity: stock.total_quantity,
            available_quantity: stock.available_quantity,
            reserved_quantity: stock.reserved_quantity,
            created_at: item.created_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct AllocationView {
    pub id: Uuid,
    pub batch_id: Uuid,
    pub item_id: Uuid,
    pub quantity: i32,
    pub notes: Option<String>,
    pub allocated_by: Uuid,
    pub allocated_at: DateTime<Utc>,
}

impl From<inventory_allocation::Model> for AllocationView {
    fn from(model: inventory_allocation::Model) -> Self {
        Self {
            id: model.id,
            batch_id: model.batch_id,
            item_id: model.item_id,
            quantity: model.quantity,
            notes: model.notes,
            allocated_by: model.allocated_by,
            allocated_at: model.allocated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AllocationOutcome {
    pub allocation: AllocationView,
    pub item: ItemView,
    pub costs: BatchCostView,
}

#[derive(Clone)]
pub struct InventoryService {
    db_pool: Arc<DatabaseConnection>,
    event_sender: EventSender,
    max_retries: u32,
}

impl InventoryService {
    pub fn new(db_pool: Arc<DatabaseConnection>, event_sender: EventSender, max_retries: u32) -> Self {
        Self {
            db_pool,
            event_sender,
            max_retries,
        }
    }

    /// Adds an item to the catalogue. Admins and managers only.
    #[instrument(skip(self, request), fields(item_code = %request.item_code))]
    pub async fn create_item(&self, request: CreateItem, caller_id: Uuid) -> Result<ItemView, ServiceError> {
        request.validate()?;

        let req = &request;
        let item = retry_on_conflict("create_item", self.max_retries, move || {
            self.try_create_item(req, caller_id)
        })
        .await?;
        info!(item_id = %item.id, "Inventory item created");
        Ok(item)
    }

    async fn try_create_item(&self, request: &CreateItem, caller_id: Uuid) -> Result<ItemView, ServiceError> {
        let txn = self.db_pool.begin().await.map_err(ServiceError::db_error)?;
        authorize(&txn, caller_id, UserRole::is_elevated, "create inventory items").await?;
        let code = request.item_code.trim().to_string();

        let existing = inventory_item::Entity::find()
            .filter(inventory_item::Column::ItemCode.eq(code.as_str()))
            .one(&txn)
            .await
            .map_err(ServiceError::db_error)?;
        if existing.is_some() {
            return Err(ServiceError::business(DUPLICATE_ITEM_CODE, "Item code already exists"));
        }

        let now = Utc::now();
        let item = inventory_item::ActiveModel {
            id: Set(Uuid::new_v4()),
            item_code: Set(code),
            item_name: Set(request.item_name.clone()),
            category: Set(request.category),
            unit_of_measure: Set(request.unit_of_measure.clone()),
            unit_cost: Set(request.unit_cost),
            created_at: Set(now),
        }
        .insert(&txn)
        .await
        .map_err(ServiceError::db_error)?;

        let quantity = request.initial_quantity.unwrap_or(0);
        let stock = inventory_stock::ActiveModel {
            id: Set(Uuid::new_v4()),
            item_id: Set(item.id),
            total_quantity: Set(quantity),
            available_quantity: Set(quantity),
            reserved_quantity: Set(0),
            updated_at: Set(now),
        }
        .insert(&txn)
        .await
        .map_err(ServiceError::db_error)?;

        txn.commit().await.map_err(ServiceError::db_error)?;
        Ok(ItemView::new(item, &stock))
    }

    #[instrument(skip(self))]
    pub async fn get_item(&self, item_id: Uuid) -> Result<ItemView, ServiceError> {
        let db = &*self.db_pool;
        let item = find_item(db, item_id).await?;
        let stock = find_stock(db, item_id).await?;
        Ok(ItemView::new(item, &stock))
    }

    #[instrument(skip(self))]
    pub async fn list_items(&self) -> Result<Vec<ItemView>, ServiceError> {
        let rows = inventory_item::Entity::find()
            .order_by_asc(inventory_item::Column::ItemCode)
            .find_also_related(inventory_stock::Entity)
            .all(&*self.db_pool)
            .await
            .map_err(ServiceError::db_error)?;

        Ok(rows
            .into_iter()
            .filter_map(|(item, stock)| stock.map(|s| ItemView::new(item, &s)))
            .collect())
    }

    /// Receives `quantity` more units into stock. Store keepers may do this
    /// as well as admins and managers.
    #[instrument(skip(self, request), fields(quantity = request.quantity))]
    pub async fn add_stock(
        &self,
        item_id: Uuid,
        request: AddStock,
        caller_id: Uuid,
    ) -> Result<ItemView, ServiceError> {
        request.validate()?;

        let txn = self.db_pool.begin().await.map_err(ServiceError::db_error)?;
        authorize(&txn, caller_id, UserRole::handles_stock, "receive stock").await?;
        let item = find_item(&txn, item_id).await?;

        let result = inventory_stock::Entity::update_many()
            .col_expr(
                inventory_stock::Column::TotalQuantity,
                Expr::col(inventory_stock::Column::TotalQuantity).add(request.quantity),
            )
            .col_expr(
                inventory_stock::Column::AvailableQuantity,
                Expr::col(inventory_stock::Column::AvailableQuantity).add(request.quantity),
            )
            .col_expr(inventory_stock::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(inventory_stock::Column::ItemId.eq(item_id))
            .exec(&txn)
            .await
            .map_err(ServiceError::db_error)?;
        if result.rows_affected == 0 {
            return Err(ServiceError::not_found("Inventory stock", "item_id", item_id));
        }

        let stock = find_stock(&txn, item_id).await?;
        txn.commit().await.map_err(ServiceError::db_error)?;

        info!(available = stock.available_quantity, "Stock received");
        Ok(ItemView::new(item, &stock))
    }

    /// Reserves material for a batch and rolls its costs up. Admins and
    /// managers only.
    #[instrument(skip(self, request), fields(item_id = %request.item_id, quantity = request.quantity))]
    pub async fn allocate_to_batch(
        &self,
        batch_id: Uuid,
        request: AllocateMaterial,
        caller_id: Uuid,
    ) -> Result<AllocationOutcome, ServiceError> {
        request.validate()?;

        let req = &request;
        let (outcome, snapshot) = retry_on_conflict("allocate_to_batch", self.max_retries, move || {
            self.try_allocate(batch_id, req, caller_id)
        })
        .await?;

        metrics::counter!("harvest_api.inventory.allocations", 1);
        info!(
            allocation_id = %outcome.allocation.id,
            available = outcome.item.available_quantity,
            "Material allocated to batch"
        );
        self.event_sender.notify(costing::recalculated_event(&snapshot));
        Ok(outcome)
    }

    async fn try_allocate(
        &self,
        batch_id: Uuid,
        request: &AllocateMaterial,
        caller_id: Uuid,
    ) -> Result<(AllocationOutcome, crate::entities::batch_cost::Model), ServiceError> {
        let txn = self.db_pool.begin().await.map_err(ServiceError::db_error)?;

        let caller = authorize(&txn, caller_id, UserRole::is_elevated, "allocate material").await?;
        let (_, ledger) = BatchRepository::load_ledger(&txn, batch_id).await?;
        let item = find_item(&txn, request.item_id).await?;
        let stock = find_stock(&txn, request.item_id).await?;

        if stock.available_quantity < request.quantity {
            return Err(ServiceError::InsufficientStock(format!(
                "Insufficient stock available. Available: {}, Requested: {}",
                stock.available_quantity, request.quantity
            )));
        }

        let now = Utc::now();
        let result = inventory_stock::Entity::update_many()
            .col_expr(
                inventory_stock::Column::AvailableQuantity,
                Expr::col(inventory_stock::Column::AvailableQuantity).sub(request.quantity),
            )
            .col_expr(
                inventory_stock::Column::ReservedQuantity,
                Expr::col(inventory_stock::Column::ReservedQuantity).add(request.quantity),
            )
            .col_expr(inventory_stock::Column::UpdatedAt, Expr::value(now))
            .filter(inventory_stock::Column::ItemId.eq(request.item_id))
            .filter(inventory_stock::Column::AvailableQuantity.gte(request.quantity))
            .exec(&txn)
            .await
            .map_err(ServiceError::db_error)?;
        if result.rows_affected == 0 {
            // stock moved since it was read
            return Err(ServiceError::ConcurrentModification(stock.id));
        }

        let allocation = inventory_allocation::ActiveModel {
            id: Set(Uuid::new_v4()),
            batch_id: Set(batch_id),
            item_id: Set(item.id),
            quantity: Set(request.quantity),
            notes: Set(request.notes.clone()),
            allocated_by: Set(caller.id),
            allocated_at: Set(now),
        }
        .insert(&txn)
        .await
        .map_err(ServiceError::db_error)?;

        let snapshot = costing::recalculate_in(&txn, &ledger, now).await?;
        let stock = find_stock(&txn, request.item_id).await?;
        txn.commit().await.map_err(ServiceError::db_error)?;

        let outcome = AllocationOutcome {
            allocation: allocation.into(),
            item: ItemView::new(item, &stock),
            costs: snapshot.clone().into(),
        };
        Ok((outcome, snapshot))
    }

    #[instrument(skip(self))]
    pub async fn list_batch_allocations(&self, batch_id: Uuid) -> Result<Vec<AllocationView>, ServiceError> {
        let db = &*self.db_pool;
        BatchRepository::find(db, batch_id).await?;
        let rows = inventory_allocation::Entity::find()
            .filter(inventory_allocation::Column::BatchId.eq(batch_id))
            .order_by_asc(inventory_allocation::Column::AllocatedAt)
            .all(db)
            .await
            .map_err(ServiceError::db_error)?;
        Ok(rows.into_iter().map(Into::into).collect())
    }
}

async fn find_item<C: ConnectionTrait>(conn: &C, item_id: Uuid) -> Result<inventory_item::Model, ServiceError> {
    inventory_item::Entity::find_by_id(item_id)
        .one(conn)
        .await
        .map_err(ServiceError::db_error)?
        .ok_or_else(|| ServiceError::not_found("Inventory item", "id", item_id))
}

async fn find_stock<C: ConnectionTrait>(conn: &C, item_id: Uuid) -> Result<inventory_stock::Model, ServiceError> {
    inventory_stock::Entity::find()
        .filter(inventory_stock::Column::ItemId.eq(item_id))
        .one(conn)
        .await
        .map_err(ServiceError::db_error)?
        .ok_or_else(|| ServiceError::not_found("Inventory stock", "item_id", item_id))
}
