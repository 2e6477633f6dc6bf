use axum::{
    extract::{Path, State},
    response::Response,
    routing::{get, post},
    Json, Router,
};
use uuid::Uuid;

use crate::errors::ServiceError;
use crate::handlers::common::{created_response, success_response, Caller};
use crate::services::inventory::{
    AddStock, AllocateMaterial, AllocationOutcome, AllocationView, CreateItem, ItemView,
};
use crate::{ApiResponse, AppState};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/inventory/items", get(list_items).post(create_item))
        .route("/inventory/items/:id", get(get_item))
        .route("/inventory/items/:id/stock", post(add_stock))
        .route(
            "/batches/:id/allocations",
            get(list_batch_allocations).post(allocate_to_batch),
        )
}

/// Create an inventory item with its stock record
#[utoipa::path(
    post,
    path = "/api/v1/inventory/items",
    params(("X-User-Id" = Uuid, Header, description = "Acting user")),
    request_body = CreateItem,
    responses(
        (status = 201, description = "Item created", body = ApiResponse<ItemView>),
        (status = 400, description = "Invalid request or duplicate item code", body = crate::errors::ErrorResponse),
        (status = 403, description = "Caller may not manage the catalogue", body = crate::errors::ErrorResponse)
    ),
    tag = "inventory"
)]
pub async fn create_item(
    State(state): State<AppState>,
    caller: Caller,
    Json(body): Json<CreateItem>,
) -> Result<Response, ServiceError> {
    let item = state.services.inventory.create_item(body, caller.0).await?;
    Ok(created_response(item))
}

#[utoipa::path(
    get,
    path = "/api/v1/inventory/items",
    responses(
        (status = 200, description = "Items with stock levels", body = ApiResponse<Vec<ItemView>>)
    ),
    tag = "inventory"
)]
pub async fn list_items(State(state): State<AppState>) -> Result<Response, ServiceError> {
    let items = state.services.inventory.list_items().await?;
    Ok(success_response(items))
}

#[utoipa::path(
    get,
    path = "/api/v1/inventory/items/{id}",
    params(("id" = Uuid, Path, description = "Item id")),
    responses(
        (status = 200, description = "Item found", body = ApiResponse<ItemView>),
        (status = 404, description = "Item not found", body = crate::errors::ErrorResponse)
    ),
    tag = "inventory"
)]
pub async fn get_item(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Response, ServiceError> {
    let item = state.services.inventory.get_item(id).await?;
    Ok(success_response(item))
}

/// Receive more units of an item
#[utoipa::path(
    post,
    path = "/api/v1/inventory/items/{id}/stock",
    params(
        ("id" = Uuid, Path, description = "Item id"),
        ("X-User-Id" = Uuid, Header, description = "Acting user")
    ),
    request_body = AddStock,
    responses(
        (status = 200, description = "Stock updated", body = ApiResponse<ItemView>),
        (status = 403, description = "Caller may not receive stock", body = crate::errors::ErrorResponse),
        (status = 404, description = "Item not found", body = crate::errors::ErrorResponse)
    ),
    tag = "inventory"
)]
pub async fn add_stock(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<Uuid>,
    Json(body): Json<AddStock>,
) -> Result<Response, ServiceError> {
    let item = state.services.inventory.add_stock(id, body, caller.0).await?;
    Ok(success_response(item))
}

/// Allocate material to a batch
#[utoipa::path(
    post,
    path = "/api/v1/batches/{id}/allocations",
    params(
        ("id" = Uuid, Path, description = "Batch id"),
        ("X-User-Id" = Uuid, Header, description = "Acting user")
    ),
    request_body = AllocateMaterial,
    responses(
        (status = 201, description = "Material allocated", body = ApiResponse<AllocationOutcome>),
        (status = 403, description = "Caller may not allocate material", body = crate::errors::ErrorResponse),
        (status = 404, description = "Batch, item or user not found", body = crate::errors::ErrorResponse),
        (status = 422, description = "Insufficient stock", body = crate::errors::ErrorResponse)
    ),
    tag = "inventory"
)]
pub async fn allocate_to_batch(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<Uuid>,
    Json(body): Json<AllocateMaterial>,
) -> Result<Response, ServiceError> {
    let outcome = state
        .services
        .inventory
        .allocate_to_batch(id, body, caller.0)
        .await?;
    Ok(created_response(outcome))
}

#[utoipa::path(
    get,
    path = "/api/v1/batches/{id}/allocations",
    params(("id" = Uuid, Path, description = "Batch id")),
    responses(
        (status = 200, description = "Allocations of the batch", body = ApiResponse<Vec<AllocationView>>),
        (status = 404, description = "Batch not found", body = crate::errors::ErrorResponse)
    ),
    tag = "inventory"
)]
pub async fn list_batch_allocations(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Response, ServiceError> {
    let allocations = state.services.inventory.list_batch_allocations(id).await?;
    Ok(success_response(allocations))
}
