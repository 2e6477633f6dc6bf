use axum::{
    extract::{Path, State},
    response::Response,
    routing::{get, put},
    Json, Router,
};
use uuid::Uuid;

use crate::errors::ServiceError;
use crate::handlers::common::{success_response, Caller};
use crate::services::batches::{BatchView, UpdateBatchStatus};
use crate::{ApiResponse, AppState};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/batches/:id", get(get_batch))
        .route("/batches/by-code/:code", get(get_batch_by_code))
        .route("/batches/:id/status", put(update_batch_status))
}

/// Get a batch by id
#[utoipa::path(
    get,
    path = "/api/v1/batches/{id}",
    params(("id" = Uuid, Path, description = "Batch id")),
    responses(
        (status = 200, description = "Batch found", body = ApiResponse<BatchView>),
        (status = 404, description = "Batch not found", body = crate::errors::ErrorResponse)
    ),
    tag = "batches"
)]
pub async fn get_batch(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Response, ServiceError> {
    let batch = state.services.batches.get_batch(id).await?;
    Ok(success_response(batch))
}

/// Get a batch by its `BATCH-YYYYMMDD-NNNN` code
#[utoipa::path(
    get,
    path = "/api/v1/batches/by-code/{code}",
    params(("code" = String, Path, description = "Batch code")),
    responses(
        (status = 200, description = "Batch found", body = ApiResponse<BatchView>),
        (status = 404, description = "Batch not found", body = crate::errors::ErrorResponse)
    ),
    tag = "batches"
)]
pub async fn get_batch_by_code(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> Result<Response, ServiceError> {
    let batch = state.services.batches.get_batch_by_code(&code).await?;
    Ok(success_response(batch))
}

/// Request a batch status change
#[utoipa::path(
    put,
    path = "/api/v1/batches/{id}/status",
    params(
        ("id" = Uuid, Path, description = "Batch id"),
        ("X-User-Id" = Uuid, Header, description = "Acting user")
    ),
    request_body = UpdateBatchStatus,
    responses(
        (status = 200, description = "Status updated", body = ApiResponse<BatchView>),
        (status = 400, description = "Transition not allowed", body = crate::errors::ErrorResponse),
        (status = 403, description = "Vendor does not own the batch", body = crate::errors::ErrorResponse),
        (status = 404, description = "Batch or user not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Concurrent modification", body = crate::errors::ErrorResponse)
    ),
    tag = "batches"
)]
pub async fn update_batch_status(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateBatchStatus>,
) -> Result<Response, ServiceError> {
    let batch = state
        .services
        .batches
        .update_batch_status(id, body.status, caller.0)
        .await?;
    Ok(success_response(batch))
}
