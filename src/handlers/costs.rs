use axum::{
    extract::{Path, State},
    response::Response,
    routing::{get, post},
    Json, Router,
};
use uuid::Uuid;

use crate::errors::ServiceError;
use crate::handlers::common::{created_response, success_response, Caller};
use crate::services::costing::{AddTransportCost, BatchCostView, TransportCostOutcome, TransportCostView};
use crate::{ApiResponse, AppState};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/batches/:id/costs", get(get_batch_cost))
        .route("/batches/:id/costs/recalculate", post(recalculate_costs))
        .route("/batches/by-code/:code/costs", get(get_batch_cost_by_code))
        .route(
            "/batches/:id/transport-costs",
            get(list_transport_costs).post(add_transport_cost),
        )
}

/// Current cost snapshot of a batch
#[utoipa::path(
    get,
    path = "/api/v1/batches/{id}/costs",
    params(("id" = Uuid, Path, description = "Batch id")),
    responses(
        (status = 200, description = "Cost snapshot, all zero if never calculated", body = ApiResponse<BatchCostView>),
        (status = 404, description = "Batch not found", body = crate::errors::ErrorResponse)
    ),
    tag = "costs"
)]
pub async fn get_batch_cost(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Response, ServiceError> {
    let costs = state.services.costs.get_batch_cost(id).await?;
    Ok(success_response(costs))
}

#[utoipa::path(
    get,
    path = "/api/v1/batches/by-code/{code}/costs",
    params(("code" = String, Path, description = "Batch code")),
    responses(
        (status = 200, description = "Cost snapshot", body = ApiResponse<BatchCostView>),
        (status = 404, description = "Batch not found", body = crate::errors::ErrorResponse)
    ),
    tag = "costs"
)]
pub async fn get_batch_cost_by_code(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> Result<Response, ServiceError> {
    let costs = state.services.costs.get_batch_cost_by_code(&code).await?;
    Ok(success_response(costs))
}

/// Rebuild a batch's cost snapshot from its cost facts
#[utoipa::path(
    post,
    path = "/api/v1/batches/{id}/costs/recalculate",
    params(
        ("id" = Uuid, Path, description = "Batch id"),
        ("X-User-Id" = Uuid, Header, description = "Acting user")
    ),
    responses(
        (status = 200, description = "Recalculated snapshot", body = ApiResponse<BatchCostView>),
        (status = 403, description = "Caller may not recalculate costs", body = crate::errors::ErrorResponse),
        (status = 404, description = "Batch not found", body = crate::errors::ErrorResponse)
    ),
    tag = "costs"
)]
pub async fn recalculate_costs(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<Uuid>,
) -> Result<Response, ServiceError> {
    let costs = crate::tracing::timed(
        "recalculate_costs",
        state.services.costs.recalculate_costs(id, caller.0),
    )
    .await?;
    Ok(success_response(costs))
}

/// Record an inward or outward transport cost
#[utoipa::path(
    post,
    path = "/api/v1/batches/{id}/transport-costs",
    params(
        ("id" = Uuid, Path, description = "Batch id"),
        ("X-User-Id" = Uuid, Header, description = "Acting user")
    ),
    request_body = AddTransportCost,
    responses(
        (status = 201, description = "Transport cost recorded", body = ApiResponse<TransportCostOutcome>),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse),
        (status = 403, description = "Caller may not record transport costs", body = crate::errors::ErrorResponse),
        (status = 404, description = "Batch or user not found", body = crate::errors::ErrorResponse)
    ),
    tag = "costs"
)]
pub async fn add_transport_cost(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<Uuid>,
    Json(body): Json<AddTransportCost>,
) -> Result<Response, ServiceError> {
    let outcome = state
        .services
        .costs
        .add_transport_cost(id, body, caller.0)
        .await?;
    Ok(created_response(outcome))
}

#[utoipa::path(
    get,
    path = "/api/v1/batches/{id}/transport-costs",
    params(("id" = Uuid, Path, description = "Batch id")),
    responses(
        (status = 200, description = "Transport costs of the batch", body = ApiResponse<Vec<TransportCostView>>),
        (status = 404, description = "Batch not found", body = crate::errors::ErrorResponse)
    ),
    tag = "costs"
)]
pub async fn list_transport_costs(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Response, ServiceError> {
    let costs = state.services.costs.list_transport_costs(id).await?;
    Ok(success_response(costs))
}
