use axum::{
    extract::{Path, Query, State},
    response::Response,
    routing::{get, post},
    Json, Router,
};
use uuid::Uuid;

use crate::errors::ServiceError;
use crate::handlers::common::{created_response, success_response, Caller, DateQuery};
use crate::services::dispatch::{CreateGatePass, GatePassOutcome, GatePassView, ReceiveGatePass};
use crate::{ApiResponse, AppState};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route(
            "/batches/:id/gate-passes",
            get(list_batch_gate_passes).post(create_gate_pass),
        )
        .route("/gate-passes", get(gate_passes_on))
        .route("/gate-passes/pending", get(list_pending_gate_passes))
        .route("/gate-passes/:id", get(get_gate_pass))
        .route("/gate-passes/:id/receive", post(receive_gate_pass))
}

/// Issue a gate pass for a batch
#[utoipa::path(
    post,
    path = "/api/v1/batches/{id}/gate-passes",
    params(
        ("id" = Uuid, Path, description = "Batch id"),
        ("X-User-Id" = Uuid, Header, description = "Acting user")
    ),
    request_body = CreateGatePass,
    responses(
        (status = 201, description = "Gate pass issued", body = ApiResponse<GatePassOutcome>),
        (status = 400, description = "Invalid request or dispatch capacity exceeded", body = crate::errors::ErrorResponse),
        (status = 404, description = "Batch or user not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Concurrent modification", body = crate::errors::ErrorResponse)
    ),
    tag = "gate-passes"
)]
pub async fn create_gate_pass(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<Uuid>,
    Json(body): Json<CreateGatePass>,
) -> Result<Response, ServiceError> {
    let outcome = state
        .services
        .dispatch
        .create_gate_pass(id, body, caller.0)
        .await?;
    Ok(created_response(outcome))
}

/// Record receipt of a gate pass at its destination
#[utoipa::path(
    post,
    path = "/api/v1/gate-passes/{id}/receive",
    params(
        ("id" = Uuid, Path, description = "Gate pass id"),
        ("X-User-Id" = Uuid, Header, description = "Acting user")
    ),
    request_body = ReceiveGatePass,
    responses(
        (status = 200, description = "Receipt recorded", body = ApiResponse<GatePassView>),
        (status = 400, description = "Already received or invalid count", body = crate::errors::ErrorResponse),
        (status = 403, description = "Caller may not sign for gate passes", body = crate::errors::ErrorResponse),
        (status = 404, description = "Gate pass not found", body = crate::errors::ErrorResponse)
    ),
    tag = "gate-passes"
)]
pub async fn receive_gate_pass(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<Uuid>,
    Json(body): Json<ReceiveGatePass>,
) -> Result<Response, ServiceError> {
    let pass = state
        .services
        .dispatch
        .receive_gate_pass(id, body, caller.0)
        .await?;
    Ok(success_response(pass))
}

#[utoipa::path(
    get,
    path = "/api/v1/gate-passes/{id}",
    params(("id" = Uuid, Path, description = "Gate pass id")),
    responses(
        (status = 200, description = "Gate pass found", body = ApiResponse<GatePassView>),
        (status = 404, description = "Gate pass not found", body = crate::errors::ErrorResponse)
    ),
    tag = "gate-passes"
)]
pub async fn get_gate_pass(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Response, ServiceError> {
    let pass = state.services.dispatch.get_gate_pass(id).await?;
    Ok(success_response(pass))
}

#[utoipa::path(
    get,
    path = "/api/v1/batches/{id}/gate-passes",
    params(("id" = Uuid, Path, description = "Batch id")),
    responses(
        (status = 200, description = "Gate passes of the batch", body = ApiResponse<Vec<GatePassView>>),
        (status = 404, description = "Batch not found", body = crate::errors::ErrorResponse)
    ),
    tag = "gate-passes"
)]
pub async fn list_batch_gate_passes(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Response, ServiceError> {
    let passes = state.services.dispatch.list_batch_gate_passes(id).await?;
    Ok(success_response(passes))
}

/// Gate passes not yet received, newest dispatch first
#[utoipa::path(
    get,
    path = "/api/v1/gate-passes/pending",
    responses(
        (status = 200, description = "Pending gate passes", body = ApiResponse<Vec<GatePassView>>)
    ),
    tag = "gate-passes"
)]
pub async fn list_pending_gate_passes(State(state): State<AppState>) -> Result<Response, ServiceError> {
    let passes = state.services.dispatch.list_pending_gate_passes().await?;
    Ok(success_response(passes))
}

/// Gate passes dispatched on a day
#[utoipa::path(
    get,
    path = "/api/v1/gate-passes",
    params(DateQuery),
    responses(
        (status = 200, description = "Gate passes for the day", body = ApiResponse<Vec<GatePassView>>)
    ),
    tag = "gate-passes"
)]
pub async fn gate_passes_on(
    State(state): State<AppState>,
    Query(query): Query<DateQuery>,
) -> Result<Response, ServiceError> {
    let passes = state.services.dispatch.gate_passes_on(query.date).await?;
    Ok(success_response(passes))
}
