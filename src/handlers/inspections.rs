use axum::{
    extract::{Path, State},
    response::Response,
    routing::{get, post},
    Json, Router,
};
use uuid::Uuid;

use crate::errors::ServiceError;
use crate::handlers::common::{created_response, success_response, Caller};
use crate::services::inspections::{
    DecideInspection, InspectionDecision, InspectionView, SubmitInspection,
};
use crate::{ApiResponse, AppState};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/inspections", post(submit_inspection))
        .route("/inspections/pending", get(list_pending_inspections))
        .route("/inspections/:id", get(get_inspection))
        .route("/inspections/:id/decision", post(decide_inspection))
}

/// File a farm inspection
#[utoipa::path(
    post,
    path = "/api/v1/inspections",
    params(("X-User-Id" = Uuid, Header, description = "Vendor filing the inspection")),
    request_body = SubmitInspection,
    responses(
        (status = 201, description = "Inspection filed", body = ApiResponse<InspectionView>),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse),
        (status = 404, description = "Farm or user not found", body = crate::errors::ErrorResponse)
    ),
    tag = "inspections"
)]
pub async fn submit_inspection(
    State(state): State<AppState>,
    caller: Caller,
    Json(body): Json<SubmitInspection>,
) -> Result<Response, ServiceError> {
    let inspection = state
        .services
        .inspections
        .submit_inspection(body, caller.0)
        .await?;
    Ok(created_response(inspection))
}

/// Approve or reject an inspection. Approval opens a batch; the `outcome`
/// field tells the two results apart.
#[utoipa::path(
    post,
    path = "/api/v1/inspections/{id}/decision",
    params(
        ("id" = Uuid, Path, description = "Inspection id"),
        ("X-User-Id" = Uuid, Header, description = "Deciding admin or manager")
    ),
    request_body = DecideInspection,
    responses(
        (status = 200, description = "Inspection decided", body = ApiResponse<InspectionDecision>),
        (status = 400, description = "Inspection already decided", body = crate::errors::ErrorResponse),
        (status = 403, description = "Caller may not decide inspections", body = crate::errors::ErrorResponse),
        (status = 404, description = "Inspection not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Batch code collision persisted after retries", body = crate::errors::ErrorResponse)
    ),
    tag = "inspections"
)]
pub async fn decide_inspection(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<Uuid>,
    Json(body): Json<DecideInspection>,
) -> Result<Response, ServiceError> {
    let decision = state
        .services
        .inspections
        .approve_inspection(id, body, caller.0)
        .await?;
    Ok(success_response(decision))
}

#[utoipa::path(
    get,
    path = "/api/v1/inspections/pending",
    responses(
        (status = 200, description = "Inspections awaiting a decision", body = ApiResponse<Vec<InspectionView>>)
    ),
    tag = "inspections"
)]
pub async fn list_pending_inspections(State(state): State<AppState>) -> Result<Response, ServiceError> {
    let pending = state.services.inspections.list_pending_inspections().await?;
    Ok(success_response(pending))
}

#[utoipa::path(
    get,
    path = "/api/v1/inspections/{id}",
    params(("id" = Uuid, Path, description = "Inspection id")),
    responses(
        (status = 200, description = "Inspection found", body = ApiResponse<InspectionView>),
        (status = 404, description = "Inspection not found", body = crate::errors::ErrorResponse)
    ),
    tag = "inspections"
)]
pub async fn get_inspection(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Response, ServiceError> {
    let inspection = state.services.inspections.get_inspection(id).await?;
    Ok(success_response(inspection))
}
