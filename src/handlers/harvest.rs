use axum::{
    extract::{Path, Query, State},
    response::Response,
    routing::get,
    Json, Router,
};
use uuid::Uuid;

use crate::errors::ServiceError;
use crate::handlers::common::{created_response, success_response, Caller, DateQuery};
use crate::services::harvest::{DailyReportView, HarvestOutcome, SubmitDailyReport};
use crate::{ApiResponse, AppState};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route(
            "/batches/:id/reports",
            get(list_batch_reports).post(submit_daily_report),
        )
        .route("/reports", get(reports_on))
}

/// Submit a daily harvest report
#[utoipa::path(
    post,
    path = "/api/v1/batches/{id}/reports",
    params(
        ("id" = Uuid, Path, description = "Batch id"),
        ("X-User-Id" = Uuid, Header, description = "Acting user")
    ),
    request_body = SubmitDailyReport,
    responses(
        (status = 201, description = "Report recorded", body = ApiResponse<HarvestOutcome>),
        (status = 400, description = "Invalid report or harvest capacity exceeded", body = crate::errors::ErrorResponse),
        (status = 404, description = "Batch or user not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Concurrent modification", body = crate::errors::ErrorResponse)
    ),
    tag = "harvest"
)]
pub async fn submit_daily_report(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<Uuid>,
    Json(body): Json<SubmitDailyReport>,
) -> Result<Response, ServiceError> {
    let outcome = crate::tracing::timed(
        "submit_daily_report",
        state.services.harvest.submit_daily_report(id, body, caller.0),
    )
    .await?;
    Ok(created_response(outcome))
}

/// List a batch's harvest reports
#[utoipa::path(
    get,
    path = "/api/v1/batches/{id}/reports",
    params(("id" = Uuid, Path, description = "Batch id")),
    responses(
        (status = 200, description = "Reports in report-date order", body = ApiResponse<Vec<DailyReportView>>),
        (status = 404, description = "Batch not found", body = crate::errors::ErrorResponse)
    ),
    tag = "harvest"
)]
pub async fn list_batch_reports(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Response, ServiceError> {
    let reports = state.services.harvest.list_batch_reports(id).await?;
    Ok(success_response(reports))
}

/// Harvest reports filed on a day
#[utoipa::path(
    get,
    path = "/api/v1/reports",
    params(DateQuery),
    responses(
        (status = 200, description = "Reports for the day", body = ApiResponse<Vec<DailyReportView>>)
    ),
    tag = "harvest"
)]
pub async fn reports_on(
    State(state): State<AppState>,
    Query(query): Query<DateQuery>,
) -> Result<Response, ServiceError> {
    let reports = state.services.harvest.reports_on(query.date).await?;
    Ok(success_response(reports))
}
