use axum::{
    extract::{Path, State},
    response::Response,
    routing::get,
    Json, Router,
};
use uuid::Uuid;

use crate::errors::ServiceError;
use crate::handlers::common::{created_response, success_response, Caller};
use crate::services::farms::{FarmView, RegisterFarm};
use crate::{ApiResponse, AppState};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/farms", get(list_farms).post(create_farm))
        .route("/farms/:id", get(get_farm))
}

/// Register a farm
#[utoipa::path(
    post,
    path = "/api/v1/farms",
    params(("X-User-Id" = Uuid, Header, description = "Registering admin or manager")),
    request_body = RegisterFarm,
    responses(
        (status = 201, description = "Farm registered", body = ApiResponse<FarmView>),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse),
        (status = 403, description = "Caller may not register farms", body = crate::errors::ErrorResponse)
    ),
    tag = "farms"
)]
pub async fn create_farm(
    State(state): State<AppState>,
    caller: Caller,
    Json(body): Json<RegisterFarm>,
) -> Result<Response, ServiceError> {
    let farm = state.services.farms.create_farm(body, caller.0).await?;
    Ok(created_response(farm))
}

#[utoipa::path(
    get,
    path = "/api/v1/farms",
    responses(
        (status = 200, description = "All registered farms", body = ApiResponse<Vec<FarmView>>)
    ),
    tag = "farms"
)]
pub async fn list_farms(State(state): State<AppState>) -> Result<Response, ServiceError> {
    let farms = state.services.farms.list_farms().await?;
    Ok(success_response(farms))
}

#[utoipa::path(
    get,
    path = "/api/v1/farms/{id}",
    params(("id" = Uuid, Path, description = "Farm id")),
    responses(
        (status = 200, description = "Farm found", body = ApiResponse<FarmView>),
        (status = 404, description = "Farm not found", body = crate::errors::ErrorResponse)
    ),
    tag = "farms"
)]
pub async fn get_farm(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Response, ServiceError> {
    let farm = state.services.farms.get_farm(id).await?;
    Ok(success_response(farm))
}
