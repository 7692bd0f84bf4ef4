//! HTTP handlers for projects and their ledgers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use serde::Deserialize;
use shared::{Pagination, Role};
use uuid::Uuid;

use crate::{
    error::AppResult,
    middleware::CurrentUser,
    services::{
        availability::{AdjustmentInput, AvailabilityService},
        project::{AssignMixInput, CreateProjectInput, ProjectService},
    },
    AppState,
};

#[derive(Debug, Deserialize)]
pub struct ConsumptionQuery {
    pub insumo_id: Option<Uuid>,
}

pub async fn create_project(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Json(input): Json<CreateProjectInput>,
) -> AppResult<impl IntoResponse> {
    user.0.require(Role::can_administer)?;
    let service = ProjectService::new(state.db);
    let project = service.create_project(input).await?;
    Ok((StatusCode::CREATED, Json(project)))
}

pub async fn get_project(
    State(state): State<AppState>,
    Path(project_id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    let service = ProjectService::new(state.db);
    let project = service.get_project(project_id).await?;
    Ok(Json(project))
}

pub async fn list_projects(
    State(state): State<AppState>,
    Query(pagination): Query<Pagination>,
) -> AppResult<impl IntoResponse> {
    let service = ProjectService::new(state.db);
    let projects = service.list_projects(pagination).await?;
    Ok(Json(projects))
}

/// Assign the mix new runs of the project will produce
pub async fn assign_mix(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(project_id): Path<Uuid>,
    Json(input): Json<AssignMixInput>,
) -> AppResult<impl IntoResponse> {
    user.0.require(Role::can_administer)?;
    let service = ProjectService::new(state.db);
    let project = service.assign_mix(project_id, input).await?;
    Ok(Json(project))
}

/// Required, consumed and available quantities per input
pub async fn get_availability(
    State(state): State<AppState>,
    Path(project_id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    let service = AvailabilityService::new(state.db);
    let availability = service.get_availability(project_id).await?;
    Ok(Json(availability))
}

pub async fn list_consumption(
    State(state): State<AppState>,
    Path(project_id): Path<Uuid>,
    Query(query): Query<ConsumptionQuery>,
) -> AppResult<impl IntoResponse> {
    let service = AvailabilityService::new(state.db);
    let entries = service.list_consumption(project_id, query.insumo_id).await?;
    Ok(Json(entries))
}

/// Record a signed ledger correction
pub async fn register_adjustment(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(project_id): Path<Uuid>,
    Json(input): Json<AdjustmentInput>,
) -> AppResult<impl IntoResponse> {
    user.0.require(Role::can_administer)?;
    let service = AvailabilityService::new(state.db);
    let entry = service
        .register_adjustment(project_id, user.0.user_id, input)
        .await?;
    Ok((StatusCode::CREATED, Json(entry)))
}
