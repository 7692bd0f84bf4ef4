//! HTTP handlers for laboratory stock

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use shared::{Pagination, Role};
use uuid::Uuid;

use crate::{
    error::AppResult,
    middleware::CurrentUser,
    services::stock::{RecordMovementInput, StockService},
    AppState,
};

/// Record an entry or exit of laboratory stock
pub async fn record_movement(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Json(input): Json<RecordMovementInput>,
) -> AppResult<impl IntoResponse> {
    user.0.require(Role::can_manage_lab)?;
    let service = StockService::new(state.db);
    let movement = service.record_movement(user.0.user_id, input).await?;
    Ok((StatusCode::CREATED, Json(movement)))
}

pub async fn list_balances(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    let service = StockService::new(state.db);
    let balances = service.list_balances().await?;
    Ok(Json(balances))
}

pub async fn list_movements(
    State(state): State<AppState>,
    Path(insumo_id): Path<Uuid>,
    Query(pagination): Query<Pagination>,
) -> AppResult<impl IntoResponse> {
    let service = StockService::new(state.db);
    let movements = service.list_movements(insumo_id, pagination).await?;
    Ok(Json(movements))
}
