//! HTTP handlers for mixes

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use rust_decimal::Decimal;
use shared::Role;
use uuid::Uuid;

use crate::{
    error::AppResult,
    middleware::CurrentUser,
    services::mix::{CreateMixInput, MixService, RecipeInMixInput},
    AppState,
};

pub async fn create_mix(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Json(input): Json<CreateMixInput>,
) -> AppResult<impl IntoResponse> {
    user.0.require(Role::can_manage_lab)?;
    let service = MixService::new(state.db);
    let mix = service.create_mix(input).await?;
    Ok((StatusCode::CREATED, Json(mix)))
}

/// Add a recipe to a mix or replace its quantity
pub async fn set_recipe_in_mix(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(mezcla_id): Path<Uuid>,
    Json(input): Json<RecipeInMixInput>,
) -> AppResult<impl IntoResponse> {
    user.0.require(Role::can_manage_lab)?;
    let service = MixService::new(state.db);
    let mix = service.set_recipe_in_mix(mezcla_id, input).await?;
    Ok(Json(mix))
}

pub async fn get_mix(
    State(state): State<AppState>,
    Path(mezcla_id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    let service = MixService::new(state.db);
    let mix = service.get_mix(mezcla_id).await?;
    Ok(Json(mix))
}

pub async fn list_mixes(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    let service = MixService::new(state.db);
    let mixes = service.list_mixes().await?;
    Ok(Json(mixes))
}

/// Input requirements of one batch of a mix, in base units
pub async fn get_mix_requirements(
    State(state): State<AppState>,
    Path(mezcla_id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    let service = MixService::new(state.db.clone());
    service.get_mix(mezcla_id).await?;
    let requirements = service.get_requirements(mezcla_id).await?;
    Ok(Json(requirements.scaled(Decimal::ONE)?))
}
