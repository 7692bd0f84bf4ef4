//! HTTP handlers for the input catalog and recipes

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use shared::Role;
use uuid::Uuid;

use crate::{
    error::AppResult,
    middleware::CurrentUser,
    services::catalog::{CatalogService, CreateInsumoInput, CreateRecipeInput, RecipeLineInput},
    AppState,
};

/// Add an input to the catalog
pub async fn create_insumo(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Json(input): Json<CreateInsumoInput>,
) -> AppResult<impl IntoResponse> {
    user.0.require(Role::can_administer)?;
    let service = CatalogService::new(state.db);
    let insumo = service.create_insumo(input).await?;
    Ok((StatusCode::CREATED, Json(insumo)))
}

pub async fn get_insumo(
    State(state): State<AppState>,
    Path(insumo_id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    let service = CatalogService::new(state.db);
    let insumo = service.get_insumo(insumo_id).await?;
    Ok(Json(insumo))
}

pub async fn list_insumos(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    let service = CatalogService::new(state.db);
    let insumos = service.list_insumos().await?;
    Ok(Json(insumos))
}

/// Create a recipe
pub async fn create_recipe(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Json(input): Json<CreateRecipeInput>,
) -> AppResult<impl IntoResponse> {
    user.0.require(Role::can_manage_lab)?;
    let service = CatalogService::new(state.db);
    let recipe = service.create_recipe(input).await?;
    Ok((StatusCode::CREATED, Json(recipe)))
}

/// Add or replace an input line of a recipe
pub async fn set_recipe_input(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(receta_id): Path<Uuid>,
    Json(input): Json<RecipeLineInput>,
) -> AppResult<impl IntoResponse> {
    user.0.require(Role::can_manage_lab)?;
    let service = CatalogService::new(state.db);
    let recipe = service.set_recipe_input(receta_id, input).await?;
    Ok(Json(recipe))
}

pub async fn get_recipe(
    State(state): State<AppState>,
    Path(receta_id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    let service = CatalogService::new(state.db);
    let recipe = service.get_recipe(receta_id).await?;
    Ok(Json(recipe))
}

pub async fn list_recipes(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    let service = CatalogService::new(state.db);
    let recipes = service.list_recipes().await?;
    Ok(Json(recipes))
}
