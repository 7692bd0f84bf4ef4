//! Route definitions for the forestry operations server

use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};

use crate::{handlers, middleware::auth_middleware, AppState};

/// Create API routes
pub fn api_routes(state: AppState) -> Router<AppState> {
    Router::new()
        // Health check (public)
        .route("/health", get(handlers::health_check))
        // Protected routes - input catalog
        .nest("/insumos", insumo_routes(state.clone()))
        // Protected routes - recipes
        .nest("/recetas", recipe_routes(state.clone()))
        // Protected routes - mixes
        .nest("/mezclas", mix_routes(state.clone()))
        // Protected routes - projects and their ledgers
        .nest("/proyectos", project_routes(state.clone()))
        // Protected routes - production runs
        .nest("/producciones", production_routes(state.clone()))
        // Protected routes - laboratory stock
        .nest("/stock", stock_routes(state))
}

/// Input catalog routes (protected)
fn insumo_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_insumos).post(handlers::create_insumo))
        .route("/:insumo_id", get(handlers::get_insumo))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}

/// Recipe routes (protected)
fn recipe_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_recipes).post(handlers::create_recipe))
        .route("/:receta_id", get(handlers::get_recipe))
        .route("/:receta_id/insumos", put(handlers::set_recipe_input))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}

/// Mix routes (protected)
fn mix_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_mixes).post(handlers::create_mix))
        .route("/:mezcla_id", get(handlers::get_mix))
        .route("/:mezcla_id/recetas", put(handlers::set_recipe_in_mix))
        .route("/:mezcla_id/requerimientos", get(handlers::get_mix_requirements))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}

/// Project routes (protected)
fn project_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_projects).post(handlers::create_project))
        .route("/:project_id", get(handlers::get_project))
        .route("/:project_id/mezcla", put(handlers::assign_mix))
        .route("/:project_id/disponibilidad", get(handlers::get_availability))
        .route("/:project_id/consumos", get(handlers::list_consumption))
        .route("/:project_id/consumos/ajustes", post(handlers::register_adjustment))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}

/// Production run routes (protected)
fn production_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_runs).post(handlers::create_run))
        .route("/:run_id", get(handlers::get_run))
        .route("/:run_id/iniciar", post(handlers::start_run))
        .route("/:run_id/completar", post(handlers::complete_run))
        .route("/:run_id/cancelar", post(handlers::cancel_run))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}

/// Laboratory stock routes (protected)
fn stock_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_balances))
        .route("/movimientos", post(handlers::record_movement))
        .route("/:insumo_id/movimientos", get(handlers::list_movements))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}
