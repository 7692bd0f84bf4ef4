//! HTTP handlers for production runs

use axum::{
    body::Bytes,
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
    services::production::{
        CompleteProductionInput, CreateProductionInput, ProductionFilter, ProductionService,
    },
    AppState,
};

/// Create a pending run for a project
pub async fn create_run(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Json(input): Json<CreateProductionInput>,
) -> AppResult<impl IntoResponse> {
    user.0.require(Role::can_operate_production)?;
    let service = ProductionService::new(state.db);
    let run = service.create_run(user.0.user_id, input).await?;
    Ok((StatusCode::CREATED, Json(run)))
}

pub async fn get_run(
    State(state): State<AppState>,
    Path(run_id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    let service = ProductionService::new(state.db);
    let run = service.get_run(run_id).await?;
    Ok(Json(run))
}

pub async fn list_runs(
    State(state): State<AppState>,
    Query(filter): Query<ProductionFilter>,
    Query(pagination): Query<Pagination>,
) -> AppResult<impl IntoResponse> {
    let service = ProductionService::new(state.db);
    let runs = service.list_runs(filter, pagination).await?;
    Ok(Json(runs))
}

pub async fn start_run(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(run_id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    user.0.require(Role::can_operate_production)?;
    let service = ProductionService::new(state.db);
    let run = service.start_run(run_id).await?;
    Ok(Json(run))
}

/// Complete a run; the body with production results is optional
pub async fn complete_run(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(run_id): Path<Uuid>,
    body: Bytes,
) -> AppResult<impl IntoResponse> {
    user.0.require(Role::can_operate_production)?;
    let input = completion_input(&body)?;
    let service = ProductionService::new(state.db);
    let run = service.complete_run(run_id, user.0.user_id, input).await?;
    Ok(Json(run))
}

pub async fn cancel_run(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(run_id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    user.0.require(Role::can_operate_production)?;
    let service = ProductionService::new(state.db);
    let run = service.cancel_run(run_id).await?;
    Ok(Json(run))
}

/// Only an empty body means "no results"; anything else must be valid JSON
fn completion_input(body: &[u8]) -> AppResult<CompleteProductionInput> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(CompleteProductionInput::default());
    }
    let Json(input) = Json::<CompleteProductionInput>::from_bytes(body)?;
    Ok(input)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use rust_decimal::Decimal;

    #[test]
    fn test_empty_body_completes_without_results() {
        let input = completion_input(b"").unwrap();
        assert!(input.cantidad_producida.is_none());
        assert!(input.observaciones.is_none());

        assert!(completion_input(b"  \n").unwrap().cantidad_producida.is_none());
    }

    #[test]
    fn test_results_body_is_parsed() {
        let input =
            completion_input(br#"{"cantidad_producida": "120.5", "observaciones": "lote parejo"}"#)
                .unwrap();
        assert_eq!(input.cantidad_producida, Some(Decimal::new(1205, 1)));
        assert_eq!(input.observaciones.as_deref(), Some("lote parejo"));
    }

    #[test]
    fn test_malformed_body_is_rejected() {
        let err = completion_input(br#"{"cantidad_producida":"abc"}"#).unwrap_err();
        assert!(matches!(err, AppError::Validation { ref field, .. } if field == "body"));

        assert!(completion_input(b"{not json").is_err());
    }
}
