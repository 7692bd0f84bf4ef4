//! Error handling for the forestry operations server
//!
//! Provides consistent error responses in English and Spanish

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use shared::{DomainError, UnitError, UnknownVariant};
use thiserror::Error;

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    // Authentication errors
    #[error("Invalid token")]
    InvalidToken,

    #[error("Insufficient permissions")]
    InsufficientPermissions,

    // Validation errors
    #[error("Validation error: {message}")]
    Validation {
        field: String,
        message: String,
        message_es: String,
    },

    #[error("Validation error: {0}")]
    ValidationError(#[from] validator::ValidationErrors),

    #[error("Conflict: {message}")]
    Conflict {
        resource: String,
        message: String,
        message_es: String,
    },

    #[error("Resource not found: {0}")]
    NotFound(String),

    // Business logic errors
    #[error(transparent)]
    Domain(#[from] DomainError),

    // Database errors
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    // Internal errors
    #[error("Internal server error: {0}")]
    Internal(String),
}

impl From<UnitError> for AppError {
    fn from(err: UnitError) -> Self {
        AppError::Domain(err.into())
    }
}

/// A stored code the domain does not recognize is a data problem, not a client one
impl From<UnknownVariant> for AppError {
    fn from(err: UnknownVariant) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::Validation {
            field: "body".to_string(),
            message: rejection.body_text(),
            message_es: "El cuerpo de la solicitud no es un JSON válido".to_string(),
        }
    }
}

/// Error response structure
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message_en: String,
    pub message_es: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

impl AppError {
    fn status_and_detail(&self) -> (StatusCode, ErrorDetail) {
        match self {
            AppError::InvalidToken => (
                StatusCode::UNAUTHORIZED,
                ErrorDetail {
                    code: "INVALID_TOKEN".to_string(),
                    message_en: "Invalid token".to_string(),
                    message_es: "Token inválido".to_string(),
                    field: None,
                },
            ),
            AppError::InsufficientPermissions => (
                StatusCode::FORBIDDEN,
                ErrorDetail {
                    code: "INSUFFICIENT_PERMISSIONS".to_string(),
                    message_en: "You do not have permission to perform this action".to_string(),
                    message_es: "No tiene permisos para realizar esta acción".to_string(),
                    field: None,
                },
            ),
            AppError::Validation {
                field,
                message,
                message_es,
            } => (
                StatusCode::BAD_REQUEST,
                ErrorDetail {
                    code: "VALIDATION_ERROR".to_string(),
                    message_en: message.clone(),
                    message_es: message_es.clone(),
                    field: Some(field.clone()),
                },
            ),
            AppError::ValidationError(errors) => {
                let field = errors.field_errors().keys().next().map(|f| f.to_string());
                (
                    StatusCode::BAD_REQUEST,
                    ErrorDetail {
                        code: "VALIDATION_ERROR".to_string(),
                        message_en: errors.to_string(),
                        message_es: format!("Datos inválidos: {}", errors),
                        field,
                    },
                )
            }
            AppError::Conflict {
                resource,
                message,
                message_es,
            } => (
                StatusCode::CONFLICT,
                ErrorDetail {
                    code: "CONFLICT".to_string(),
                    message_en: message.clone(),
                    message_es: message_es.clone(),
                    field: Some(resource.clone()),
                },
            ),
            AppError::NotFound(resource) => (
                StatusCode::NOT_FOUND,
                ErrorDetail {
                    code: "NOT_FOUND".to_string(),
                    message_en: format!("{} not found", resource),
                    message_es: format!("No se encontró {}", resource),
                    field: None,
                },
            ),
            AppError::Domain(err) => domain_detail(err),
            AppError::DatabaseError(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorDetail {
                    code: "DATABASE_ERROR".to_string(),
                    message_en: "A database error occurred".to_string(),
                    message_es: "Ocurrió un error en la base de datos".to_string(),
                    field: None,
                },
            ),
            AppError::Internal(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorDetail {
                    code: "INTERNAL_ERROR".to_string(),
                    message_en: msg.clone(),
                    message_es: "Error interno del servidor".to_string(),
                    field: None,
                },
            ),
        }
    }
}

fn domain_detail(err: &DomainError) -> (StatusCode, ErrorDetail) {
    match err {
        DomainError::InvalidTransition { from, action } => (
            StatusCode::UNPROCESSABLE_ENTITY,
            ErrorDetail {
                code: "INVALID_STATE_TRANSITION".to_string(),
                message_en: err.to_string(),
                message_es: format!(
                    "No se puede {} una producción en estado {}",
                    action, from
                ),
                field: Some("estado".to_string()),
            },
        ),
        DomainError::InsufficientAvailability {
            insumo_id,
            requested,
            available,
        } => (
            StatusCode::UNPROCESSABLE_ENTITY,
            ErrorDetail {
                code: "INSUFFICIENT_AVAILABILITY".to_string(),
                message_en: err.to_string(),
                message_es: format!(
                    "Disponibilidad insuficiente del insumo {}: solicitado {}, disponible {}",
                    insumo_id, requested, available
                ),
                field: Some("insumo_id".to_string()),
            },
        ),
        DomainError::InsufficientStock {
            insumo_id,
            requested,
            balance,
        } => (
            StatusCode::UNPROCESSABLE_ENTITY,
            ErrorDetail {
                code: "INSUFFICIENT_STOCK".to_string(),
                message_en: err.to_string(),
                message_es: format!(
                    "Stock insuficiente del insumo {}: solicitado {}, saldo {}",
                    insumo_id, requested, balance
                ),
                field: Some("cantidad".to_string()),
            },
        ),
        DomainError::InvalidQuantity { field, message } => (
            StatusCode::BAD_REQUEST,
            ErrorDetail {
                code: "VALIDATION_ERROR".to_string(),
                message_en: err.to_string(),
                message_es: format!("Cantidad inválida en {}: {}", field, message),
                field: Some(field.clone()),
            },
        ),
        DomainError::Unit(UnitError::UnsupportedUnit(unit)) => (
            StatusCode::BAD_REQUEST,
            ErrorDetail {
                code: "UNSUPPORTED_UNIT".to_string(),
                message_en: err.to_string(),
                message_es: format!("Unidad no soportada: {}", unit),
                field: Some("unidad".to_string()),
            },
        ),
        DomainError::Unit(UnitError::IncompatibleDimension { from, to }) => (
            StatusCode::BAD_REQUEST,
            ErrorDetail {
                code: "INCOMPATIBLE_UNITS".to_string(),
                message_en: err.to_string(),
                message_es: format!("No se puede convertir {} a {}", from, to),
                field: Some("unidad".to_string()),
            },
        ),
        DomainError::Unit(UnitError::Overflow { amount, unit }) => (
            StatusCode::BAD_REQUEST,
            ErrorDetail {
                code: "QUANTITY_OUT_OF_RANGE".to_string(),
                message_en: err.to_string(),
                message_es: format!("La cantidad {} {} está fuera de rango", amount, unit),
                field: Some("cantidad".to_string()),
            },
        ),
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_detail) = self.status_and_detail();

        // Log the error for debugging
        tracing::error!("Error: {:?}", self);

        (status, Json(ErrorResponse { error: error_detail })).into_response()
    }
}

/// Result type alias for handlers
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use shared::{ProductionStatus, Transition};
    use uuid::Uuid;

    #[test]
    fn test_invalid_transition_is_unprocessable() {
        let err = AppError::from(DomainError::InvalidTransition {
            from: ProductionStatus::Completada,
            action: Transition::Completar,
        });
        let (status, detail) = err.status_and_detail();
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(detail.code, "INVALID_STATE_TRANSITION");
    }

    #[test]
    fn test_insufficient_availability_is_unprocessable() {
        let err = AppError::from(DomainError::InsufficientAvailability {
            insumo_id: Uuid::nil(),
            requested: Decimal::ONE,
            available: Decimal::ZERO,
        });
        let (status, detail) = err.status_and_detail();
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(detail.code, "INSUFFICIENT_AVAILABILITY");
    }

    #[test]
    fn test_unit_errors_are_bad_request() {
        let err = AppError::from(UnitError::UnsupportedUnit("pies".to_string()));
        let (status, detail) = err.status_and_detail();
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(detail.code, "UNSUPPORTED_UNIT");
        assert_eq!(detail.field.as_deref(), Some("unidad"));
    }

    #[test]
    fn test_conversion_overflow_is_bad_request() {
        let err = AppError::from(UnitError::Overflow {
            amount: "1".to_string(),
            unit: "t".to_string(),
        });
        let (status, detail) = err.status_and_detail();
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(detail.code, "QUANTITY_OUT_OF_RANGE");
    }

    #[test]
    fn test_unknown_stored_code_is_internal() {
        let err = AppError::from(UnknownVariant::new("production status", "archivada"));
        let (status, _) = err.status_and_detail();
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_not_found_message() {
        let (status, detail) = AppError::NotFound("Production run".to_string()).status_and_detail();
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(detail.message_en, "Production run not found");
    }
}
