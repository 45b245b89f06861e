use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use sea_orm::{DbErr, SqlErr};
use thiserror::Error;

/// Erreur applicative renvoyée par les services et les routes.
/// Le corps JSON est toujours `{"error": "<message>"}`.
#[derive(Debug, Error)]
pub enum AppError {
    /// Champ requis vide, valeur hors bornes... détecté avant tout accès BD
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("Accès refusé")]
    Forbidden,

    #[error("{0}")]
    NotFound(String),

    /// Doublon, transition interdite, contrainte d'unicité
    #[error("{0}")]
    Conflict(String),

    #[error("Service indisponible, veuillez réessayer plus tard")]
    Unavailable,

    /// Message de la base transmis tel quel
    #[error("{0}")]
    Database(String),
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        if let AppError::Database(detail) = self {
            tracing::error!("Database error: {}", detail);
        }

        HttpResponse::build(self.status_code()).json(serde_json::json!({
            "error": self.to_string()
        }))
    }
}

impl From<DbErr> for AppError {
    fn from(err: DbErr) -> Self {
        if let Some(SqlErr::UniqueConstraintViolation(detail)) = err.sql_err() {
            return AppError::Conflict(detail);
        }

        match err {
            DbErr::Conn(_) | DbErr::ConnectionAcquire(_) => {
                tracing::warn!("Database unreachable: {}", err);
                AppError::Unavailable
            }
            DbErr::RecordNotFound(msg) => AppError::NotFound(msg),
            other => AppError::Database(other.to_string()),
        }
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        AppError::Validation(errors.to_string())
    }
}
