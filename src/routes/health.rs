use actix_web::{get, web, HttpResponse};
use chrono::Utc;
use sea_orm::DatabaseConnection;

use crate::models::health::HealthResponse;

/// GET /health - Service + ping de la base (503 si injoignable)
#[get("/health")]
pub async fn health_check(db: web::Data<DatabaseConnection>) -> HttpResponse {
    let (status, database) = match db.ping().await {
        Ok(()) => ("ok", "up".to_string()),
        Err(e) => {
            tracing::warn!("Health check: database unreachable: {}", e);
            ("degraded", "down".to_string())
        }
    };

    let response = HealthResponse {
        status: status.to_string(),
        database,
        time: Utc::now(),
    };

    if status == "ok" {
        HttpResponse::Ok().json(response)
    } else {
        HttpResponse::ServiceUnavailable().json(response)
    }
}
