use actix_web::{get, web, HttpResponse};
use sea_orm::DatabaseConnection;

use crate::error::AppError;
use crate::services::dashboard_service::DashboardService;
use crate::services::session::Session;

/// GET /dashboard - Données de tous les onglets du rôle connecté
#[get("/dashboard")]
pub async fn dashboard(
    db: web::Data<DatabaseConnection>,
    session: Session,
) -> Result<HttpResponse, AppError> {
    let dashboard = DashboardService::for_session(&db, &session).await?;
    Ok(HttpResponse::Ok().json(dashboard))
}
