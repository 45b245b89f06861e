use actix_web::{get, web, HttpResponse};
use sea_orm::DatabaseConnection;

use crate::error::AppError;
use crate::services::profile_service::ProfileService;
use crate::services::session::Session;

/// GET /students/{id} - Fiche candidat (entreprise concernée, administration)
#[get("/{id}")]
pub async fn get_student(
    db: web::Data<DatabaseConnection>,
    session: Session,
    path: web::Path<i32>,
) -> Result<HttpResponse, AppError> {
    let view = ProfileService::student_view(&db, &session, path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(view))
}

pub fn students_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(web::scope("/students").service(get_student));
}
