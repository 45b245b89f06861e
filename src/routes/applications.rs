use actix_web::{get, put, web, HttpResponse};
use sea_orm::DatabaseConnection;

use crate::error::AppError;
use crate::models::dto::{ApplicationsQuery, UpdateApplicationStatusRequest};
use crate::models::users::Role;
use crate::services::application_service::ApplicationService;
use crate::services::session::Session;

/// GET /applications - Étudiant: ses candidatures / entreprise: celles reçues
#[get("")]
pub async fn list_applications(
    db: web::Data<DatabaseConnection>,
    session: Session,
    query: web::Query<ApplicationsQuery>,
) -> Result<HttpResponse, AppError> {
    let applications = match session.role() {
        Role::Student => ApplicationService::list_mine(&db, &session).await?,
        Role::Company => ApplicationService::list_received(&db, &session, query.offer_id).await?,
        Role::Administration => return Err(AppError::Forbidden),
    };
    Ok(HttpResponse::Ok().json(applications))
}

/// PUT /applications/{id}/status - acceptee | rejetee
#[put("/{id}/status")]
pub async fn update_application_status(
    db: web::Data<DatabaseConnection>,
    session: Session,
    path: web::Path<i32>,
    body: web::Json<UpdateApplicationStatusRequest>,
) -> Result<HttpResponse, AppError> {
    let application =
        ApplicationService::update_status(&db, &session, path.into_inner(), body.status).await?;
    Ok(HttpResponse::Ok().json(application))
}

pub fn applications_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/applications")
            .service(list_applications)
            .service(update_application_status),
    );
}
