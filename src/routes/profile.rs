use actix_web::{get, put, web, HttpResponse};
use sea_orm::DatabaseConnection;

use crate::error::AppError;
use crate::models::dto::UpdateProfileRequest;
use crate::services::profile_service::ProfileService;
use crate::services::session::Session;

#[get("")]
pub async fn get_profile(
    db: web::Data<DatabaseConnection>,
    session: Session,
) -> Result<HttpResponse, AppError> {
    let profile = ProfileService::get(&db, &session).await?;
    Ok(HttpResponse::Ok().json(profile))
}

/// PUT /profile - Coordonnées et champs du rôle (email et rôle immuables)
#[put("")]
pub async fn update_profile(
    db: web::Data<DatabaseConnection>,
    session: Session,
    body: web::Json<UpdateProfileRequest>,
) -> Result<HttpResponse, AppError> {
    let profile = ProfileService::update(&db, &session, body.into_inner()).await?;
    Ok(HttpResponse::Ok().json(profile))
}

pub fn profile_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/profile")
            .service(get_profile)
            .service(update_profile),
    );
}
