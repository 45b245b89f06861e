use actix_web::{get, post, web, HttpResponse};
use sea_orm::DatabaseConnection;

use crate::error::AppError;
use crate::models::dto::{CancelConventionRequest, ConventionsQuery, CreateConventionRequest};
use crate::services::convention_service::ConventionService;
use crate::services::session::Session;

/// GET /conventions?status=en_cours - Conventions visibles par le rôle
#[get("")]
pub async fn list_conventions(
    db: web::Data<DatabaseConnection>,
    session: Session,
    query: web::Query<ConventionsQuery>,
) -> Result<HttpResponse, AppError> {
    let conventions = ConventionService::list(&db, &session, query.status).await?;
    Ok(HttpResponse::Ok().json(conventions))
}

/// POST /conventions - Création par l'administration
#[post("")]
pub async fn create_convention(
    db: web::Data<DatabaseConnection>,
    session: Session,
    body: web::Json<CreateConventionRequest>,
) -> Result<HttpResponse, AppError> {
    let convention = ConventionService::create(&db, &session, body.into_inner()).await?;
    Ok(HttpResponse::Created().json(convention))
}

#[get("/{id}")]
pub async fn get_convention(
    db: web::Data<DatabaseConnection>,
    session: Session,
    path: web::Path<i32>,
) -> Result<HttpResponse, AppError> {
    let convention = ConventionService::get(&db, &session, path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(convention))
}

/// POST /conventions/{id}/sign - Signature de la partie connectée
#[post("/{id}/sign")]
pub async fn sign_convention(
    db: web::Data<DatabaseConnection>,
    session: Session,
    path: web::Path<i32>,
) -> Result<HttpResponse, AppError> {
    let convention = ConventionService::sign(&db, &session, path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(convention))
}

#[post("/{id}/review")]
pub async fn begin_review(
    db: web::Data<DatabaseConnection>,
    session: Session,
    path: web::Path<i32>,
) -> Result<HttpResponse, AppError> {
    let convention = ConventionService::begin_review(&db, &session, path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(convention))
}

#[post("/{id}/validate")]
pub async fn validate_convention(
    db: web::Data<DatabaseConnection>,
    session: Session,
    path: web::Path<i32>,
) -> Result<HttpResponse, AppError> {
    let convention = ConventionService::validate(&db, &session, path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(convention))
}

#[post("/{id}/cancel")]
pub async fn cancel_convention(
    db: web::Data<DatabaseConnection>,
    session: Session,
    path: web::Path<i32>,
    body: web::Json<CancelConventionRequest>,
) -> Result<HttpResponse, AppError> {
    let convention =
        ConventionService::cancel(&db, &session, path.into_inner(), &body.reason).await?;
    Ok(HttpResponse::Ok().json(convention))
}

pub fn conventions_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/conventions")
            .service(list_conventions)
            .service(create_convention)
            .service(get_convention)
            .service(sign_convention)
            .service(begin_review)
            .service(validate_convention)
            .service(cancel_convention),
    );
}
