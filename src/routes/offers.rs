use actix_web::{delete, get, post, put, web, HttpResponse};
use sea_orm::DatabaseConnection;

use crate::error::AppError;
use crate::models::dto::{ApplyRequest, CreateOfferRequest, UpdateOfferRequest};
use crate::models::offre::OfferStatus;
use crate::services::application_service::ApplicationService;
use crate::services::offer_service::OfferService;
use crate::services::session::Session;

/// GET /offers - Offres ouvertes, avec le nom de la société
#[get("")]
pub async fn list_open_offers(
    db: web::Data<DatabaseConnection>,
    session: Session,
) -> Result<HttpResponse, AppError> {
    let offers = OfferService::list_open(&db, &session).await?;
    Ok(HttpResponse::Ok().json(offers))
}

/// GET /offers/mine - Offres de l'entreprise connectée
#[get("/mine")]
pub async fn list_my_offers(
    db: web::Data<DatabaseConnection>,
    session: Session,
) -> Result<HttpResponse, AppError> {
    let offers = OfferService::list_own(&db, &session).await?;
    Ok(HttpResponse::Ok().json(offers))
}

#[get("/{id}")]
pub async fn get_offer(
    db: web::Data<DatabaseConnection>,
    session: Session,
    path: web::Path<i32>,
) -> Result<HttpResponse, AppError> {
    let offer = OfferService::get(&db, &session, path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(offer))
}

#[post("")]
pub async fn create_offer(
    db: web::Data<DatabaseConnection>,
    session: Session,
    body: web::Json<CreateOfferRequest>,
) -> Result<HttpResponse, AppError> {
    let offer = OfferService::create(&db, &session, body.into_inner()).await?;
    Ok(HttpResponse::Created().json(offer))
}

#[put("/{id}")]
pub async fn update_offer(
    db: web::Data<DatabaseConnection>,
    session: Session,
    path: web::Path<i32>,
    body: web::Json<UpdateOfferRequest>,
) -> Result<HttpResponse, AppError> {
    let offer = OfferService::update(&db, &session, path.into_inner(), body.into_inner()).await?;
    Ok(HttpResponse::Ok().json(offer))
}

/// POST /offers/{id}/archive - Statut fermee
#[post("/{id}/archive")]
pub async fn archive_offer(
    db: web::Data<DatabaseConnection>,
    session: Session,
    path: web::Path<i32>,
) -> Result<HttpResponse, AppError> {
    let offer =
        OfferService::set_status(&db, &session, path.into_inner(), OfferStatus::Closed).await?;
    Ok(HttpResponse::Ok().json(offer))
}

/// POST /offers/{id}/reopen - Statut ouverte
#[post("/{id}/reopen")]
pub async fn reopen_offer(
    db: web::Data<DatabaseConnection>,
    session: Session,
    path: web::Path<i32>,
) -> Result<HttpResponse, AppError> {
    let offer =
        OfferService::set_status(&db, &session, path.into_inner(), OfferStatus::Open).await?;
    Ok(HttpResponse::Ok().json(offer))
}

#[delete("/{id}")]
pub async fn delete_offer(
    db: web::Data<DatabaseConnection>,
    session: Session,
    path: web::Path<i32>,
) -> Result<HttpResponse, AppError> {
    OfferService::delete(&db, &session, path.into_inner()).await?;
    Ok(HttpResponse::NoContent().finish())
}

/// POST /offers/{id}/apply - Candidature d'un étudiant
#[post("/{id}/apply")]
pub async fn apply_to_offer(
    db: web::Data<DatabaseConnection>,
    session: Session,
    path: web::Path<i32>,
    body: web::Json<ApplyRequest>,
) -> Result<HttpResponse, AppError> {
    let application =
        ApplicationService::apply(&db, &session, path.into_inner(), body.into_inner()).await?;
    Ok(HttpResponse::Created().json(application))
}

pub fn offers_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/offers")
            .service(list_open_offers)
            .service(list_my_offers)
            .service(create_offer)
            .service(get_offer)
            .service(update_offer)
            .service(archive_offer)
            .service(reopen_offer)
            .service(delete_offer)
            .service(apply_to_offer),
    );
}
