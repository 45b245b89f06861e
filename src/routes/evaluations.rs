use actix_web::{get, post, put, web, HttpResponse};
use sea_orm::DatabaseConnection;

use crate::error::AppError;
use crate::models::dto::{FinalGradeRequest, SubmitEvaluationRequest};
use crate::services::evaluation_service::EvaluationService;
use crate::services::session::Session;

/// GET /evaluations - Évaluations visibles + moyenne
#[get("")]
pub async fn list_evaluations(
    db: web::Data<DatabaseConnection>,
    session: Session,
) -> Result<HttpResponse, AppError> {
    let summary = EvaluationService::list(&db, &session).await?;
    Ok(HttpResponse::Ok().json(summary))
}

#[post("")]
pub async fn submit_evaluation(
    db: web::Data<DatabaseConnection>,
    session: Session,
    body: web::Json<SubmitEvaluationRequest>,
) -> Result<HttpResponse, AppError> {
    let evaluation = EvaluationService::submit(&db, &session, body.into_inner()).await?;
    Ok(HttpResponse::Created().json(evaluation))
}

/// PUT /evaluations/{id}/final-grade - Note finale (administration)
#[put("/{id}/final-grade")]
pub async fn record_final_grade(
    db: web::Data<DatabaseConnection>,
    session: Session,
    path: web::Path<i32>,
    body: web::Json<FinalGradeRequest>,
) -> Result<HttpResponse, AppError> {
    let evaluation =
        EvaluationService::record_final_grade(&db, &session, path.into_inner(), body.into_inner())
            .await?;
    Ok(HttpResponse::Ok().json(evaluation))
}

pub fn evaluations_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/evaluations")
            .service(list_evaluations)
            .service(submit_evaluation)
            .service(record_final_grade),
    );
}
