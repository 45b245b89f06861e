use actix_web::{get, post, web, HttpResponse};
use sea_orm::DatabaseConnection;

use crate::error::AppError;
use crate::models::dto::{GradeReportRequest, ReportsQuery, SubmitReportRequest};
use crate::services::report_service::ReportService;
use crate::services::session::Session;

/// GET /reports?filter=all|pending|graded
#[get("")]
pub async fn list_reports(
    db: web::Data<DatabaseConnection>,
    session: Session,
    query: web::Query<ReportsQuery>,
) -> Result<HttpResponse, AppError> {
    let reports = ReportService::list(&db, &session, query.filter).await?;
    Ok(HttpResponse::Ok().json(reports))
}

/// POST /reports - Dépôt ou remplacement du rapport d'un stage
#[post("")]
pub async fn submit_report(
    db: web::Data<DatabaseConnection>,
    session: Session,
    body: web::Json<SubmitReportRequest>,
) -> Result<HttpResponse, AppError> {
    let report = ReportService::submit_or_update(&db, &session, body.into_inner()).await?;
    Ok(HttpResponse::Ok().json(report))
}

/// POST /reports/{id}/grade - Note /20 (administration)
#[post("/{id}/grade")]
pub async fn grade_report(
    db: web::Data<DatabaseConnection>,
    session: Session,
    path: web::Path<i32>,
    body: web::Json<GradeReportRequest>,
) -> Result<HttpResponse, AppError> {
    let report = ReportService::grade(&db, &session, path.into_inner(), body.into_inner()).await?;
    Ok(HttpResponse::Ok().json(report))
}

pub fn reports_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/reports")
            .service(list_reports)
            .service(submit_report)
            .service(grade_report),
    );
}
