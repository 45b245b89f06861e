use chrono::Utc;
use sea_orm::*;
use validator::Validate;

use crate::error::AppError;
use crate::models::convention::{self, ConventionStatus};
use crate::models::dto::{self, GradeReportRequest, ReportFilter, ReportResponse, SubmitReportRequest};
use crate::models::users::Role;
use crate::models::{candidature, rapport};
use crate::services::convention_service::ConventionService;
use crate::services::session::Session;

pub struct ReportService;

/// Champs du dépôt nettoyés; refusé avant toute écriture si le lien ou le titre manque
fn check_submission(request: &SubmitReportRequest) -> Result<(String, String, Option<String>), AppError> {
    let file_url = request.file_url.trim();
    if file_url.is_empty() {
        return Err(AppError::Validation("Le lien du fichier est requis".to_string()));
    }
    let title = request.title.trim();
    if title.is_empty() {
        return Err(AppError::Validation("Le titre du rapport est requis".to_string()));
    }
    let description = request
        .description
        .as_deref()
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .map(str::to_string);

    Ok((title.to_string(), file_url.to_string(), description))
}

impl ReportService {
    /// Dépôt (ou remplacement tant qu'il n'est pas noté) du rapport d'un stage
    pub async fn submit_or_update(
        db: &DatabaseConnection,
        session: &Session,
        request: SubmitReportRequest,
    ) -> Result<ReportResponse, AppError> {
        session.require_role(Role::Student)?;
        let (title, file_url, description) = check_submission(&request)?;

        let parties = ConventionService::load_parties(db, request.stage_id).await?;
        if parties.application.etudiant_id != session.user_id() {
            return Err(AppError::Forbidden);
        }
        if parties.convention.statut == ConventionStatus::Cancelled {
            return Err(AppError::Conflict("Aucun stage actif".to_string()));
        }

        let existing = rapport::Entity::find()
            .filter(rapport::Column::ConventionId.eq(parties.convention.id))
            .one(db)
            .await?;

        let saved = match existing {
            Some(report) if report.is_graded() => {
                return Err(AppError::Conflict(
                    "Ce rapport a déjà été évalué et ne peut plus être modifié".to_string(),
                ));
            }
            Some(report) => {
                let mut active: rapport::ActiveModel = report.into();
                active.titre = Set(title);
                active.description = Set(description);
                active.fichier_url = Set(file_url);
                active.submitted_at = Set(Utc::now());
                active.update(db).await?
            }
            None => {
                rapport::ActiveModel {
                    convention_id: Set(parties.convention.id),
                    titre: Set(title),
                    description: Set(description),
                    fichier_url: Set(file_url),
                    submitted_at: Set(Utc::now()),
                    note: Set(None),
                    commentaire: Set(None),
                    graded_at: Set(None),
                    graded_by: Set(None),
                    ..Default::default()
                }
                .insert(db)
                .await?
            }
        };

        tracing::info!(report_id = saved.id, stage_id = saved.convention_id, "Report submitted");
        Ok(ReportResponse::from(saved))
    }

    /// Notation /20 par l'administration, une seule fois
    pub async fn grade(
        db: &DatabaseConnection,
        session: &Session,
        report_id: i32,
        request: GradeReportRequest,
    ) -> Result<ReportResponse, AppError> {
        session.require_role(Role::Administration)?;
        request.validate()?;
        let grade = dto::f64_to_decimal(request.grade)
            .ok_or_else(|| AppError::Validation("Note invalide".to_string()))?;

        let report = rapport::Entity::find_by_id(report_id)
            .one(db)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Rapport {} introuvable", report_id)))?;
        if report.is_graded() {
            return Err(AppError::Conflict("Ce rapport a déjà été évalué".to_string()));
        }

        let mut active: rapport::ActiveModel = report.into();
        active.note = Set(Some(grade));
        active.commentaire = Set(request
            .feedback
            .map(|f| f.trim().to_string())
            .filter(|f| !f.is_empty()));
        active.graded_at = Set(Some(Utc::now()));
        active.graded_by = Set(Some(session.user_id()));
        let graded = active.update(db).await?;

        tracing::info!(report_id, grade = %grade, "Report graded");
        Ok(ReportResponse::from(graded))
    }

    /// Tous les rapports pour l'administration, les siens pour l'étudiant
    pub async fn list(
        db: &DatabaseConnection,
        session: &Session,
        filter: ReportFilter,
    ) -> Result<Vec<ReportResponse>, AppError> {
        let reports = Self::visible(db, session).await?;
        Ok(reports
            .into_iter()
            .filter(|r| filter.matches(r))
            .map(ReportResponse::from)
            .collect())
    }

    pub async fn visible(
        db: &DatabaseConnection,
        session: &Session,
    ) -> Result<Vec<rapport::Model>, AppError> {
        session.require_any_role(&[Role::Administration, Role::Student])?;

        let mut query = rapport::Entity::find();
        if session.role() == Role::Student {
            query = query
                .inner_join(convention::Entity)
                .join(JoinType::InnerJoin, convention::Relation::Candidature.def())
                .filter(candidature::Column::EtudiantId.eq(session.user_id()));
        }

        Ok(query
            .order_by_desc(rapport::Column::SubmittedAt)
            .all(db)
            .await?)
    }
}
