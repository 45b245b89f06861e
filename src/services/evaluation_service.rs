use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::*;
use validator::Validate;

use crate::error::AppError;
use crate::models::dto::{
    self, EvaluationResponse, EvaluationSummary, FinalGradeRequest, SubmitEvaluationRequest,
};
use crate::models::users::Role;
use crate::models::{candidature, convention, evaluation};
use crate::services::convention_service::ConventionService;
use crate::services::session::Session;

pub const DUPLICATE_EVALUATION: &str = "Vous avez déjà évalué ce stage";

pub struct EvaluationService;

fn received_by_query(student_id: i32) -> Select<evaluation::Entity> {
    evaluation::Entity::find()
        .inner_join(convention::Entity)
        .join(JoinType::InnerJoin, convention::Relation::Candidature.def())
        .filter(candidature::Column::EtudiantId.eq(student_id))
}

fn summarize(evaluations: Vec<evaluation::Model>) -> EvaluationSummary {
    EvaluationSummary {
        count: evaluations.len(),
        average_rating: average_rating(&evaluations),
        evaluations: evaluations.into_iter().map(EvaluationResponse::from).collect(),
    }
}

/// Note finale par défaut: note entreprise (/5) ramenée sur 20
pub fn default_final_grade(rating: Decimal) -> Decimal {
    (rating * Decimal::from(4)).round_dp(2).min(Decimal::from(20))
}

/// Moyenne des notes entreprise, None sans évaluation
pub fn average_rating(evaluations: &[evaluation::Model]) -> Option<f64> {
    if evaluations.is_empty() {
        return None;
    }
    let total: Decimal = evaluations.iter().map(|e| e.note_entreprise).sum();
    let average = total / Decimal::from(evaluations.len() as u64);
    Some(dto::decimal_to_f64(average.round_dp(2)))
}

impl EvaluationService {
    /// Évaluation d'un stagiaire par l'entreprise qui l'accueille
    pub async fn submit(
        db: &DatabaseConnection,
        session: &Session,
        request: SubmitEvaluationRequest,
    ) -> Result<EvaluationResponse, AppError> {
        session.require_role(Role::Company)?;
        request.validate()?;

        let comment = request.comment.trim().to_string();
        if comment.is_empty() {
            return Err(AppError::Validation("Le commentaire est requis".to_string()));
        }
        let rating = dto::f64_to_decimal(request.rating)
            .ok_or_else(|| AppError::Validation("Note invalide".to_string()))?;

        let parties = ConventionService::load_parties(db, request.stage_id).await?;
        if parties.offer.entreprise_id != session.user_id() {
            return Err(AppError::Forbidden);
        }

        let existing = evaluation::Entity::find()
            .filter(evaluation::Column::ConventionId.eq(parties.convention.id))
            .filter(evaluation::Column::EvaluateurId.eq(session.user_id()))
            .one(db)
            .await?;
        if existing.is_some() {
            return Err(AppError::Conflict(DUPLICATE_EVALUATION.to_string()));
        }

        let optional = |value: Option<String>| {
            value
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let created = evaluation::ActiveModel {
            convention_id: Set(parties.convention.id),
            evaluateur_id: Set(session.user_id()),
            note_entreprise: Set(rating),
            commentaire: Set(comment),
            points_forts: Set(optional(request.strengths)),
            axes_amelioration: Set(optional(request.improvements)),
            note_finale: Set(None),
            created_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(db)
        .await
        .map_err(|e| match AppError::from(e) {
            AppError::Conflict(_) => AppError::Conflict(DUPLICATE_EVALUATION.to_string()),
            other => other,
        })?;

        tracing::info!(
            evaluation_id = created.id,
            stage_id = created.convention_id,
            "Evaluation submitted"
        );
        Ok(EvaluationResponse::from(created))
    }

    /// Note finale /20 saisie par l'administration
    pub async fn record_final_grade(
        db: &DatabaseConnection,
        session: &Session,
        evaluation_id: i32,
        request: FinalGradeRequest,
    ) -> Result<EvaluationResponse, AppError> {
        session.require_role(Role::Administration)?;
        request.validate()?;

        let evaluation = evaluation::Entity::find_by_id(evaluation_id)
            .one(db)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!("Évaluation {} introuvable", evaluation_id))
            })?;

        let grade = match request.grade {
            Some(grade) => dto::f64_to_decimal(grade)
                .ok_or_else(|| AppError::Validation("Note invalide".to_string()))?,
            None => default_final_grade(evaluation.note_entreprise),
        };

        let mut active: evaluation::ActiveModel = evaluation.into();
        active.note_finale = Set(Some(grade));
        let updated = active.update(db).await?;

        tracing::info!(evaluation_id, grade = %grade, "Final grade recorded");
        Ok(EvaluationResponse::from(updated))
    }

    pub async fn list(
        db: &DatabaseConnection,
        session: &Session,
    ) -> Result<EvaluationSummary, AppError> {
        let evaluations = Self::visible(db, session).await?;
        Ok(summarize(evaluations))
    }

    /// Évaluations reçues par un étudiant sur l'ensemble de ses stages
    pub async fn received_by(
        db: &DatabaseConnection,
        student_id: i32,
    ) -> Result<EvaluationSummary, AppError> {
        let evaluations = received_by_query(student_id)
            .order_by_desc(evaluation::Column::CreatedAt)
            .all(db)
            .await?;
        Ok(summarize(evaluations))
    }

    /// Étudiant: évaluations de ses stages, entreprise: celles qu'elle a rédigées
    pub async fn visible(
        db: &DatabaseConnection,
        session: &Session,
    ) -> Result<Vec<evaluation::Model>, AppError> {
        let mut query = evaluation::Entity::find();

        match session.role() {
            Role::Administration => {}
            Role::Company => {
                query = query.filter(evaluation::Column::EvaluateurId.eq(session.user_id()));
            }
            Role::Student => query = received_by_query(session.user_id()),
        }

        Ok(query
            .order_by_desc(evaluation::Column::CreatedAt)
            .all(db)
            .await?)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::models::candidature::ApplicationStatus;
    use crate::models::convention::ConventionStatus;
    use crate::services::application_service::tests::{application_row, offer_row};
    use crate::services::convention_service::tests::convention_row;
    use crate::services::session::tests::{admin_demo, company_demo, student_demo};

    pub fn evaluation_row(id: i32, rating: Decimal) -> evaluation::Model {
        evaluation::Model {
            id,
            convention_id: 10,
            evaluateur_id: 900_002,
            note_entreprise: rating,
            commentaire: "Très impliqué".into(),
            points_forts: None,
            axes_amelioration: None,
            note_finale: None,
            created_at: Utc::now(),
        }
    }

    fn submission(comment: &str) -> SubmitEvaluationRequest {
        SubmitEvaluationRequest {
            stage_id: 10,
            rating: 4.0,
            comment: comment.into(),
            strengths: Some("Autonome".into()),
            improvements: None,
        }
    }

    #[test]
    fn test_default_final_grade() {
        assert_eq!(default_final_grade(Decimal::new(4, 0)), Decimal::new(16, 0));
        assert_eq!(default_final_grade(Decimal::new(35, 1)), Decimal::new(14, 0));
        assert_eq!(default_final_grade(Decimal::new(5, 0)), Decimal::new(20, 0));
    }

    #[test]
    fn test_average_rating() {
        assert_eq!(average_rating(&[]), None);
        let evaluations = vec![
            evaluation_row(1, Decimal::new(4, 0)),
            evaluation_row(2, Decimal::new(3, 0)),
        ];
        assert_eq!(average_rating(&evaluations), Some(3.5));
    }

    #[tokio::test]
    async fn test_blank_comment_is_rejected() {
        let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();

        let result = EvaluationService::submit(&db, &company_demo(), submission("   ")).await;

        assert!(matches!(result, Err(AppError::Validation(_))));
        assert!(db.into_transaction_log().is_empty());
    }

    #[tokio::test]
    async fn test_student_cannot_evaluate() {
        let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();
        let result = EvaluationService::submit(&db, &student_demo(), submission("Bien")).await;
        assert!(matches!(result, Err(AppError::Forbidden)));
    }

    #[tokio::test]
    async fn test_second_evaluation_is_refused() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![convention_row(10, ConventionStatus::InProgress)]])
            .append_query_results([vec![application_row(1, ApplicationStatus::Accepted)]])
            .append_query_results([vec![offer_row(900_002, 1)]])
            .append_query_results([vec![evaluation_row(1, Decimal::new(4, 0))]])
            .into_connection();

        let result = EvaluationService::submit(&db, &company_demo(), submission("Bien")).await;

        match result {
            Err(AppError::Conflict(msg)) => assert_eq!(msg, DUPLICATE_EVALUATION),
            other => panic!("unexpected result: {:?}", other.map(|r| r.id)),
        }
    }

    #[tokio::test]
    async fn test_final_grade_defaults_to_rating_times_four() {
        let graded = evaluation::Model {
            note_finale: Some(Decimal::new(16, 0)),
            ..evaluation_row(1, Decimal::new(4, 0))
        };
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![evaluation_row(1, Decimal::new(4, 0))]])
            .append_query_results([vec![graded]])
            .into_connection();

        let response = EvaluationService::record_final_grade(
            &db,
            &admin_demo(),
            1,
            FinalGradeRequest { grade: None },
        )
        .await
        .unwrap();

        assert_eq!(response.final_grade, Some(16.0));
    }

    #[tokio::test]
    async fn test_summary_reports_average() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![
                evaluation_row(1, Decimal::new(5, 0)),
                evaluation_row(2, Decimal::new(4, 0)),
            ]])
            .into_connection();

        let summary = EvaluationService::list(&db, &student_demo()).await.unwrap();

        assert_eq!(summary.count, 2);
        assert_eq!(summary.average_rating, Some(4.5));
    }
}
