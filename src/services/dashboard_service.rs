// ============================================================================
// TABLEAUX DE BORD
// ============================================================================
//
// Une seule charge utile par rôle, construite à partir des services métier:
//   - etudiant       : candidatures, conventions, rapports, évaluations reçues
//   - entreprise     : offres, candidatures reçues, conventions, évaluations
//   - administration : statistiques globales (Statistics::compute, pur)
//
// ============================================================================

use rust_decimal::Decimal;
use sea_orm::*;
use serde::Serialize;

use crate::error::AppError;
use crate::models::convention::{self, ConventionStatus};
use crate::models::dto::{
    self, ApplicationResponse, ConventionResponse, EvaluationResponse, EvaluationSummary,
    OfferResponse, ReportFilter, ReportResponse,
};
use crate::models::offre::{self, OfferStatus};
use crate::models::users::Role;
use crate::models::{evaluation, rapport};
use crate::services::application_service::ApplicationService;
use crate::services::convention_service::ConventionService;
use crate::services::evaluation_service::{self, EvaluationService};
use crate::services::offer_service::OfferService;
use crate::services::report_service::ReportService;
use crate::services::session::Session;

pub struct DashboardService;

#[derive(Debug, Serialize)]
#[serde(tag = "role")]
pub enum Dashboard {
    #[serde(rename = "etudiant")]
    Student {
        applications: Vec<ApplicationResponse>,
        conventions: Vec<ConventionResponse>,
        reports: Vec<ReportResponse>,
        evaluations: EvaluationSummary,
        open_offers: u64,
    },
    #[serde(rename = "entreprise")]
    Company {
        offers: Vec<OfferResponse>,
        applications: Vec<ApplicationResponse>,
        conventions: Vec<ConventionResponse>,
        evaluations: EvaluationSummary,
    },
    #[serde(rename = "administration")]
    Administration {
        statistics: Statistics,
        conventions: Vec<ConventionResponse>,
        reports: Vec<ReportResponse>,
    },
}

#[derive(Debug, Default, PartialEq, Serialize)]
pub struct ConventionStats {
    pub total: usize,
    pub pending: usize,
    pub in_progress: usize,
    pub validated: usize,
    pub cancelled: usize,
    pub validation_rate: u32, // %
}

#[derive(Debug, Default, PartialEq, Serialize)]
pub struct ReportStats {
    pub submitted: usize,
    pub graded: usize,
    pub pending: usize,
    pub average_grade: Option<f64>, // /20
}

#[derive(Debug, Default, Serialize)]
pub struct EvaluationStats {
    pub count: usize,
    pub average_rating: Option<f64>, // /5
    pub top: Vec<EvaluationResponse>,
}

#[derive(Debug, Default, Serialize)]
pub struct Statistics {
    pub conventions: ConventionStats,
    pub reports: ReportStats,
    pub evaluations: EvaluationStats,
}

fn percent(part: usize, total: usize) -> u32 {
    if total == 0 {
        return 0;
    }
    ((part as f64 / total as f64) * 100.0).round() as u32
}

impl Statistics {
    pub fn compute(
        conventions: &[convention::Model],
        reports: &[rapport::Model],
        evaluations: &[evaluation::Model],
    ) -> Self {
        let count = |status: ConventionStatus| conventions.iter().filter(|c| c.statut == status).count();
        let validated = count(ConventionStatus::Validated);

        let grades: Vec<Decimal> = reports.iter().filter_map(|r| r.note).collect();
        let average_grade = if grades.is_empty() {
            None
        } else {
            let total: Decimal = grades.iter().sum();
            Some(dto::decimal_to_f64(
                (total / Decimal::from(grades.len() as u64)).round_dp(2),
            ))
        };

        let mut ranked: Vec<&evaluation::Model> = evaluations.iter().collect();
        ranked.sort_by(|a, b| b.note_entreprise.cmp(&a.note_entreprise));

        Statistics {
            conventions: ConventionStats {
                total: conventions.len(),
                pending: count(ConventionStatus::Pending),
                in_progress: count(ConventionStatus::InProgress),
                validated,
                cancelled: count(ConventionStatus::Cancelled),
                validation_rate: percent(validated, conventions.len()),
            },
            reports: ReportStats {
                submitted: reports.len(),
                graded: grades.len(),
                pending: reports.len() - grades.len(),
                average_grade,
            },
            evaluations: EvaluationStats {
                count: evaluations.len(),
                average_rating: evaluation_service::average_rating(evaluations),
                top: ranked
                    .into_iter()
                    .take(3)
                    .cloned()
                    .map(EvaluationResponse::from)
                    .collect(),
            },
        }
    }
}

impl DashboardService {
    pub async fn for_session(
        db: &DatabaseConnection,
        session: &Session,
    ) -> Result<Dashboard, AppError> {
        match session.role() {
            Role::Student => Self::student(db, session).await,
            Role::Company => Self::company(db, session).await,
            Role::Administration => Self::administration(db, session).await,
        }
    }

    async fn student(db: &DatabaseConnection, session: &Session) -> Result<Dashboard, AppError> {
        let applications = ApplicationService::list_mine(db, session).await?;
        let conventions = ConventionService::list(db, session, None).await?;
        let reports = ReportService::list(db, session, ReportFilter::All).await?;
        let evaluations = EvaluationService::list(db, session).await?;
        let open_offers = offre::Entity::find()
            .filter(offre::Column::Statut.eq(OfferStatus::Open))
            .count(db)
            .await?;

        Ok(Dashboard::Student {
            applications,
            conventions,
            reports,
            evaluations,
            open_offers,
        })
    }

    async fn company(db: &DatabaseConnection, session: &Session) -> Result<Dashboard, AppError> {
        Ok(Dashboard::Company {
            offers: OfferService::list_own(db, session).await?,
            applications: ApplicationService::list_received(db, session, None).await?,
            conventions: ConventionService::list(db, session, None).await?,
            evaluations: EvaluationService::list(db, session).await?,
        })
    }

    async fn administration(
        db: &DatabaseConnection,
        session: &Session,
    ) -> Result<Dashboard, AppError> {
        let conventions = ConventionService::visible(db, session, None).await?;
        let reports = ReportService::visible(db, session).await?;
        let evaluations = EvaluationService::visible(db, session).await?;

        let statistics = Statistics::compute(&conventions, &reports, &evaluations);
        tracing::debug!(
            conventions = statistics.conventions.total,
            reports = statistics.reports.submitted,
            "Statistics computed"
        );

        Ok(Dashboard::Administration {
            statistics,
            conventions: conventions.into_iter().map(ConventionResponse::from).collect(),
            reports: reports.into_iter().map(ReportResponse::from).collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::services::convention_service::tests::convention_row;
    use crate::services::session::tests::admin_demo;

    fn report(id: i32, note: Option<Decimal>) -> rapport::Model {
        rapport::Model {
            id,
            convention_id: id,
            titre: "Rapport".into(),
            description: None,
            fichier_url: "https://drive.example.com/r.pdf".into(),
            submitted_at: Utc::now(),
            note,
            commentaire: None,
            graded_at: None,
            graded_by: None,
        }
    }

    fn evaluation(id: i32, rating: i64) -> evaluation::Model {
        evaluation::Model {
            id,
            convention_id: id,
            evaluateur_id: 900_002,
            note_entreprise: Decimal::new(rating, 0),
            commentaire: "RAS".into(),
            points_forts: None,
            axes_amelioration: None,
            note_finale: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_statistics_on_empty_data() {
        let stats = Statistics::compute(&[], &[], &[]);
        assert_eq!(stats.conventions, ConventionStats::default());
        assert_eq!(stats.reports.average_grade, None);
        assert_eq!(stats.evaluations.average_rating, None);
        assert!(stats.evaluations.top.is_empty());
    }

    #[test]
    fn test_statistics_counts_and_rates() {
        let conventions = vec![
            convention_row(1, ConventionStatus::Validated),
            convention_row(2, ConventionStatus::Pending),
            convention_row(3, ConventionStatus::InProgress),
        ];
        let reports = vec![
            report(1, Some(Decimal::new(14, 0))),
            report(2, Some(Decimal::new(17, 0))),
            report(3, None),
        ];
        let evaluations = vec![evaluation(1, 3), evaluation(2, 5), evaluation(3, 2), evaluation(4, 4)];

        let stats = Statistics::compute(&conventions, &reports, &evaluations);

        assert_eq!(stats.conventions.total, 3);
        assert_eq!(stats.conventions.validated, 1);
        assert_eq!(stats.conventions.validation_rate, 33);
        assert_eq!(stats.reports.graded, 2);
        assert_eq!(stats.reports.pending, 1);
        assert_eq!(stats.reports.average_grade, Some(15.5));
        assert_eq!(stats.evaluations.average_rating, Some(3.5));
        let top: Vec<i32> = stats.evaluations.top.iter().map(|e| e.id).collect();
        assert_eq!(top, vec![2, 4, 1]);
    }

    #[tokio::test]
    async fn test_admin_dashboard_has_statistics() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![convention_row(1, ConventionStatus::Validated)]])
            .append_query_results([vec![report(1, Some(Decimal::new(12, 0)))]])
            .append_query_results([vec![evaluation(1, 4)]])
            .into_connection();

        let dashboard = DashboardService::for_session(&db, &admin_demo()).await.unwrap();

        match dashboard {
            Dashboard::Administration { statistics, .. } => {
                assert_eq!(statistics.conventions.validation_rate, 100);
                assert_eq!(statistics.reports.average_grade, Some(12.0));
            }
            other => panic!("unexpected dashboard: {:?}", other),
        }
    }
}
