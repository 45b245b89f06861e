use chrono::Utc;
use sea_orm::*;
use validator::Validate;

use crate::error::AppError;
use crate::models::candidature::{self, ApplicationStatus};
use crate::models::convention::{self, ConventionStatus};
use crate::models::dto::{ConventionResponse, CreateConventionRequest};
use crate::models::offre;
use crate::models::users::Role;
use crate::services::convention_workflow::{
    self, ConventionEvent, ConventionState, Outcome, Party,
};
use crate::services::session::Session;

pub const CONVENTION_EXISTS: &str = "Une convention existe déjà pour cette candidature";

pub struct ConventionService;

/// Convention avec la candidature et l'offre dont elle découle
pub struct ConventionParties {
    pub convention: convention::Model,
    pub application: candidature::Model,
    pub offer: offre::Model,
}

impl ConventionParties {
    /// Partie représentée par la session, None si la session n'a aucun droit sur la convention
    pub fn party_of(&self, session: &Session) -> Option<Party> {
        match session.role() {
            Role::Student if self.application.etudiant_id == session.user_id() => {
                Some(Party::Student)
            }
            Role::Company if self.offer.entreprise_id == session.user_id() => Some(Party::Company),
            Role::Administration => Some(Party::School),
            _ => None,
        }
    }
}

fn required(value: &str, message: &str) -> Result<String, AppError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(AppError::Validation(message.to_string()));
    }
    Ok(value.to_string())
}

/// Une seule insertion portant tous les champs
fn new_convention_model(request: CreateConventionRequest) -> Result<convention::ActiveModel, AppError> {
    request.validate()?;
    if request.end_date < request.start_date {
        return Err(AppError::Validation(
            "La date de fin doit être postérieure à la date de début".to_string(),
        ));
    }

    let state = ConventionState::new();
    Ok(convention::ActiveModel {
        candidature_id: Set(request.application_id),
        date_debut: Set(request.start_date),
        date_fin: Set(request.end_date),
        lieu: Set(required(&request.location, "Le lieu est requis")?),
        tuteur: Set(required(&request.supervisor, "Le tuteur est requis")?),
        contact_tuteur: Set(request.supervisor_contact.trim().to_string()),
        description_poste: Set(request.job_description.trim().to_string()),
        objectifs: Set(request.objectives.trim().to_string()),
        statut: Set(state.status),
        signature_etudiant: Set(state.student_signed),
        signature_entreprise: Set(state.company_signed),
        signature_ecole: Set(state.school_signed),
        motif_annulation: Set(None),
        created_at: Set(Utc::now()),
        validated_at: Set(None),
        cancelled_at: Set(None),
        ..Default::default()
    })
}

impl ConventionService {
    /// Création par l'administration à partir d'une candidature acceptée
    pub async fn create(
        db: &DatabaseConnection,
        session: &Session,
        request: CreateConventionRequest,
    ) -> Result<ConventionResponse, AppError> {
        session.require_role(Role::Administration)?;

        let application_id = request.application_id;
        let model = new_convention_model(request)?;

        let application = candidature::Entity::find_by_id(application_id)
            .one(db)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!("Candidature {} introuvable", application_id))
            })?;
        if application.statut != ApplicationStatus::Accepted {
            return Err(AppError::Conflict(
                "Seule une candidature acceptée peut donner lieu à une convention".to_string(),
            ));
        }

        let existing = convention::Entity::find()
            .filter(convention::Column::CandidatureId.eq(application_id))
            .one(db)
            .await?;
        if existing.is_some() {
            return Err(AppError::Conflict(CONVENTION_EXISTS.to_string()));
        }

        let created = model.insert(db).await.map_err(|e| match AppError::from(e) {
            AppError::Conflict(_) => AppError::Conflict(CONVENTION_EXISTS.to_string()),
            other => other,
        })?;

        tracing::info!(convention_id = created.id, application_id, "Convention created");
        Ok(ConventionResponse::from(created))
    }

    /// Conventions visibles par la session (toutes pour l'administration)
    pub async fn visible(
        db: &DatabaseConnection,
        session: &Session,
        status: Option<ConventionStatus>,
    ) -> Result<Vec<convention::Model>, AppError> {
        let mut query = convention::Entity::find();

        match session.role() {
            Role::Administration => {}
            Role::Student => {
                query = query
                    .inner_join(candidature::Entity)
                    .filter(candidature::Column::EtudiantId.eq(session.user_id()));
            }
            Role::Company => {
                query = query
                    .inner_join(candidature::Entity)
                    .join(JoinType::InnerJoin, candidature::Relation::Offre.def())
                    .filter(offre::Column::EntrepriseId.eq(session.user_id()));
            }
        }

        if let Some(status) = status {
            query = query.filter(convention::Column::Statut.eq(status));
        }

        Ok(query
            .order_by_desc(convention::Column::CreatedAt)
            .order_by_desc(convention::Column::Id)
            .all(db)
            .await?)
    }

    pub async fn list(
        db: &DatabaseConnection,
        session: &Session,
        status: Option<ConventionStatus>,
    ) -> Result<Vec<ConventionResponse>, AppError> {
        let conventions = Self::visible(db, session, status).await?;
        Ok(conventions.into_iter().map(ConventionResponse::from).collect())
    }

    pub async fn get(
        db: &DatabaseConnection,
        session: &Session,
        convention_id: i32,
    ) -> Result<ConventionResponse, AppError> {
        let parties = Self::load_parties(db, convention_id).await?;
        if parties.party_of(session).is_none() {
            return Err(AppError::Forbidden);
        }
        Ok(ConventionResponse::from(parties.convention))
    }

    /// Signature par la partie que représente la session
    pub async fn sign(
        db: &DatabaseConnection,
        session: &Session,
        convention_id: i32,
    ) -> Result<ConventionResponse, AppError> {
        let parties = Self::load_parties(db, convention_id).await?;
        let party = parties.party_of(session).ok_or(AppError::Forbidden)?;

        let updated = Self::apply(db, parties.convention, ConventionEvent::Sign(party)).await?;
        tracing::info!(convention_id, party = ?party, "Convention signed");
        Ok(updated)
    }

    pub async fn begin_review(
        db: &DatabaseConnection,
        session: &Session,
        convention_id: i32,
    ) -> Result<ConventionResponse, AppError> {
        session.require_role(Role::Administration)?;
        let convention = Self::load(db, convention_id).await?;
        Self::apply(db, convention, ConventionEvent::BeginReview).await
    }

    pub async fn validate(
        db: &DatabaseConnection,
        session: &Session,
        convention_id: i32,
    ) -> Result<ConventionResponse, AppError> {
        session.require_role(Role::Administration)?;
        let convention = Self::load(db, convention_id).await?;
        let updated = Self::apply(db, convention, ConventionEvent::Validate).await?;
        tracing::info!(convention_id, "Convention validated");
        Ok(updated)
    }

    /// Annulation (administration ou entreprise propriétaire), motif obligatoire
    pub async fn cancel(
        db: &DatabaseConnection,
        session: &Session,
        convention_id: i32,
        reason: &str,
    ) -> Result<ConventionResponse, AppError> {
        // Motif vérifié avant tout accès à la base
        let reason = convention_workflow::check_reason(reason)?;
        session.require_any_role(&[Role::Administration, Role::Company])?;

        let parties = Self::load_parties(db, convention_id).await?;
        if parties.party_of(session).is_none() {
            return Err(AppError::Forbidden);
        }

        let updated =
            Self::apply(db, parties.convention, ConventionEvent::Cancel { reason }).await?;
        tracing::info!(convention_id, "Convention cancelled");
        Ok(updated)
    }

    async fn load(db: &DatabaseConnection, convention_id: i32) -> Result<convention::Model, AppError> {
        convention::Entity::find_by_id(convention_id)
            .one(db)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Convention {} introuvable", convention_id)))
    }

    pub async fn load_parties(
        db: &DatabaseConnection,
        convention_id: i32,
    ) -> Result<ConventionParties, AppError> {
        let convention = Self::load(db, convention_id).await?;

        let application = candidature::Entity::find_by_id(convention.candidature_id)
            .one(db)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!("Candidature {} introuvable", convention.candidature_id))
            })?;

        let offer = offre::Entity::find_by_id(application.offre_id)
            .one(db)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Offre {} introuvable", application.offre_id)))?;

        Ok(ConventionParties {
            convention,
            application,
            offer,
        })
    }

    /// Passe l'événement dans la machine à états et persiste le résultat
    async fn apply(
        db: &DatabaseConnection,
        convention: convention::Model,
        event: ConventionEvent,
    ) -> Result<ConventionResponse, AppError> {
        let current = ConventionState::from(&convention);
        let next = match convention_workflow::transition(&current, event)? {
            Outcome::Unchanged => return Ok(ConventionResponse::from(convention)),
            Outcome::Changed(next) => next,
        };

        let now = Utc::now();
        let mut active: convention::ActiveModel = convention.into();
        active.statut = Set(next.status);
        active.signature_etudiant = Set(next.student_signed);
        active.signature_entreprise = Set(next.company_signed);
        active.signature_ecole = Set(next.school_signed);
        active.motif_annulation = Set(next.cancellation_reason.clone());
        if next.status != current.status {
            match next.status {
                ConventionStatus::Validated => active.validated_at = Set(Some(now)),
                ConventionStatus::Cancelled => active.cancelled_at = Set(Some(now)),
                _ => {}
            }
        }

        let updated = active.update(db).await?;
        if next.fully_signed() && !current.fully_signed() {
            tracing::info!(convention_id = updated.id, "Convention signée par les trois parties");
        }
        Ok(ConventionResponse::from(updated))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::services::application_service::tests::{application_row, offer_row};
    use crate::services::session::tests::{admin_demo, company_demo, student_demo};

    pub fn convention_row(id: i32, statut: ConventionStatus) -> convention::Model {
        convention::Model {
            id,
            candidature_id: 1,
            date_debut: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            date_fin: NaiveDate::from_ymd_opt(2024, 8, 30).unwrap(),
            lieu: "Paris".into(),
            tuteur: "M. Martin".into(),
            contact_tuteur: "martin@techcorp.fr".into(),
            description_poste: "Développement".into(),
            objectifs: "Livrer une API".into(),
            statut,
            signature_etudiant: false,
            signature_entreprise: false,
            signature_ecole: false,
            motif_annulation: None,
            created_at: Utc::now(),
            validated_at: None,
            cancelled_at: None,
        }
    }

    fn create_request() -> CreateConventionRequest {
        CreateConventionRequest {
            application_id: 1,
            start_date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2024, 8, 30).unwrap(),
            location: "Paris".into(),
            supervisor: "M. Martin".into(),
            supervisor_contact: "martin@techcorp.fr".into(),
            job_description: "Développement".into(),
            objectives: "Livrer une API".into(),
        }
    }

    #[test]
    fn test_new_convention_carries_every_field() {
        let model = new_convention_model(create_request()).unwrap();
        assert_eq!(model.statut, Set(ConventionStatus::Pending));
        assert_eq!(model.signature_etudiant, Set(false));
        assert_eq!(model.signature_entreprise, Set(false));
        assert_eq!(model.signature_ecole, Set(false));
        assert_eq!(model.tuteur, Set("M. Martin".to_string()));
        assert_eq!(model.objectifs, Set("Livrer une API".to_string()));
    }

    #[test]
    fn test_end_before_start_is_rejected() {
        let mut request = create_request();
        request.end_date = NaiveDate::from_ymd_opt(2024, 2, 1).unwrap();
        assert!(matches!(
            new_convention_model(request),
            Err(AppError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_accepted_application_gives_pending_convention() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![application_row(1, ApplicationStatus::Accepted)]])
            .append_query_results([Vec::<convention::Model>::new()])
            .append_query_results([vec![convention_row(10, ConventionStatus::Pending)]])
            .into_connection();

        let response = ConventionService::create(&db, &admin_demo(), create_request())
            .await
            .unwrap();

        assert_eq!(response.status, ConventionStatus::Pending);
        assert_eq!(response.signatures.count, 0);
        assert_eq!(response.application_id, 1);
    }

    #[tokio::test]
    async fn test_company_accepts_then_admin_creates_convention() {
        use crate::services::application_service::ApplicationService;
        use std::collections::BTreeMap;

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![application_row(1, ApplicationStatus::Pending)]])
            .append_query_results([vec![offer_row(900_002, 1)]])
            .append_query_results([vec![BTreeMap::from([(
                "num_items",
                sea_orm::Value::BigInt(Some(0)),
            )])]])
            .append_query_results([vec![application_row(1, ApplicationStatus::Accepted)]])
            .append_query_results([vec![application_row(1, ApplicationStatus::Accepted)]])
            .append_query_results([Vec::<convention::Model>::new()])
            .append_query_results([vec![convention_row(10, ConventionStatus::Pending)]])
            .into_connection();

        let accepted =
            ApplicationService::update_status(&db, &company_demo(), 1, ApplicationStatus::Accepted)
                .await
                .unwrap();
        assert_eq!(accepted.status, ApplicationStatus::Accepted);

        let convention = ConventionService::create(&db, &admin_demo(), create_request())
            .await
            .unwrap();
        assert_eq!(convention.application_id, accepted.id);
        assert_eq!(convention.status, ConventionStatus::Pending);
        assert!(!convention.signatures.student);
        assert!(!convention.signatures.company);
        assert!(!convention.signatures.school);
    }

    #[tokio::test]
    async fn test_pending_application_cannot_get_convention() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![application_row(1, ApplicationStatus::Pending)]])
            .into_connection();

        let result = ConventionService::create(&db, &admin_demo(), create_request()).await;
        assert!(matches!(result, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_cancel_with_blank_reason_touches_nothing() {
        let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();

        let result = ConventionService::cancel(&db, &admin_demo(), 10, "   ").await;

        assert!(matches!(result, Err(AppError::Validation(_))));
        assert!(db.into_transaction_log().is_empty());
    }

    #[tokio::test]
    async fn test_student_signs_own_convention() {
        let mut signed = convention_row(10, ConventionStatus::Pending);
        signed.signature_etudiant = true;

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![convention_row(10, ConventionStatus::Pending)]])
            .append_query_results([vec![application_row(1, ApplicationStatus::Accepted)]])
            .append_query_results([vec![offer_row(900_002, 1)]])
            .append_query_results([vec![signed]])
            .into_connection();

        let response = ConventionService::sign(&db, &student_demo(), 10).await.unwrap();

        assert!(response.signatures.student);
        assert_eq!(response.signatures.count, 1);
        assert_eq!(response.status, ConventionStatus::Pending);
    }

    #[tokio::test]
    async fn test_resigning_writes_nothing() {
        let mut signed = convention_row(10, ConventionStatus::InProgress);
        signed.signature_entreprise = true;

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![signed]])
            .append_query_results([vec![application_row(1, ApplicationStatus::Accepted)]])
            .append_query_results([vec![offer_row(900_002, 1)]])
            .into_connection();

        let response = ConventionService::sign(&db, &company_demo(), 10).await.unwrap();
        assert!(response.signatures.company);
    }

    #[tokio::test]
    async fn test_outsider_cannot_sign() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![convention_row(10, ConventionStatus::Pending)]])
            .append_query_results([vec![application_row(1, ApplicationStatus::Accepted)]])
            .append_query_results([vec![offer_row(42, 1)]])
            .into_connection();

        let result = ConventionService::sign(&db, &company_demo(), 10).await;
        assert!(matches!(result, Err(AppError::Forbidden)));
    }

    #[tokio::test]
    async fn test_cancel_persists_reason() {
        let cancelled = convention::Model {
            statut: ConventionStatus::Cancelled,
            motif_annulation: Some("Entreprise fermée".into()),
            cancelled_at: Some(Utc::now()),
            ..convention_row(10, ConventionStatus::Pending)
        };
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![convention_row(10, ConventionStatus::Pending)]])
            .append_query_results([vec![application_row(1, ApplicationStatus::Accepted)]])
            .append_query_results([vec![offer_row(900_002, 1)]])
            .append_query_results([vec![cancelled]])
            .into_connection();

        let response = ConventionService::cancel(&db, &company_demo(), 10, "  Entreprise fermée ")
            .await
            .unwrap();

        assert_eq!(response.status, ConventionStatus::Cancelled);
        assert_eq!(response.cancellation_reason.as_deref(), Some("Entreprise fermée"));
        assert!(response.cancelled_at.is_some());
    }

    #[tokio::test]
    async fn test_validated_convention_cannot_be_cancelled() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![convention_row(10, ConventionStatus::Validated)]])
            .append_query_results([vec![application_row(1, ApplicationStatus::Accepted)]])
            .append_query_results([vec![offer_row(900_002, 1)]])
            .into_connection();

        let result = ConventionService::cancel(&db, &admin_demo(), 10, "Entreprise fermée").await;
        assert!(matches!(result, Err(AppError::Conflict(_))));
    }
}
