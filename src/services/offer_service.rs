use std::collections::HashMap;

use chrono::Utc;
use sea_orm::*;
use validator::Validate;

use crate::error::AppError;
use crate::models::dto::{CreateOfferRequest, OfferResponse, UpdateOfferRequest};
use crate::models::offre::{self, OfferStatus};
use crate::models::users::Role;
use crate::models::{candidature, entreprise};
use crate::services::session::Session;

pub struct OfferService;

/// "Python, React" -> ["Python", "React"]
pub fn parse_skills(input: &str) -> Vec<String> {
    input
        .split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .collect()
}

fn required(value: &str, message: &str) -> Result<String, AppError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(AppError::Validation(message.to_string()));
    }
    Ok(value.to_string())
}

fn optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Construit la ligne à insérer; aucune écriture si la validation échoue
fn new_offer_model(company_id: i32, request: CreateOfferRequest) -> Result<offre::ActiveModel, AppError> {
    request.validate()?;

    let titre = required(&request.title, "Le titre est requis")?;
    let description = required(&request.description, "La description est requise")?;
    let skills = request.skills.as_deref().map(parse_skills).unwrap_or_default();

    Ok(offre::ActiveModel {
        entreprise_id: Set(company_id),
        titre: Set(titre),
        description: Set(description),
        localisation: Set(optional(request.location)),
        duree: Set(optional(request.duration)),
        remuneration: Set(optional(request.compensation)),
        competences: Set(serde_json::json!(skills)),
        places: Set(request.capacity.unwrap_or(1)),
        statut: Set(OfferStatus::Open),
        date_publication: Set(Utc::now()),
        ..Default::default()
    })
}

impl OfferService {
    /// Offres de l'entreprise connectée, les plus récentes d'abord
    pub async fn list_own(
        db: &DatabaseConnection,
        session: &Session,
    ) -> Result<Vec<OfferResponse>, AppError> {
        session.require_role(Role::Company)?;

        let offers = offre::Entity::find()
            .filter(offre::Column::EntrepriseId.eq(session.user_id()))
            .order_by_desc(offre::Column::DatePublication)
            .order_by_desc(offre::Column::Id)
            .all(db)
            .await?;

        let name = Some(session.name().to_string());
        Ok(offers
            .into_iter()
            .map(|o| OfferResponse::from(o).with_company(name.clone()))
            .collect())
    }

    /// Offres visibles par les étudiants (statut ouverte uniquement)
    pub async fn list_open(
        db: &DatabaseConnection,
        _session: &Session,
    ) -> Result<Vec<OfferResponse>, AppError> {
        let offers = offre::Entity::find()
            .filter(offre::Column::Statut.eq(OfferStatus::Open))
            .order_by_desc(offre::Column::DatePublication)
            .order_by_desc(offre::Column::Id)
            .all(db)
            .await?;

        let names = Self::company_names(db, offers.iter().map(|o| o.entreprise_id)).await?;

        Ok(offers
            .into_iter()
            .map(|o| {
                let name = names.get(&o.entreprise_id).cloned();
                OfferResponse::from(o).with_company(name)
            })
            .collect())
    }

    pub async fn get(
        db: &DatabaseConnection,
        session: &Session,
        offer_id: i32,
    ) -> Result<OfferResponse, AppError> {
        let offer = offre::Entity::find_by_id(offer_id)
            .one(db)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Offre {} introuvable", offer_id)))?;

        let is_owner = offer.entreprise_id == session.user_id();
        if offer.statut != OfferStatus::Open && !is_owner && session.role() != Role::Administration {
            return Err(AppError::NotFound(format!("Offre {} introuvable", offer_id)));
        }

        let names = Self::company_names(db, [offer.entreprise_id]).await?;
        let name = names.get(&offer.entreprise_id).cloned();
        Ok(OfferResponse::from(offer).with_company(name))
    }

    pub async fn create(
        db: &DatabaseConnection,
        session: &Session,
        request: CreateOfferRequest,
    ) -> Result<OfferResponse, AppError> {
        session.require_role(Role::Company)?;

        let model = new_offer_model(session.user_id(), request)?;
        let offer = model.insert(db).await?;

        tracing::info!(offer_id = offer.id, company_id = offer.entreprise_id, "Offer published");
        Ok(OfferResponse::from(offer).with_company(Some(session.name().to_string())))
    }

    /// Modification partielle par le propriétaire
    pub async fn update(
        db: &DatabaseConnection,
        session: &Session,
        offer_id: i32,
        request: UpdateOfferRequest,
    ) -> Result<OfferResponse, AppError> {
        request.validate()?;
        let offer = Self::load_owned(db, session, offer_id).await?;

        let mut active: offre::ActiveModel = offer.into();
        if let Some(title) = request.title {
            active.titre = Set(required(&title, "Le titre est requis")?);
        }
        if let Some(description) = request.description {
            active.description = Set(required(&description, "La description est requise")?);
        }
        if request.location.is_some() {
            active.localisation = Set(optional(request.location));
        }
        if request.duration.is_some() {
            active.duree = Set(optional(request.duration));
        }
        if request.compensation.is_some() {
            active.remuneration = Set(optional(request.compensation));
        }
        if let Some(skills) = request.skills {
            active.competences = Set(serde_json::json!(parse_skills(&skills)));
        }
        if let Some(capacity) = request.capacity {
            active.places = Set(capacity);
        }

        let updated = active.update(db).await?;
        Ok(OfferResponse::from(updated).with_company(Some(session.name().to_string())))
    }

    /// Archiver (fermee) ou ré-ouvrir (ouverte)
    pub async fn set_status(
        db: &DatabaseConnection,
        session: &Session,
        offer_id: i32,
        status: OfferStatus,
    ) -> Result<OfferResponse, AppError> {
        let offer = Self::load_owned(db, session, offer_id).await?;
        if offer.statut == status {
            return Ok(OfferResponse::from(offer).with_company(Some(session.name().to_string())));
        }

        let mut active: offre::ActiveModel = offer.into();
        active.statut = Set(status);
        let updated = active.update(db).await?;

        tracing::info!(offer_id, status = ?status, "Offer status changed");
        Ok(OfferResponse::from(updated).with_company(Some(session.name().to_string())))
    }

    /// Suppression, refusée dès qu'une candidature existe (archiver à la place)
    pub async fn delete(
        db: &DatabaseConnection,
        session: &Session,
        offer_id: i32,
    ) -> Result<(), AppError> {
        let offer = Self::load_owned(db, session, offer_id).await?;

        let applications = candidature::Entity::find()
            .filter(candidature::Column::OffreId.eq(offer.id))
            .one(db)
            .await?;
        if applications.is_some() {
            return Err(AppError::Conflict(
                "Cette offre a reçu des candidatures, archivez-la plutôt".to_string(),
            ));
        }

        offre::Entity::delete_by_id(offer.id).exec(db).await?;
        tracing::info!(offer_id, "Offer deleted");
        Ok(())
    }

    async fn load_owned(
        db: &DatabaseConnection,
        session: &Session,
        offer_id: i32,
    ) -> Result<offre::Model, AppError> {
        session.require_role(Role::Company)?;

        let offer = offre::Entity::find_by_id(offer_id)
            .one(db)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Offre {} introuvable", offer_id)))?;

        if offer.entreprise_id != session.user_id() {
            return Err(AppError::Forbidden);
        }
        Ok(offer)
    }

    /// Nom des sociétés, une seule requête pour toute la liste
    pub async fn company_names(
        db: &DatabaseConnection,
        company_ids: impl IntoIterator<Item = i32>,
    ) -> Result<HashMap<i32, String>, AppError> {
        let mut ids: Vec<i32> = company_ids.into_iter().collect();
        ids.sort_unstable();
        ids.dedup();
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        let companies = entreprise::Entity::find()
            .filter(entreprise::Column::IdUtilisateur.is_in(ids))
            .all(db)
            .await?;

        Ok(companies
            .into_iter()
            .map(|c| (c.id_utilisateur, c.nom_societe))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::session::tests::{company_demo, student_demo};

    fn create_request(skills: &str) -> CreateOfferRequest {
        CreateOfferRequest {
            title: "Stage Data".into(),
            description: "Analyse de données".into(),
            location: Some(" Paris ".into()),
            duration: Some("6 mois".into()),
            compensation: Some("".into()),
            skills: Some(skills.into()),
            capacity: None,
        }
    }

    fn offer_row(id: i32, company_id: i32, statut: OfferStatus) -> offre::Model {
        offre::Model {
            id,
            entreprise_id: company_id,
            titre: "Stage Data".into(),
            description: "Analyse de données".into(),
            localisation: Some("Paris".into()),
            duree: None,
            remuneration: None,
            competences: serde_json::json!(["Python", "React"]),
            places: 1,
            statut,
            date_publication: Utc::now(),
        }
    }

    #[test]
    fn test_parse_skills() {
        assert_eq!(parse_skills("Python, React"), vec!["Python", "React"]);
        assert_eq!(parse_skills(" SQL ,, Rust ,"), vec!["SQL", "Rust"]);
        assert!(parse_skills("  ").is_empty());
    }

    #[test]
    fn test_new_offer_model_splits_skills() {
        let model = new_offer_model(900_002, create_request("Python, React")).unwrap();
        assert_eq!(model.competences, Set(serde_json::json!(["Python", "React"])));
        assert_eq!(model.statut, Set(OfferStatus::Open));
        assert_eq!(model.places, Set(1));
        assert_eq!(model.localisation, Set(Some("Paris".to_string())));
        assert_eq!(model.remuneration, Set(None));
    }

    #[test]
    fn test_blank_title_is_rejected() {
        let mut request = create_request("Python");
        request.title = "   ".into();
        assert!(matches!(
            new_offer_model(900_002, request),
            Err(AppError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_created_offer_lists_skills() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![offer_row(5, 900_002, OfferStatus::Open)]])
            .into_connection();

        let offer = OfferService::create(&db, &company_demo(), create_request("Python, React"))
            .await
            .unwrap();

        assert_eq!(offer.skills, vec!["Python".to_string(), "React".to_string()]);
        assert_eq!(offer.company_name.as_deref(), Some("TechCorp"));
    }

    #[tokio::test]
    async fn test_student_cannot_create_offer() {
        let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();

        let result = OfferService::create(&db, &student_demo(), create_request("Python")).await;

        assert!(matches!(result, Err(AppError::Forbidden)));
        assert!(db.into_transaction_log().is_empty());
    }

    #[tokio::test]
    async fn test_closed_offer_hidden_from_students() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![offer_row(5, 900_002, OfferStatus::Closed)]])
            .into_connection();

        let result = OfferService::get(&db, &student_demo(), 5).await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_archive_by_other_company_is_forbidden() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![offer_row(5, 42, OfferStatus::Open)]])
            .into_connection();

        let result = OfferService::set_status(&db, &company_demo(), 5, OfferStatus::Closed).await;
        assert!(matches!(result, Err(AppError::Forbidden)));
    }

    #[tokio::test]
    async fn test_owner_edits_offer() {
        let edited = offre::Model {
            titre: "Stage Rust".into(),
            places: 2,
            ..offer_row(5, 900_002, OfferStatus::Open)
        };
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![offer_row(5, 900_002, OfferStatus::Open)]])
            .append_query_results([vec![edited]])
            .into_connection();
        let request = UpdateOfferRequest {
            title: Some(" Stage Rust ".into()),
            description: None,
            location: None,
            duration: None,
            compensation: None,
            skills: None,
            capacity: Some(2),
        };

        let offer = OfferService::update(&db, &company_demo(), 5, request)
            .await
            .unwrap();

        assert_eq!(offer.title, "Stage Rust");
        assert_eq!(offer.capacity, 2);
        let log = format!("{:?}", db.into_transaction_log());
        assert!(log.contains("UPDATE"));
        assert!(log.contains(r#"String(Some("Stage Rust"))"#));
    }

    #[tokio::test]
    async fn test_archived_offer_leaves_open_listing() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![offer_row(5, 900_002, OfferStatus::Open)]])
            .append_query_results([vec![offer_row(5, 900_002, OfferStatus::Closed)]])
            .append_query_results([Vec::<offre::Model>::new()])
            .into_connection();

        let archived = OfferService::set_status(&db, &company_demo(), 5, OfferStatus::Closed)
            .await
            .unwrap();
        assert_eq!(archived.status, OfferStatus::Closed);

        let open = OfferService::list_open(&db, &student_demo()).await.unwrap();
        assert!(open.is_empty());

        let log = db.into_transaction_log();
        assert_eq!(log.len(), 3);
        let listing = format!("{:?}", log[2]);
        assert!(listing.contains("statut"));
        assert!(listing.contains(r#"String(Some("ouverte"))"#));
    }

    #[tokio::test]
    async fn test_reopen_archived_offer() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![offer_row(5, 900_002, OfferStatus::Closed)]])
            .append_query_results([vec![offer_row(5, 900_002, OfferStatus::Open)]])
            .into_connection();

        let offer = OfferService::set_status(&db, &company_demo(), 5, OfferStatus::Open)
            .await
            .unwrap();

        assert_eq!(offer.status, OfferStatus::Open);
        assert_eq!(offer.status_label, "Ouverte");
    }

    #[tokio::test]
    async fn test_offer_with_applications_cannot_be_deleted() {
        use crate::models::candidature::ApplicationStatus;
        use crate::services::application_service::tests::application_row;

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![offer_row(5, 900_002, OfferStatus::Open)]])
            .append_query_results([vec![application_row(1, ApplicationStatus::Pending)]])
            .into_connection();

        let result = OfferService::delete(&db, &company_demo(), 5).await;

        assert!(matches!(result, Err(AppError::Conflict(_))));
        let log = format!("{:?}", db.into_transaction_log());
        assert!(!log.contains("DELETE"));
    }

    #[tokio::test]
    async fn test_offer_without_applications_is_deleted() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![offer_row(5, 900_002, OfferStatus::Open)]])
            .append_query_results([Vec::<candidature::Model>::new()])
            .append_exec_results([MockExecResult {
                last_insert_id: 0,
                rows_affected: 1,
            }])
            .into_connection();

        OfferService::delete(&db, &company_demo(), 5).await.unwrap();

        let log = format!("{:?}", db.into_transaction_log());
        assert!(log.contains(r#"DELETE FROM \"offres\""#));
    }
}
