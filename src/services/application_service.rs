use std::collections::HashMap;

use chrono::Utc;
use sea_orm::*;

use crate::error::AppError;
use crate::models::candidature::{self, ApplicationStatus};
use crate::models::dto::{ApplicationResponse, ApplyRequest};
use crate::models::offre::{self, OfferStatus};
use crate::models::users::{self, Role};
use crate::services::offer_service::OfferService;
use crate::services::session::Session;

pub const DUPLICATE_APPLICATION: &str = "Vous avez déjà postulé à cette offre.";

pub struct ApplicationService;

/// en_attente -> acceptee | rejetee, rien d'autre
fn check_status_change(
    current: ApplicationStatus,
    requested: ApplicationStatus,
) -> Result<(), AppError> {
    if requested == ApplicationStatus::Pending {
        return Err(AppError::Validation(
            "Statut invalide: acceptee ou rejetee attendu".to_string(),
        ));
    }
    if current.is_terminal() {
        return Err(AppError::Conflict(format!(
            "Cette candidature a déjà été traitée ({})",
            current.label()
        )));
    }
    Ok(())
}

impl ApplicationService {
    pub async fn apply(
        db: &DatabaseConnection,
        session: &Session,
        offer_id: i32,
        request: ApplyRequest,
    ) -> Result<ApplicationResponse, AppError> {
        session.require_role(Role::Student)?;
        let student_id = session.user_id();

        // Doublon vérifié avant tout le reste
        let existing = candidature::Entity::find()
            .filter(candidature::Column::EtudiantId.eq(student_id))
            .filter(candidature::Column::OffreId.eq(offer_id))
            .one(db)
            .await?;
        if existing.is_some() {
            return Err(AppError::Conflict(DUPLICATE_APPLICATION.to_string()));
        }

        let offer = offre::Entity::find_by_id(offer_id)
            .one(db)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Offre {} introuvable", offer_id)))?;
        if offer.statut != OfferStatus::Open {
            return Err(AppError::Conflict(
                "Cette offre n'accepte plus de candidatures".to_string(),
            ));
        }

        let application = candidature::ActiveModel {
            etudiant_id: Set(student_id),
            offre_id: Set(offer.id),
            lettre_motivation: Set(request.cover_letter.trim().to_string()),
            cv_url: Set(request
                .resume_url
                .map(|u| u.trim().to_string())
                .filter(|u| !u.is_empty())),
            statut: Set(ApplicationStatus::Pending),
            created_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(db)
        .await
        .map_err(|e| match AppError::from(e) {
            // Deux envois simultanés: l'index unique (etudiant_id, offre_id) tranche
            AppError::Conflict(_) => AppError::Conflict(DUPLICATE_APPLICATION.to_string()),
            other => other,
        })?;

        tracing::info!(
            application_id = application.id,
            offer_id,
            student_id,
            "Application submitted"
        );

        let mut response = ApplicationResponse::from(application);
        response.offer_title = Some(offer.titre);
        response.student_name = Some(session.name().to_string());
        Ok(response)
    }

    /// Candidatures de l'étudiant connecté, avec titre de l'offre et société
    pub async fn list_mine(
        db: &DatabaseConnection,
        session: &Session,
    ) -> Result<Vec<ApplicationResponse>, AppError> {
        session.require_role(Role::Student)?;

        let applications = candidature::Entity::find()
            .filter(candidature::Column::EtudiantId.eq(session.user_id()))
            .order_by_desc(candidature::Column::CreatedAt)
            .all(db)
            .await?;
        if applications.is_empty() {
            return Ok(Vec::new());
        }

        let offer_ids: Vec<i32> = applications.iter().map(|a| a.offre_id).collect();
        let offers: HashMap<i32, offre::Model> = offre::Entity::find()
            .filter(offre::Column::Id.is_in(offer_ids))
            .all(db)
            .await?
            .into_iter()
            .map(|o| (o.id, o))
            .collect();
        let companies =
            OfferService::company_names(db, offers.values().map(|o| o.entreprise_id)).await?;

        let name = session.name().to_string();
        Ok(applications
            .into_iter()
            .map(|a| {
                let offer = offers.get(&a.offre_id);
                let mut response = ApplicationResponse::from(a);
                response.student_name = Some(name.clone());
                response.offer_title = offer.map(|o| o.titre.clone());
                response.company_name =
                    offer.and_then(|o| companies.get(&o.entreprise_id).cloned());
                response
            })
            .collect())
    }

    /// Candidatures reçues sur les offres de l'entreprise (filtre optionnel par offre)
    pub async fn list_received(
        db: &DatabaseConnection,
        session: &Session,
        offer_id: Option<i32>,
    ) -> Result<Vec<ApplicationResponse>, AppError> {
        session.require_role(Role::Company)?;

        let mut offers_query =
            offre::Entity::find().filter(offre::Column::EntrepriseId.eq(session.user_id()));
        if let Some(id) = offer_id {
            offers_query = offers_query.filter(offre::Column::Id.eq(id));
        }
        let offers: HashMap<i32, String> = offers_query
            .all(db)
            .await?
            .into_iter()
            .map(|o| (o.id, o.titre))
            .collect();
        if offers.is_empty() {
            return Ok(Vec::new());
        }

        let applications = candidature::Entity::find()
            .filter(candidature::Column::OffreId.is_in(offers.keys().copied().collect::<Vec<_>>()))
            .order_by_desc(candidature::Column::CreatedAt)
            .all(db)
            .await?;

        let students = Self::student_names(db, applications.iter().map(|a| a.etudiant_id)).await?;
        let company = session.name().to_string();

        Ok(applications
            .into_iter()
            .map(|a| {
                let mut response = ApplicationResponse::from(a);
                response.student_name = students.get(&response.student_id).cloned();
                response.offer_title = offers.get(&response.offer_id).cloned();
                response.company_name = Some(company.clone());
                response
            })
            .collect())
    }

    /// Acceptation / refus par l'entreprise propriétaire de l'offre
    pub async fn update_status(
        db: &DatabaseConnection,
        session: &Session,
        application_id: i32,
        status: ApplicationStatus,
    ) -> Result<ApplicationResponse, AppError> {
        session.require_role(Role::Company)?;

        let application = candidature::Entity::find_by_id(application_id)
            .one(db)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!("Candidature {} introuvable", application_id))
            })?;

        let offer = offre::Entity::find_by_id(application.offre_id)
            .one(db)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Offre {} introuvable", application.offre_id)))?;
        if offer.entreprise_id != session.user_id() {
            return Err(AppError::Forbidden);
        }

        check_status_change(application.statut, status)?;

        if status == ApplicationStatus::Accepted {
            let accepted = candidature::Entity::find()
                .filter(candidature::Column::OffreId.eq(offer.id))
                .filter(candidature::Column::Statut.eq(ApplicationStatus::Accepted))
                .count(db)
                .await?;
            if accepted >= offer.places.max(0) as u64 {
                return Err(AppError::Conflict(
                    "Toutes les places de cette offre sont pourvues".to_string(),
                ));
            }
        }

        let mut active: candidature::ActiveModel = application.into();
        active.statut = Set(status);
        let updated = active.update(db).await?;

        tracing::info!(application_id, status = ?status, "Application status updated");

        let mut response = ApplicationResponse::from(updated);
        response.offer_title = Some(offer.titre);
        response.company_name = Some(session.name().to_string());
        Ok(response)
    }

    pub async fn student_names(
        db: &DatabaseConnection,
        student_ids: impl IntoIterator<Item = i32>,
    ) -> Result<HashMap<i32, String>, AppError> {
        let mut ids: Vec<i32> = student_ids.into_iter().collect();
        ids.sort_unstable();
        ids.dedup();
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        Ok(users::Entity::find()
            .filter(users::Column::Id.is_in(ids))
            .all(db)
            .await?
            .into_iter()
            .map(|u| (u.id, u.display_name()))
            .collect())
    }
}
