use sea_orm::*;

use crate::error::AppError;
use crate::models::dto::{ProfileFields, ProfileResponse, StudentProfileView, UpdateProfileRequest};
use crate::models::users::{self, Role};
use crate::models::{administration, candidature, entreprise, etudiant, offre};
use crate::services::evaluation_service::EvaluationService;
use crate::services::session::Session;

pub struct ProfileService;

enum RoleProfile {
    Student(etudiant::Model),
    Company(entreprise::Model),
    Administration(administration::Model),
}

fn clean(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn to_details<T: serde::Serialize>(model: Option<T>) -> Option<serde_json::Value> {
    model.and_then(|m| serde_json::to_value(m).ok())
}

impl ProfileService {
    /// Identité + coordonnées + profil du rôle
    pub async fn get(db: &DatabaseConnection, session: &Session) -> Result<ProfileResponse, AppError> {
        let user = users::Entity::find_by_id(session.user_id()).one(db).await?;

        let details = match session.role() {
            Role::Student => {
                to_details(etudiant::Entity::find_by_id(session.user_id()).one(db).await?)
            }
            Role::Company => {
                to_details(entreprise::Entity::find_by_id(session.user_id()).one(db).await?)
            }
            Role::Administration => to_details(
                administration::Entity::find_by_id(session.user_id())
                    .one(db)
                    .await?,
            ),
        };

        let (telephone, adresse) = match user {
            Some(u) => (u.telephone, u.adresse),
            None => (None, None),
        };

        Ok(ProfileResponse {
            user: session.identity(),
            telephone,
            adresse,
            details,
        })
    }

    /// Fiche d'un étudiant: l'administration voit tout le monde,
    /// une entreprise seulement les étudiants qui ont postulé à ses offres
    pub async fn student_view(
        db: &DatabaseConnection,
        session: &Session,
        student_id: i32,
    ) -> Result<StudentProfileView, AppError> {
        session.require_any_role(&[Role::Company, Role::Administration])?;

        let mut query = candidature::Entity::find()
            .filter(candidature::Column::EtudiantId.eq(student_id));
        if session.role() == Role::Company {
            query = query
                .inner_join(offre::Entity)
                .filter(offre::Column::EntrepriseId.eq(session.user_id()));
        }
        let applications = query
            .order_by_desc(candidature::Column::CreatedAt)
            .all(db)
            .await?;
        if session.role() == Role::Company && applications.is_empty() {
            return Err(AppError::Forbidden);
        }

        let user = users::Entity::find_by_id(student_id)
            .one(db)
            .await?
            .filter(|u| u.role == Role::Student)
            .ok_or_else(|| AppError::NotFound("Profil étudiant introuvable".to_string()))?;
        let profile = etudiant::Entity::find_by_id(student_id).one(db).await?;
        let evaluations = EvaluationService::received_by(db, student_id).await?;

        let cv_url = applications
            .iter()
            .filter_map(|a| clean(a.cv_url.clone()))
            .next();

        Ok(StudentProfileView {
            id: user.id,
            name: user.display_name(),
            email: user.email,
            telephone: user.telephone,
            adresse: user.adresse,
            profile,
            cv_url,
            applications: applications.len(),
            evaluations,
        })
    }

    /// Mise à jour partielle; le rôle et l'email ne changent jamais
    pub async fn update(
        db: &DatabaseConnection,
        session: &Session,
        request: UpdateProfileRequest,
    ) -> Result<ProfileResponse, AppError> {
        if let Some(name) = request.profile.nom_societe.as_deref() {
            if name.trim().is_empty() {
                return Err(AppError::Validation(
                    "Le nom de la société est requis".to_string(),
                ));
            }
        }
        if let Some(level) = request.profile.niveau_acces.as_deref() {
            if !administration::ACCESS_LEVELS.contains(&level) {
                return Err(AppError::Validation(format!("Niveau d'accès invalide: {}", level)));
            }
        }

        let user = users::Entity::find_by_id(session.user_id())
            .one(db)
            .await?
            .ok_or_else(|| AppError::NotFound("Utilisateur introuvable".to_string()))?;
        // Le profil du rôle est chargé avant toute écriture
        let profile = Self::load_role_profile(db, session).await?;

        let txn = db.begin().await?;
        if request.telephone.is_some() || request.adresse.is_some() {
            let mut active: users::ActiveModel = user.into();
            if request.telephone.is_some() {
                active.telephone = Set(clean(request.telephone));
            }
            if request.adresse.is_some() {
                active.adresse = Set(clean(request.adresse));
            }
            active.update(&txn).await?;
        }
        Self::update_role_profile(&txn, profile, request.profile).await?;
        txn.commit().await?;

        tracing::info!(user_id = session.user_id(), "Profile updated");
        Self::get(db, session).await
    }

    async fn load_role_profile(
        db: &DatabaseConnection,
        session: &Session,
    ) -> Result<RoleProfile, AppError> {
        let user_id = session.user_id();
        let profile = match session.role() {
            Role::Student => etudiant::Entity::find_by_id(user_id)
                .one(db)
                .await?
                .map(RoleProfile::Student)
                .ok_or("Profil étudiant introuvable"),
            Role::Company => entreprise::Entity::find_by_id(user_id)
                .one(db)
                .await?
                .map(RoleProfile::Company)
                .ok_or("Profil entreprise introuvable"),
            Role::Administration => administration::Entity::find_by_id(user_id)
                .one(db)
                .await?
                .map(RoleProfile::Administration)
                .ok_or("Profil administration introuvable"),
        };
        profile.map_err(|msg| AppError::NotFound(msg.to_string()))
    }

    async fn update_role_profile<C: ConnectionTrait>(
        conn: &C,
        profile: RoleProfile,
        fields: ProfileFields,
    ) -> Result<(), AppError> {
        match profile {
            RoleProfile::Student(profile) => {
                let mut active: etudiant::ActiveModel = profile.into();
                if fields.filiere.is_some() {
                    active.filiere = Set(clean(fields.filiere));
                }
                if fields.niveau.is_some() {
                    active.niveau = Set(clean(fields.niveau));
                }
                if fields.date_naissance.is_some() {
                    active.date_naissance = Set(fields.date_naissance);
                }
                if active.is_changed() {
                    active.update(conn).await?;
                }
            }
            RoleProfile::Company(profile) => {
                let mut active: entreprise::ActiveModel = profile.into();
                if let Some(name) = clean(fields.nom_societe) {
                    active.nom_societe = Set(name);
                }
                if fields.secteur_activite.is_some() {
                    active.secteur_activite = Set(clean(fields.secteur_activite));
                }
                if fields.site_web.is_some() {
                    active.site_web = Set(clean(fields.site_web));
                }
                if fields.description.is_some() {
                    active.description = Set(clean(fields.description));
                }
                if active.is_changed() {
                    active.update(conn).await?;
                }
            }
            RoleProfile::Administration(profile) => {
                let mut active: administration::ActiveModel = profile.into();
                if fields.departement.is_some() {
                    active.departement = Set(clean(fields.departement));
                }
                if fields.fonction.is_some() {
                    active.fonction = Set(clean(fields.fonction));
                }
                if let Some(level) = clean(fields.niveau_acces) {
                    active.niveau_acces = Set(level);
                }
                if active.is_changed() {
                    active.update(conn).await?;
                }
            }
        }
        Ok(())
    }
}
