// ============================================================================
// DTO - COUCHE DE NORMALISATION
// ============================================================================
//
// Les colonnes de la base sont en français (titre, statut, note_entreprise,
// fichier_url...) et ont varié d'une version à l'autre du schéma. Toutes les
// réponses de l'API passent par les conversions ci-dessous: une seule forme
// stable (champs anglais) par entité, quel que soit le nommage côté base.
//
// ============================================================================

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::candidature::{self, ApplicationStatus};
use crate::models::convention::{self, ConventionStatus};
use crate::models::offre::{self, OfferStatus};
use crate::models::users::Role;
use crate::models::{etudiant, evaluation, rapport};

// ---------------------------------------------------------------------------
// Authentification / profil
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1, message = "L'email est requis"))]
    pub email: String,
    #[validate(length(min = 1, message = "Le mot de passe est requis"))]
    pub password: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(email(message = "Adresse email invalide"))]
    pub email: String,
    #[validate(length(min = 6, message = "Le mot de passe doit contenir au moins 6 caractères."))]
    pub password: String,
    pub confirm_password: String,
    pub role: Role,
    #[validate(length(min = 1, message = "Le nom est requis"))]
    pub nom: String,
    #[serde(default)]
    pub prenom: String,
    pub telephone: Option<String>,
    pub adresse: Option<String>,
    #[serde(flatten)]
    pub profile: ProfileFields,
}

/// Champs spécifiques au rôle (seuls ceux du rôle choisi sont utilisés)
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct ProfileFields {
    // etudiant
    pub filiere: Option<String>,
    pub niveau: Option<String>,
    pub date_naissance: Option<NaiveDate>,
    // entreprise
    pub nom_societe: Option<String>,
    pub secteur_activite: Option<String>,
    pub site_web: Option<String>,
    pub description: Option<String>,
    // administration
    pub departement: Option<String>,
    pub fonction: Option<String>,
    pub niveau_acces: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateProfileRequest {
    pub telephone: Option<String>,
    pub adresse: Option<String>,
    #[serde(flatten)]
    pub profile: ProfileFields,
}

#[derive(Debug, Deserialize)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
    pub confirm_password: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct IdentityResponse {
    pub user_id: i32,
    pub email: String,
    pub role: Role,
    pub role_label: &'static str,
    pub name: String,
    pub demo: bool,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: IdentityResponse,
}

#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub user: IdentityResponse,
    pub telephone: Option<String>,
    pub adresse: Option<String>,
    pub details: Option<serde_json::Value>,
}

/// Fiche d'un candidat consultée par une entreprise ou l'administration
#[derive(Debug, Serialize)]
pub struct StudentProfileView {
    pub id: i32,
    pub name: String,
    pub email: String,
    pub telephone: Option<String>,
    pub adresse: Option<String>,
    pub profile: Option<etudiant::Model>,
    /// CV de la candidature la plus récente qui en fournit un
    pub cv_url: Option<String>,
    pub applications: usize,
    pub evaluations: EvaluationSummary,
}

// ---------------------------------------------------------------------------
// Offres
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, Validate)]
pub struct CreateOfferRequest {
    #[validate(length(min = 1, message = "Le titre est requis"))]
    pub title: String,
    #[validate(length(min = 1, message = "La description est requise"))]
    pub description: String,
    pub location: Option<String>,
    pub duration: Option<String>,
    pub compensation: Option<String>,
    /// Saisie libre séparée par des virgules: "Python, React"
    pub skills: Option<String>,
    #[validate(range(min = 1, message = "Au moins une place est requise"))]
    pub capacity: Option<i32>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateOfferRequest {
    #[validate(length(min = 1, message = "Le titre est requis"))]
    pub title: Option<String>,
    #[validate(length(min = 1, message = "La description est requise"))]
    pub description: Option<String>,
    pub location: Option<String>,
    pub duration: Option<String>,
    pub compensation: Option<String>,
    pub skills: Option<String>,
    #[validate(range(min = 1, message = "Au moins une place est requise"))]
    pub capacity: Option<i32>,
}

#[derive(Debug, Serialize)]
pub struct OfferResponse {
    pub id: i32,
    pub company_id: i32,
    pub company_name: Option<String>,
    pub title: String,
    pub description: String,
    pub location: Option<String>,
    pub duration: Option<String>,
    pub compensation: Option<String>,
    pub skills: Vec<String>,
    pub capacity: i32,
    pub status: OfferStatus,
    pub status_label: &'static str,
    pub badge: &'static str,
    pub published_at: DateTime<Utc>,
}

impl From<offre::Model> for OfferResponse {
    fn from(o: offre::Model) -> Self {
        Self {
            id: o.id,
            company_id: o.entreprise_id,
            company_name: None,
            skills: skills_from_json(&o.competences),
            title: o.titre,
            description: o.description,
            location: o.localisation,
            duration: o.duree,
            compensation: o.remuneration,
            capacity: o.places,
            status_label: o.statut.label(),
            badge: o.statut.badge(),
            status: o.statut,
            published_at: o.date_publication,
        }
    }
}

impl OfferResponse {
    pub fn with_company(mut self, name: Option<String>) -> Self {
        self.company_name = name;
        self
    }
}

/// Les anciennes lignes stockaient les compétences en une seule chaîne
fn skills_from_json(value: &serde_json::Value) -> Vec<String> {
    match value {
        serde_json::Value::Array(items) => items
            .iter()
            .filter_map(|v| v.as_str())
            .map(|s| s.to_string())
            .collect(),
        serde_json::Value::String(s) => crate::services::offer_service::parse_skills(s),
        _ => Vec::new(),
    }
}

// ---------------------------------------------------------------------------
// Candidatures
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct ApplyRequest {
    #[serde(default)]
    pub cover_letter: String,
    pub resume_url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateApplicationStatusRequest {
    pub status: ApplicationStatus,
}

#[derive(Debug, Deserialize)]
pub struct ApplicationsQuery {
    pub offer_id: Option<i32>,
}

#[derive(Debug, Serialize)]
pub struct ApplicationResponse {
    pub id: i32,
    pub student_id: i32,
    pub student_name: Option<String>,
    pub offer_id: i32,
    pub offer_title: Option<String>,
    pub company_name: Option<String>,
    pub cover_letter: String,
    pub resume_url: Option<String>,
    pub status: ApplicationStatus,
    pub status_label: &'static str,
    pub badge: &'static str,
    pub submitted_at: DateTime<Utc>,
}

impl From<candidature::Model> for ApplicationResponse {
    fn from(c: candidature::Model) -> Self {
        Self {
            id: c.id,
            student_id: c.etudiant_id,
            student_name: None,
            offer_id: c.offre_id,
            offer_title: None,
            company_name: None,
            cover_letter: c.lettre_motivation,
            resume_url: c.cv_url,
            status_label: c.statut.label(),
            badge: c.statut.badge(),
            status: c.statut,
            submitted_at: c.created_at,
        }
    }
}

// ---------------------------------------------------------------------------
// Conventions
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, Validate)]
pub struct CreateConventionRequest {
    pub application_id: i32,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[validate(length(min = 1, message = "Le lieu est requis"))]
    pub location: String,
    #[validate(length(min = 1, message = "Le tuteur est requis"))]
    pub supervisor: String,
    #[serde(default)]
    pub supervisor_contact: String,
    #[serde(default)]
    pub job_description: String,
    #[serde(default)]
    pub objectives: String,
}

#[derive(Debug, Deserialize)]
pub struct CancelConventionRequest {
    #[serde(default)]
    pub reason: String,
}

#[derive(Debug, Deserialize)]
pub struct ConventionsQuery {
    pub status: Option<ConventionStatus>,
}

#[derive(Debug, Serialize)]
pub struct SignaturesResponse {
    pub student: bool,
    pub company: bool,
    pub school: bool,
    pub count: u8,
}

#[derive(Debug, Serialize)]
pub struct ConventionResponse {
    pub id: i32,
    pub application_id: i32,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub duration_weeks: i64,
    pub location: String,
    pub supervisor: String,
    pub supervisor_contact: String,
    pub job_description: String,
    pub objectives: String,
    pub status: ConventionStatus,
    pub status_label: &'static str,
    pub badge: &'static str,
    pub signatures: SignaturesResponse,
    pub cancellation_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub validated_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
}

impl From<convention::Model> for ConventionResponse {
    fn from(c: convention::Model) -> Self {
        let count = [c.signature_etudiant, c.signature_entreprise, c.signature_ecole]
            .iter()
            .filter(|s| **s)
            .count() as u8;

        Self {
            id: c.id,
            application_id: c.candidature_id,
            duration_weeks: (c.date_fin - c.date_debut).num_weeks(),
            start_date: c.date_debut,
            end_date: c.date_fin,
            location: c.lieu,
            supervisor: c.tuteur,
            supervisor_contact: c.contact_tuteur,
            job_description: c.description_poste,
            objectives: c.objectifs,
            status_label: c.statut.label(),
            badge: c.statut.badge(),
            status: c.statut,
            signatures: SignaturesResponse {
                student: c.signature_etudiant,
                company: c.signature_entreprise,
                school: c.signature_ecole,
                count,
            },
            cancellation_reason: c.motif_annulation,
            created_at: c.created_at,
            validated_at: c.validated_at,
            cancelled_at: c.cancelled_at,
        }
    }
}

// ---------------------------------------------------------------------------
// Rapports
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct SubmitReportRequest {
    pub stage_id: i32,
    #[serde(default)]
    pub title: String,
    pub description: Option<String>,
    #[serde(default)]
    pub file_url: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct GradeReportRequest {
    #[validate(range(min = 0.0, max = 20.0, message = "La note doit être comprise entre 0 et 20"))]
    pub grade: f64,
    pub feedback: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportFilter {
    #[default]
    All,
    Pending,
    Graded,
}

impl ReportFilter {
    pub fn matches(&self, report: &rapport::Model) -> bool {
        match self {
            ReportFilter::All => true,
            ReportFilter::Pending => !report.is_graded(),
            ReportFilter::Graded => report.is_graded(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ReportsQuery {
    #[serde(default)]
    pub filter: ReportFilter,
}

#[derive(Debug, Serialize)]
pub struct ReportResponse {
    pub id: i32,
    pub stage_id: i32,
    pub title: String,
    pub description: Option<String>,
    pub file_url: String,
    pub submitted_at: DateTime<Utc>,
    pub grade: Option<f64>,
    pub feedback: Option<String>,
    pub graded_at: Option<DateTime<Utc>>,
    pub graded_by: Option<i32>,
    pub evaluated: bool,
}

impl From<rapport::Model> for ReportResponse {
    fn from(r: rapport::Model) -> Self {
        Self {
            evaluated: r.is_graded(),
            id: r.id,
            stage_id: r.convention_id,
            title: r.titre,
            description: r.description,
            file_url: r.fichier_url,
            submitted_at: r.submitted_at,
            grade: r.note.map(decimal_to_f64),
            feedback: r.commentaire,
            graded_at: r.graded_at,
            graded_by: r.graded_by,
        }
    }
}

// ---------------------------------------------------------------------------
// Évaluations
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, Validate)]
pub struct SubmitEvaluationRequest {
    pub stage_id: i32,
    #[validate(range(min = 0.0, max = 5.0, message = "La note doit être comprise entre 0 et 5"))]
    pub rating: f64,
    #[validate(length(min = 1, message = "Le commentaire est requis"))]
    pub comment: String,
    pub strengths: Option<String>,
    pub improvements: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct FinalGradeRequest {
    #[validate(range(min = 0.0, max = 20.0, message = "La note doit être comprise entre 0 et 20"))]
    pub grade: Option<f64>,
}

#[derive(Debug, Serialize)]
pub struct EvaluationResponse {
    pub id: i32,
    pub stage_id: i32,
    pub evaluator_id: i32,
    pub rating: f64,
    pub comment: String,
    pub strengths: Option<String>,
    pub improvements: Option<String>,
    pub final_grade: Option<f64>,
    pub created_at: DateTime<Utc>,
}

impl From<evaluation::Model> for EvaluationResponse {
    fn from(e: evaluation::Model) -> Self {
        Self {
            id: e.id,
            stage_id: e.convention_id,
            evaluator_id: e.evaluateur_id,
            rating: decimal_to_f64(e.note_entreprise),
            comment: e.commentaire,
            strengths: e.points_forts,
            improvements: e.axes_amelioration,
            final_grade: e.note_finale.map(decimal_to_f64),
            created_at: e.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct EvaluationSummary {
    pub evaluations: Vec<EvaluationResponse>,
    pub count: usize,
    pub average_rating: Option<f64>,
}

// ---------------------------------------------------------------------------
// Conversions numériques
// ---------------------------------------------------------------------------

pub fn decimal_to_f64(decimal: Decimal) -> f64 {
    decimal.to_f64().unwrap_or(0.0)
}

/// Arrondi à 2 décimales, None si la valeur n'est pas représentable (NaN, inf)
pub fn f64_to_decimal(value: f64) -> Option<Decimal> {
    Decimal::from_f64_retain(value).map(|d| d.round_dp(2))
}
