// ============================================================================
// MODÈLE : CONVENTIONS
// ============================================================================
//
// Description:
//   Convention tripartite (étudiant / entreprise / établissement) créée par
//   l'administration à partir d'une candidature acceptée. L'id de la
//   convention sert aussi d'identifiant de "stage" pour les rapports et les
//   évaluations.
//
// Points d'attention:
//   - candidature_id est UNIQUE: une seule convention par candidature
//   - les trois signatures sont indépendantes du statut
//   - les transitions de statut passent TOUTES par
//     services::convention_workflow::transition
//
// ============================================================================

use serde::{Serialize, Deserialize};
use sea_orm::entity::prelude::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
pub enum ConventionStatus {
    #[sea_orm(string_value = "en_attente")]
    #[serde(rename = "en_attente")]
    Pending,
    #[sea_orm(string_value = "en_cours")]
    #[serde(rename = "en_cours")]
    InProgress,
    #[sea_orm(string_value = "validee")]
    #[serde(rename = "validee")]
    Validated,
    #[sea_orm(string_value = "annulee")]
    #[serde(rename = "annulee")]
    Cancelled,
}

impl ConventionStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ConventionStatus::Validated | ConventionStatus::Cancelled)
    }

    pub fn label(&self) -> &'static str {
        match self {
            ConventionStatus::Pending => "En Attente",
            ConventionStatus::InProgress => "En Cours",
            ConventionStatus::Validated => "Validée",
            ConventionStatus::Cancelled => "Annulée",
        }
    }

    pub fn badge(&self) -> &'static str {
        match self {
            ConventionStatus::Pending => "badge-pending",
            ConventionStatus::InProgress => "badge-accepted",
            ConventionStatus::Validated => "badge-validated",
            ConventionStatus::Cancelled => "badge-rejected",
        }
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "conventions")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique)]
    pub candidature_id: i32,
    pub date_debut: Date,
    pub date_fin: Date,
    pub lieu: String,
    pub tuteur: String,
    pub contact_tuteur: String,
    #[sea_orm(column_type = "Text")]
    pub description_poste: String,
    #[sea_orm(column_type = "Text")]
    pub objectifs: String,
    pub statut: ConventionStatus,
    pub signature_etudiant: bool,
    pub signature_entreprise: bool,
    pub signature_ecole: bool,
    pub motif_annulation: Option<String>,
    pub created_at: DateTimeUtc,
    pub validated_at: Option<DateTimeUtc>,
    pub cancelled_at: Option<DateTimeUtc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::candidature::Entity",
        from = "Column::CandidatureId",
        to = "super::candidature::Column::Id"
    )]
    Candidature,
}

impl Related<super::candidature::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Candidature.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
