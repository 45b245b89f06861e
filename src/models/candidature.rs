use serde::{Serialize, Deserialize};
use sea_orm::entity::prelude::*;

// en_attente -> acceptee | rejetee, les deux états finaux sont terminaux
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
pub enum ApplicationStatus {
    #[sea_orm(string_value = "en_attente")]
    #[serde(rename = "en_attente")]
    Pending,
    #[sea_orm(string_value = "acceptee")]
    #[serde(rename = "acceptee")]
    Accepted,
    #[sea_orm(string_value = "rejetee")]
    #[serde(rename = "rejetee")]
    Rejected,
}

impl ApplicationStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ApplicationStatus::Pending)
    }

    pub fn label(&self) -> &'static str {
        match self {
            ApplicationStatus::Pending => "En Attente",
            ApplicationStatus::Accepted => "Acceptée",
            ApplicationStatus::Rejected => "Rejetée",
        }
    }

    pub fn badge(&self) -> &'static str {
        match self {
            ApplicationStatus::Pending => "badge-pending",
            ApplicationStatus::Accepted => "badge-accepted",
            ApplicationStatus::Rejected => "badge-rejected",
        }
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "candidatures")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub etudiant_id: i32,
    pub offre_id: i32,
    #[sea_orm(column_type = "Text")]
    pub lettre_motivation: String,
    pub cv_url: Option<String>,
    pub statut: ApplicationStatus,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::EtudiantId",
        to = "super::users::Column::Id"
    )]
    Etudiant,

    #[sea_orm(
        belongs_to = "super::offre::Entity",
        from = "Column::OffreId",
        to = "super::offre::Column::Id",
        on_delete = "Cascade"
    )]
    Offre,
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Etudiant.def()
    }
}

impl Related<super::offre::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Offre.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
