use serde::{Serialize, Deserialize};
use sea_orm::entity::prelude::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
pub enum OfferStatus {
    #[sea_orm(string_value = "ouverte")]
    #[serde(rename = "ouverte")]
    Open,
    #[sea_orm(string_value = "fermee")]
    #[serde(rename = "fermee")]
    Closed,
}

impl OfferStatus {
    pub fn label(&self) -> &'static str {
        match self {
            OfferStatus::Open => "Ouverte",
            OfferStatus::Closed => "Fermée",
        }
    }

    pub fn badge(&self) -> &'static str {
        match self {
            OfferStatus::Open => "badge-accepted",
            OfferStatus::Closed => "badge-rejected",
        }
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "offres")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub entreprise_id: i32,
    pub titre: String,
    #[sea_orm(column_type = "Text")]
    pub description: String,
    pub localisation: Option<String>,
    pub duree: Option<String>,
    pub remuneration: Option<String>,
    pub competences: Json, // ["Python", "React"]
    pub places: i32,
    pub statut: OfferStatus,
    pub date_publication: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::EntrepriseId",
        to = "super::users::Column::Id"
    )]
    Entreprise,

    #[sea_orm(has_many = "super::candidature::Entity")]
    Candidature,
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Entreprise.def()
    }
}

impl Related<super::candidature::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Candidature.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
