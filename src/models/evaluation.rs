use serde::{Serialize, Deserialize};
use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "evaluations")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub convention_id: i32,
    pub evaluateur_id: i32,
    pub note_entreprise: Decimal, // 0-5
    #[sea_orm(column_type = "Text")]
    pub commentaire: String,
    #[sea_orm(column_type = "Text", nullable)]
    pub points_forts: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub axes_amelioration: Option<String>,
    pub note_finale: Option<Decimal>, // 0-20, saisie par l'administration
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::convention::Entity",
        from = "Column::ConventionId",
        to = "super::convention::Column::Id",
        on_delete = "Cascade"
    )]
    Convention,

    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::EvaluateurId",
        to = "super::users::Column::Id"
    )]
    Evaluateur,
}

impl Related<super::convention::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Convention.def()
    }
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Evaluateur.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
