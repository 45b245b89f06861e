use serde::{Serialize, Deserialize};
use sea_orm::entity::prelude::*;

pub const ACCESS_LEVELS: [&str; 3] = ["lecture", "ecriture", "admin"];
pub const DEFAULT_ACCESS_LEVEL: &str = "lecture";

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "administration")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id_utilisateur: i32,
    pub departement: Option<String>,
    pub fonction: Option<String>,
    pub niveau_acces: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::IdUtilisateur",
        to = "super::users::Column::Id",
        on_delete = "Cascade"
    )]
    User,
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
