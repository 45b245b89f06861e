use serde::{Serialize, Deserialize};
use sea_orm::entity::prelude::*;

// Extension de profil des étudiants (clé = id utilisateur)
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "etudiant")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id_utilisateur: i32,
    pub filiere: Option<String>,
    pub niveau: Option<String>,
    pub date_naissance: Option<Date>,
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
