use serde::{Serialize, Deserialize};
use sea_orm::entity::prelude::*;

/// Statut de validation du compte entreprise à l'inscription
pub const VALIDATION_PENDING: &str = "en_attente";

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "entreprise")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id_utilisateur: i32,
    pub nom_societe: String,
    pub secteur_activite: Option<String>,
    pub site_web: Option<String>,
    pub description: Option<String>,
    pub statut_validation: String,
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
