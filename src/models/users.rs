use serde::{Serialize, Deserialize};
use sea_orm::entity::prelude::*;

/// Rôle attaché à l'identité, fixé à l'inscription
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
pub enum Role {
    #[sea_orm(string_value = "etudiant")]
    #[serde(rename = "etudiant")]
    Student,
    #[sea_orm(string_value = "entreprise")]
    #[serde(rename = "entreprise")]
    Company,
    #[sea_orm(string_value = "administration")]
    #[serde(rename = "administration", alias = "admin")]
    Administration,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Student => "etudiant",
            Role::Company => "entreprise",
            Role::Administration => "administration",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Role::Student => "Étudiant",
            Role::Company => "Entreprise",
            Role::Administration => "Administration",
        }
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "utilisateur")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique)]
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: Option<String>, // Format: pbkdf2:sha256:iterations$salt$hash (None pour les comptes démo)
    pub role: Role,
    pub nom: String,
    pub prenom: String,
    pub telephone: Option<String>,
    pub adresse: Option<String>,
    pub created_at: DateTimeUtc,
}

impl Model {
    /// Nom affiché: "Prénom Nom", ou le nom seul pour une entreprise
    pub fn display_name(&self) -> String {
        if self.prenom.trim().is_empty() {
            self.nom.clone()
        } else {
            format!("{} {}", self.prenom, self.nom)
        }
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::offre::Entity")]
    Offre,

    #[sea_orm(has_many = "super::candidature::Entity")]
    Candidature,
}

impl Related<super::offre::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Offre.def()
    }
}

impl Related<super::candidature::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Candidature.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
