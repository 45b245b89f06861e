// Comptes de démonstration: mot de passe partagé, aucune vérification en base.
// Les lignes utilisateur correspondantes sont créées au démarrage (ids fixes)
// pour que les offres/candidatures des comptes démo respectent les clés étrangères.

use chrono::Utc;
use sea_orm::sea_query::OnConflict;
use sea_orm::{ConnectionTrait, DatabaseConnection, DbErr, EntityTrait, Set, TransactionTrait};
use tracing::info;

use crate::models::{administration, entreprise, etudiant, users};
use crate::models::users::Role;
use crate::services::session::DemoProfile;

pub const DEMO_PASSWORD: &str = "password";

pub struct DemoAccount {
    pub user_id: i32,
    pub email: &'static str,
    pub role: Role,
    pub prenom: &'static str,
    pub nom: &'static str,
}

pub const DEMO_ACCOUNTS: [DemoAccount; 3] = [
    DemoAccount {
        user_id: 900_001,
        email: "user@example.com",
        role: Role::Student,
        prenom: "Jean",
        nom: "Dupont",
    },
    DemoAccount {
        user_id: 900_002,
        email: "entrepris@example.com",
        role: Role::Company,
        prenom: "",
        nom: "TechCorp",
    },
    DemoAccount {
        user_id: 900_003,
        email: "admin@example.com",
        role: Role::Administration,
        prenom: "",
        nom: "Administrateur",
    },
];

impl DemoAccount {
    pub fn display_name(&self) -> String {
        if self.prenom.is_empty() {
            self.nom.to_string()
        } else {
            format!("{} {}", self.prenom, self.nom)
        }
    }

    pub fn profile(&self) -> DemoProfile {
        DemoProfile {
            user_id: self.user_id,
            email: self.email.to_string(),
            role: self.role,
            name: self.display_name(),
        }
    }
}

pub fn find_account(email: &str) -> Option<&'static DemoAccount> {
    let email = email.trim();
    DEMO_ACCOUNTS
        .iter()
        .find(|a| a.email.eq_ignore_ascii_case(email))
}

/// Vérifie les identifiants d'un compte démo (None si l'email n'est pas un compte démo)
pub fn authenticate(email: &str, password: &str) -> Option<Result<DemoProfile, &'static str>> {
    let account = find_account(email)?;
    if password != DEMO_PASSWORD {
        return Some(Err("Mot de passe incorrect"));
    }
    Some(Ok(account.profile()))
}

/// Crée les lignes utilisateur + profil des comptes démo si absentes.
/// Chaque compte est écrit dans sa propre transaction.
pub async fn seed_demo_accounts(db: &DatabaseConnection) -> Result<(), DbErr> {
    let mut inserted = 0u32;

    for account in DEMO_ACCOUNTS.iter() {
        let txn = db.begin().await?;
        if seed_account(&txn, account).await? {
            inserted += 1;
        }
        txn.commit().await?;
    }

    if inserted > 0 {
        info!("Seeded {} demo accounts", inserted);
    }

    Ok(())
}

/// true si la ligne utilisateur vient d'être créée.
/// Le profil est toujours (ré)inséré: un compte sans profil se répare au démarrage.
async fn seed_account<C: ConnectionTrait>(conn: &C, account: &DemoAccount) -> Result<bool, DbErr> {
    let user = users::ActiveModel {
        id: Set(account.user_id),
        email: Set(account.email.to_string()),
        password_hash: Set(None),
        role: Set(account.role),
        nom: Set(account.nom.to_string()),
        prenom: Set(account.prenom.to_string()),
        telephone: Set(None),
        adresse: Set(None),
        created_at: Set(Utc::now()),
    };

    let created = match users::Entity::insert(user)
        .on_conflict(OnConflict::column(users::Column::Id).do_nothing().to_owned())
        .exec_without_returning(conn)
        .await
    {
        Ok(n) => n > 0,
        Err(DbErr::RecordNotInserted) => false,
        Err(e) => return Err(e),
    };

    let profile = match account.role {
        Role::Student => {
            etudiant::Entity::insert(etudiant::ActiveModel {
                id_utilisateur: Set(account.user_id),
                filiere: Set(Some("Informatique".to_string())),
                niveau: Set(Some("Master 1".to_string())),
                date_naissance: Set(None),
            })
            .on_conflict(
                OnConflict::column(etudiant::Column::IdUtilisateur)
                    .do_nothing()
                    .to_owned(),
            )
            .exec_without_returning(conn)
            .await
        }
        Role::Company => {
            entreprise::Entity::insert(entreprise::ActiveModel {
                id_utilisateur: Set(account.user_id),
                nom_societe: Set(account.nom.to_string()),
                secteur_activite: Set(Some("Technologie & Développement".to_string())),
                site_web: Set(None),
                description: Set(None),
                statut_validation: Set("validee".to_string()),
            })
            .on_conflict(
                OnConflict::column(entreprise::Column::IdUtilisateur)
                    .do_nothing()
                    .to_owned(),
            )
            .exec_without_returning(conn)
            .await
        }
        Role::Administration => {
            administration::Entity::insert(administration::ActiveModel {
                id_utilisateur: Set(account.user_id),
                departement: Set(Some("Gestion des Stages".to_string())),
                fonction: Set(None),
                niveau_acces: Set("admin".to_string()),
            })
            .on_conflict(
                OnConflict::column(administration::Column::IdUtilisateur)
                    .do_nothing()
                    .to_owned(),
            )
            .exec_without_returning(conn)
            .await
        }
    };

    match profile {
        Ok(_) | Err(DbErr::RecordNotInserted) => Ok(created),
        Err(e) => Err(e),
    }
}
