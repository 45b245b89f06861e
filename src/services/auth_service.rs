use chrono::Utc;
use sea_orm::*;
use validator::Validate;

use crate::config::AuthConfig;
use crate::error::AppError;
use crate::models::dto::{
    AuthResponse, ChangePasswordRequest, LoginRequest, ProfileFields, RegisterRequest,
};
use crate::models::users::{self, Role};
use crate::models::{administration, entreprise, etudiant};
use crate::services::demo;
use crate::services::session::{Session, SessionRegistry};
use crate::utils::{jwt, password};

pub const UNKNOWN_EMAIL: &str = "Email non trouvé";
pub const WRONG_PASSWORD: &str = "Mot de passe incorrect";

pub struct AuthService;

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn clean(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Règles du formulaire vérifiées avant toute écriture
fn check_registration(request: &RegisterRequest) -> Result<(), AppError> {
    password::check_new_password(&request.password, &request.confirm_password)
        .map_err(AppError::Validation)?;
    request.validate()?;

    if request.nom.trim().is_empty() {
        return Err(AppError::Validation("Le nom est requis".to_string()));
    }
    if request.role == Role::Company
        && clean(request.profile.nom_societe.clone()).is_none()
    {
        return Err(AppError::Validation(
            "Le nom de la société est requis".to_string(),
        ));
    }
    if let Some(level) = request.profile.niveau_acces.as_deref() {
        if !administration::ACCESS_LEVELS.contains(&level) {
            return Err(AppError::Validation(format!("Niveau d'accès invalide: {}", level)));
        }
    }
    if demo::find_account(&request.email).is_some() {
        return Err(AppError::Conflict(
            "Cet email est réservé aux comptes de démonstration".to_string(),
        ));
    }
    Ok(())
}

/// Ligne de profil propre au rôle, écrite dans la même transaction que l'utilisateur
async fn insert_profile<C: ConnectionTrait>(
    conn: &C,
    user_id: i32,
    role: Role,
    fields: ProfileFields,
) -> Result<(), AppError> {
    match role {
        Role::Student => {
            etudiant::ActiveModel {
                id_utilisateur: Set(user_id),
                filiere: Set(clean(fields.filiere)),
                niveau: Set(clean(fields.niveau)),
                date_naissance: Set(fields.date_naissance),
            }
            .insert(conn)
            .await?;
        }
        Role::Company => {
            entreprise::ActiveModel {
                id_utilisateur: Set(user_id),
                nom_societe: Set(clean(fields.nom_societe).unwrap_or_default()),
                secteur_activite: Set(clean(fields.secteur_activite)),
                site_web: Set(clean(fields.site_web)),
                description: Set(clean(fields.description)),
                statut_validation: Set(entreprise::VALIDATION_PENDING.to_string()),
            }
            .insert(conn)
            .await?;
        }
        Role::Administration => {
            administration::ActiveModel {
                id_utilisateur: Set(user_id),
                departement: Set(clean(fields.departement)),
                fonction: Set(clean(fields.fonction)),
                niveau_acces: Set(clean(fields.niveau_acces)
                    .unwrap_or_else(|| administration::DEFAULT_ACCESS_LEVEL.to_string())),
            }
            .insert(conn)
            .await?;
        }
    }
    Ok(())
}

impl AuthService {
    /// Connexion: comptes démo d'abord (sans base), puis comptes réels
    pub async fn login(
        db: &DatabaseConnection,
        registry: &SessionRegistry,
        config: &AuthConfig,
        request: LoginRequest,
    ) -> Result<AuthResponse, AppError> {
        request.validate()?;

        if config.demo_accounts {
            if let Some(result) = demo::authenticate(&request.email, &request.password) {
                let profile = result.map_err(|msg| AppError::Unauthorized(msg.to_string()))?;
                let session = registry.open_demo(profile)?;
                tracing::info!(user_id = session.user_id(), "Demo login");
                return Ok(Self::respond(&session));
            }
        }

        let email = normalize_email(&request.email);
        let user = users::Entity::find()
            .filter(users::Column::Email.eq(&email))
            .one(db)
            .await?
            .ok_or_else(|| AppError::Unauthorized(UNKNOWN_EMAIL.to_string()))?;

        let stored = user
            .password_hash
            .as_deref()
            .ok_or_else(|| AppError::Unauthorized(WRONG_PASSWORD.to_string()))?;
        let valid = password::verify_password(&request.password, stored)
            .map_err(|e| AppError::Database(format!("Password verification error: {}", e)))?;
        if !valid {
            tracing::warn!(user_id = user.id, "Failed login attempt");
            return Err(AppError::Unauthorized(WRONG_PASSWORD.to_string()));
        }

        let session = Self::open_real_session(registry, config, &user)?;
        tracing::info!(user_id = user.id, role = user.role.as_str(), "User logged in");
        Ok(Self::respond(&session))
    }

    /// Inscription: utilisateur + profil en une transaction, puis connexion
    pub async fn register(
        db: &DatabaseConnection,
        registry: &SessionRegistry,
        config: &AuthConfig,
        request: RegisterRequest,
    ) -> Result<AuthResponse, AppError> {
        check_registration(&request)?;
        let email = normalize_email(&request.email);

        let existing = users::Entity::find()
            .filter(users::Column::Email.eq(&email))
            .one(db)
            .await?;
        if existing.is_some() {
            return Err(AppError::Conflict(
                "Un compte existe déjà avec cet email".to_string(),
            ));
        }

        let password_hash = password::hash_password(&request.password)
            .map_err(|e| AppError::Database(format!("Failed to hash password: {}", e)))?;

        let txn = db.begin().await?;

        let user = users::ActiveModel {
            email: Set(email),
            password_hash: Set(Some(password_hash)),
            role: Set(request.role),
            nom: Set(request.nom.trim().to_string()),
            prenom: Set(request.prenom.trim().to_string()),
            telephone: Set(clean(request.telephone)),
            adresse: Set(clean(request.adresse)),
            created_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        insert_profile(&txn, user.id, user.role, request.profile).await?;
        txn.commit().await?;

        tracing::info!(user_id = user.id, role = user.role.as_str(), "User registered");

        let session = Self::open_real_session(registry, config, &user)?;
        Ok(Self::respond(&session))
    }

    /// Changement de mot de passe (comptes réels uniquement)
    /// Le mot de passe changé, l'ancien token est révoqué et un nouveau est émis
    pub async fn change_password(
        db: &DatabaseConnection,
        registry: &SessionRegistry,
        config: &AuthConfig,
        session: &Session,
        request: ChangePasswordRequest,
    ) -> Result<AuthResponse, AppError> {
        if session.is_demo() {
            return Err(AppError::Forbidden);
        }
        password::check_new_password(&request.new_password, &request.confirm_password)
            .map_err(AppError::Validation)?;

        let user = users::Entity::find_by_id(session.user_id())
            .one(db)
            .await?
            .ok_or_else(|| AppError::NotFound("Utilisateur introuvable".to_string()))?;

        let stored = user.password_hash.as_deref().unwrap_or_default();
        let valid = password::verify_password(&request.current_password, stored)
            .unwrap_or(false);
        if !valid {
            return Err(AppError::Unauthorized(WRONG_PASSWORD.to_string()));
        }

        let new_hash = password::hash_password(&request.new_password)
            .map_err(|e| AppError::Database(format!("Failed to hash password: {}", e)))?;

        let mut active: users::ActiveModel = user.into();
        active.password_hash = Set(Some(new_hash));
        let user = active.update(db).await?;

        registry.revoke(session);
        let rotated = Self::open_real_session(registry, config, &user)?;
        tracing::info!(user_id = user.id, "Password changed, session rotated");
        Ok(Self::respond(&rotated))
    }

    fn open_real_session(
        registry: &SessionRegistry,
        config: &AuthConfig,
        user: &users::Model,
    ) -> Result<Session, AppError> {
        let (token, claims) = jwt::generate_token(
            &config.jwt_secret,
            config.token_ttl_hours,
            user.id,
            &user.email,
            user.role,
            &user.display_name(),
        )
        .map_err(AppError::Database)?;

        registry.activate_token(&claims);
        Ok(Session::Real { token, claims })
    }

    fn respond(session: &Session) -> AuthResponse {
        AuthResponse {
            token: session.token().to_string(),
            user: session.identity(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> AuthConfig {
        AuthConfig {
            jwt_secret: "test-secret".into(),
            ..AuthConfig::default()
        }
    }

    fn login(email: &str, password: &str) -> LoginRequest {
        LoginRequest {
            email: email.into(),
            password: password.into(),
        }
    }

    fn registration(role: Role, password: &str, confirm: &str) -> RegisterRequest {
        RegisterRequest {
            email: "lea@univ.fr".into(),
            password: password.into(),
            confirm_password: confirm.into(),
            role,
            nom: "Roux".into(),
            prenom: "Léa".into(),
            telephone: None,
            adresse: None,
            profile: ProfileFields::default(),
        }
    }

    fn user_row(hash: Option<String>) -> users::Model {
        users::Model {
            id: 12,
            email: "lea@univ.fr".into(),
            password_hash: hash,
            role: Role::Student,
            nom: "Roux".into(),
            prenom: "Léa".into(),
            telephone: None,
            adresse: None,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_demo_login_never_touches_the_database() {
        let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();
        let registry = SessionRegistry::new();

        let response = AuthService::login(&db, &registry, &config(), login("user@example.com", "password"))
            .await
            .unwrap();

        assert!(response.user.demo);
        assert_eq!(response.user.role, Role::Student);
        assert_eq!(response.user.name, "Jean Dupont");
        assert!(registry.resolve("test-secret", Some(&response.token), None).is_some());
        assert!(db.into_transaction_log().is_empty());
    }

    #[tokio::test]
    async fn test_demo_login_with_wrong_password() {
        let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();
        let registry = SessionRegistry::new();

        let result =
            AuthService::login(&db, &registry, &config(), login("admin@example.com", "secret")).await;

        match result {
            Err(AppError::Unauthorized(msg)) => assert_eq!(msg, WRONG_PASSWORD),
            other => panic!("unexpected result: {:?}", other.map(|r| r.token)),
        }
    }

    #[tokio::test]
    async fn test_unknown_email() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<users::Model>::new()])
            .into_connection();
        let registry = SessionRegistry::new();

        let result =
            AuthService::login(&db, &registry, &config(), login("nobody@univ.fr", "whatever")).await;

        match result {
            Err(AppError::Unauthorized(msg)) => assert_eq!(msg, UNKNOWN_EMAIL),
            other => panic!("unexpected result: {:?}", other.map(|r| r.token)),
        }
    }

    #[tokio::test]
    async fn test_real_login_opens_a_revocable_session() {
        let hash = password::hash_password("secret1").unwrap();
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![user_row(Some(hash))]])
            .into_connection();
        let registry = SessionRegistry::new();

        let response = AuthService::login(&db, &registry, &config(), login("Lea@Univ.fr ", "secret1"))
            .await
            .unwrap();

        assert!(!response.user.demo);
        assert_eq!(response.user.name, "Léa Roux");
        let session = registry
            .resolve("test-secret", None, Some(&response.token))
            .unwrap();
        assert_eq!(session.user_id(), 12);

        registry.logout("test-secret", None, Some(&response.token));
        assert!(registry.resolve("test-secret", None, Some(&response.token)).is_none());
    }

    #[tokio::test]
    async fn test_password_mismatch_is_rejected_before_any_write() {
        let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();
        let registry = SessionRegistry::new();

        let result = AuthService::register(
            &db,
            &registry,
            &config(),
            registration(Role::Student, "secret1", "secret2"),
        )
        .await;

        match result {
            Err(AppError::Validation(msg)) => {
                assert_eq!(msg, "Les mots de passe ne correspondent pas.")
            }
            other => panic!("unexpected result: {:?}", other.map(|r| r.token)),
        }
        assert!(db.into_transaction_log().is_empty());
    }

    #[tokio::test]
    async fn test_company_requires_company_name() {
        let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();
        let registry = SessionRegistry::new();

        let result = AuthService::register(
            &db,
            &registry,
            &config(),
            registration(Role::Company, "secret1", "secret1"),
        )
        .await;

        assert!(matches!(result, Err(AppError::Validation(_))));
        assert!(db.into_transaction_log().is_empty());
    }

    #[tokio::test]
    async fn test_demo_email_cannot_be_registered() {
        let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();
        let registry = SessionRegistry::new();
        let mut request = registration(Role::Student, "secret1", "secret1");
        request.email = "user@example.com".into();

        let result = AuthService::register(&db, &registry, &config(), request).await;
        assert!(matches!(result, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_student_registration() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<users::Model>::new()])
            .append_query_results([vec![user_row(Some("hash".into()))]])
            .append_query_results([vec![etudiant::Model {
                id_utilisateur: 12,
                filiere: None,
                niveau: None,
                date_naissance: None,
            }]])
            .into_connection();
        let registry = SessionRegistry::new();

        let response = AuthService::register(
            &db,
            &registry,
            &config(),
            registration(Role::Student, "secret1", "secret1"),
        )
        .await
        .unwrap();

        assert_eq!(response.user.user_id, 12);
        assert_eq!(response.user.role_label, "Étudiant");
        assert!(registry.resolve("test-secret", None, Some(&response.token)).is_some());
    }

    #[tokio::test]
    async fn test_demo_session_cannot_change_password() {
        let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();
        let result = AuthService::change_password(
            &db,
            &SessionRegistry::new(),
            &config(),
            &crate::services::session::tests::student_demo(),
            ChangePasswordRequest {
                current_password: "password".into(),
                new_password: "secret1".into(),
                confirm_password: "secret1".into(),
            },
        )
        .await;
        assert!(matches!(result, Err(AppError::Forbidden)));
    }
}
