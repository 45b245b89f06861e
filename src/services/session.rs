use chrono::{Duration, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::models::dto::IdentityResponse;
use crate::models::users::Role;
use crate::utils::jwt::{self, Claims};

/// Identité d'une session de démonstration (jamais vérifiée contre la base)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DemoProfile {
    pub user_id: i32,
    pub email: String,
    pub role: Role,
    pub name: String,
}

/// Session courante, résolue une seule fois par requête
#[derive(Debug, Clone)]
pub enum Session {
    Real { token: String, claims: Claims },
    Demo { key: String, profile: DemoProfile },
}

impl Session {
    pub fn user_id(&self) -> i32 {
        match self {
            Session::Real { claims, .. } => claims.sub,
            Session::Demo { profile, .. } => profile.user_id,
        }
    }

    pub fn role(&self) -> Role {
        match self {
            Session::Real { claims, .. } => claims.role,
            Session::Demo { profile, .. } => profile.role,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Session::Real { claims, .. } => &claims.name,
            Session::Demo { profile, .. } => &profile.name,
        }
    }

    pub fn email(&self) -> &str {
        match self {
            Session::Real { claims, .. } => &claims.email,
            Session::Demo { profile, .. } => &profile.email,
        }
    }

    pub fn is_demo(&self) -> bool {
        matches!(self, Session::Demo { .. })
    }

    /// Token à renvoyer au client (JWT ou clé de session démo)
    pub fn token(&self) -> &str {
        match self {
            Session::Real { token, .. } => token,
            Session::Demo { key, .. } => key,
        }
    }

    pub fn require_role(&self, role: Role) -> Result<(), AppError> {
        if self.role() == role {
            Ok(())
        } else {
            Err(AppError::Forbidden)
        }
    }

    pub fn require_any_role(&self, roles: &[Role]) -> Result<(), AppError> {
        if roles.contains(&self.role()) {
            Ok(())
        } else {
            Err(AppError::Forbidden)
        }
    }

    pub fn identity(&self) -> IdentityResponse {
        IdentityResponse {
            user_id: self.user_id(),
            email: self.email().to_string(),
            role: self.role(),
            role_label: self.role().label(),
            name: self.name().to_string(),
            demo: self.is_demo(),
        }
    }
}

/// Durée de vie par défaut d'une session démo
pub const DEMO_SESSION_TTL_HOURS: i64 = 24;
/// Au-delà, la session démo la plus ancienne est évincée
pub const MAX_DEMO_SESSIONS: usize = 10_000;

#[derive(Debug, Clone)]
struct DemoEntry {
    raw: String,
    expires_at: i64,
}

/// Registre en mémoire des sessions ouvertes.
///
/// - `active_tokens`: jti des JWT émis et non révoqués -> exp
/// - `demo_sessions`: clé opaque -> identité démo sérialisée en JSON + expiration
///
/// Les entrées expirées sont purgées à chaque ouverture de session.
/// Un redémarrage du serveur ferme toutes les sessions.
#[derive(Debug)]
pub struct SessionRegistry {
    active_tokens: DashMap<String, i64>,
    demo_sessions: DashMap<String, DemoEntry>,
    demo_ttl: Duration,
    max_demo_sessions: usize,
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::with_demo_ttl(DEMO_SESSION_TTL_HOURS)
    }
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_demo_ttl(hours: i64) -> Self {
        Self {
            active_tokens: DashMap::new(),
            demo_sessions: DashMap::new(),
            demo_ttl: Duration::hours(hours),
            max_demo_sessions: MAX_DEMO_SESSIONS,
        }
    }

    pub fn activate_token(&self, claims: &Claims) {
        self.prune_expired();
        self.active_tokens.insert(claims.jti.clone(), claims.exp);
    }

    pub fn is_token_active(&self, jti: &str) -> bool {
        self.active_tokens.contains_key(jti)
    }

    /// Nombre de sessions ouvertes (réelles, démo)
    pub fn counts(&self) -> (usize, usize) {
        (self.active_tokens.len(), self.demo_sessions.len())
    }

    /// Supprime les tokens et sessions démo expirés
    pub fn prune_expired(&self) {
        let now = Utc::now().timestamp();
        self.active_tokens.retain(|_, exp| *exp > now);
        self.demo_sessions.retain(|_, entry| entry.expires_at > now);
    }

    /// Ouvre une session démo et retourne sa clé
    pub fn open_demo(&self, profile: DemoProfile) -> Result<Session, AppError> {
        self.prune_expired();
        if self.demo_sessions.len() >= self.max_demo_sessions {
            self.evict_oldest_demo();
        }

        let key = format!("demo-{}", uuid::Uuid::new_v4());
        let serialized = serde_json::to_string(&profile)
            .map_err(|e| AppError::Database(format!("Failed to store demo session: {}", e)))?;
        let expires_at = (Utc::now() + self.demo_ttl).timestamp();
        self.demo_sessions.insert(
            key.clone(),
            DemoEntry {
                raw: serialized,
                expires_at,
            },
        );
        tracing::debug!(sessions = ?self.counts(), "Demo session opened");
        Ok(Session::Demo { key, profile })
    }

    fn evict_oldest_demo(&self) {
        let oldest = self
            .demo_sessions
            .iter()
            .min_by_key(|entry| entry.value().expires_at)
            .map(|entry| entry.key().clone());
        if let Some(key) = oldest {
            tracing::warn!("Demo session limit reached, evicting the oldest");
            self.demo_sessions.remove(&key);
        }
    }

    /// Lit une session démo; une entrée expirée ou illisible est supprimée
    pub fn demo(&self, key: &str) -> Option<Session> {
        let entry = self.demo_sessions.get(key)?.value().clone();
        if entry.expires_at <= Utc::now().timestamp() {
            self.demo_sessions.remove(key);
            return None;
        }
        match serde_json::from_str::<DemoProfile>(&entry.raw) {
            Ok(profile) => Some(Session::Demo {
                key: key.to_string(),
                profile,
            }),
            Err(e) => {
                tracing::warn!("Discarding unreadable demo session: {}", e);
                self.demo_sessions.remove(key);
                None
            }
        }
    }

    /// Résout la session d'une requête.
    /// La session démo passe AVANT le token réel: un JWT resté dans le client
    /// ne doit pas masquer une connexion démo plus récente.
    pub fn resolve(
        &self,
        secret: &str,
        demo_key: Option<&str>,
        bearer: Option<&str>,
    ) -> Option<Session> {
        if let Some(session) = demo_key.and_then(|key| self.demo(key)) {
            return Some(session);
        }

        let token = bearer?;
        if let Some(session) = self.demo(token) {
            return Some(session);
        }

        let claims = jwt::verify_token(secret, token).ok()?;
        if !self.is_token_active(&claims.jti) {
            return None;
        }

        Some(Session::Real {
            token: token.to_string(),
            claims,
        })
    }

    /// Ferme la session (démo et réelle)
    pub fn revoke(&self, session: &Session) {
        match session {
            Session::Real { claims, .. } => {
                self.active_tokens.remove(&claims.jti);
            }
            Session::Demo { key, .. } => {
                self.demo_sessions.remove(key);
            }
        }
    }

    /// Logout: ferme la session démo ET la session réelle portées par la requête.
    /// Un JWT expiré mais bien signé est aussi retiré du registre.
    pub fn logout(&self, secret: &str, demo_key: Option<&str>, bearer: Option<&str>) {
        if let Some(key) = demo_key {
            self.demo_sessions.remove(key);
        }
        if let Some(token) = bearer {
            self.demo_sessions.remove(token);
            if let Ok(claims) = jwt::decode_signed(secret, token) {
                self.active_tokens.remove(&claims.jti);
            }
        }
    }

    #[cfg(test)]
    pub(crate) fn insert_raw_demo(&self, key: &str, raw: &str) {
        self.demo_sessions.insert(
            key.to_string(),
            DemoEntry {
                raw: raw.to_string(),
                expires_at: (Utc::now() + self.demo_ttl).timestamp(),
            },
        );
    }
}
