use actix_web::{dev::Payload, web, FromRequest, HttpRequest};
use futures::future::{ready, Ready};

use crate::config::AuthConfig;
use crate::error::AppError;
use crate::services::session::{Session, SessionRegistry};

/// Cookie portant la clé de session démo
pub const DEMO_COOKIE: &str = "demo_session";

/// Token du header Authorization (format: "Bearer <token>")
pub fn bearer_token(req: &HttpRequest) -> Option<&str> {
    req.headers()
        .get("Authorization")?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

pub fn demo_cookie(req: &HttpRequest) -> Option<String> {
    req.cookie(DEMO_COOKIE).map(|c| c.value().to_string())
}

fn resolve(req: &HttpRequest) -> Result<Option<Session>, AppError> {
    let registry = req
        .app_data::<web::Data<SessionRegistry>>()
        .ok_or_else(|| AppError::Database("Session registry not configured".to_string()))?;
    let config = req
        .app_data::<web::Data<AuthConfig>>()
        .ok_or_else(|| AppError::Database("Auth config not configured".to_string()))?;

    let demo_key = demo_cookie(req);
    Ok(registry.resolve(&config.jwt_secret, demo_key.as_deref(), bearer_token(req)))
}

/// Session obligatoire: 401 si aucune session valide.
/// La session démo est consultée avant le JWT.
impl FromRequest for Session {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(resolve(req).and_then(|session| {
            session.ok_or_else(|| AppError::Unauthorized("Authentification requise".to_string()))
        }))
    }
}

/// Session facultative (routes publiques: me, guard)
pub struct OptionalSession(pub Option<Session>);

impl FromRequest for OptionalSession {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(resolve(req).map(OptionalSession))
    }
}
