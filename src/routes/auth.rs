use actix_web::cookie::{Cookie, SameSite};
use actix_web::{get, post, web, HttpRequest, HttpResponse};
use sea_orm::DatabaseConnection;
use serde::Deserialize;

use crate::config::AuthConfig;
use crate::error::AppError;
use crate::middleware::{bearer_token, demo_cookie, OptionalSession, DEMO_COOKIE};
use crate::models::dto::{AuthResponse, ChangePasswordRequest, LoginRequest, RegisterRequest};
use crate::services::auth_service::AuthService;
use crate::services::guard;
use crate::services::session::{Session, SessionRegistry};

#[derive(Deserialize)]
pub struct GuardQuery {
    pub path: String,
}

/// La clé démo est aussi posée en cookie pour les navigateurs
fn with_session_cookie(mut builder: actix_web::HttpResponseBuilder, body: AuthResponse) -> HttpResponse {
    if body.user.demo {
        builder.cookie(
            Cookie::build(DEMO_COOKIE, body.token.clone())
                .path("/")
                .http_only(true)
                .same_site(SameSite::Lax)
                .finish(),
        );
    }
    builder.json(body)
}

/// POST /auth/register - Créer un compte (PUBLIC)
#[post("/register")]
pub async fn register(
    body: web::Json<RegisterRequest>,
    db: web::Data<DatabaseConnection>,
    registry: web::Data<SessionRegistry>,
    config: web::Data<AuthConfig>,
) -> Result<HttpResponse, AppError> {
    let response = AuthService::register(&db, &registry, &config, body.into_inner()).await?;
    Ok(HttpResponse::Created().json(response))
}

/// POST /auth/login - Se connecter (PUBLIC)
#[post("/login")]
pub async fn login(
    body: web::Json<LoginRequest>,
    db: web::Data<DatabaseConnection>,
    registry: web::Data<SessionRegistry>,
    config: web::Data<AuthConfig>,
) -> Result<HttpResponse, AppError> {
    let response = AuthService::login(&db, &registry, &config, body.into_inner()).await?;
    Ok(with_session_cookie(HttpResponse::Ok(), response))
}

/// POST /auth/logout - Ferme la session démo ET la session réelle
#[post("/logout")]
pub async fn logout(
    req: HttpRequest,
    registry: web::Data<SessionRegistry>,
    config: web::Data<AuthConfig>,
) -> HttpResponse {
    let demo_key = demo_cookie(&req);
    registry.logout(&config.jwt_secret, demo_key.as_deref(), bearer_token(&req));

    let mut expired = Cookie::build(DEMO_COOKIE, "").path("/").finish();
    expired.make_removal();

    HttpResponse::Ok()
        .cookie(expired)
        .json(serde_json::json!({ "success": true }))
}

/// GET /auth/me - Identité courante (PUBLIC, authenticated=false sans session)
#[get("/me")]
pub async fn me(session: OptionalSession) -> HttpResponse {
    match session.0 {
        Some(session) => HttpResponse::Ok().json(serde_json::json!({
            "authenticated": true,
            "user": session.identity(),
        })),
        None => HttpResponse::Ok().json(serde_json::json!({
            "authenticated": false,
            "user": null,
        })),
    }
}

/// GET /auth/guard?path=/etudiant/... - Décision de navigation du client
#[get("/guard")]
pub async fn check_route(session: OptionalSession, query: web::Query<GuardQuery>) -> HttpResponse {
    let decision = guard::check_path(session.0.as_ref(), &query.path);
    HttpResponse::Ok().json(decision)
}

/// POST /auth/change-password - Changer son mot de passe (PROTÉGÉE)
#[post("/change-password")]
pub async fn change_password(
    session: Session,
    body: web::Json<ChangePasswordRequest>,
    db: web::Data<DatabaseConnection>,
    registry: web::Data<SessionRegistry>,
    config: web::Data<AuthConfig>,
) -> Result<HttpResponse, AppError> {
    let response =
        AuthService::change_password(&db, &registry, &config, &session, body.into_inner()).await?;
    Ok(HttpResponse::Ok().json(response))
}

pub fn auth_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/auth")
            .service(register)
            .service(login)
            .service(logout)
            .service(me)
            .service(check_route)
            .service(change_password),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{test, App};
    use sea_orm::{DatabaseBackend, MockDatabase};
    use serde_json::{json, Value};

    #[actix_web::test]
    async fn test_demo_login_logout_then_guard_redirects_to_login() {
        let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(db))
                .app_data(web::Data::new(SessionRegistry::new()))
                .app_data(web::Data::new(AuthConfig::default()))
                .configure(auth_routes),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/auth/login")
            .set_json(json!({ "email": "user@example.com", "password": "password" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert!(resp.status().is_success());
        let cookie = resp
            .response()
            .cookies()
            .find(|c| c.name() == DEMO_COOKIE)
            .map(|c| c.into_owned())
            .unwrap();
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["user"]["role"], "etudiant");
        assert_eq!(body["user"]["name"], "Jean Dupont");

        let req = test::TestRequest::get()
            .uri("/auth/guard?path=/etudiant/candidatures")
            .cookie(cookie.clone())
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["decision"], "allow");

        let req = test::TestRequest::get()
            .uri("/auth/guard?path=/admin")
            .cookie(cookie.clone())
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body, json!({ "decision": "redirect", "to": "/" }));

        let req = test::TestRequest::post()
            .uri("/auth/logout")
            .cookie(cookie.clone())
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert!(resp.status().is_success());

        let req = test::TestRequest::get()
            .uri("/auth/guard?path=/etudiant/candidatures")
            .cookie(cookie.clone())
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body, json!({ "decision": "redirect", "to": "/login" }));

        let req = test::TestRequest::get()
            .uri("/auth/me")
            .cookie(cookie)
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["authenticated"], false);
    }

    #[actix_web::test]
    async fn test_wrong_demo_password_is_401_with_message() {
        let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(db))
                .app_data(web::Data::new(SessionRegistry::new()))
                .app_data(web::Data::new(AuthConfig::default()))
                .configure(auth_routes),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/auth/login")
            .set_json(json!({ "email": "admin@example.com", "password": "nope" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), actix_web::http::StatusCode::UNAUTHORIZED);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body, json!({ "error": "Mot de passe incorrect" }));
    }
}
