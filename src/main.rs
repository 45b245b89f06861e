mod config;
mod db;
mod error;
mod middleware;
mod models;
mod routes;
mod services;
mod utils;

use actix_web::{App, HttpServer, middleware::Logger, web};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::config::AppConfig;
use crate::services::session::SessionRegistry;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = AppConfig::from_env().map_err(|e| {
        error!("Invalid configuration: {}", e);
        std::io::Error::other(e)
    })?;

    info!("🔌 Connecting to database...");
    let db = db::establish_connection(&config.database_url)
        .await
        .map_err(|e| {
            error!("Failed to connect to database: {}", e);
            std::io::Error::other(e)
        })?;
    info!("✅ Database connected!");

    db::ensure_schema(&db).await.map_err(std::io::Error::other)?;
    if config.auth.demo_accounts {
        services::demo::seed_demo_accounts(&db)
            .await
            .map_err(std::io::Error::other)?;
    }

    // Sessions en mémoire: un redémarrage déconnecte tout le monde
    let db = web::Data::new(db);
    let registry = web::Data::new(SessionRegistry::with_demo_ttl(config.auth.token_ttl_hours));
    let auth_config = web::Data::new(config.auth.clone());

    info!("🚀 Starting server on http://{}:{}", config.host, config.port);

    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .app_data(db.clone())
            .app_data(registry.clone())
            .app_data(auth_config.clone())
            .configure(routes::configure_routes)
    })
        .bind((config.host.as_str(), config.port))?
        .run()
        .await
}
