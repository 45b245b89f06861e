// Configuration de l'application, lue une seule fois au démarrage
// depuis l'environnement (.env chargé par dotenv dans main.rs).

use std::env;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub auth: AuthConfig,
}

/// Paramètres des sessions (JWT + comptes de démonstration)
#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub token_ttl_hours: i64,
    pub demo_accounts: bool,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: "default-insecure-key-change-this".to_string(),
            token_ttl_hours: 24,
            demo_accounts: true,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, String> {
        let database_url = env::var("DATABASE_URL")
            .map_err(|_| "DATABASE_URL must be set in .env file".to_string())?;

        let host = env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = match env::var("PORT") {
            Ok(p) => p.parse::<u16>().map_err(|_| format!("Invalid PORT: {}", p))?,
            Err(_) => 8080,
        };

        let defaults = AuthConfig::default();
        let jwt_secret = env::var("JWT_SECRET").unwrap_or_else(|_| {
            tracing::warn!("JWT_SECRET not found in .env, using default (INSECURE)");
            defaults.jwt_secret.clone()
        });
        let token_ttl_hours = match env::var("TOKEN_TTL_HOURS") {
            Ok(v) => v
                .parse::<i64>()
                .map_err(|_| format!("Invalid TOKEN_TTL_HOURS: {}", v))?,
            Err(_) => defaults.token_ttl_hours,
        };
        let demo_accounts = env::var("DEMO_ACCOUNTS")
            .map(|v| parse_flag(&v))
            .unwrap_or(defaults.demo_accounts);

        Ok(Self {
            database_url,
            host,
            port,
            auth: AuthConfig {
                jwt_secret,
                token_ttl_hours,
                demo_accounts,
            },
        })
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_flag() {
        assert!(parse_flag("true"));
        assert!(parse_flag(" ON "));
        assert!(parse_flag("1"));
        assert!(!parse_flag("false"));
        assert!(!parse_flag("0"));
        assert!(!parse_flag(""));
    }
}
