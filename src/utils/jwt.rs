use jsonwebtoken::{encode, decode, Header, Validation, EncodingKey, DecodingKey, Algorithm};
use serde::{Deserialize, Serialize};
use chrono::{Utc, Duration};

use crate::models::users::Role;

/// Contenu du token d'une session réelle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: i32,        // user_id
    pub email: String,
    pub role: Role,
    pub name: String,
    pub jti: String,     // identifiant de session, révoqué au logout
    pub exp: i64,        // expiration timestamp
}

/// Génère un JWT pour un utilisateur. Retourne (token, claims).
pub fn generate_token(
    secret: &str,
    ttl_hours: i64,
    user_id: i32,
    email: &str,
    role: Role,
    name: &str,
) -> Result<(String, Claims), String> {
    let expiration = Utc::now()
        .checked_add_signed(Duration::hours(ttl_hours))
        .ok_or("Failed to calculate expiration")?
        .timestamp();

    let claims = Claims {
        sub: user_id,
        email: email.to_string(),
        role,
        name: name.to_string(),
        jti: uuid::Uuid::new_v4().to_string(),
        exp: expiration,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_ref()),
    )
        .map_err(|e| format!("Failed to generate token: {}", e))?;

    Ok((token, claims))
}

/// Vérifie et décode un JWT
pub fn verify_token(secret: &str, token: &str) -> Result<Claims, String> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_ref()),
        &Validation::new(Algorithm::HS256),
    )
        .map(|data| data.claims)
        .map_err(|e| format!("Invalid token: {}", e))
}

/// Vérifie la signature sans rejeter un token expiré (logout)
pub fn decode_signed(secret: &str, token: &str) -> Result<Claims, String> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = false;
    decode::<Claims>(token, &DecodingKey::from_secret(secret.as_ref()), &validation)
        .map(|data| data.claims)
        .map_err(|e| format!("Invalid token: {}", e))
}
