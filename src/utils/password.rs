use hmac::Hmac;
use pbkdf2::pbkdf2;
use sha2::Sha256;
use rand::Rng;
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};

type HmacSha256 = Hmac<Sha256>;

const ITERATIONS: u32 = 260000;
const KEY_LENGTH: usize = 32;
const SALT_LENGTH: usize = 16;

pub const MIN_PASSWORD_LENGTH: usize = 6;

/// Hash un mot de passe: pbkdf2:sha256:iterations$salt$hash (salt/hash en base64 URL-safe)
pub fn hash_password(password: &str) -> Result<String, String> {
    let mut salt = [0u8; SALT_LENGTH];
    rand::thread_rng().fill(&mut salt);

    let mut key = [0u8; KEY_LENGTH];
    pbkdf2::<HmacSha256>(password.as_bytes(), &salt, ITERATIONS, &mut key)
        .map_err(|e| format!("PBKDF2 hash generation failed: {}", e))?;

    Ok(format!(
        "pbkdf2:sha256:{}${}${}",
        ITERATIONS,
        URL_SAFE_NO_PAD.encode(salt),
        URL_SAFE_NO_PAD.encode(key)
    ))
}

/// Vérifie un mot de passe contre un hash stocké.
/// Les anciens comptes importés ont un hash en hexadécimal, les nouveaux en base64.
pub fn verify_password(password: &str, stored_hash: &str) -> Result<bool, String> {
    let mut parts = stored_hash.split('$');
    let (header, salt_str, hash_str) = match (parts.next(), parts.next(), parts.next(), parts.next()) {
        (Some(h), Some(s), Some(k), None) => (h, s, k),
        _ => return Err("Invalid hash format".to_string()),
    };

    let iterations = match header.split(':').collect::<Vec<_>>().as_slice() {
        ["pbkdf2", "sha256", n] => n
            .parse::<u32>()
            .map_err(|_| "Invalid iterations".to_string())?,
        _ => return Err("Invalid header".to_string()),
    };

    let salt = decode_component(salt_str)?;
    let expected = decode_component(hash_str)?;

    let mut computed = vec![0u8; expected.len()];
    pbkdf2::<HmacSha256>(password.as_bytes(), &salt, iterations, &mut computed)
        .map_err(|e| format!("PBKDF2 hash verification failed: {}", e))?;

    // Comparaison sans court-circuit
    let diff = computed
        .iter()
        .zip(expected.iter())
        .fold(0u8, |acc, (a, b)| acc | (a ^ b));
    Ok(diff == 0 && computed.len() == expected.len())
}

fn decode_component(input: &str) -> Result<Vec<u8>, String> {
    if input.len() == KEY_LENGTH * 2 && input.chars().all(|c| c.is_ascii_hexdigit()) {
        return hex::decode(input).map_err(|e| format!("Hex decode failed: {}", e));
    }

    URL_SAFE_NO_PAD
        .decode(input.trim_end_matches('='))
        .map_err(|_| "Failed to decode".to_string())
}

/// Règles du formulaire d'inscription, vérifiées avant tout appel réseau
pub fn check_new_password(password: &str, confirmation: &str) -> Result<(), String> {
    if password != confirmation {
        return Err("Les mots de passe ne correspondent pas.".to_string());
    }
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(format!(
            "Le mot de passe doit contenir au moins {} caractères.",
            MIN_PASSWORD_LENGTH
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_then_verify() {
        let hash = hash_password("s3cret!").unwrap();
        assert!(hash.starts_with("pbkdf2:sha256:260000$"));
        assert!(verify_password("s3cret!", &hash).unwrap());
        assert!(!verify_password("wrong", &hash).unwrap());
    }

    #[test]
    fn test_hex_encoded_hash_is_accepted() {
        let salt = b"fixedsalt";
        let mut key = [0u8; KEY_LENGTH];
        pbkdf2::<HmacSha256>(b"legacy", salt, 1000, &mut key).unwrap();
        let stored = format!(
            "pbkdf2:sha256:1000${}${}",
            URL_SAFE_NO_PAD.encode(salt),
            hex::encode(key)
        );

        assert!(verify_password("legacy", &stored).unwrap());
    }

    #[test]
    fn test_malformed_hash() {
        assert!(verify_password("x", "not-a-hash").is_err());
        assert!(verify_password("x", "md5:1$a$b").is_err());
    }

    #[test]
    fn test_check_new_password() {
        assert!(check_new_password("abcdef", "abcdef").is_ok());
        assert_eq!(
            check_new_password("abcdef", "abcdeg").unwrap_err(),
            "Les mots de passe ne correspondent pas."
        );
        assert!(check_new_password("abc", "abc").is_err());
    }
}
