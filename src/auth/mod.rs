use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Longest lifetime a minted token may have (one year).
pub const MAX_EXPIRY_HOURS: u64 = 24 * 365;

/// Bearer token claims. `sub` is the user's uid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub email: String,
    pub exp: i64,
    pub iat: i64,
}

impl Claims {
    /// `expiry_hours` is clamped to [`MAX_EXPIRY_HOURS`].
    pub fn new(sub: impl Into<String>, email: impl Into<String>, expiry_hours: u64) -> Self {
        let now = Utc::now();
        let hours = expiry_hours.min(MAX_EXPIRY_HOURS) as i64;
        let exp = (now + Duration::hours(hours)).timestamp();

        Self {
            sub: sub.into(),
            email: email.into(),
            exp,
            iat: now.timestamp(),
        }
    }
}

#[derive(Debug, Error)]
pub enum JwtError {
    #[error("JWT generation error: {0}")]
    TokenGeneration(String),

    #[error("JWT secret not configured")]
    InvalidSecret,

    #[error("Invalid JWT token: {0}")]
    InvalidToken(String),
}

pub fn generate_jwt(claims: &Claims, secret: &str) -> Result<String, JwtError> {
    if secret.is_empty() {
        return Err(JwtError::InvalidSecret);
    }

    let encoding_key = EncodingKey::from_secret(secret.as_bytes());
    let header = Header::default();

    encode(&header, claims, &encoding_key).map_err(|e| JwtError::TokenGeneration(e.to_string()))
}

/// Validates signature and expiry, returning the claims.
pub fn validate_jwt(token: &str, secret: &str) -> Result<Claims, JwtError> {
    if secret.is_empty() {
        return Err(JwtError::InvalidSecret);
    }

    let decoding_key = DecodingKey::from_secret(secret.as_bytes());
    let validation = Validation::default();

    let token_data = decode::<Claims>(token, &decoding_key, &validation)
        .map_err(|e| JwtError::InvalidToken(e.to_string()))?;

    Ok(token_data.claims)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip() {
        let claims = Claims::new("uid-1", "racer@example.com", 1);
        let token = generate_jwt(&claims, "secret").unwrap();
        let decoded = validate_jwt(&token, "secret").unwrap();
        assert_eq!(decoded, claims);
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let token = generate_jwt(&Claims::new("uid-1", "a@b.c", 1), "secret").unwrap();
        assert!(matches!(
            validate_jwt(&token, "other"),
            Err(JwtError::InvalidToken(_))
        ));
    }

    #[test]
    fn test_expired_token_rejected() {
        let mut claims = Claims::new("uid-1", "a@b.c", 1);
        claims.iat -= 7200;
        claims.exp -= 7200;
        let token = generate_jwt(&claims, "secret").unwrap();
        assert!(validate_jwt(&token, "secret").is_err());
    }

    #[test]
    fn test_expiry_is_clamped() {
        let claims = Claims::new("uid-1", "a@b.c", u64::MAX);
        assert_eq!(claims.exp - claims.iat, MAX_EXPIRY_HOURS as i64 * 3600);
        let token = generate_jwt(&claims, "secret").unwrap();
        assert!(validate_jwt(&token, "secret").is_ok());
    }

    #[test]
    fn test_empty_secret() {
        let claims = Claims::new("uid-1", "a@b.c", 1);
        assert!(matches!(generate_jwt(&claims, ""), Err(JwtError::InvalidSecret)));
    }
}
