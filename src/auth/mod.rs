pub mod password;

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::database::models::User;
use crate::types::{Caller, Region, Role};

pub use password::{hash_password, hash_password_async, verify_password, verify_password_async, PasswordError};

/// Token payload: `{ id, role, region?, iat, exp }`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    pub id: Uuid,
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<Region>,
    pub exp: i64,
    pub iat: i64,
}

impl Claims {
    pub fn new(id: Uuid, role: Role, region: Option<Region>, expiry_secs: u64) -> Self {
        let now = Utc::now();
        let exp = (now + Duration::seconds(expiry_secs as i64)).timestamp();

        // Admin tokens never carry a region
        let region = match role {
            Role::Admin => None,
            Role::User => region,
        };

        Self {
            id,
            role,
            region,
            exp,
            iat: now.timestamp(),
        }
    }

    pub fn for_user(user: &User, expiry_secs: u64) -> Self {
        Self::new(user.id, user.role, user.region, expiry_secs)
    }
}

impl TryFrom<Claims> for Caller {
    type Error = JwtError;

    fn try_from(claims: Claims) -> Result<Self, Self::Error> {
        match (claims.role, claims.region) {
            (Role::Admin, _) => Ok(Caller::admin(claims.id)),
            (Role::User, Some(region)) => Ok(Caller::regional(claims.id, region)),
            (Role::User, None) => Err(JwtError::InvalidToken(
                "regional token is missing its region".to_string(),
            )),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum JwtError {
    #[error("JWT generation error: {0}")]
    TokenGeneration(String),
    #[error("Invalid JWT secret")]
    InvalidSecret,
    #[error("Invalid JWT token: {0}")]
    InvalidToken(String),
}

pub fn generate_jwt(claims: &Claims, secret: &str) -> Result<String, JwtError> {
    if secret.is_empty() {
        return Err(JwtError::InvalidSecret);
    }

    let encoding_key = EncodingKey::from_secret(secret.as_bytes());
    encode(&Header::default(), claims, &encoding_key)
        .map_err(|e| JwtError::TokenGeneration(e.to_string()))
}

/// Verify signature and expiry, returning the decoded claims
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

    const SECRET: &str = "test-secret";

    #[test]
    fn regional_token_round_trips() {
        let id = Uuid::new_v4();
        let claims = Claims::new(id, Role::User, Some(Region::Bro), 3600);
        let token = generate_jwt(&claims, SECRET).unwrap();

        let decoded = validate_jwt(&token, SECRET).unwrap();
        assert_eq!(decoded, claims);
        assert_eq!(decoded.exp - decoded.iat, 3600);

        let caller = Caller::try_from(decoded).unwrap();
        assert_eq!(caller, Caller::regional(id, Region::Bro));
    }

    #[test]
    fn admin_token_omits_region() {
        let claims = Claims::new(Uuid::new_v4(), Role::Admin, Some(Region::Kro), 3600);
        assert!(claims.region.is_none());

        let payload = serde_json::to_value(&claims).unwrap();
        assert!(payload.get("region").is_none());
        assert_eq!(payload["role"], "admin");
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let claims = Claims::new(Uuid::new_v4(), Role::Admin, None, 3600);
        let token = generate_jwt(&claims, SECRET).unwrap();
        assert!(matches!(
            validate_jwt(&token, "other-secret"),
            Err(JwtError::InvalidToken(_))
        ));
    }

    #[test]
    fn expired_token_is_rejected() {
        let mut claims = Claims::new(Uuid::new_v4(), Role::Admin, None, 3600);
        claims.iat -= 7200;
        claims.exp -= 7200;
        let token = generate_jwt(&claims, SECRET).unwrap();
        assert!(validate_jwt(&token, SECRET).is_err());
    }

    #[test]
    fn empty_secret_is_refused() {
        let claims = Claims::new(Uuid::new_v4(), Role::Admin, None, 3600);
        assert!(matches!(generate_jwt(&claims, ""), Err(JwtError::InvalidSecret)));
    }

    #[test]
    fn user_claims_without_region_do_not_become_caller() {
        let claims = Claims {
            id: Uuid::new_v4(),
            role: Role::User,
            region: None,
            exp: 0,
            iat: 0,
        };
        assert!(Caller::try_from(claims).is_err());
    }
}
