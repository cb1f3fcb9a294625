use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Access token claims. Tokens are minted by the identity service; this
/// service only verifies them.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // subject id
    pub organization_id: String,
    pub role: String,
    pub exp: i64,
    pub iat: i64,
    pub jti: String,
}

impl Claims {
    pub fn new(
        subject_id: String,
        organization_id: String,
        role: String,
        expiration_hours: u64,
    ) -> Self {
        let now = Utc::now();
        let exp = now + Duration::hours(expiration_hours as i64);

        Self {
            sub: subject_id,
            organization_id,
            role,
            exp: exp.timestamp(),
            iat: now.timestamp(),
            jti: Uuid::new_v4().to_string(),
        }
    }
}

pub fn create_access_token(claims: &Claims, secret: &str) -> anyhow::Result<String> {
    let token = encode(
        &Header::default(),
        claims,
        &EncodingKey::from_secret(secret.as_ref()),
    )?;
    Ok(token)
}

pub fn verify_access_token(token: &str, secret: &str) -> anyhow::Result<Claims> {
    let validation = Validation::default();
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_ref()),
        &validation,
    )?;

    Ok(token_data.claims)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_and_verify_round_trip() {
        let claims = Claims::new("subject-1".into(), "org-1".into(), "teacher".into(), 1);
        let token = create_access_token(&claims, "secret").expect("create token");
        let verified = verify_access_token(&token, "secret").expect("verify token");
        assert_eq!(verified.sub, "subject-1");
        assert_eq!(verified.organization_id, "org-1");
        assert_eq!(verified.role, "teacher");
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let claims = Claims::new("subject-1".into(), "org-1".into(), "admin".into(), 1);
        let token = create_access_token(&claims, "secret").expect("create token");
        assert!(verify_access_token(&token, "other").is_err());
    }
}
