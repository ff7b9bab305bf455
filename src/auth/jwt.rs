use chrono::Utc;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::Error};
use uuid::Uuid;

use crate::{
    model::user::UserAccount,
    models::{Claims, TokenType},
};

/// Identity carried inside a token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subject {
    pub user_id: u64,
    pub username: String,
    pub role: u8,
    pub employee_id: Option<u64>,
}

impl From<&UserAccount> for Subject {
    fn from(user: &UserAccount) -> Self {
        Self {
            user_id: user.id,
            username: user.username.clone(),
            role: user.role_id,
            employee_id: user.employee_id,
        }
    }
}

impl From<&Claims> for Subject {
    fn from(claims: &Claims) -> Self {
        Self {
            user_id: claims.user_id,
            username: claims.sub.clone(),
            role: claims.role,
            employee_id: claims.employee_id,
        }
    }
}

fn issue(
    subject: &Subject,
    token_type: TokenType,
    secret: &str,
    ttl: i64,
) -> Result<(String, Claims), Error> {
    let claims = Claims {
        user_id: subject.user_id,
        sub: subject.username.clone(),
        role: subject.role,
        exp: (Utc::now().timestamp() + ttl).max(0) as usize,
        jti: Uuid::new_v4().to_string(),
        token_type,
        employee_id: subject.employee_id,
    };
    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;
    Ok((token, claims))
}

pub fn generate_access_token(subject: &Subject, secret: &str, ttl: i64) -> Result<String, Error> {
    issue(subject, TokenType::Access, secret, ttl).map(|(token, _)| token)
}

/// Returns the claims too, so the caller can persist the `jti`.
pub fn generate_refresh_token(
    subject: &Subject,
    secret: &str,
    ttl: i64,
) -> Result<(String, Claims), Error> {
    issue(subject, TokenType::Refresh, secret, ttl)
}

pub fn verify_token(token: &str, secret: &str) -> Result<Claims, Error> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn subject() -> Subject {
        Subject {
            user_id: 9,
            username: "hr.lead".into(),
            role: 2,
            employee_id: Some(4),
        }
    }

    #[test]
    fn tokens_round_trip() {
        let token = generate_access_token(&subject(), "secret", 60).unwrap();
        let claims = verify_token(&token, "secret").unwrap();
        assert_eq!(claims.token_type, TokenType::Access);
        assert_eq!(Subject::from(&claims), subject());
    }

    #[test]
    fn refresh_tokens_get_unique_ids() {
        let (_, a) = generate_refresh_token(&subject(), "secret", 60).unwrap();
        let (_, b) = generate_refresh_token(&subject(), "secret", 60).unwrap();
        assert_eq!(a.token_type, TokenType::Refresh);
        assert_ne!(a.jti, b.jti);
    }

    #[test]
    fn rejects_wrong_secret_and_expired_tokens() {
        let token = generate_access_token(&subject(), "secret", 60).unwrap();
        assert!(verify_token(&token, "other").is_err());

        let expired = generate_access_token(&subject(), "secret", -3600).unwrap();
        assert!(verify_token(&expired, "secret").is_err());
    }
}
