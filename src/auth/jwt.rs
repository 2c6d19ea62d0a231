use chrono::{Duration, Utc};
use jsonwebtoken::{errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::{configuration::JWTSettings, models::User};

const MAX_EXPIRY_HOURS: u64 = 24 * 365;

/// Issues and verifies the HS256 bearer tokens handed out by `/login`.
#[derive(Clone)]
pub struct Tokenizer{
    secret: SecretString,
    expiry: Duration
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims{
    pub sub: Uuid,
    pub iat: i64,
    pub exp: i64,
    pub email: String,
    pub role: UserRole
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
pub enum UserRole{
    ADMIN,
    USER,
}

#[derive(Error, Debug)]
pub enum TokenError{
    #[error("token has expired")]
    Expired,
    #[error("invalid token")]
    Invalid(#[source] jsonwebtoken::errors::Error)
}

impl Tokenizer {
    pub fn new(settings: &JWTSettings) -> Self {
        Self{
            secret: SecretString::from(settings.secret.clone()),
            // capped at a year
            expiry: Duration::hours(settings.expiry_hours.min(MAX_EXPIRY_HOURS) as i64)
        }
    }

    pub fn issue(&self, user: &User) -> Result<String, jsonwebtoken::errors::Error>{
        let now = Utc::now();
        let claims = Claims{
            sub: user.user_id,
            iat: now.timestamp(),
            exp: (now + self.expiry).timestamp(),
            email: user.email.clone(),
            role: if user.is_admin { UserRole::ADMIN } else { UserRole::USER }
        };

        jsonwebtoken::encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(self.secret.expose_secret().as_bytes())
        )
    }

    pub fn verify(&self, token: &str) -> Result<Claims, TokenError>{
        jsonwebtoken::decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.expose_secret().as_bytes()),
            &Validation::new(Algorithm::HS256)
        )
        .map(|data| data.claims)
        .map_err(|e| match e.kind() {
            ErrorKind::ExpiredSignature => TokenError::Expired,
            _ => TokenError::Invalid(e)
        })
    }
}
