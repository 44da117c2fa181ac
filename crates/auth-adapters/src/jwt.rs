//! HS256 bearer tokens.

use chrono::{Duration, Utc};
use domains::{ForumError, Session, SessionVerifier};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Token payload. `sub` is the numeric user id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: i64,
    pub username: String,
    #[serde(default)]
    pub admin: bool,
    pub exp: i64,
}

impl From<Claims> for Session {
    fn from(claims: Claims) -> Self {
        Session { user_id: claims.sub, username: claims.username, admin: claims.admin }
    }
}

#[derive(Error, Debug)]
pub enum TokenError {
    #[error("failed to sign token: {0}")]
    Sign(#[from] jsonwebtoken::errors::Error),
}

pub struct JwtSessionVerifier {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
}

impl JwtSessionVerifier {
    pub fn new(secret: &SecretString) -> Self {
        let bytes = secret.expose_secret().as_bytes();
        Self {
            encoding: EncodingKey::from_secret(bytes),
            decoding: DecodingKey::from_secret(bytes),
            validation: Validation::new(Algorithm::HS256),
        }
    }

    /// Signs a token for `session` that expires after `ttl`. Used by the
    /// seeding tool and tests; production tokens come from the account system.
    pub fn issue(&self, session: &Session, ttl: Duration) -> Result<String, TokenError> {
        let claims = Claims {
            sub: session.user_id,
            username: session.username.clone(),
            admin: session.admin,
            exp: (Utc::now() + ttl).timestamp(),
        };
        Ok(encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)?)
    }
}

impl SessionVerifier for JwtSessionVerifier {
    fn verify(&self, token: &str) -> Result<Session, ForumError> {
        decode::<Claims>(token, &self.decoding, &self.validation)
            .map(|data| Session::from(data.claims))
            .map_err(|err| {
                debug!(%err, "bearer token rejected");
                ForumError::InvalidToken
            })
    }
}
