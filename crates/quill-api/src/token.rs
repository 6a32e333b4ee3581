use std::time::Duration;

use anyhow::Context;
use chrono::Utc;
use jsonwebtoken::{
    Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::ErrorKind,
};
use thiserror::Error;
use uuid::Uuid;

use quill_db::models::UserRow;
use quill_types::api::Claims;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("token has expired")]
    Expired,
    #[error("token is invalid")]
    Invalid,
}

/// Issues and checks HS256 access tokens.
#[derive(Clone)]
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    access_ttl: Duration,
    remember_me_ttl: Duration,
}

impl TokenService {
    pub fn new(secret: &str, access_ttl: Duration, remember_me_ttl: Duration) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // expiry is exact, no grace window
        validation.leeway = 0;

        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            access_ttl,
            remember_me_ttl,
        }
    }

    pub fn ttl(&self, remember_me: bool) -> Duration {
        if remember_me {
            self.remember_me_ttl
        } else {
            self.access_ttl
        }
    }

    pub fn issue(&self, user: &UserRow, remember_me: bool) -> anyhow::Result<(String, Claims)> {
        let ttl = chrono::Duration::from_std(self.ttl(remember_me))
            .context("token lifetime out of range")?;
        self.issue_with_ttl(user, ttl)
    }

    pub(crate) fn issue_with_ttl(
        &self,
        user: &UserRow,
        ttl: chrono::Duration,
    ) -> anyhow::Result<(String, Claims)> {
        let issued_at = Utc::now();
        let expired_at = issued_at + ttl;

        let claims = Claims {
            id: Uuid::new_v4(),
            user_id: user.id,
            email: user.email.clone(),
            role: user.role,
            name: user.name.clone(),
            issued_at,
            expired_at,
            exp: expired_at.timestamp().max(0) as usize,
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .context("unable to sign token")?;
        Ok((token, claims))
    }

    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        decode::<Claims>(token, &self.decoding, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Invalid,
            })
    }
}
