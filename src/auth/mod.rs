use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

/// Length of the hex key derived from the shared secret
pub const DERIVED_KEY_LEN: usize = 32;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject identifier
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,
    /// Collection the subject lives in
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collection: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub exp: i64,
    pub iat: i64,
}

impl Claims {
    pub fn new(
        id: impl Into<String>,
        collection: impl Into<String>,
        expiry_hours: u64,
    ) -> Result<Self, TokenError> {
        let now = Utc::now();
        let lifetime = i64::try_from(expiry_hours)
            .ok()
            .and_then(Duration::try_hours)
            .ok_or_else(|| TokenError::Generation(format!("token expiry of {} hours is out of range", expiry_hours)))?;
        let exp = now
            .checked_add_signed(lifetime)
            .ok_or_else(|| TokenError::Generation(format!("token expiry of {} hours is out of range", expiry_hours)))?
            .timestamp();

        Ok(Self {
            id: Some(id.into()),
            sub: None,
            collection: Some(collection.into()),
            email: None,
            exp,
            iat: now.timestamp(),
        })
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    /// `id` wins over `sub`
    pub fn subject(&self) -> Option<&str> {
        self.id
            .as_deref()
            .or(self.sub.as_deref())
            .filter(|s| !s.is_empty())
    }
}

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("Invalid token secret")]
    InvalidSecret,

    #[error("Token generation error: {0}")]
    Generation(String),

    #[error("Invalid token: {0}")]
    Invalid(#[from] jsonwebtoken::errors::Error),

    #[error("Token has no subject")]
    MissingSubject,
}

/// SHA-256 of the secret, lowercase hex, first 32 characters
pub fn derive_key(secret: &str) -> String {
    let digest = Sha256::digest(secret.as_bytes());
    let mut hex = format!("{:x}", digest);
    hex.truncate(DERIVED_KEY_LEN);
    hex
}

pub fn issue_token(secret: &str, claims: &Claims) -> Result<String, TokenError> {
    if secret.is_empty() {
        return Err(TokenError::InvalidSecret);
    }

    let key = derive_key(secret);
    let encoding_key = EncodingKey::from_secret(key.as_bytes());

    encode(&Header::new(Algorithm::HS256), claims, &encoding_key)
        .map_err(|e| TokenError::Generation(e.to_string()))
}

/// Check signature and expiry; the claims must name a subject
pub fn verify_token(secret: &str, token: &str) -> Result<Claims, TokenError> {
    if secret.is_empty() {
        return Err(TokenError::InvalidSecret);
    }

    let key = derive_key(secret);
    let decoding_key = DecodingKey::from_secret(key.as_bytes());
    let mut validation = Validation::new(Algorithm::HS256);
    validation.leeway = 0;

    let claims = decode::<Claims>(token, &decoding_key, &validation)?.claims;
    if claims.subject().is_none() {
        return Err(TokenError::MissingSubject);
    }
    Ok(claims)
}

/// `Bearer <token>` → `<token>`; anything else is no token at all
pub fn bearer_token(header_value: &str) -> Option<&str> {
    let (scheme, token) = header_value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}
