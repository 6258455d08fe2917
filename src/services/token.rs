use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

/// Claims embedded in a WOPI access token. The token authorizes exactly one
/// user against exactly one file.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct WopiClaims {
    /// Email if present, otherwise display name
    pub sub: String,
    pub file_id: String,
    pub iat: i64,
    pub exp: i64,
}

/// User descriptor supplied by the embedding frontend when requesting a token.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct WopiUser {
    pub name: Option<String>,
    pub email: Option<String>,
}

#[derive(Error, Debug)]
pub enum TokenError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Malformed, expired and bad-signature tokens are deliberately
    /// indistinguishable to callers.
    #[error("invalid token")]
    Invalid,

    #[error(transparent)]
    Signing(#[from] jsonwebtoken::errors::Error),
}

/// Issues and verifies the signed access tokens gating every WOPI call.
#[derive(Clone)]
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    ttl: Duration,
}

impl TokenService {
    pub fn new(secret: &str, ttl_secs: i64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_ref()),
            decoding_key: DecodingKey::from_secret(secret.as_ref()),
            ttl: Duration::seconds(ttl_secs),
        }
    }

    /// Mint a token binding `(file_id, user)`. The subject is the user's
    /// email when present, otherwise the display name.
    pub fn issue(&self, file_id: &str, user: &WopiUser) -> Result<String, TokenError> {
        if file_id.is_empty() {
            return Err(TokenError::InvalidInput("fileId must not be empty".into()));
        }

        // A blank email must fall back to the name, so each field is
        // filtered for emptiness before the preference is applied.
        let email = user.email.as_deref().filter(|s| !s.is_empty());
        let name = user.name.as_deref().filter(|s| !s.is_empty());
        let sub = email.or(name).ok_or_else(|| {
            TokenError::InvalidInput("user must carry a name or an email".into())
        })?;

        let now = Utc::now();
        let claims = WopiClaims {
            sub: sub.to_owned(),
            file_id: file_id.to_owned(),
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
        };

        Ok(encode(&Header::default(), &claims, &self.encoding_key)?)
    }

    /// Decode and check a token. Any failure collapses into `Invalid`; the
    /// underlying cause is only logged.
    pub fn verify(&self, token: &str) -> Result<WopiClaims, TokenError> {
        let mut validation = Validation::default();
        validation.leeway = 0; // expiry is exact, no grace window

        decode::<WopiClaims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| {
                tracing::debug!("token rejected: {}", e);
                TokenError::Invalid
            })
    }
}
