use crate::error::AppError;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

/// Claims encoded within an issued bearer token.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject of the token: the user's email.
    pub sub: String,
    /// Issued-at timestamp (seconds since epoch).
    pub iat: usize,
    /// Expiration timestamp (seconds since epoch).
    pub exp: usize,
}

/// Issues and verifies signed, time-limited bearer tokens.
///
/// Holds the signing key material and the token lifetime; constructed once
/// at startup from [`Config`](crate::config::Config) and shared read-only
/// via `web::Data`. Rotating the secret invalidates every outstanding token
/// (there is no revocation list, so that is the only kill switch).
#[derive(Clone)]
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    ttl_minutes: i64,
}

impl TokenService {
    pub fn new(secret: &str, ttl_minutes: i64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            ttl_minutes,
        }
    }

    /// Issues an HS256 token for `subject`, expiring `ttl_minutes` from now.
    ///
    /// Only key/encoding failures are errors; they surface as
    /// `AppError::InternalServerError`.
    pub fn issue(&self, subject: &str) -> Result<String, AppError> {
        let now = chrono::Utc::now();
        let expiry = now
            .checked_add_signed(chrono::Duration::minutes(self.ttl_minutes))
            .ok_or_else(|| AppError::InternalServerError("token expiry overflow".into()))?;

        let claims = Claims {
            sub: subject.to_string(),
            iat: now.timestamp() as usize,
            exp: expiry.timestamp() as usize,
        };

        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| AppError::InternalServerError(format!("Failed to issue token: {}", e)))
    }

    /// Verifies a token string and returns its claims.
    ///
    /// Fails uniformly with `AppError::Unauthorized` whether the signature
    /// is invalid, the payload is malformed, or the token has expired;
    /// callers cannot distinguish the reason.
    pub fn verify(&self, token: &str) -> Result<Claims, AppError> {
        decode::<Claims>(token, &self.decoding_key, &Validation::default())
            .map(|data| data.claims)
            .map_err(|_| AppError::Unauthorized("Invalid token".into()))
    }
}
