use crate::error::AppError;
use bcrypt::{hash, verify, DEFAULT_COST};

/// Hashes a plaintext password with bcrypt. The per-call random salt is
/// embedded in the returned digest.
pub fn hash_password(password: &str) -> Result<String, AppError> {
    hash(password, DEFAULT_COST)
        .map_err(|e| AppError::InternalServerError(format!("Failed to hash password: {}", e)))
}

/// Verifies a plaintext password against a stored digest.
///
/// Returns `false` for a mismatch and equally for a malformed digest: the
/// caller only learns "not authenticated", never which of the two occurred.
pub fn verify_password(password: &str, digest: &str) -> bool {
    verify(password, digest).unwrap_or(false)
}
