//! Bearer token checks for the request surface.

/// Errors that can occur during access verification
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum AccessError {
    #[error("Missing bearer token")]
    MissingToken,

    #[error("Invalid bearer token")]
    InvalidToken,
}

/// Verifies an `Authorization` header value against the configured token.
///
/// When no token is configured every request is allowed. Otherwise the header
/// must be `Bearer <token>` with a matching token.
pub fn verify_bearer(header: Option<&str>, expected: Option<&str>) -> Result<(), AccessError> {
    let Some(expected) = expected else {
        return Ok(());
    };

    let presented = header
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .ok_or(AccessError::MissingToken)?;

    if constant_time_eq(presented.as_bytes(), expected.as_bytes()) {
        Ok(())
    } else {
        Err(AccessError::InvalidToken)
    }
}

/// Compares without short-circuiting on the first differing byte
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
