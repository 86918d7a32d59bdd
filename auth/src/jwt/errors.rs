use thiserror::Error;

/// Error type for JWT operations.
///
/// Carries the precise reason a token was refused. Callers that answer
/// untrusted clients should go through `TokenService::verify`, which folds
/// all of these into a single `VerifyError`.
#[derive(Debug, Clone, Error)]
pub enum JwtError {
    #[error("Failed to encode token: {0}")]
    EncodingFailed(String),

    #[error("Failed to decode token: {0}")]
    DecodingFailed(String),

    #[error("Token is expired")]
    TokenExpired,

    #[error("Token signature is invalid")]
    InvalidSignature,

    #[error("Missing required claim: {0}")]
    MissingClaim(String),
}
