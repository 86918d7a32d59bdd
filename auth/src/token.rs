use chrono::DateTime;
use chrono::Duration;
use chrono::Utc;
use thiserror::Error;

use crate::jwt::IdentityClaim;
use crate::jwt::JwtError;
use crate::jwt::JwtHandler;
use crate::jwt::TokenClaims;

/// Uniform token verification failure.
///
/// Malformed, forged and expired tokens all produce this same value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("Invalid or expired token")]
pub struct VerifyError;

/// Anything able to turn a bearer token back into an identity.
pub trait TokenVerifier: Send + Sync + 'static {
    fn verify_token(&self, token: &str) -> Result<IdentityClaim, VerifyError>;
}

/// Issues and verifies signed, expiring session tokens.
///
/// The secret is fixed for the lifetime of the service.
pub struct TokenService {
    jwt_handler: JwtHandler,
    ttl: Duration,
}

impl TokenService {
    /// Token lifetime used by `new`.
    pub const DEFAULT_TTL_SECONDS: i64 = 3600;

    pub fn new(secret: &[u8]) -> Self {
        Self::with_ttl(secret, Duration::seconds(Self::DEFAULT_TTL_SECONDS))
    }

    pub fn with_ttl(secret: &[u8], ttl: Duration) -> Self {
        Self {
            jwt_handler: JwtHandler::new(secret),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Issue a token for `claim`, valid from now for the configured lifetime.
    ///
    /// # Errors
    /// * `EncodingFailed` - Token signing failed
    pub fn issue(&self, claim: &IdentityClaim) -> Result<String, JwtError> {
        self.issue_at(claim, Utc::now())
    }

    /// Issue a token as if it had been created at `issued_at`.
    pub fn issue_at(
        &self,
        claim: &IdentityClaim,
        issued_at: DateTime<Utc>,
    ) -> Result<String, JwtError> {
        let claims = TokenClaims::new(claim, issued_at, self.ttl);
        self.jwt_handler.encode(&claims)
    }

    /// Verify signature and expiry, returning the embedded identity.
    ///
    /// # Errors
    /// * `VerifyError` - For every kind of rejection
    pub fn verify(&self, token: &str) -> Result<IdentityClaim, VerifyError> {
        let claims: TokenClaims = self.jwt_handler.decode(token).map_err(|_| VerifyError)?;

        if claims.is_expired(Utc::now().timestamp()) {
            return Err(VerifyError);
        }

        Ok(claims.identity())
    }
}

impl TokenVerifier for TokenService {
    fn verify_token(&self, token: &str) -> Result<IdentityClaim, VerifyError> {
        self.verify(token)
    }
}
