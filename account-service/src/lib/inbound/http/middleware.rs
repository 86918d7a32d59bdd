use auth::TokenVerifier;
use axum::extract::Request;
use axum::extract::State;
use axum::http::header::AUTHORIZATION;
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::Response;

use super::handlers::ApiError;
use crate::domain::user::models::UserId;
use crate::inbound::http::router::AppState;

/// Extension type to store the authenticated caller in request extensions
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser {
    pub user_id: UserId,
    pub name: String,
}

/// Middleware that validates the bearer token and adds the caller to request extensions
pub async fn authenticate(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let caller = authorize(req.headers(), state.token_verifier.as_ref())?;

    req.extensions_mut().insert(caller);

    Ok(next.run(req).await)
}

/// Resolve the caller from the `Authorization` header.
///
/// Every failure yields the same 401; the verifier is only consulted when a
/// non-empty bearer token is present.
pub fn authorize(
    headers: &HeaderMap,
    verifier: &dyn TokenVerifier,
) -> Result<AuthenticatedUser, ApiError> {
    let token = bearer_token(headers).ok_or_else(ApiError::unauthorized)?;

    let claim = verifier.verify_token(token).map_err(|e| {
        tracing::debug!(error = %e, "Token rejected");
        ApiError::unauthorized()
    })?;

    Ok(AuthenticatedUser {
        user_id: UserId(claim.subject_id),
        name: claim.display_name,
    })
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?;

    let value = match value.to_str() {
        Ok(value) => value,
        Err(_) => {
            tracing::debug!("Authorization header is not visible ASCII");
            return None;
        }
    };

    let token = value.strip_prefix("Bearer ")?.trim();

    (!token.is_empty()).then_some(token)
}
