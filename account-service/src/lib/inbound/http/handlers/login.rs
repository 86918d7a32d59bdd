use axum::extract::State;
use axum::http::StatusCode;
use serde::Deserialize;
use serde::Serialize;

use super::scalar_text;
use super::ApiError;
use super::ApiSuccess;
use super::Payload;
use super::UserData;
use crate::domain::user::models::LoginCommand;
use crate::inbound::http::router::AppState;
use crate::user::errors::UserError;

pub async fn login(
    State(state): State<AppState>,
    Payload(body): Payload<LoginRequest>,
) -> Result<ApiSuccess<LoginResponseData>, ApiError> {
    let command = LoginCommand {
        email: body.email.unwrap_or_default(),
        password: body.password.unwrap_or_default(),
    };

    let outcome = state
        .user_service
        .login(command)
        .await
        .map_err(|e| match e {
            UserError::EmailNotRegistered if state.api.uniform_login_errors => {
                UserError::InvalidCredentials
            }
            other => other,
        })
        .map_err(|e| ApiError::from_user_error(e, "Error logging in"))?;

    Ok(ApiSuccess::new(
        StatusCode::OK,
        "Login successful",
        LoginResponseData {
            user: (&outcome.user).into(),
            token: outcome.token,
        },
    ))
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct LoginRequest {
    #[serde(default, deserialize_with = "scalar_text")]
    email: Option<String>,
    #[serde(default, deserialize_with = "scalar_text")]
    password: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoginResponseData {
    pub user: UserData,
    pub token: String,
}
