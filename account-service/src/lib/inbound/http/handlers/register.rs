use axum::extract::State;
use axum::http::StatusCode;
use serde::Deserialize;
use serde::Serialize;

use super::required;
use super::scalar_text;
use super::ApiError;
use super::ApiSuccess;
use super::Payload;
use crate::domain::user::errors::MissingFieldsError;
use crate::domain::user::models::RegisterUserCommand;
use crate::domain::user::models::User;
use crate::inbound::http::router::AppState;

pub async fn register(
    State(state): State<AppState>,
    Payload(body): Payload<RegisterRequest>,
) -> Result<ApiSuccess<RegisterResponseData>, ApiError> {
    let command = body.try_into_command()?;

    let user = state
        .user_service
        .register_user(command)
        .await
        .map_err(|e| ApiError::from_user_error(e, "Error registering user"))?;

    Ok(ApiSuccess::new(
        StatusCode::CREATED,
        "User registered successfully",
        RegisterResponseData {
            user: RegisteredUser::new(&user, state.api.expose_password_hash),
        },
    ))
}

/// HTTP request body for registering a user
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct RegisterRequest {
    #[serde(default, deserialize_with = "scalar_text")]
    name: Option<String>,
    #[serde(default, deserialize_with = "scalar_text")]
    phone: Option<String>,
    #[serde(default, deserialize_with = "scalar_text")]
    email: Option<String>,
    #[serde(default, deserialize_with = "scalar_text")]
    password: Option<String>,
}

impl RegisterRequest {
    fn try_into_command(self) -> Result<RegisterUserCommand, MissingFieldsError> {
        let mut missing = Vec::new();
        let name = required(self.name, "name", &mut missing);
        let phone = required(self.phone, "phone", &mut missing);
        let email = required(self.email, "email", &mut missing);
        let password = required(self.password, "password", &mut missing);

        if !missing.is_empty() {
            return Err(MissingFieldsError { fields: missing });
        }

        Ok(RegisterUserCommand::new(name, phone, email, password))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegisterResponseData {
    pub user: RegisteredUser,
}

/// Created user; `password` carries the stored hash when exposure is enabled
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegisteredUser {
    pub id: i64,
    pub name: String,
    pub phone: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

impl RegisteredUser {
    fn new(user: &User, expose_password_hash: bool) -> Self {
        Self {
            id: user.id.0,
            name: user.name.clone(),
            phone: user.phone.clone(),
            email: user.email.clone(),
            password: expose_password_hash.then(|| user.password_hash.clone()),
        }
    }
}
