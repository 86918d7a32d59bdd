use axum::extract::State;
use axum::http::StatusCode;

use super::ApiError;
use super::ApiSuccess;
use super::UserData;
use crate::inbound::http::router::AppState;

pub async fn list_users(
    State(state): State<AppState>,
) -> Result<ApiSuccess<Vec<UserData>>, ApiError> {
    state
        .user_service
        .list_users()
        .await
        .map_err(|e| ApiError::from_user_error(e, "Error fetching users"))
        .map(|users| {
            ApiSuccess::new(
                StatusCode::OK,
                "Users fetched successfully",
                users.iter().map(UserData::from).collect(),
            )
        })
}
