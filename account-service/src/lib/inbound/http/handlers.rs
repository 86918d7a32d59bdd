use axum::async_trait;
use axum::body::Body;
use axum::body::Bytes;
use axum::extract::FromRequest;
use axum::extract::Multipart;
use axum::extract::Request;
use axum::http::header::CONTENT_TYPE;
use axum::http::Method;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::response::Response;
use axum::Form;
use axum::Json;
use serde::de::DeserializeOwned;
use serde::de::Error as _;
use serde::Deserialize;
use serde::Deserializer;
use serde::Serialize;
use serde_json::Value;

use crate::domain::user::errors::MissingFieldsError;
use crate::domain::user::models::User;
use crate::user::errors::UserError;

pub mod get_user;
pub mod list_users;
pub mod login;
pub mod register;

#[derive(Debug, Clone)]
pub struct ApiSuccess<T: Serialize + PartialEq>(StatusCode, Json<ApiResponseBody<T>>);

impl<T> PartialEq for ApiSuccess<T>
where
    T: Serialize + PartialEq,
{
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0 && self.1 .0 == other.1 .0
    }
}

impl<T: Serialize + PartialEq> ApiSuccess<T> {
    pub fn new(status: StatusCode, message: &str, data: T) -> Self {
        ApiSuccess(status, Json(ApiResponseBody::new(status, message, data)))
    }
}

impl<T: Serialize + PartialEq> IntoResponse for ApiSuccess<T> {
    fn into_response(self) -> Response {
        (self.0, self.1).into_response()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    InternalServerError(String),
    BadRequest(String),
    NotFound(String),
    Unauthorized(String),
}

impl ApiError {
    /// Map a service failure for the operation described by `context`.
    ///
    /// Caller mistakes keep their own message. Infrastructure failures are
    /// logged and replaced by `context` so backend details never reach the
    /// client.
    pub fn from_user_error(err: UserError, context: &str) -> Self {
        match err {
            UserError::MissingFields(_) => ApiError::BadRequest(err.to_string()),
            UserError::EmailNotRegistered | UserError::InvalidCredentials => {
                ApiError::Unauthorized(err.to_string())
            }
            UserError::NotFound(_) => ApiError::NotFound("User not found".to_string()),
            UserError::Password(_)
            | UserError::Token(_)
            | UserError::DatabaseError(_)
            | UserError::Unknown(_) => {
                tracing::error!(error = %err, "{}", context);
                ApiError::InternalServerError(context.to_string())
            }
        }
    }

    pub fn unauthorized() -> Self {
        ApiError::Unauthorized("Unauthorized".to_string())
    }
}

impl From<MissingFieldsError> for ApiError {
    fn from(err: MissingFieldsError) -> Self {
        ApiError::BadRequest(err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::InternalServerError(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
        };

        (status, Json(ApiResponseBody::new_error(status, message))).into_response()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApiResponseBody<T: Serialize + PartialEq> {
    status_code: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
    data: T,
}

impl<T: Serialize + PartialEq> ApiResponseBody<T> {
    pub fn new(status_code: StatusCode, message: &str, data: T) -> Self {
        Self {
            status_code: status_code.as_u16(),
            message: Some(message.to_string()),
            data,
        }
    }
}

impl ApiResponseBody<ApiErrorData> {
    pub fn new_error(status_code: StatusCode, message: String) -> Self {
        Self {
            status_code: status_code.as_u16(),
            message: None,
            data: ApiErrorData { message },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApiErrorData {
    pub message: String,
}

/// Public view of a user, without the stored credential
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserData {
    pub id: i64,
    pub name: String,
    pub phone: String,
    pub email: String,
}

impl From<&User> for UserData {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.0,
            name: user.name.clone(),
            phone: user.phone.clone(),
            email: user.email.clone(),
        }
    }
}

/// Request body accepted as JSON, an urlencoded form or a multipart form
/// of text fields.
///
/// An empty body yields `T::default()`, so absent fields are reported by
/// the handler rather than rejected here.
#[derive(Debug, Clone, Copy, Default)]
pub struct Payload<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for Payload<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Default,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let content_type = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default();
        let is_multipart = content_type.starts_with("multipart/form-data");
        let is_form = content_type.starts_with("application/x-www-form-urlencoded");

        if is_multipart {
            return from_multipart(req, state).await.map(Payload);
        }

        let bytes = Bytes::from_request(req, state)
            .await
            .map_err(|_| invalid_body())?;

        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Payload(T::default()));
        }

        if is_form {
            let form_request = axum::http::Request::builder()
                .method(Method::POST)
                .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(Body::from(bytes))
                .map_err(|_| invalid_body())?;
            let Form(value) = Form::<T>::from_request(form_request, state)
                .await
                .map_err(|_| invalid_body())?;
            return Ok(Payload(value));
        }

        serde_json::from_slice(&bytes)
            .map(Payload)
            .map_err(|_| invalid_body())
    }
}

/// Collect multipart text fields into an object and deserialize it.
///
/// File parts are rejected; only plain fields are expected here.
async fn from_multipart<S, T>(req: Request, state: &S) -> Result<T, ApiError>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    let mut multipart = Multipart::from_request(req, state)
        .await
        .map_err(|_| invalid_body())?;

    let mut fields = serde_json::Map::new();
    while let Some(field) = multipart.next_field().await.map_err(|_| invalid_body())? {
        if field.file_name().is_some() {
            return Err(invalid_body());
        }
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };
        let text = field.text().await.map_err(|_| invalid_body())?;
        fields.insert(name, Value::String(text));
    }

    serde_json::from_value(Value::Object(fields)).map_err(|_| invalid_body())
}

fn invalid_body() -> ApiError {
    ApiError::BadRequest("Invalid request body".to_string())
}

/// Read a body field as text.
///
/// Numbers and booleans become their textual form and `null` counts as
/// absent. Arrays and objects fail the whole body.
pub(crate) fn scalar_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(text)) => Ok(Some(text)),
        Some(Value::Number(number)) => Ok(Some(number.to_string())),
        Some(Value::Bool(flag)) => Ok(Some(flag.to_string())),
        Some(_) => Err(D::Error::custom("expected a string or a number")),
    }
}

/// Take a required field, recording its name when absent or empty.
pub(crate) fn required(
    value: Option<String>,
    field: &'static str,
    missing: &mut Vec<&'static str>,
) -> String {
    match value {
        Some(value) if !value.is_empty() => value,
        _ => {
            missing.push(field);
            String::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::user::models::UserId;

    #[derive(Debug, Default, Deserialize, PartialEq)]
    struct Credentials {
        #[serde(default, deserialize_with = "scalar_text")]
        email: Option<String>,
        #[serde(default, deserialize_with = "scalar_text")]
        password: Option<String>,
    }

    fn request(content_type: Option<&str>, body: &'static str) -> Request {
        let mut builder = axum::http::Request::builder().method(Method::POST).uri("/");
        if let Some(content_type) = content_type {
            builder = builder.header(CONTENT_TYPE, content_type);
        }
        builder.body(Body::from(body)).unwrap()
    }

    #[tokio::test]
    async fn test_payload_from_json() {
        let req = request(
            Some("application/json"),
            r#"{"email":"a@x.com","password":null}"#,
        );
        let Payload(body) = Payload::<Credentials>::from_request(req, &()).await.unwrap();

        assert_eq!(body.email.as_deref(), Some("a@x.com"));
        assert_eq!(body.password, None);
    }

    #[tokio::test]
    async fn test_payload_from_form() {
        let req = request(
            Some("application/x-www-form-urlencoded"),
            "email=a%40x.com&password=pw",
        );
        let Payload(body) = Payload::<Credentials>::from_request(req, &()).await.unwrap();

        assert_eq!(body.email.as_deref(), Some("a@x.com"));
        assert_eq!(body.password.as_deref(), Some("pw"));
    }

    #[tokio::test]
    async fn test_payload_from_multipart() {
        let body = "--XYZ\r\n\
            Content-Disposition: form-data; name=\"email\"\r\n\r\n\
            a@x.com\r\n\
            --XYZ\r\n\
            Content-Disposition: form-data; name=\"password\"\r\n\r\n\
            pw\r\n\
            --XYZ--\r\n";
        let req = request(Some("multipart/form-data; boundary=XYZ"), body);
        let Payload(body) = Payload::<Credentials>::from_request(req, &()).await.unwrap();

        assert_eq!(body.email.as_deref(), Some("a@x.com"));
        assert_eq!(body.password.as_deref(), Some("pw"));
    }

    #[tokio::test]
    async fn test_payload_rejects_multipart_files() {
        let body = "--XYZ\r\n\
            Content-Disposition: form-data; name=\"email\"; filename=\"a.txt\"\r\n\r\n\
            a@x.com\r\n\
            --XYZ--\r\n";
        let req = request(Some("multipart/form-data; boundary=XYZ"), body);
        let err = Payload::<Credentials>::from_request(req, &()).await.unwrap_err();
        assert_eq!(err, ApiError::BadRequest("Invalid request body".to_string()));
    }

    #[tokio::test]
    async fn test_payload_numbers_become_text() {
        let req = request(Some("application/json"), r#"{"email":"a@x.com","password":1234}"#);
        let Payload(body) = Payload::<Credentials>::from_request(req, &()).await.unwrap();
        assert_eq!(body.password.as_deref(), Some("1234"));
    }

    #[tokio::test]
    async fn test_payload_rejects_nested_values() {
        let req = request(Some("application/json"), r#"{"email":{"value":"a@x.com"}}"#);
        let err = Payload::<Credentials>::from_request(req, &()).await.unwrap_err();
        assert_eq!(err, ApiError::BadRequest("Invalid request body".to_string()));
    }

    #[tokio::test]
    async fn test_payload_empty_body_is_default() {
        let req = request(None, "");
        let Payload(body) = Payload::<Credentials>::from_request(req, &()).await.unwrap();
        assert_eq!(body, Credentials::default());
    }

    #[tokio::test]
    async fn test_payload_rejects_malformed_json() {
        let req = request(Some("application/json"), "{not json");
        let err = Payload::<Credentials>::from_request(req, &()).await.unwrap_err();
        assert_eq!(err, ApiError::BadRequest("Invalid request body".to_string()));
    }

    #[test]
    fn test_store_failures_hide_details() {
        let err = ApiError::from_user_error(
            UserError::DatabaseError("relation \"users\" does not exist".to_string()),
            "Error fetching users",
        );
        assert_eq!(
            err,
            ApiError::InternalServerError("Error fetching users".to_string())
        );
    }

    #[test]
    fn test_caller_errors_keep_their_message() {
        assert_eq!(
            ApiError::from_user_error(UserError::EmailNotRegistered, "Error logging in"),
            ApiError::Unauthorized("Email not registered".to_string())
        );
        assert_eq!(
            ApiError::from_user_error(UserError::NotFound(UserId(3)), "Error fetching user"),
            ApiError::NotFound("User not found".to_string())
        );
    }

    #[test]
    fn test_envelope_shapes() {
        let success = ApiResponseBody::new(StatusCode::OK, "Login successful", 7);
        assert_eq!(
            serde_json::to_value(&success).unwrap(),
            serde_json::json!({"status_code": 200, "message": "Login successful", "data": 7})
        );

        let error =
            ApiResponseBody::new_error(StatusCode::UNAUTHORIZED, "Unauthorized".to_string());
        assert_eq!(
            serde_json::to_value(&error).unwrap(),
            serde_json::json!({"status_code": 401, "data": {"message": "Unauthorized"}})
        );
    }
}
