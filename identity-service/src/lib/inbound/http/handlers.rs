use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::response::Response;
use axum::Json;
use serde::Serialize;

use crate::identity::errors::IdentityError;
use crate::identity::errors::SecretError;
use crate::identity::models::AuthSession;
use crate::identity::models::Identity;

pub mod login;
pub mod logout;
pub mod me;
pub mod password_reset;
pub mod refresh;
pub mod register;

/// Body of every 401, whatever the underlying reason.
pub const INVALID_CREDENTIALS_MESSAGE: &str = "Invalid credentials";

pub const REJECTED_PASSWORD_MESSAGE: &str = "Password does not meet the password policy";

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
    pub fn new(status: StatusCode, data: T) -> Self {
        ApiSuccess(status, Json(ApiResponseBody::new(status, data)))
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
    UnprocessableEntity(String),
    Conflict(String),
    Unauthorized(String),
    NotImplemented(String),
    ServiceUnavailable(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::InternalServerError(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
            ApiError::UnprocessableEntity(msg) => (StatusCode::UNPROCESSABLE_ENTITY, msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            ApiError::NotImplemented(msg) => (StatusCode::NOT_IMPLEMENTED, msg),
            ApiError::ServiceUnavailable(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg),
        };

        (status, Json(ApiResponseBody::new_error(status, message))).into_response()
    }
}

impl From<IdentityError> for ApiError {
    fn from(err: IdentityError) -> Self {
        match err {
            IdentityError::WeakSecret(SecretError::Rejected(_)) => {
                ApiError::UnprocessableEntity(REJECTED_PASSWORD_MESSAGE.to_string())
            }
            IdentityError::InvalidEmail(_) | IdentityError::WeakSecret(_) => {
                ApiError::UnprocessableEntity(err.to_string())
            }
            IdentityError::EmailAlreadyRegistered => ApiError::Conflict(err.to_string()),
            IdentityError::InvalidCredentials | IdentityError::UserInactive => {
                ApiError::Unauthorized(INVALID_CREDENTIALS_MESSAGE.to_string())
            }
            IdentityError::NotSupported { .. } => {
                ApiError::NotImplemented(format!("Feature unavailable: {}", err))
            }
            IdentityError::ProviderUnavailable => ApiError::ServiceUnavailable(
                "Authentication is temporarily unavailable".to_string(),
            ),
            IdentityError::Internal => {
                ApiError::InternalServerError("Internal server error".to_string())
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApiResponseBody<T: Serialize + PartialEq> {
    status_code: u16,
    data: T,
}

impl<T: Serialize + PartialEq> ApiResponseBody<T> {
    pub fn new(status_code: StatusCode, data: T) -> Self {
        Self {
            status_code: status_code.as_u16(),
            data,
        }
    }
}

impl ApiResponseBody<ApiErrorData> {
    pub fn new_error(status_code: StatusCode, message: String) -> Self {
        Self {
            status_code: status_code.as_u16(),
            data: ApiErrorData { message },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApiErrorData {
    pub message: String,
}

/// Public view of an identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IdentityData {
    pub id: String,
    pub email: String,
    pub is_active: bool,
    pub email_verified: bool,
}

impl From<&Identity> for IdentityData {
    fn from(identity: &Identity) -> Self {
        Self {
            id: identity.user_id.to_string(),
            email: identity.email.as_str().to_string(),
            is_active: identity.is_active,
            email_verified: identity.email_verified,
        }
    }
}

/// Response data of register, login and refresh.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionData {
    pub user: IdentityData,
    pub access_token: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    pub token_type: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_in: Option<i64>,
}

impl From<AuthSession> for SessionData {
    fn from(session: AuthSession) -> Self {
        Self {
            user: (&session.identity).into(),
            access_token: session.tokens.access_token,
            refresh_token: session.tokens.refresh_token,
            token_type: "bearer",
            expires_in: session.tokens.expires_in,
        }
    }
}
