use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;

use super::ApiError;
use super::ApiSuccess;
use super::SessionData;
use crate::inbound::http::router::AppState;

pub async fn register(
    State(state): State<AppState>,
    Json(body): Json<CredentialsRequest>,
) -> Result<ApiSuccess<SessionData>, ApiError> {
    state
        .identity_provider
        .register(&body.email, &body.password)
        .await
        .map_err(ApiError::from)
        .map(|session| ApiSuccess::new(StatusCode::CREATED, session.into()))
}

/// Email and password, as sent to register and login.
#[derive(Clone, PartialEq, Eq, Deserialize)]
pub struct CredentialsRequest {
    pub email: String,
    pub password: String,
}
