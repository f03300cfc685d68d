use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;

use super::register::CredentialsRequest;
use super::ApiError;
use super::ApiSuccess;
use super::SessionData;
use crate::inbound::http::router::AppState;

pub async fn login(
    State(state): State<AppState>,
    Json(body): Json<CredentialsRequest>,
) -> Result<ApiSuccess<SessionData>, ApiError> {
    state
        .identity_provider
        .login(&body.email, &body.password)
        .await
        .map_err(ApiError::from)
        .map(|session| ApiSuccess::new(StatusCode::OK, session.into()))
}
