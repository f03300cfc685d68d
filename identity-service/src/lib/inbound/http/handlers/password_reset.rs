use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use serde::Serialize;

use super::ApiError;
use super::ApiSuccess;
use crate::inbound::http::router::AppState;

/// Always answers 202 so the response never tells whether the email exists.
pub async fn request_password_reset(
    State(state): State<AppState>,
    Json(body): Json<PasswordResetRequest>,
) -> Result<ApiSuccess<PasswordResetResponseData>, ApiError> {
    state
        .identity_provider
        .request_password_reset(&body.email)
        .await?;

    Ok(ApiSuccess::new(
        StatusCode::ACCEPTED,
        PasswordResetResponseData {
            message: "If the email is registered, a reset link has been sent".to_string(),
        },
    ))
}

pub async fn confirm_password_reset(
    State(state): State<AppState>,
    Json(body): Json<ConfirmPasswordResetRequest>,
) -> Result<ApiSuccess<ConfirmPasswordResetResponseData>, ApiError> {
    let updated = state
        .identity_provider
        .confirm_password_reset(&body.reset_token, &body.new_password)
        .await?;

    Ok(ApiSuccess::new(
        StatusCode::OK,
        ConfirmPasswordResetResponseData { updated },
    ))
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PasswordResetRequest {
    pub email: String,
}

#[derive(Clone, PartialEq, Eq, Deserialize)]
pub struct ConfirmPasswordResetRequest {
    pub reset_token: String,
    pub new_password: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PasswordResetResponseData {
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConfirmPasswordResetResponseData {
    pub updated: bool,
}
