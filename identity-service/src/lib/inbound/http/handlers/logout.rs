use axum::extract::State;
use axum::http::StatusCode;
use axum::Extension;
use serde::Serialize;

use super::ApiError;
use super::ApiSuccess;
use crate::inbound::http::middleware::BearerToken;
use crate::inbound::http::router::AppState;

pub async fn logout(
    State(state): State<AppState>,
    Extension(BearerToken(token)): Extension<BearerToken>,
) -> Result<ApiSuccess<LogoutResponseData>, ApiError> {
    let revoked = state.identity_provider.logout(&token).await?;

    Ok(ApiSuccess::new(StatusCode::OK, LogoutResponseData { revoked }))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogoutResponseData {
    /// False when the token simply expires on its own
    pub revoked: bool,
}
