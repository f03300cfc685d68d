use axum::http::StatusCode;
use axum::Extension;

use super::ApiError;
use super::ApiSuccess;
use super::IdentityData;
use super::INVALID_CREDENTIALS_MESSAGE;
use crate::inbound::http::middleware::CurrentIdentity;

pub async fn me(
    Extension(CurrentIdentity(identity)): Extension<CurrentIdentity>,
) -> Result<ApiSuccess<IdentityData>, ApiError> {
    identity
        .as_ref()
        .map(|identity| ApiSuccess::new(StatusCode::OK, identity.into()))
        .ok_or_else(|| ApiError::Unauthorized(INVALID_CREDENTIALS_MESSAGE.to_string()))
}
