use axum::extract::Request;
use axum::extract::State;
use axum::http::header::AUTHORIZATION;
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::IntoResponse;
use axum::response::Response;
use axum_extra::extract::CookieJar;

use super::handlers::ApiError;
use super::handlers::INVALID_CREDENTIALS_MESSAGE;
use crate::identity::models::Identity;
use crate::inbound::http::router::AppState;

/// Cookie a browser session carries the access token in.
pub const ACCESS_TOKEN_COOKIE: &str = "access_token";

/// Identity resolved for the current request; `None` is an anonymous caller.
#[derive(Debug, Clone)]
pub struct CurrentIdentity(pub Option<Identity>);

/// Raw access token the request presented.
#[derive(Clone)]
pub struct BearerToken(pub String);

/// Resolves the caller's identity on every request.
///
/// Invalid, expired and revoked tokens leave the request anonymous. Only a
/// provider that cannot answer at all fails the request.
pub async fn resolve_identity(
    State(state): State<AppState>,
    jar: CookieJar,
    mut req: Request,
    next: Next,
) -> Response {
    let token = bearer_token(req.headers()).or_else(|| {
        jar.get(ACCESS_TOKEN_COOKIE)
            .map(|cookie| cookie.value().to_string())
            .filter(|value| !value.is_empty())
    });

    let identity = match &token {
        Some(token) => match state.identity_provider.verify_token(token).await {
            Ok(identity) => identity,
            Err(e) => return ApiError::from(e).into_response(),
        },
        None => None,
    };

    if let Some(token) = token {
        req.extensions_mut().insert(BearerToken(token));
    }
    req.extensions_mut().insert(CurrentIdentity(identity));

    next.run(req).await
}

/// Rejects anonymous callers on protected routes.
pub async fn require_identity(req: Request, next: Next) -> Result<Response, ApiError> {
    match req.extensions().get::<CurrentIdentity>() {
        Some(CurrentIdentity(Some(_))) => Ok(next.run(req).await),
        _ => Err(ApiError::Unauthorized(
            INVALID_CREDENTIALS_MESSAGE.to_string(),
        )),
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;

    if scheme.eq_ignore_ascii_case("bearer") && !token.trim().is_empty() {
        Some(token.trim().to_string())
    } else {
        None
    }
}
