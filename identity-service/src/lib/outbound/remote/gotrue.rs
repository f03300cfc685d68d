use std::time::Duration;

use async_trait::async_trait;
use reqwest::RequestBuilder;
use reqwest::Response;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;

use crate::identity::errors::RemoteIdentityError;
use crate::identity::models::RemoteSession;
use crate::identity::models::RemoteUser;
use crate::identity::models::SignUpOutcome;
use crate::identity::ports::IdentityServiceClient;

/// Client for a GoTrue-compatible identity service (Supabase Auth).
///
/// Every request carries the project `apikey` and is bounded by the
/// configured timeout. Failures are never retried.
#[derive(Clone)]
pub struct GoTrueClient {
    http: reqwest::Client,
    base_url: String,
    anon_key: String,
    timeout: Duration,
}

/// Which call produced an error response; decides how its status is read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Call {
    SignUp,
    PasswordGrant,
    RefreshGrant,
    Bearer,
    UpdatePassword,
    Recover,
}

#[derive(Debug, Deserialize)]
struct UserBody {
    id: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    email_confirmed_at: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SessionBody {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
    user: UserBody,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SignUpBody {
    Session(SessionBody),
    User(UserBody),
}

/// Error payload; GoTrue versions disagree on field names.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ErrorBody {
    error_code: Option<String>,
    error: Option<String>,
    error_description: Option<String>,
    msg: Option<String>,
    message: Option<String>,
}

impl ErrorBody {
    fn code(&self) -> &str {
        self.error_code
            .as_deref()
            .or(self.error.as_deref())
            .unwrap_or_default()
    }

    fn message(&self) -> String {
        self.msg
            .as_deref()
            .or(self.message.as_deref())
            .or(self.error_description.as_deref())
            .or(self.error.as_deref())
            .unwrap_or("no detail")
            .to_string()
    }
}

impl From<UserBody> for RemoteUser {
    fn from(body: UserBody) -> Self {
        Self {
            subject_id: body.id,
            email: body.email.filter(|email| !email.is_empty()),
            email_verified: body
                .email_confirmed_at
                .is_some_and(|confirmed| !confirmed.is_empty()),
        }
    }
}

impl From<SessionBody> for RemoteSession {
    fn from(body: SessionBody) -> Self {
        Self {
            access_token: body.access_token,
            refresh_token: body.refresh_token,
            expires_in: body.expires_in,
            user: body.user.into(),
        }
    }
}

impl GoTrueClient {
    /// Create a client for the service at `base_url`.
    ///
    /// # Arguments
    /// * `base_url` - Project URL, without the `/auth/v1` suffix
    /// * `anon_key` - Public project key sent as `apikey`
    /// * `timeout` - Upper bound for each request, connect included
    ///
    /// # Errors
    /// * `reqwest::Error` - HTTP client could not be built
    pub fn new(base_url: &str, anon_key: &str, timeout: Duration) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .build()?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            anon_key: anon_key.to_string(),
            timeout,
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/auth/v1/{}", self.base_url, path)
    }

    fn transport_error(&self, err: reqwest::Error) -> RemoteIdentityError {
        if err.is_timeout() {
            RemoteIdentityError::Timeout(self.timeout.as_millis())
        } else if err.is_decode() {
            RemoteIdentityError::Protocol(err.to_string())
        } else {
            RemoteIdentityError::Unavailable(err.to_string())
        }
    }

    /// Send a request and turn non-2xx answers into classified errors.
    async fn send(&self, request: RequestBuilder, call: Call) -> Result<Response, RemoteIdentityError> {
        let response = request
            .header("apikey", &self.anon_key)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        // An unreadable error body still classifies by status alone.
        let body = response.json::<ErrorBody>().await.unwrap_or_default();
        let err = classify(status, &body, call);
        tracing::debug!(status = status.as_u16(), code = body.code(), error = %err, "Identity service error response");

        Err(err)
    }

    async fn read<T: DeserializeOwned>(&self, response: Response) -> Result<T, RemoteIdentityError> {
        response.json::<T>().await.map_err(|e| self.transport_error(e))
    }

    async fn password_grant(
        &self,
        email: &str,
        password: &str,
    ) -> Result<RemoteSession, RemoteIdentityError> {
        let request = self
            .http
            .post(self.endpoint("token"))
            .query(&[("grant_type", "password")])
            .json(&json!({ "email": email, "password": password }));

        let response = self.send(request, Call::PasswordGrant).await?;
        let session: SessionBody = self.read(response).await?;

        Ok(session.into())
    }
}

fn classify(status: StatusCode, body: &ErrorBody, call: Call) -> RemoteIdentityError {
    if status == StatusCode::REQUEST_TIMEOUT
        || status == StatusCode::TOO_MANY_REQUESTS
        || status.is_server_error()
    {
        return RemoteIdentityError::Unavailable(format!("status {}", status.as_u16()));
    }

    let code = body.code();
    if code == "weak_password" {
        return RemoteIdentityError::WeakPassword(body.message());
    }

    match call {
        Call::SignUp
            if code == "user_already_exists"
                || code == "email_exists"
                || body.message().to_lowercase().contains("already registered") =>
        {
            RemoteIdentityError::AlreadyRegistered
        }
        Call::PasswordGrant
            if status == StatusCode::BAD_REQUEST || status == StatusCode::UNAUTHORIZED =>
        {
            if code == "email_not_confirmed" {
                RemoteIdentityError::Rejected(body.message())
            } else {
                RemoteIdentityError::InvalidCredentials
            }
        }
        Call::RefreshGrant
            if status == StatusCode::BAD_REQUEST
                || status == StatusCode::UNAUTHORIZED
                || status == StatusCode::FORBIDDEN =>
        {
            RemoteIdentityError::InvalidToken
        }
        Call::Bearer | Call::UpdatePassword
            if status == StatusCode::UNAUTHORIZED
                || status == StatusCode::FORBIDDEN
                || status == StatusCode::NOT_FOUND =>
        {
            RemoteIdentityError::InvalidToken
        }
        Call::UpdatePassword if status == StatusCode::UNPROCESSABLE_ENTITY => {
            RemoteIdentityError::WeakPassword(body.message())
        }
        _ => RemoteIdentityError::Rejected(body.message()),
    }
}

#[async_trait]
impl IdentityServiceClient for GoTrueClient {
    async fn sign_up(
        &self,
        email: &str,
        password: &str,
    ) -> Result<SignUpOutcome, RemoteIdentityError> {
        let request = self
            .http
            .post(self.endpoint("signup"))
            .json(&json!({ "email": email, "password": password }));

        let response = self.send(request, Call::SignUp).await?;

        match self.read::<SignUpBody>(response).await? {
            SignUpBody::Session(session) => {
                let session = RemoteSession::from(session);
                Ok(SignUpOutcome {
                    user: session.user.clone(),
                    session: Some(session),
                })
            }
            SignUpBody::User(user) => Ok(SignUpOutcome {
                user: user.into(),
                session: None,
            }),
        }
    }

    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<RemoteSession, RemoteIdentityError> {
        self.password_grant(email, password).await
    }

    async fn refresh_session(
        &self,
        refresh_token: &str,
    ) -> Result<RemoteSession, RemoteIdentityError> {
        let request = self
            .http
            .post(self.endpoint("token"))
            .query(&[("grant_type", "refresh_token")])
            .json(&json!({ "refresh_token": refresh_token }));

        let response = self.send(request, Call::RefreshGrant).await?;
        let session: SessionBody = self.read(response).await?;

        Ok(session.into())
    }

    async fn get_user(&self, access_token: &str) -> Result<RemoteUser, RemoteIdentityError> {
        let request = self.http.get(self.endpoint("user")).bearer_auth(access_token);

        let response = self.send(request, Call::Bearer).await?;
        let user: UserBody = self.read(response).await?;

        Ok(user.into())
    }

    async fn sign_out(&self, access_token: &str) -> Result<(), RemoteIdentityError> {
        let request = self
            .http
            .post(self.endpoint("logout"))
            .bearer_auth(access_token);

        self.send(request, Call::Bearer).await?;

        Ok(())
    }

    async fn recover(&self, email: &str) -> Result<(), RemoteIdentityError> {
        let request = self
            .http
            .post(self.endpoint("recover"))
            .json(&json!({ "email": email }));

        self.send(request, Call::Recover).await?;

        Ok(())
    }

    async fn update_password(
        &self,
        access_token: &str,
        new_password: &str,
    ) -> Result<RemoteUser, RemoteIdentityError> {
        let request = self
            .http
            .put(self.endpoint("user"))
            .bearer_auth(access_token)
            .json(&json!({ "password": new_password }));

        let response = self.send(request, Call::UpdatePassword).await?;
        let user: UserBody = self.read(response).await?;

        Ok(user.into())
    }
}
