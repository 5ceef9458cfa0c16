//! GoTrue-compatible identity service
//!
//! The provider issues and validates tokens; this adapter only keeps the
//! current session in memory and reports its transitions to subscribers.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use parking_lot::RwLock;
use profilesync_core::{IdentityService, SessionSubscription};
use profilesync_domain::constants::SESSION_EVENT_CAPACITY;
use profilesync_domain::{
    IdentityConfig, IdentityError, Principal, ProfileSyncError, Session, SessionEvent,
    SessionEventKind,
};
use reqwest::{Method, Response, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::sync::broadcast;
use tracing::{debug, info, instrument, warn};

use super::auth::AccessTokenProvider;
use super::errors::{identity_error, ApiErrorBody};
use super::BackendEndpoint;
use crate::errors::InfraError;
use crate::http::HttpClient;

const TOKEN_PATH: &str = "auth/v1/token";
const SIGNUP_PATH: &str = "auth/v1/signup";
const LOGOUT_PATH: &str = "auth/v1/logout";
const USER_PATH: &str = "auth/v1/user";

#[derive(Debug, Deserialize)]
struct UserResponse {
    id: String,
    #[serde(default)]
    email: Option<String>,
}

impl From<UserResponse> for Principal {
    fn from(user: UserResponse) -> Self {
        Principal::new(user.id, user.email)
    }
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
    /// Unix seconds
    #[serde(default)]
    expires_at: Option<i64>,
    user: UserResponse,
}

impl TokenResponse {
    fn into_session(self, now: DateTime<Utc>) -> Session {
        let expires_at = self
            .expires_at
            .and_then(|secs| DateTime::from_timestamp(secs, 0))
            .or_else(|| self.expires_in.map(|secs| now + Duration::seconds(secs)));

        let mut session = Session::new(self.access_token, self.user.into());
        session.refresh_token = self.refresh_token;
        session.expires_at = expires_at;
        session
    }
}

fn transport(err: impl Into<InfraError>) -> IdentityError {
    IdentityError::from(err.into())
}

async fn read_body(response: Response) -> Result<(StatusCode, String), IdentityError> {
    let status = response.status();
    let body = response.text().await.map_err(transport)?;
    Ok((status, body))
}

fn session_from_body(status: StatusCode, body: &str) -> Result<Session, IdentityError> {
    if !status.is_success() {
        return Err(identity_error(status, &ApiErrorBody::parse(body)));
    }
    let token: TokenResponse = serde_json::from_str(body).map_err(transport)?;
    Ok(token.into_session(Utc::now()))
}

/// Identity service backed by a hosted GoTrue-compatible auth API
pub struct HttpIdentityService {
    endpoint: BackendEndpoint,
    http: HttpClient,
    current: RwLock<Option<Session>>,
    events: broadcast::Sender<SessionEvent>,
}

impl HttpIdentityService {
    pub fn new(endpoint: BackendEndpoint, http: HttpClient) -> Self {
        let (events, _) = broadcast::channel(SESSION_EVENT_CAPACITY);
        Self { endpoint, http, current: RwLock::new(None), events }
    }

    /// # Errors
    /// `ProfileSyncError::Config` when the API URL or key is missing.
    pub fn from_config(config: &IdentityConfig) -> Result<Self, ProfileSyncError> {
        let endpoint = BackendEndpoint::from_config(config)?;
        let http = endpoint.http_client()?;
        Ok(Self::new(endpoint, http))
    }

    /// Adopt a session obtained elsewhere (e.g. persisted by a previous run).
    ///
    /// No event is emitted; the next `get_session` reports it.
    pub fn restore_session(&self, session: Session) {
        *self.current.write() = Some(session);
    }

    /// Number of live session-change subscriptions
    pub fn receiver_count(&self) -> usize {
        self.events.receiver_count()
    }

    fn emit(&self, kind: SessionEventKind, session: Option<Session>) {
        if self.events.send(SessionEvent::new(kind, session)).is_err() {
            debug!(kind = %kind, "session event dropped; no subscribers");
        }
    }

    fn adopt(&self, kind: SessionEventKind, session: Session) -> Session {
        *self.current.write() = Some(session.clone());
        self.emit(kind, Some(session.clone()));
        session
    }

    fn clear(&self) -> bool {
        let previous = self.current.write().take();
        if previous.is_some() {
            self.emit(SessionEventKind::SignedOut, None);
        }
        previous.is_some()
    }

    async fn post_json(
        &self,
        path: &str,
        grant_type: Option<&str>,
        body: &Value,
        bearer: Option<&str>,
    ) -> Result<(StatusCode, String), IdentityError> {
        let mut url = self.endpoint.url(path).map_err(transport)?;
        if let Some(grant_type) = grant_type {
            url.query_pairs_mut().append_pair("grant_type", grant_type);
        }

        let mut request = self.http.request(Method::POST, url).json(body);
        if let Some(token) = bearer {
            request = request.bearer_auth(token);
        }

        let response = self.http.send(request).await.map_err(transport)?;
        read_body(response).await
    }

    #[instrument(skip_all)]
    async fn refresh(&self, refresh_token: &str) -> Result<Session, IdentityError> {
        let (status, body) = self
            .post_json(
                TOKEN_PATH,
                Some("refresh_token"),
                &json!({ "refresh_token": refresh_token }),
                None,
            )
            .await?;
        let session = session_from_body(status, &body)?;
        info!(principal_id = %session.principal.id, "session refreshed");
        Ok(self.adopt(SessionEventKind::TokenRefreshed, session))
    }
}

#[async_trait]
impl IdentityService for HttpIdentityService {
    async fn get_session(&self) -> Result<Option<Session>, IdentityError> {
        let current = self.current.read().clone();
        let Some(session) = current else {
            return Ok(None);
        };

        if !session.is_expired_at(Utc::now()) {
            return Ok(Some(session));
        }

        let Some(refresh_token) = session.refresh_token.as_deref() else {
            debug!(principal_id = %session.principal.id, "session expired without a refresh token");
            self.clear();
            return Ok(None);
        };

        match self.refresh(refresh_token).await {
            Ok(refreshed) => Ok(Some(refreshed)),
            Err(err) => {
                warn!(
                    principal_id = %session.principal.id,
                    error = %err,
                    "session refresh failed; signing out"
                );
                self.clear();
                Ok(None)
            }
        }
    }

    async fn get_current_principal(&self) -> Result<Option<Principal>, IdentityError> {
        let Some(session) = self.get_session().await? else {
            return Ok(None);
        };

        let url = self.endpoint.url(USER_PATH).map_err(transport)?;
        let request = self.http.request(Method::GET, url).bearer_auth(&session.access_token);
        let response = self.http.send(request).await.map_err(transport)?;
        let (status, body) = read_body(response).await?;

        if !status.is_success() {
            return Err(identity_error(status, &ApiErrorBody::parse(&body)));
        }

        let user: UserResponse = serde_json::from_str(&body).map_err(transport)?;
        Ok(Some(user.into()))
    }

    #[instrument(skip(self, password))]
    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Session, IdentityError> {
        let (status, body) = self
            .post_json(
                TOKEN_PATH,
                Some("password"),
                &json!({ "email": email, "password": password }),
                None,
            )
            .await?;
        let session = session_from_body(status, &body)?;

        info!(principal_id = %session.principal.id, "signed in");
        Ok(self.adopt(SessionEventKind::SignedIn, session))
    }

    #[instrument(skip(self, password))]
    async fn sign_up(&self, email: &str, password: &str) -> Result<Session, IdentityError> {
        let (status, body) = self
            .post_json(SIGNUP_PATH, None, &json!({ "email": email, "password": password }), None)
            .await?;

        if !status.is_success() {
            return Err(identity_error(status, &ApiErrorBody::parse(&body)));
        }

        let value: Value = serde_json::from_str(&body).map_err(transport)?;
        if value.get("access_token").is_none() {
            // Projects requiring email confirmation answer with the bare user.
            let principal_id = value.get("id").and_then(Value::as_str).unwrap_or("unknown");
            warn!(principal_id, "account registered but no session was issued");
            return Err(IdentityError::Provider {
                status: status.as_u16(),
                message: "sign-up requires email confirmation before a session is issued".into(),
            });
        }

        let token: TokenResponse = serde_json::from_value(value).map_err(transport)?;
        let session = token.into_session(Utc::now());

        info!(principal_id = %session.principal.id, "account registered");
        Ok(self.adopt(SessionEventKind::SignedIn, session))
    }

    async fn sign_out(&self) -> Result<(), IdentityError> {
        let current = self.current.read().clone();
        let Some(session) = current else {
            return Ok(());
        };

        let (status, body) =
            self.post_json(LOGOUT_PATH, None, &json!({}), Some(&session.access_token)).await?;

        // An already revoked token still ends the local session.
        if !status.is_success() && status != StatusCode::UNAUTHORIZED {
            return Err(identity_error(status, &ApiErrorBody::parse(&body)));
        }

        if self.clear() {
            info!(principal_id = %session.principal.id, "signed out");
        }
        Ok(())
    }

    fn on_session_change(&self) -> SessionSubscription {
        SessionSubscription::new(self.events.subscribe())
    }
}

#[async_trait]
impl AccessTokenProvider for HttpIdentityService {
    async fn access_token(&self) -> Option<String> {
        match self.get_session().await {
            Ok(session) => session.map(|session| session.access_token),
            Err(err) => {
                warn!(error = %err, "failed to read session for access token");
                None
            }
        }
    }
}
