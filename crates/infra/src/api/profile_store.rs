//! PostgREST-compatible profile store

use std::sync::Arc;

use async_trait::async_trait;
use profilesync_core::ProfileStore;
use profilesync_domain::{Profile, ProfileSyncError, StoreError};
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::{Method, RequestBuilder};
use tracing::{debug, instrument};

use super::auth::AccessTokenProvider;
use super::errors::{store_error, ApiErrorBody};
use super::BackendEndpoint;
use crate::errors::InfraError;
use crate::http::HttpClient;

/// Ask PostgREST for a single object instead of an array
const SINGLE_OBJECT: &str = "application/vnd.pgrst.object+json";

fn backend(err: impl Into<InfraError>) -> StoreError {
    StoreError::from(err.into())
}

/// Profile store reading and writing one row per profile over the REST API
pub struct RestProfileStore {
    endpoint: BackendEndpoint,
    http: HttpClient,
    table: String,
    tokens: Option<Arc<dyn AccessTokenProvider>>,
}

impl RestProfileStore {
    pub fn new(endpoint: BackendEndpoint, http: HttpClient, table: impl Into<String>) -> Self {
        Self { endpoint, http, table: table.into(), tokens: None }
    }

    /// # Errors
    /// `ProfileSyncError::Config` if the API key is not a valid header value.
    pub fn from_endpoint(
        endpoint: BackendEndpoint,
        table: impl Into<String>,
    ) -> Result<Self, ProfileSyncError> {
        let http = endpoint.http_client()?;
        Ok(Self::new(endpoint, http, table))
    }

    /// Authorise requests as the signed-in user when a session exists.
    #[must_use]
    pub fn with_token_provider(mut self, tokens: Arc<dyn AccessTokenProvider>) -> Self {
        self.tokens = Some(tokens);
        self
    }

    async fn authorise(&self, request: RequestBuilder) -> RequestBuilder {
        let token = match &self.tokens {
            Some(tokens) => tokens.access_token().await,
            None => None,
        };
        request.bearer_auth(token.as_deref().unwrap_or(self.endpoint.anon_key()))
    }

    fn table_url(&self) -> Result<url::Url, StoreError> {
        self.endpoint.url(&format!("rest/v1/{}", self.table)).map_err(backend)
    }
}

#[async_trait]
impl ProfileStore for RestProfileStore {
    #[instrument(skip(self))]
    async fn get_by_id(&self, id: &str) -> Result<Profile, StoreError> {
        let mut url = self.table_url()?;
        url.query_pairs_mut().append_pair("id", &format!("eq.{id}")).append_pair("select", "*");

        let request = self.http.request(Method::GET, url).header(ACCEPT, SINGLE_OBJECT);
        let response = self.http.send(self.authorise(request).await).await.map_err(backend)?;
        let status = response.status();
        let body = response.text().await.map_err(backend)?;

        if !status.is_success() {
            return Err(store_error(status, &ApiErrorBody::parse(&body), id));
        }

        serde_json::from_str(&body).map_err(backend)
    }

    #[instrument(skip(self, profile), fields(profile_id = %profile.id))]
    async fn insert(&self, profile: &Profile) -> Result<(), StoreError> {
        let request = self
            .http
            .request(Method::POST, self.table_url()?)
            .header(CONTENT_TYPE, "application/json")
            .header("Prefer", "return=minimal")
            .json(profile);
        let response = self.http.send(self.authorise(request).await).await.map_err(backend)?;
        let status = response.status();

        if status.is_success() {
            debug!(profile_id = %profile.id, "profile row inserted");
            return Ok(());
        }

        let body = response.text().await.map_err(backend)?;
        Err(match store_error(status, &ApiErrorBody::parse(&body), &profile.id) {
            // A 406 on insert is a negotiation failure, not a missing row.
            StoreError::NotFound(_) => {
                StoreError::Backend(format!("HTTP {}: {body}", status.as_u16()))
            }
            other => other,
        })
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use profilesync_domain::Role;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    struct FixedToken(&'static str);

    #[async_trait]
    impl AccessTokenProvider for FixedToken {
        async fn access_token(&self) -> Option<String> {
            Some(self.0.to_string())
        }
    }

    fn store(server: &MockServer) -> RestProfileStore {
        let endpoint = BackendEndpoint::new(&server.uri(), "anon-key").unwrap();
        let http = HttpClient::builder().max_attempts(1).build().unwrap();
        RestProfileStore::new(endpoint, http, "users")
    }

    fn alice() -> Profile {
        Profile {
            id: "u1".into(),
            username: "alice".into(),
            email: "alice@example.com".into(),
            role: Role::User,
            created_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        }
    }

    #[tokio::test]
    async fn lookup_requests_a_single_object() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/users"))
            .and(query_param("id", "eq.u1"))
            .and(query_param("select", "*"))
            .and(header("accept", SINGLE_OBJECT))
            .and(header("authorization", "Bearer anon-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "u1",
                "username": "alice",
                "email": "alice@example.com",
                "role": "user",
                "created_at": "2024-01-01T00:00:00+00:00"
            })))
            .expect(1)
            .mount(&server)
            .await;

        assert_eq!(store(&server).get_by_id("u1").await.unwrap(), alice());
    }

    #[tokio::test]
    async fn zero_rows_is_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/users"))
            .respond_with(ResponseTemplate::new(406).set_body_json(json!({
                "code": "PGRST116",
                "details": "The result contains 0 rows",
                "hint": null,
                "message": "JSON object requested, multiple (or no) rows returned"
            })))
            .mount(&server)
            .await;

        assert_eq!(store(&server).get_by_id("u404").await, Err(StoreError::NotFound("u404".into())));
    }

    #[tokio::test]
    async fn server_errors_are_backend_errors() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/users"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        assert!(matches!(store(&server).get_by_id("u1").await, Err(StoreError::Backend(_))));
    }

    #[tokio::test]
    async fn insert_uses_user_token_and_detects_duplicates() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/rest/v1/users"))
            .and(header("authorization", "Bearer user-token"))
            .and(body_partial_json(json!({ "id": "u1", "role": "user" })))
            .respond_with(ResponseTemplate::new(201))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/rest/v1/users"))
            .respond_with(ResponseTemplate::new(409).set_body_json(json!({
                "code": "23505",
                "message": "duplicate key value violates unique constraint \"users_pkey\""
            })))
            .mount(&server)
            .await;

        let store = store(&server).with_token_provider(Arc::new(FixedToken("user-token")));
        store.insert(&alice()).await.unwrap();
        assert_eq!(store.insert(&alice()).await, Err(StoreError::AlreadyExists("u1".into())));
    }
}
