use std::time::Duration;

use profilesync_domain::ProfileSyncError;
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Client as ReqwestClient, Method, RequestBuilder, Response};
use tracing::debug;

use crate::errors::InfraError;

/// HTTP client with built-in retry and timeout support.
///
/// A 5xx response or a timeout is retried only for idempotent methods, since
/// a `POST` may already have taken effect server-side. A refused connection
/// never reached the server and is retried for every method.
#[derive(Clone)]
pub struct HttpClient {
    client: ReqwestClient,
    max_attempts: usize,
    base_backoff: Duration,
}

impl HttpClient {
    /// Start building a new HTTP client.
    pub fn builder() -> HttpClientBuilder {
        HttpClientBuilder::default()
    }

    /// Create a request builder using the underlying reqwest client.
    pub fn request<U>(&self, method: Method, url: U) -> RequestBuilder
    where
        U: reqwest::IntoUrl,
    {
        self.client.request(method, url)
    }

    /// Execute `builder`, replaying it while the retry policy allows.
    ///
    /// # Errors
    /// Transport failures after the last attempt, converted via
    /// [`InfraError`].
    pub async fn send(&self, builder: RequestBuilder) -> Result<Response, InfraError> {
        let mut attempt = 1;

        loop {
            let request = builder
                .try_clone()
                .ok_or_else(|| {
                    InfraError(ProfileSyncError::Internal(
                        "request body cannot be cloned; buffer the body to enable retries".into(),
                    ))
                })?
                .build()?;

            let method = request.method().clone();
            debug!(attempt, %method, url = %redact_query(request.url()), "sending HTTP request");

            let outcome = self.client.execute(request).await;
            let retryable = match &outcome {
                Ok(response) => {
                    debug!(attempt, %method, status = %response.status(), "received HTTP response");
                    is_idempotent(&method) && response.status().is_server_error()
                }
                Err(err) => {
                    debug!(attempt, %method, error = %err, "HTTP request failed");
                    should_retry_error(&method, err)
                }
            };

            if !retryable || attempt >= self.max_attempts {
                return outcome.map_err(InfraError::from);
            }

            self.sleep_with_backoff(attempt).await;
            attempt += 1;
        }
    }

    fn backoff_delay(&self, retry_number: usize) -> Duration {
        let shift = u32::try_from(retry_number.saturating_sub(1).min(8)).unwrap_or(8);
        let multiplier = 1u32 << shift;
        self.base_backoff.saturating_mul(multiplier)
    }

    async fn sleep_with_backoff(&self, retry_number: usize) {
        let delay = self.backoff_delay(retry_number);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }
}

/// Query strings may carry filter values; log only the path.
fn redact_query(url: &url::Url) -> String {
    format!("{}{}", url.origin().ascii_serialization(), url.path())
}

/// Builder for [`HttpClient`].
#[derive(Debug)]
pub struct HttpClientBuilder {
    timeout: Duration,
    max_attempts: usize,
    base_backoff: Duration,
    user_agent: Option<String>,
    default_headers: HeaderMap,
}

impl Default for HttpClientBuilder {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            max_attempts: 3,
            base_backoff: Duration::from_millis(200),
            user_agent: Some(concat!("profilesync/", env!("CARGO_PKG_VERSION")).to_string()),
            default_headers: HeaderMap::new(),
        }
    }
}

impl HttpClientBuilder {
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Configure the total number of attempts (initial try + retries).
    #[must_use]
    pub fn max_attempts(mut self, attempts: usize) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    #[must_use]
    pub fn base_backoff(mut self, backoff: Duration) -> Self {
        self.base_backoff = backoff;
        self
    }

    #[must_use]
    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = Some(agent.into());
        self
    }

    /// Header sent with every request; marked sensitive so it never shows up
    /// in debug output.
    ///
    /// # Errors
    /// `ProfileSyncError::Config` if the value is not a valid header value.
    pub fn sensitive_header(
        mut self,
        name: &'static str,
        value: &str,
    ) -> Result<Self, ProfileSyncError> {
        let mut header = HeaderValue::from_str(value)
            .map_err(|err| ProfileSyncError::Config(format!("invalid {name} header: {err}")))?;
        header.set_sensitive(true);
        self.default_headers.insert(name, header);
        Ok(self)
    }

    /// # Errors
    /// Returns an error if the underlying reqwest client cannot be built.
    pub fn build(self) -> Result<HttpClient, ProfileSyncError> {
        let mut builder = ReqwestClient::builder()
            .timeout(self.timeout)
            .no_proxy()
            .default_headers(self.default_headers);

        if let Some(agent) = self.user_agent {
            builder = builder.user_agent(agent);
        }

        let client = builder.build().map_err(|err| ProfileSyncError::from(InfraError::from(err)))?;

        Ok(HttpClient {
            client,
            max_attempts: self.max_attempts.max(1),
            base_backoff: self.base_backoff,
        })
    }
}

fn is_idempotent(method: &Method) -> bool {
    matches!(
        *method,
        Method::GET | Method::HEAD | Method::OPTIONS | Method::PUT | Method::DELETE
    )
}

fn should_retry_error(method: &Method, err: &reqwest::Error) -> bool {
    err.is_connect() || (is_idempotent(method) && (err.is_timeout() || err.is_request()))
}
