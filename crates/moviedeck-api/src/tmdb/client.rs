//! `ApiClient` - resilient JSON API client with retry, backoff, and token refresh.

use std::collections::BTreeMap;
use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::{Client, Method, StatusCode, header};
use serde_json::Value;
use tracing::instrument;
use url::Url;

use super::error::{ApiError, RequestFailure, TransientError};
use super::retry::RetryPolicy;
use super::token::{TokenHolder, TokenSource};

/// Default transport timeout per HTTP request.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Maximum number of body bytes logged for non-200 responses.
const BODY_PREVIEW_LEN: usize = 500;

/// Query parameters of a request. Order is irrelevant.
pub type QueryParams = BTreeMap<String, String>;

/// A single logical API call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiRequest {
    /// HTTP method.
    pub method: Method,
    /// Absolute endpoint URL.
    pub url: Url,
    /// Query string parameters.
    pub params: QueryParams,
}

impl ApiRequest {
    /// Builds a GET request.
    #[must_use]
    pub const fn get(url: Url, params: QueryParams) -> Self {
        Self {
            method: Method::GET,
            url,
            params,
        }
    }
}

/// Result of one dispatched HTTP request.
#[derive(Debug)]
enum AttemptOutcome {
    /// 200 with a decoded body.
    Success(Value),
    /// 401; may trigger a token refresh.
    Unauthorized,
    /// Transport failure or non-200 status.
    Retryable(TransientError),
    /// Anything else; ends the call.
    Fatal(ApiError),
}

/// Resilient API client.
#[derive(Debug)]
#[allow(clippy::module_name_repetitions)]
pub struct ApiClient {
    /// HTTP client.
    http_client: Client,
    /// Bearer token holder.
    tokens: TokenHolder,
    /// Policy used when the caller does not supply one.
    retry_policy: RetryPolicy,
}

/// Builder for `ApiClient`.
#[derive(Debug)]
#[allow(clippy::module_name_repetitions)]
pub struct ApiClientBuilder {
    tokens: Option<TokenHolder>,
    user_agent: Option<String>,
    retry_policy: Option<RetryPolicy>,
    timeout: Option<Duration>,
}

impl ApiClientBuilder {
    /// Creates a new builder.
    const fn new() -> Self {
        Self {
            tokens: None,
            user_agent: None,
            retry_policy: None,
            timeout: None,
        }
    }

    /// Sets the bearer token source (required).
    #[must_use]
    pub fn token_source(mut self, source: impl TokenSource + 'static) -> Self {
        self.tokens = Some(TokenHolder::new(source));
        self
    }

    /// Sets the User-Agent (required).
    #[must_use]
    pub fn user_agent(mut self, ua: impl Into<String>) -> Self {
        self.user_agent = Some(ua.into());
        self
    }

    /// Sets the default retry policy (default: 3 attempts, 1000ms).
    #[must_use]
    pub const fn retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = Some(policy);
        self
    }

    /// Sets the per-request transport timeout (default: 30s).
    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Builds the client.
    ///
    /// # Errors
    ///
    /// - `token_source` is not set.
    /// - `user_agent` is not set.
    /// - `reqwest::Client` build fails.
    pub fn build(self) -> Result<ApiClient> {
        let tokens = self.tokens.context("token_source is required")?;
        let user_agent = self.user_agent.context("user_agent is required")?;

        let http_client = Client::builder()
            .user_agent(&user_agent)
            .gzip(true)
            .timeout(self.timeout.unwrap_or(DEFAULT_TIMEOUT))
            .build()
            .context("failed to build HTTP client")?;

        Ok(ApiClient {
            http_client,
            tokens,
            retry_policy: self.retry_policy.unwrap_or_default(),
        })
    }
}

impl ApiClient {
    /// Creates a new builder.
    #[must_use]
    pub const fn builder() -> ApiClientBuilder {
        ApiClientBuilder::new()
    }

    /// Executes a call with the client's default retry policy.
    ///
    /// # Errors
    ///
    /// See [`execute_with`](Self::execute_with).
    pub async fn execute(&self, request: &ApiRequest) -> Result<Value, ApiError> {
        self.execute_with(request, self.retry_policy).await
    }

    /// Executes a call, retrying transient failures with exponential backoff.
    ///
    /// A first 401 invalidates the bearer token and re-dispatches on the same
    /// attempt number; a second 401 counts as an ordinary failure.
    ///
    /// # Errors
    ///
    /// - [`ApiError::Unavailable`] once `policy.max_retries()` attempts failed.
    /// - [`ApiError::AuthConfiguration`] if no bearer token is available.
    /// - [`ApiError::Request`] on any non-retryable failure.
    #[instrument(skip_all)]
    pub async fn execute_with(
        &self,
        request: &ApiRequest,
        policy: RetryPolicy,
    ) -> Result<Value, ApiError> {
        let max_retries = policy.max_retries();
        let mut delay = policy.initial_delay();
        let mut token_refreshed = false;
        let mut attempt: u32 = 0;

        loop {
            attempt = attempt.saturating_add(1);

            let failure = loop {
                tracing::info!(
                    method = %request.method,
                    endpoint = %request.url,
                    params = ?request.params,
                    attempt,
                    "Attempting API request."
                );

                match self.attempt(request).await {
                    AttemptOutcome::Success(data) => return Ok(data),
                    AttemptOutcome::Unauthorized if !token_refreshed => {
                        tracing::warn!(
                            attempt,
                            "Received 401 Unauthorized. Attempting to refresh Bearer token."
                        );
                        self.tokens.invalidate();
                        token_refreshed = true;
                    }
                    AttemptOutcome::Unauthorized => {
                        tracing::warn!(
                            status_code = StatusCode::UNAUTHORIZED.as_u16(),
                            "API returned a non-200 status code."
                        );
                        break TransientError::Status {
                            status: StatusCode::UNAUTHORIZED,
                        };
                    }
                    AttemptOutcome::Retryable(failure) => break failure,
                    AttemptOutcome::Fatal(err) => {
                        tracing::error!(
                            error = %err,
                            method = %request.method,
                            endpoint = %request.url,
                            params = ?request.params,
                            attempt,
                            "Error during API request."
                        );
                        return Err(err);
                    }
                }
            };

            tracing::error!(
                error = %failure,
                method = %request.method,
                endpoint = %request.url,
                params = ?request.params,
                attempt,
                "Error during API request."
            );

            if attempt >= max_retries {
                tracing::error!(
                    method = %request.method,
                    endpoint = %request.url,
                    params = ?request.params,
                    "Max retry attempts reached. Giving up on API request."
                );
                return Err(ApiError::Unavailable {
                    attempts: attempt,
                    last_failure: failure,
                });
            }

            tracing::debug!(?delay, "Backing off before retry");
            tokio::time::sleep(delay).await;
            delay = RetryPolicy::next_delay(delay);
        }
    }

    /// Dispatches one HTTP request and classifies the response.
    async fn attempt(&self, request: &ApiRequest) -> AttemptOutcome {
        let token = match self.tokens.token() {
            Ok(token) => token,
            Err(err) => return AttemptOutcome::Fatal(err),
        };

        let built = self
            .http_client
            .request(request.method.clone(), request.url.clone())
            .header(header::ACCEPT, "application/json")
            .bearer_auth(token)
            .query(&request.params)
            .build();
        let http_request = match built {
            Ok(http_request) => http_request,
            Err(err) => return AttemptOutcome::Fatal(RequestFailure::Build(err).into()),
        };

        tracing::debug!(url = %http_request.url(), "API request");

        let response = match self.http_client.execute(http_request).await {
            Ok(response) => response,
            Err(err) => return AttemptOutcome::Retryable(TransientError::Transport(err)),
        };

        let status = response.status();

        if status == StatusCode::OK {
            let body = match response.text().await {
                Ok(body) => body,
                Err(err) => return AttemptOutcome::Retryable(TransientError::Transport(err)),
            };
            return match serde_json::from_str::<Value>(&body) {
                Ok(data) => {
                    tracing::info!(
                        status_code = status.as_u16(),
                        response_data_keys = ?top_level_keys(&data),
                        "API request successful."
                    );
                    AttemptOutcome::Success(data)
                }
                Err(err) => AttemptOutcome::Fatal(RequestFailure::Decode(err).into()),
            };
        }

        if status == StatusCode::UNAUTHORIZED {
            return AttemptOutcome::Unauthorized;
        }

        let body = response
            .text()
            .await
            .unwrap_or_else(|_| String::from("<failed to read body>"));
        tracing::warn!(
            status_code = status.as_u16(),
            response_content = body_preview(&body),
            "API returned a non-200 status code."
        );
        AttemptOutcome::Retryable(TransientError::Status { status })
    }
}

/// Keys of a top-level JSON object, for success logging.
fn top_level_keys(data: &Value) -> Vec<&str> {
    data.as_object()
        .map(|object| object.keys().map(String::as_str).collect())
        .unwrap_or_default()
}

/// Truncates a body to at most `BODY_PREVIEW_LEN` bytes on a char boundary.
fn body_preview(body: &str) -> &str {
    let mut end = body.len().min(BODY_PREVIEW_LEN);
    while !body.is_char_boundary(end) {
        end = end.saturating_sub(1);
    }
    body.get(..end).unwrap_or_default()
}
