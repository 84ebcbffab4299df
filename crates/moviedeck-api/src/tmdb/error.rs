//! Error types for the TMDB client and catalog.

use std::sync::Arc;

use reqwest::StatusCode;

/// Errors returned by [`ApiClient`](super::ApiClient).
#[derive(Debug, thiserror::Error)]
#[allow(clippy::module_name_repetitions)]
pub enum ApiError {
    /// The bearer token source yielded no value. Not retried.
    #[error("bearer token is not set")]
    AuthConfiguration,

    /// The retry budget was exhausted.
    #[error("external API service is unavailable (gave up after {attempts} attempt(s))")]
    Unavailable {
        /// Number of attempts made before giving up.
        attempts: u32,
        /// Failure observed on the last attempt.
        #[source]
        last_failure: TransientError,
    },

    /// An unexpected, non-retryable failure during an attempt.
    #[error("an unexpected error occurred during API communication")]
    Request(#[source] RequestFailure),
}

impl ApiError {
    /// Returns `true` when the error came from an exhausted retry budget.
    #[must_use]
    pub const fn is_unavailable(&self) -> bool {
        matches!(self, Self::Unavailable { .. })
    }
}

impl From<RequestFailure> for ApiError {
    fn from(failure: RequestFailure) -> Self {
        Self::Request(failure)
    }
}

/// A failure that is retried with backoff.
#[derive(Debug, thiserror::Error)]
pub enum TransientError {
    /// Network, timeout, or redirect failure.
    #[error("transport error")]
    Transport(#[source] reqwest::Error),

    /// The API answered with a status other than 200.
    #[error("API returned status code {status}")]
    Status {
        /// Response status.
        status: StatusCode,
    },
}

/// A failure that terminates the call immediately.
#[derive(Debug, thiserror::Error)]
pub enum RequestFailure {
    /// The HTTP request could not be built.
    #[error("failed to build request")]
    Build(#[source] reqwest::Error),

    /// The endpoint path could not be joined to the base URL.
    #[error("invalid endpoint URL")]
    Endpoint(#[from] url::ParseError),

    /// A 200 response body was not valid JSON.
    #[error("failed to decode JSON response")]
    Decode(#[from] serde_json::Error),

    /// The decoded JSON did not have the expected envelope shape.
    #[error("unexpected response shape: {0}")]
    Shape(String),
}

/// A logical catalog operation, used to tag [`UpstreamFetchError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// Genre list.
    Genres,
    /// Top-rated movie together with its videos.
    TopRatedMovie,
    /// Movie discovery filtered by genre.
    MoviesByGenre,
    /// Single movie details.
    MovieDetails,
    /// Free-text movie search.
    SearchMovies,
}

impl Operation {
    /// User-safe message shown when this operation fails.
    #[must_use]
    pub const fn failure_message(self) -> &'static str {
        match self {
            Self::Genres => "Unable to fetch genres.",
            Self::TopRatedMovie => "Unable to fetch top-rated movies.",
            Self::MoviesByGenre => "Unable to fetch movies by genre.",
            Self::MovieDetails => "Unable to fetch movie details.",
            Self::SearchMovies => "Unable to search for movies.",
        }
    }
}

/// Facade-level error. `Display` never includes upstream details; the cause
/// is only reachable through [`std::error::Error::source`].
#[derive(Debug, thiserror::Error)]
#[error("{}", .operation.failure_message())]
pub struct UpstreamFetchError {
    operation: Operation,
    #[source]
    source: Arc<ApiError>,
}

impl UpstreamFetchError {
    /// Wraps a client failure for the given operation.
    #[must_use]
    pub const fn new(operation: Operation, source: Arc<ApiError>) -> Self {
        Self { operation, source }
    }

    /// The operation that failed.
    #[must_use]
    pub const fn operation(&self) -> Operation {
        self.operation
    }

    /// The underlying client error, for logging.
    #[must_use]
    pub fn cause(&self) -> &ApiError {
        &self.source
    }
}
