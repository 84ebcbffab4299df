//! TMDB API client module.
//!
//! Sends authenticated requests to TMDB API v3 with retry and backoff,
//! and exposes movie catalog operations with a read-through cache.

mod api;
mod cache;
mod catalog;
mod client;
mod error;
mod retry;
mod token;

#[allow(clippy::module_name_repetitions)]
pub use api::{LocalMovieApi, MovieApi};
#[allow(clippy::module_name_repetitions)]
pub use cache::{LocalResponseCache, MokaResponseCache, PassthroughCache, ResponseCache};
#[allow(clippy::module_name_repetitions)]
pub use catalog::{
    CatalogSettings, DEFAULT_BASE_URL, DEFAULT_GENRES_TTL, DEFAULT_LANGUAGE,
    DEFAULT_TOP_RATED_TTL, TmdbCatalog, TopRatedWithVideos,
};
pub use client::{ApiClient, ApiClientBuilder, ApiRequest, QueryParams};
pub use error::{ApiError, Operation, RequestFailure, TransientError, UpstreamFetchError};
pub use retry::{DEFAULT_INITIAL_DELAY, DEFAULT_MAX_RETRIES, MAX_BACKOFF_DELAY, RetryPolicy};
pub use token::{EnvToken, StaticToken, TokenHolder, TokenSource};
