//! `TmdbCatalog` - movie catalog operations on top of `ApiClient`.
#![allow(clippy::future_not_send)]

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::Value;
use tracing::instrument;
use url::Url;

use super::api::LocalMovieApi;
use super::cache::LocalResponseCache;
use super::client::{ApiClient, ApiRequest, QueryParams};
use super::error::{ApiError, Operation, RequestFailure, UpstreamFetchError};

/// Default base URL for TMDB API v3.
pub const DEFAULT_BASE_URL: &str = "https://api.themoviedb.org/3/";

/// Default response language.
pub const DEFAULT_LANGUAGE: &str = "en-US";

/// Default TTL of the cached genre list.
pub const DEFAULT_GENRES_TTL: Duration = Duration::from_secs(3600);

/// Default TTL of a cached top-rated page.
pub const DEFAULT_TOP_RATED_TTL: Duration = Duration::from_secs(1800);

/// Cache key of the genre list.
const GENRES_CACHE_KEY: &str = "tmdb_genres";

/// Cache key prefix of top-rated pages; the page number is appended.
const TOP_RATED_CACHE_KEY_PREFIX: &str = "tmdb_top_rated_movies_page_";

/// Endpoint, language, and cache lifetimes used by [`TmdbCatalog`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogSettings {
    base_url: Url,
    language: String,
    genres_ttl: Duration,
    top_rated_ttl: Duration,
}

impl CatalogSettings {
    /// Creates settings for `base_url` with the default language and TTLs.
    ///
    /// A trailing `/` is added to `base_url` when missing so that endpoint
    /// paths resolve below it.
    ///
    /// # Errors
    ///
    /// Returns an error if `base_url` is not a valid absolute URL.
    pub fn new(base_url: &str) -> Result<Self> {
        let normalized = if base_url.ends_with('/') {
            base_url.to_owned()
        } else {
            format!("{base_url}/")
        };
        let base_url = Url::parse(&normalized).context("invalid base URL")?;

        Ok(Self {
            base_url,
            language: String::from(DEFAULT_LANGUAGE),
            genres_ttl: DEFAULT_GENRES_TTL,
            top_rated_ttl: DEFAULT_TOP_RATED_TTL,
        })
    }

    /// Sets the `language` parameter sent with every request.
    #[must_use]
    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    /// Sets the genre list TTL.
    #[must_use]
    pub const fn with_genres_ttl(mut self, ttl: Duration) -> Self {
        self.genres_ttl = ttl;
        self
    }

    /// Sets the top-rated page TTL.
    #[must_use]
    pub const fn with_top_rated_ttl(mut self, ttl: Duration) -> Self {
        self.top_rated_ttl = ttl;
        self
    }

    /// API base URL (always ends with `/`).
    #[must_use]
    pub const fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Response language.
    #[must_use]
    pub fn language(&self) -> &str {
        &self.language
    }
}

/// The top-rated movie together with its videos.
///
/// Both fields are empty when the top-rated list is empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TopRatedWithVideos {
    /// First movie of top-rated page 1.
    pub movie: Option<Value>,
    /// Videos of that movie.
    pub videos: Vec<Value>,
}

impl TopRatedWithVideos {
    /// Returns `true` when no top-rated movie was found.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.movie.is_none()
    }
}

/// TMDB movie catalog.
///
/// Every request carries the configured `language`. The genre list and
/// top-rated pages are read through `cache`.
#[derive(Debug)]
#[allow(clippy::module_name_repetitions)]
pub struct TmdbCatalog<C> {
    client: ApiClient,
    settings: CatalogSettings,
    cache: C,
}

impl<C: LocalResponseCache + Sync> TmdbCatalog<C> {
    /// Creates a catalog.
    #[must_use]
    pub const fn new(client: ApiClient, settings: CatalogSettings, cache: C) -> Self {
        Self {
            client,
            settings,
            cache,
        }
    }

    /// Issues a GET to `path` below the base URL with `language` injected.
    async fn call(&self, path: &str, mut params: QueryParams) -> Result<Value, ApiError> {
        params.insert(String::from("language"), self.settings.language.clone());
        let url = self
            .settings
            .base_url
            .join(path.trim_start_matches('/'))
            .map_err(RequestFailure::from)?;

        self.client
            .execute(&ApiRequest::get(url, params))
            .await
            .inspect_err(|err| {
                tracing::error!(endpoint = path, error = %err, "TMDB API call failed.");
            })
    }

    /// Fetches the genre envelope through the cache.
    async fn fetch_genres(&self) -> Result<Vec<Value>, Arc<ApiError>> {
        let data = self
            .cache
            .get_or_try_insert_with(
                String::from(GENRES_CACHE_KEY),
                self.settings.genres_ttl,
                self.call("/genre/movie/list", QueryParams::new()),
            )
            .await?;
        unwrap_list(data, "genres").map_err(Arc::new)
    }

    /// Fetches one page of top-rated movies through the cache.
    async fn fetch_top_rated(&self, page: u32) -> Result<Vec<Value>, Arc<ApiError>> {
        let mut params = QueryParams::new();
        params.insert(String::from("page"), page.to_string());

        let data = self
            .cache
            .get_or_try_insert_with(
                format!("{TOP_RATED_CACHE_KEY_PREFIX}{page}"),
                self.settings.top_rated_ttl,
                self.call("/movie/top_rated", params),
            )
            .await
            .inspect_err(|err| {
                tracing::error!(page, error = %err, "Failed to fetch top-rated movies from TMDB.");
            })?;
        unwrap_list(data, "results").map_err(Arc::new)
    }

    /// Fetches the videos of one movie.
    async fn fetch_movie_videos(&self, movie_id: u64) -> Result<Vec<Value>, ApiError> {
        let data = self
            .call(&format!("/movie/{movie_id}/videos"), QueryParams::new())
            .await
            .inspect_err(|err| {
                tracing::error!(movie_id, error = %err, "Failed to fetch movie videos from TMDB.");
            })?;
        unwrap_list(data, "results")
    }

    async fn fetch_top_rated_with_videos(&self) -> Result<TopRatedWithVideos, Arc<ApiError>> {
        let Some(movie) = self.fetch_top_rated(1).await?.into_iter().next() else {
            return Ok(TopRatedWithVideos::default());
        };

        let movie_id = movie.get("id").and_then(Value::as_u64).ok_or_else(|| {
            ApiError::from(RequestFailure::Shape(String::from(
                "top-rated movie has no numeric id",
            )))
        })?;
        let videos = self.fetch_movie_videos(movie_id).await?;

        tracing::info!(
            movie_id,
            videos_count = videos.len(),
            "Fetched top movie videos."
        );
        Ok(TopRatedWithVideos {
            movie: Some(movie),
            videos,
        })
    }
}

impl<C: LocalResponseCache + Sync> LocalMovieApi for TmdbCatalog<C> {
    #[instrument(skip_all)]
    async fn genres(&self) -> Result<Vec<Value>, UpstreamFetchError> {
        let genres = self
            .fetch_genres()
            .await
            .map_err(|err| upstream_failure(Operation::Genres, err))?;
        tracing::info!(count = genres.len(), "Fetched genres successfully.");
        Ok(genres)
    }

    #[instrument(skip_all)]
    async fn top_rated_movie_with_videos(&self) -> Result<TopRatedWithVideos, UpstreamFetchError> {
        self.fetch_top_rated_with_videos()
            .await
            .map_err(|err| upstream_failure(Operation::TopRatedMovie, err))
    }

    #[instrument(skip_all)]
    async fn movies_by_genre(
        &self,
        genre_id: Option<u64>,
        page: u32,
    ) -> Result<Vec<Value>, UpstreamFetchError> {
        let mut params = QueryParams::new();
        params.insert(String::from("page"), page.to_string());
        params.insert(String::from("sort_by"), String::from("popularity.desc"));
        params.insert(String::from("include_adult"), String::from("false"));
        params.insert(String::from("include_video"), String::from("false"));
        if let Some(id) = genre_id {
            params.insert(String::from("with_genres"), id.to_string());
        }

        let movies = self
            .call("/discover/movie", params)
            .await
            .and_then(|data| unwrap_list(data, "results"))
            .map_err(|err| upstream_failure(Operation::MoviesByGenre, Arc::new(err)))?;
        tracing::info!(
            genre_id,
            page,
            count = movies.len(),
            "Fetched movies for genre."
        );
        Ok(movies)
    }

    #[instrument(skip_all)]
    async fn movie_details(&self, movie_id: u64) -> Result<Value, UpstreamFetchError> {
        let mut params = QueryParams::new();
        params.insert(String::from("append_to_response"), String::from("videos"));

        let details = self
            .call(&format!("/movie/{movie_id}"), params)
            .await
            .map_err(|err| upstream_failure(Operation::MovieDetails, Arc::new(err)))?;
        tracing::info!(movie_id, "Fetched movie details successfully.");
        Ok(details)
    }

    #[instrument(skip_all)]
    async fn search_movies(&self, query: &str) -> Result<Vec<Value>, UpstreamFetchError> {
        let mut params = QueryParams::new();
        params.insert(String::from("query"), query.to_owned());
        params.insert(String::from("include_adult"), String::from("false"));

        let results = self
            .call("/search/movie", params)
            .await
            .and_then(|data| unwrap_list(data, "results"))
            .map_err(|err| upstream_failure(Operation::SearchMovies, Arc::new(err)))?;
        tracing::info!(
            query,
            count = results.len(),
            "Performed movie search successfully."
        );
        Ok(results)
    }
}

/// Extracts the array stored under `key`; an absent or `null` key yields `[]`.
fn unwrap_list(mut data: Value, key: &str) -> Result<Vec<Value>, ApiError> {
    match data.get_mut(key).map(Value::take) {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Array(items)) => Ok(items),
        Some(other) => Err(RequestFailure::Shape(format!(
            "expected `{key}` to be an array, got {other}"
        ))
        .into()),
    }
}

/// Logs a failed operation and converts it to the user-safe error.
fn upstream_failure(operation: Operation, cause: Arc<ApiError>) -> UpstreamFetchError {
    tracing::error!(
        ?operation,
        error = ?cause,
        "{}",
        operation.failure_message()
    );
    UpstreamFetchError::new(operation, cause)
}
