//! `MovieApi` trait definition.
#![allow(clippy::future_not_send)]

use serde_json::Value;

use super::catalog::TopRatedWithVideos;
use super::error::UpstreamFetchError;

/// Movie catalog trait.
///
/// Abstracts catalog operations for mock substitution in tests.
/// Uses `trait_variant::make` to generate a `Send`-bound async trait.
#[allow(clippy::module_name_repetitions)]
#[trait_variant::make(MovieApi: Send)]
pub trait LocalMovieApi {
    /// Fetches the movie genre list.
    ///
    /// # Errors
    ///
    /// Returns `UpstreamFetchError` if the upstream call fails.
    async fn genres(&self) -> Result<Vec<Value>, UpstreamFetchError>;

    /// Fetches the first top-rated movie and its videos.
    ///
    /// # Errors
    ///
    /// Returns `UpstreamFetchError` if either upstream call fails.
    async fn top_rated_movie_with_videos(&self) -> Result<TopRatedWithVideos, UpstreamFetchError>;

    /// Discovers movies by popularity, optionally filtered by genre.
    ///
    /// # Errors
    ///
    /// Returns `UpstreamFetchError` if the upstream call fails.
    async fn movies_by_genre(
        &self,
        genre_id: Option<u64>,
        page: u32,
    ) -> Result<Vec<Value>, UpstreamFetchError>;

    /// Fetches movie details including videos.
    ///
    /// # Errors
    ///
    /// Returns `UpstreamFetchError` if the upstream call fails.
    async fn movie_details(&self, movie_id: u64) -> Result<Value, UpstreamFetchError>;

    /// Searches movies by title.
    ///
    /// # Errors
    ///
    /// Returns `UpstreamFetchError` if the upstream call fails.
    async fn search_movies(&self, query: &str) -> Result<Vec<Value>, UpstreamFetchError>;
}
