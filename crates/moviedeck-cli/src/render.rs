//! Tabular and JSON rendering of catalog results.

use anyhow::{Context, Result};
use moviedeck_api::tmdb::TopRatedWithVideos;
use serde::Serialize;
use serde_json::Value;

/// Placeholder for missing fields.
const MISSING: &str = "-";

/// Returns `value[key]` as display text, or `-` when absent or null.
fn text(value: &Value, key: &str) -> String {
    match value.get(key) {
        None | Some(Value::Null) => String::from(MISSING),
        Some(Value::String(s)) if s.is_empty() => String::from(MISSING),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

/// Pretty-prints `value` as JSON.
fn json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    let rendered = serde_json::to_string_pretty(value).context("failed to serialize result")?;
    tracing::info!("{rendered}");
    Ok(())
}

/// Renders the genre list.
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub fn genres(genres: &[Value], as_json: bool) -> Result<()> {
    if as_json {
        return json(genres);
    }

    tracing::info!("ID\tName");
    for genre in genres {
        tracing::info!("{}\t{}", text(genre, "id"), text(genre, "name"));
    }
    tracing::info!("Total: {} genres", genres.len());
    Ok(())
}

/// Renders a movie list (discover or search results).
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub fn movies(movies: &[Value], as_json: bool) -> Result<()> {
    if as_json {
        return json(movies);
    }

    tracing::info!("ID\tReleaseDate\tVote\tTitle");
    for movie in movies {
        tracing::info!(
            "{}\t{}\t{}\t{}",
            text(movie, "id"),
            text(movie, "release_date"),
            text(movie, "vote_average"),
            text(movie, "title"),
        );
    }
    tracing::info!("Total: {} movies", movies.len());
    Ok(())
}

/// Renders a video list under a movie.
fn videos(videos: &[Value]) {
    tracing::info!("Videos ({}):", videos.len());
    for video in videos {
        tracing::info!(
            "  {}\t{}\t{}\t{}",
            text(video, "type"),
            text(video, "site"),
            text(video, "key"),
            text(video, "name"),
        );
    }
}

/// Renders the top-rated movie and its videos.
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub fn top_rated(top: &TopRatedWithVideos, as_json: bool) -> Result<()> {
    if as_json {
        return json(top);
    }

    let Some(movie) = top.movie.as_ref() else {
        tracing::info!("No top-rated movie found.");
        return Ok(());
    };

    tracing::info!("Top-rated: {} ({})", text(movie, "title"), text(movie, "id"));
    tracing::info!("Release Date: {}", text(movie, "release_date"));
    tracing::info!("Vote: {}", text(movie, "vote_average"));
    tracing::info!("Overview: {}", text(movie, "overview"));
    videos(&top.videos);
    Ok(())
}

/// Renders movie details, including appended videos.
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub fn details(movie: &Value, as_json: bool) -> Result<()> {
    if as_json {
        return json(movie);
    }

    let genre_names = movie
        .get("genres")
        .and_then(Value::as_array)
        .map(|genres| {
            genres
                .iter()
                .filter_map(|g| g.get("name").and_then(Value::as_str))
                .collect::<Vec<_>>()
                .join(", ")
        })
        .unwrap_or_default();

    tracing::info!("ID: {}", text(movie, "id"));
    tracing::info!("Title: {}", text(movie, "title"));
    tracing::info!("Original Title: {}", text(movie, "original_title"));
    tracing::info!("Release Date: {}", text(movie, "release_date"));
    tracing::info!("Runtime: {} min", text(movie, "runtime"));
    tracing::info!("Genres: {genre_names}");
    tracing::info!("Vote: {}", text(movie, "vote_average"));
    tracing::info!("Overview: {}", text(movie, "overview"));

    let appended = movie
        .pointer("/videos/results")
        .and_then(Value::as_array)
        .map_or(&[][..], Vec::as_slice);
    videos(appended);
    Ok(())
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_text_formats_values() {
        // Arrange
        let movie = json!({
            "title": "Inception",
            "id": 27205,
            "vote_average": 8.4,
            "tagline": "",
            "homepage": null
        });

        // Act & Assert
        assert_eq!(text(&movie, "title"), "Inception");
        assert_eq!(text(&movie, "id"), "27205");
        assert_eq!(text(&movie, "vote_average"), "8.4");
        assert_eq!(text(&movie, "tagline"), MISSING);
        assert_eq!(text(&movie, "homepage"), MISSING);
        assert_eq!(text(&movie, "absent"), MISSING);
    }

    #[test]
    fn test_render_empty_top_rated() {
        // Arrange
        let top = TopRatedWithVideos::default();

        // Act
        let result = top_rated(&top, false);

        // Assert
        assert!(result.is_ok());
    }

    #[test]
    fn test_render_details_without_videos() {
        // Arrange
        let movie = json!({"id": 1, "title": "x"});

        // Act
        let result = details(&movie, false);

        // Assert
        assert!(result.is_ok());
    }
}
