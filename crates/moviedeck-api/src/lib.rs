//! API client library for moviedeck.
//!
//! Provides a resilient TMDB API client, the movie catalog built on it,
//! and validators for caller-supplied request input.

/// TMDB API client.
pub mod tmdb;

/// Request input validators.
pub mod validation;
