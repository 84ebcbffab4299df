//! Application configuration module.
//!
//! Manages the TOML config file holding the TMDB endpoint, credentials,
//! retry policy, and cache lifetimes.

#[allow(clippy::module_inception)]
mod config;
mod paths;

#[allow(clippy::module_name_repetitions)]
pub use config::{AppConfig, TOKEN_ENV_VAR};
pub use paths::resolve_config_path;
