//! Bearer token holder with invalidate-and-reload semantics.

use std::fmt;
use std::sync::{Mutex, PoisonError};

use super::error::ApiError;

/// Source the [`TokenHolder`] (re)loads its bearer token from.
pub trait TokenSource: fmt::Debug + Send + Sync {
    /// Returns the current token, or `None` when unavailable.
    fn load(&self) -> Option<String>;
}

/// A fixed token supplied at construction.
#[derive(Clone)]
pub struct StaticToken(String);

impl StaticToken {
    /// Wraps a static token value.
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }
}

impl fmt::Debug for StaticToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("StaticToken(<redacted>)")
    }
}

impl TokenSource for StaticToken {
    fn load(&self) -> Option<String> {
        Some(self.0.clone())
    }
}

/// Reads the token from an environment variable on every load, so a value
/// swapped between calls is picked up after an invalidation.
#[derive(Debug, Clone)]
pub struct EnvToken {
    var: String,
}

impl EnvToken {
    /// Reads from the given environment variable.
    #[must_use]
    pub fn new(var: impl Into<String>) -> Self {
        Self { var: var.into() }
    }
}

impl TokenSource for EnvToken {
    fn load(&self) -> Option<String> {
        std::env::var(&self.var).ok()
    }
}

/// Owns the current bearer token.
///
/// The token is loaded lazily on first access and cleared by
/// [`invalidate`](Self::invalidate); the next [`token`](Self::token) call
/// reloads it from the source. Load and store happen under one lock.
#[derive(Debug)]
#[allow(clippy::module_name_repetitions)]
pub struct TokenHolder {
    source: Box<dyn TokenSource>,
    current: Mutex<Option<String>>,
}

impl TokenHolder {
    /// Creates a holder; nothing is loaded until the first access.
    #[must_use]
    pub fn new(source: impl TokenSource + 'static) -> Self {
        Self {
            source: Box::new(source),
            current: Mutex::new(None),
        }
    }

    /// Returns the current token, loading it from the source if unset.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::AuthConfiguration`] if the source yields a
    /// missing or empty value.
    pub fn token(&self) -> Result<String, ApiError> {
        let mut current = self.current.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(token) = current.as_ref() {
            return Ok(token.clone());
        }

        let loaded = self
            .source
            .load()
            .filter(|token| !token.trim().is_empty())
            .ok_or_else(|| {
                tracing::error!("Bearer token not found in configured source.");
                ApiError::AuthConfiguration
            })?;
        *current = Some(loaded.clone());
        Ok(loaded)
    }

    /// Clears the current token unconditionally.
    pub fn invalidate(&self) {
        let mut current = self.current.lock().unwrap_or_else(PoisonError::into_inner);
        *current = None;
    }
}
