#![forbid(unsafe_code)]

//! Structured logging setup.
//!
//! Every vizkit crate emits `tracing` events with dotted message names
//! (`observable.consume`, `camera.steering.attach`, ...). Libraries never
//! install a subscriber; applications either bring their own or, with the
//! `tracing-json` feature, call [`init_json_logging`] / [`init_logging`].
//!
//! The filter comes from the `VIZKIT_LOG` environment variable (standard
//! `EnvFilter` syntax) and falls back to [`DEFAULT_FILTER`].

/// Environment variable holding the log filter.
pub const LOG_ENV: &str = "VIZKIT_LOG";

/// Filter used when [`LOG_ENV`] is unset or blank.
pub const DEFAULT_FILTER: &str = "info";

/// Resolve the filter directive using a custom environment lookup.
#[must_use]
pub fn filter_from_env<F>(get_env: F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    get_env(LOG_ENV)
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| DEFAULT_FILTER.to_string())
}

#[cfg(feature = "tracing-json")]
mod install {
    use tracing_subscriber::EnvFilter;

    use super::{DEFAULT_FILTER, filter_from_env};

    /// Error installing the global subscriber (usually: one is already set).
    pub type InitError = Box<dyn std::error::Error + Send + Sync + 'static>;

    fn env_filter() -> EnvFilter {
        let directive = filter_from_env(|key| std::env::var(key).ok());
        EnvFilter::try_new(&directive).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
    }

    /// Install a global JSON subscriber filtered by `VIZKIT_LOG`.
    ///
    /// # Errors
    ///
    /// Fails if a global subscriber is already installed.
    pub fn init_json_logging() -> Result<(), InitError> {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(env_filter())
            .try_init()
    }

    /// Install a global human-readable subscriber.
    ///
    /// `directive` overrides `VIZKIT_LOG` when given.
    ///
    /// # Errors
    ///
    /// Fails if a global subscriber is already installed.
    pub fn init_logging(directive: Option<&str>) -> Result<(), InitError> {
        let filter = match directive {
            Some(d) => EnvFilter::try_new(d)?,
            None => env_filter(),
        };
        tracing_subscriber::fmt().with_env_filter(filter).try_init()
    }
}

#[cfg(feature = "tracing-json")]
pub use install::{InitError, init_json_logging, init_logging};
