use std::time::Duration;
use serde::Deserialize;
use config::Config;
use governor::Quota;
use nonzero_ext::nonzero;
use crate::utils::error::PlaceError;

/// Configuration settings for the canvas server.
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    /// The port on which the WebSocket listener binds.
    pub port: u16,
    /// Side length of the square board. Must be greater than 1.
    pub dimension: usize,
    /// Minimum time between two accepted tile changes of one session.
    pub change_cooldown_ms: u64,
    /// The maximum number of simultaneous connections allowed.
    pub max_connections: usize,
    /// Port of the HTTP endpoint serving `/metrics` and `/stats`.
    pub metrics_port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            dimension: 10,
            change_cooldown_ms: 500,
            max_connections: 1000,
            metrics_port: 9080,
        }
    }
}

impl ServerConfig {
    /// Loads defaults, then `PLACE_*` variables, then the positional
    /// arguments `port dimension` (both optional).
    ///
    /// # Errors
    /// Returns a `PlaceError::ConfigurationError` if a value cannot be parsed.
    pub fn load<I, A>(args: I) -> Result<Self, PlaceError>
    where
        I: IntoIterator<Item = A>,
        A: Into<String>,
    {
        let defaults = Self::default();
        let mut args = args.into_iter().map(Into::into);

        Config::builder()
            .set_default("port", defaults.port as i64)?
            .set_default("dimension", defaults.dimension as i64)?
            .set_default("change_cooldown_ms", defaults.change_cooldown_ms as i64)?
            .set_default("max_connections", defaults.max_connections as i64)?
            .set_default("metrics_port", defaults.metrics_port as i64)?
            .add_source(config::Environment::with_prefix("PLACE"))
            .set_override_option("port", args.next())?
            .set_override_option("dimension", args.next())?
            .build()?
            .try_deserialize()
            .map_err(|e| PlaceError::ConfigurationError(e.to_string()))
    }

    /// Validates the configuration settings.
    ///
    /// # Errors
    /// Returns a `PlaceError::ConfigurationError` if validation fails.
    pub fn validate(&self) -> Result<(), PlaceError> {
        if self.dimension <= 1 {
            return Err(PlaceError::ConfigurationError(
                "dimension must be greater than 1".into()
            ));
        }

        if self.max_connections == 0 {
            return Err(PlaceError::ConfigurationError(
                "max_connections must be greater than 0".into()
            ));
        }

        self.change_quota().map(|_| ())
    }

    pub fn change_cooldown(&self) -> Duration {
        Duration::from_millis(self.change_cooldown_ms)
    }

    /// One accepted change per cooldown, no burst.
    ///
    /// # Errors
    /// Returns a `PlaceError::ConfigurationError` for a zero cooldown.
    pub fn change_quota(&self) -> Result<Quota, PlaceError> {
        Quota::with_period(self.change_cooldown())
            .map(|quota| quota.allow_burst(nonzero!(1u32)))
            .ok_or_else(|| {
                PlaceError::ConfigurationError("change_cooldown_ms must be greater than 0".into())
            })
    }
}
