//! Configuration for the analytics interceptor.
//!
//! [`TrackingConfig`] is filled in by the host (a configuration section,
//! the environment, or the builder methods) and resolved once when the
//! layer is built. The layer never changes it afterwards.

use serde::Deserialize;
use std::time::Duration;

/// GA4 Measurement Protocol endpoint used when none is configured.
pub const DEFAULT_ENDPOINT_URL: &str = "https://www.google-analytics.com/mp/collect";

/// First-party analytics cookie that carries the client id.
pub const DEFAULT_CLIENT_ID_COOKIE: &str = "_ga";

/// Collector request timeout, in milliseconds.
pub const DEFAULT_TIMEOUT_MS: u64 = 5_000;

/// How much of each response body is kept for the event (64KB).
pub const DEFAULT_MAX_CAPTURE_BYTES: usize = 64 * 1024;

/// Prefix used by [`TrackingConfig::from_env`].
pub const ENV_PREFIX: &str = "REQTRACK_ANALYTICS";

/// Error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Environment variables could not be deserialized.
    #[error("failed to load tracking configuration from environment: {0}")]
    Env(#[from] envy::Error),

    /// A configuration section could not be deserialized.
    #[error("invalid tracking configuration: {0}")]
    Invalid(#[from] serde_json::Error),
}

/// Tracking parameters for the analytics interceptor.
///
/// ```ignore
/// use reqtrack_analytics::TrackingConfig;
/// use std::time::Duration;
///
/// let config = TrackingConfig::new("G-XXXXXXX")
///     .enabled(true)
///     .api_secret("secret")
///     .timeout(Duration::from_secs(2));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct TrackingConfig {
    /// Collector measurement id (e.g. `G-XXXXXXX`). Tracking is off while empty.
    #[serde(alias = "trackingID", alias = "trackingId")]
    pub tracking_id: String,

    /// Whether tracking is enabled. Default: false.
    pub enabled: bool,

    /// Collector endpoint. Empty means [`DEFAULT_ENDPOINT_URL`].
    #[serde(alias = "endpointURL", alias = "endpointUrl")]
    pub endpoint_url: String,

    /// Measurement Protocol API secret sent with every event.
    #[serde(alias = "apiSecret")]
    pub api_secret: String,

    /// Collector request timeout in milliseconds. Zero means the default.
    #[serde(alias = "timeoutMs")]
    pub timeout_ms: u64,

    /// Upper bound on buffered response bytes per request.
    #[serde(alias = "maxCaptureBytes")]
    pub max_capture_bytes: usize,

    /// Cookie holding the client id.
    #[serde(alias = "clientIdCookie")]
    pub client_id_cookie: String,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            tracking_id: String::new(),
            enabled: false,
            endpoint_url: String::new(),
            api_secret: String::new(),
            timeout_ms: DEFAULT_TIMEOUT_MS,
            max_capture_bytes: DEFAULT_MAX_CAPTURE_BYTES,
            client_id_cookie: DEFAULT_CLIENT_ID_COOKIE.to_string(),
        }
    }
}

impl TrackingConfig {
    /// Create a configuration for `tracking_id`. Tracking stays disabled
    /// until [`enabled`](Self::enabled) is called.
    pub fn new(tracking_id: impl Into<String>) -> Self {
        Self {
            tracking_id: tracking_id.into(),
            ..Self::default()
        }
    }

    /// Load from `REQTRACK_ANALYTICS_*` environment variables
    /// (`REQTRACK_ANALYTICS_TRACKING_ID`, `REQTRACK_ANALYTICS_ENABLED`, ...).
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_env_prefixed(ENV_PREFIX)
    }

    /// Load from environment variables starting with `{prefix}_`.
    pub fn from_env_prefixed(prefix: &str) -> Result<Self, ConfigError> {
        Ok(envy::prefixed(format!("{}_", prefix)).from_env::<Self>()?)
    }

    /// Load from a host configuration section. `null` yields the defaults.
    pub fn from_value(value: serde_json::Value) -> Result<Self, ConfigError> {
        if value.is_null() {
            return Ok(Self::default());
        }
        Ok(serde_json::from_value(value)?)
    }

    /// Enable or disable tracking.
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Set the collector endpoint.
    pub fn endpoint_url(mut self, url: impl Into<String>) -> Self {
        self.endpoint_url = url.into();
        self
    }

    /// Set the API secret.
    pub fn api_secret(mut self, secret: impl Into<String>) -> Self {
        self.api_secret = secret.into();
        self
    }

    /// Set the collector request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Set the response capture limit.
    pub fn max_capture_bytes(mut self, limit: usize) -> Self {
        self.max_capture_bytes = limit;
        self
    }

    /// Set the client id cookie name.
    pub fn client_id_cookie(mut self, name: impl Into<String>) -> Self {
        self.client_id_cookie = name.into();
        self
    }

    /// Gate check: tracking runs only when enabled with a tracking id.
    pub fn is_active(&self) -> bool {
        self.enabled && !self.tracking_id.is_empty()
    }

    /// Collector request timeout. Non-zero once resolved.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Fill in defaults for empty values. Called once when a layer is built.
    pub fn resolve(mut self) -> Self {
        if self.endpoint_url.trim().is_empty() {
            self.endpoint_url = DEFAULT_ENDPOINT_URL.to_string();
        }
        if self.timeout_ms == 0 {
            self.timeout_ms = DEFAULT_TIMEOUT_MS;
        }
        if self.client_id_cookie.is_empty() {
            self.client_id_cookie = DEFAULT_CLIENT_ID_COOKIE.to_string();
        }
        self
    }
}

/// Load environment variables from a `.env` file in the current directory.
///
/// Existing variables win; a missing file is not an error.
pub fn load_dotenv() {
    match dotenvy::dotenv() {
        Ok(path) => tracing::debug!(path = %path.display(), "Loaded .env file"),
        Err(err) if err.not_found() => {}
        Err(err) => tracing::warn!(error = %err, "Failed to load .env file"),
    }
}
