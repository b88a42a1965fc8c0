//! Centralized server configuration.
//!
//! Strongly-typed configuration loaded via the `config` crate from
//! environment variables. Nested keys use `__` as the separator, so
//! `SESSION__DURATION_MINUTES` sets `session.duration_minutes`.

use serde::Deserialize;
use std::time::Duration;

/// Server configuration.
#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    /// Address the HTTP listener binds to.
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,

    /// PostgreSQL database connection URL.
    pub database_url: String,

    /// Redis connection URL for the session cache.
    pub redis_url: String,

    /// Session token configuration.
    #[serde(default)]
    pub session: SessionConfig,

    /// Spotify client configuration.
    pub spotify: SpotifyConfig,

    /// Store and cache bounds.
    #[serde(default)]
    pub store: StoreConfig,

    /// Cross-origin access.
    #[serde(default)]
    pub cors: CorsConfig,
}

fn default_listen_addr() -> String {
    "0.0.0.0:4000".to_string()
}

/// Session token configuration.
#[derive(Clone, Deserialize)]
pub struct SessionConfig {
    /// HS256 signing secret. Issuing fails while this is unset.
    #[serde(default)]
    pub signing_secret: Option<String>,

    /// Issuer claim written into and required of every token.
    #[serde(default = "default_issuer")]
    pub issuer: String,

    /// Token validity in minutes.
    #[serde(default = "default_session_duration_minutes")]
    pub duration_minutes: i64,
}

fn default_issuer() -> String {
    "nowplaying".to_string()
}

fn default_session_duration_minutes() -> i64 {
    nowplaying_identity::DEFAULT_SESSION_MINUTES
}

/// Longest accepted session validity: 30 days.
pub const MAX_SESSION_MINUTES: i64 = 30 * 24 * 60;

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            signing_secret: None,
            issuer: default_issuer(),
            duration_minutes: default_session_duration_minutes(),
        }
    }
}

impl SessionConfig {
    #[must_use]
    pub fn validity(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.duration_minutes)
    }
}

impl std::fmt::Debug for SessionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionConfig")
            .field(
                "signing_secret",
                &self.signing_secret.as_ref().map(|_| "<redacted>"),
            )
            .field("issuer", &self.issuer)
            .field("duration_minutes", &self.duration_minutes)
            .finish()
    }
}

/// Spotify client configuration.
#[derive(Clone, Deserialize)]
pub struct SpotifyConfig {
    pub client_id: String,
    pub client_secret: String,

    #[serde(default = "default_token_url")]
    pub token_url: String,

    #[serde(default = "default_currently_playing_url")]
    pub currently_playing_url: String,

    /// Bound on each outbound request, in seconds.
    #[serde(default = "default_request_timeout_seconds")]
    pub request_timeout_seconds: u64,
}

fn default_token_url() -> String {
    nowplaying_upstream::SPOTIFY_TOKEN_URL.to_string()
}

fn default_currently_playing_url() -> String {
    nowplaying_upstream::SPOTIFY_CURRENTLY_PLAYING_URL.to_string()
}

fn default_request_timeout_seconds() -> u64 {
    nowplaying_upstream::DEFAULT_REQUEST_TIMEOUT.as_secs()
}

impl SpotifyConfig {
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }
}

impl std::fmt::Debug for SpotifyConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpotifyConfig")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("token_url", &self.token_url)
            .field("currently_playing_url", &self.currently_playing_url)
            .field("request_timeout_seconds", &self.request_timeout_seconds)
            .finish()
    }
}

/// Bounds on store and cache calls.
#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    /// Bound on each store or cache call, in seconds.
    #[serde(default = "default_store_timeout_seconds")]
    pub timeout_seconds: u64,

    /// Maximum PostgreSQL pool size.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_store_timeout_seconds() -> u64 {
    3
}

fn default_max_connections() -> u32 {
    5
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: default_store_timeout_seconds(),
            max_connections: default_max_connections(),
        }
    }
}

impl StoreConfig {
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

/// Cross-origin access configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CorsConfig {
    /// Origins allowed to call the API. Empty allows none.
    #[serde(default)]
    pub allowed_origins: Vec<String>,
}

impl ServerConfig {
    /// Loads configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if required configuration is missing or invalid.
    pub fn from_env() -> Result<Self, config::ConfigError> {
        Self::load(environment())
    }

    fn load(source: config::Environment) -> Result<Self, config::ConfigError> {
        let config: Self = config::Config::builder()
            .add_source(source)
            .build()?
            .try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), config::ConfigError> {
        let minutes = self.session.duration_minutes;
        if !(1..=MAX_SESSION_MINUTES).contains(&minutes) {
            return Err(config::ConfigError::Message(format!(
                "session.duration_minutes must be between 1 and {MAX_SESSION_MINUTES}, got {minutes}"
            )));
        }
        Ok(())
    }
}

fn environment() -> config::Environment {
    config::Environment::default()
        .separator("__")
        .try_parsing(true)
        .list_separator(",")
        .with_list_parse_key("cors.allowed_origins")
}
