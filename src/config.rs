use std::env;

use crate::pipeline::series::{DEFAULT_FILLER_INTERVAL_MS, DEFAULT_GAP_THRESHOLD_MS, GapConfig};

/// Shortest accepted filler interval.
pub const MIN_FILLER_INTERVAL_MS: i64 = 1000;

#[derive(Debug, Clone)]
pub enum Deployment {
    Local,
    Dev,
    Stage,
    Prod,
}

impl Deployment {
    #[must_use]
    pub fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "dev" | "development" => Self::Dev,
            "stage" | "staging" => Self::Stage,
            "prod" | "production" => Self::Prod,
            _ => Self::Local,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GapPolicyKind {
    Filler,
    Marker,
}

impl GapPolicyKind {
    fn parse(s: &str) -> Result<Self, ConfigError> {
        match s.trim().to_lowercase().as_str() {
            "filler" => Ok(Self::Filler),
            "marker" => Ok(Self::Marker),
            other => Err(ConfigError::Invalid("GAP_POLICY", other.to_string())),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    // FROST server
    pub frost_base_url: String,
    pub frost_timeout_seconds: u64,
    pub frost_max_pages: usize,
    /// Upper bound on requests in flight to the server from one batch.
    pub frost_concurrency: usize,

    // Observations
    pub observation_limit: usize,
    pub observation_limit_max: usize,
    pub gap_threshold_ms: i64,
    pub filler_interval_ms: i64,
    pub gap_policy: GapPolicyKind,

    // Registry refresh
    pub things_refresh_interval_seconds: u64,
    pub refresh_retry_max: u32,
    pub refresh_retry_delay_seconds: u64,

    // API settings
    pub api_host: String,
    pub api_port: u16,
    pub api_concurrency_limit: usize,

    // Caching
    pub cache_ttl_seconds: u64,
    pub cache_max_bytes: u64,

    // Client sessions
    pub session_idle_seconds: u64,
    pub session_max: u64,

    // Map
    pub map_center_lat: f64,
    pub map_center_lon: f64,

    // Application metadata
    pub deployment: Deployment,
}

fn parse_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

impl Default for Config {
    fn default() -> Self {
        Self {
            frost_base_url: "http://localhost:8080/FROST-Server/v1.1".to_string(),
            frost_timeout_seconds: 30,
            frost_max_pages: 20,
            frost_concurrency: 8,
            observation_limit: 1000,
            observation_limit_max: 10_000,
            gap_threshold_ms: DEFAULT_GAP_THRESHOLD_MS,
            filler_interval_ms: DEFAULT_FILLER_INTERVAL_MS,
            gap_policy: GapPolicyKind::Filler,
            things_refresh_interval_seconds: 300,
            refresh_retry_max: 3,
            refresh_retry_delay_seconds: 10,
            api_host: "0.0.0.0".to_string(),
            api_port: 3000,
            api_concurrency_limit: 64,
            cache_ttl_seconds: 60,
            cache_max_bytes: 67_108_864, // 64MB
            session_idle_seconds: 3600,
            session_max: 10_000,
            map_center_lat: 52.00482,
            map_center_lon: 4.37034,
            deployment: Deployment::Local,
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Unset or unparseable numeric values fall back to their defaults.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Missing` if `FROST_BASE_URL` is not set, and
    /// `ConfigError::Invalid` for an unknown gap policy or non-positive gap
    /// durations.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        let defaults = Self::default();

        let config = Self {
            // FROST server
            frost_base_url: env::var("FROST_BASE_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .map_err(|_| ConfigError::Missing("FROST_BASE_URL"))?,
            frost_timeout_seconds: parse_or("FROST_TIMEOUT_SECONDS", defaults.frost_timeout_seconds),
            frost_max_pages: parse_or("FROST_MAX_PAGES", defaults.frost_max_pages),
            frost_concurrency: parse_or("FROST_CONCURRENCY", defaults.frost_concurrency),

            // Observations
            observation_limit: parse_or("OBSERVATION_LIMIT", defaults.observation_limit),
            observation_limit_max: parse_or("OBSERVATION_LIMIT_MAX", defaults.observation_limit_max),
            gap_threshold_ms: parse_or("GAP_THRESHOLD_MS", defaults.gap_threshold_ms),
            filler_interval_ms: parse_or("FILLER_INTERVAL_MS", defaults.filler_interval_ms),
            gap_policy: match env::var("GAP_POLICY") {
                Ok(v) => GapPolicyKind::parse(&v)?,
                Err(_) => defaults.gap_policy,
            },

            // Registry refresh
            things_refresh_interval_seconds: parse_or(
                "THINGS_REFRESH_INTERVAL_SECONDS",
                defaults.things_refresh_interval_seconds,
            ),
            refresh_retry_max: parse_or("REFRESH_RETRY_MAX", defaults.refresh_retry_max),
            refresh_retry_delay_seconds: parse_or(
                "REFRESH_RETRY_DELAY_SECONDS",
                defaults.refresh_retry_delay_seconds,
            ),

            // API settings
            api_host: env::var("API_HOST").unwrap_or(defaults.api_host),
            api_port: parse_or("API_PORT", defaults.api_port),
            api_concurrency_limit: parse_or("API_CONCURRENCY_LIMIT", defaults.api_concurrency_limit),

            // Caching
            cache_ttl_seconds: parse_or("CACHE_TTL_SECONDS", defaults.cache_ttl_seconds),
            cache_max_bytes: parse_or("CACHE_MAX_BYTES", defaults.cache_max_bytes),

            // Client sessions
            session_idle_seconds: parse_or("SESSION_IDLE_SECONDS", defaults.session_idle_seconds),
            session_max: parse_or("SESSION_MAX", defaults.session_max),

            // Map
            map_center_lat: parse_or("MAP_CENTER_LAT", defaults.map_center_lat),
            map_center_lon: parse_or("MAP_CENTER_LON", defaults.map_center_lon),

            // Application metadata
            deployment: Deployment::from_str(
                &env::var("DEPLOYMENT").unwrap_or_else(|_| "local".to_string()),
            ),
        };

        config.validate()?;
        Ok(config)
    }

    /// Check the settings that would break the series pipeline.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` naming the offending variable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.gap_threshold_ms <= 0 {
            return Err(ConfigError::Invalid(
                "GAP_THRESHOLD_MS",
                self.gap_threshold_ms.to_string(),
            ));
        }
        if self.filler_interval_ms < MIN_FILLER_INTERVAL_MS
            || self.filler_interval_ms > self.gap_threshold_ms
        {
            return Err(ConfigError::Invalid(
                "FILLER_INTERVAL_MS",
                format!(
                    "{} (must be between {MIN_FILLER_INTERVAL_MS} and GAP_THRESHOLD_MS)",
                    self.filler_interval_ms
                ),
            ));
        }
        if self.frost_concurrency == 0 {
            return Err(ConfigError::Invalid("FROST_CONCURRENCY", "0".to_string()));
        }
        if self.observation_limit == 0 || self.observation_limit > self.observation_limit_max {
            return Err(ConfigError::Invalid(
                "OBSERVATION_LIMIT",
                self.observation_limit.to_string(),
            ));
        }
        Ok(())
    }

    #[must_use]
    pub fn gap_config(&self) -> GapConfig {
        match self.gap_policy {
            GapPolicyKind::Filler => GapConfig::filler(self.gap_threshold_ms, self.filler_interval_ms),
            GapPolicyKind::Marker => GapConfig::marker(self.gap_threshold_ms),
        }
    }

    #[must_use]
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.api_host, self.api_port)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {0}: {1}")]
    Invalid(&'static str, String),
}
