//! Protocol configuration

use std::time::Duration;

/// Attendance protocol configuration.
///
/// Construct with [`ProtocolConfig::try_new`] (validates the secret) and
/// adjust defaults with the `with_*` builders, or load everything from the
/// environment with [`ProtocolConfig::from_env`].
#[derive(Debug, Clone)]
pub struct ProtocolConfig {
    /// HMAC signing secret (must be at least 32 bytes)
    pub secret: String,
    /// Token validity window; also the rotation interval
    pub token_ttl: Duration,
    /// Permitted clock skew when checking issued-at
    pub clock_skew: Duration,
    /// Permitted drift between submitted and expected rotation counters
    pub rotation_tolerance: i64,
    /// Distinct countries per token before the geo-dispersion flag raises
    pub geo_dispersion_threshold: usize,
}

impl ProtocolConfig {
    /// Create a config with defaults: 30 s TTL, 5 s skew, ±1 rotation
    /// tolerance, 3-country geo threshold.
    ///
    /// # Errors
    /// Returns error if the secret is shorter than 32 bytes.
    pub fn try_new(secret: impl Into<String>) -> Result<Self, ConfigError> {
        let secret = secret.into();
        if secret.len() < crate::crypto::HmacKey::MIN_KEY_LENGTH {
            return Err(ConfigError::Invalid(
                "signing secret must be at least 32 bytes",
            ));
        }
        Ok(Self {
            secret,
            token_ttl: Duration::from_secs(30),
            clock_skew: Duration::from_secs(5),
            rotation_tolerance: 1,
            geo_dispersion_threshold: 3,
        })
    }

    /// Load configuration from environment variables.
    ///
    /// `ROLLCALL_HMAC_SECRET` is required; `ROLLCALL_TOKEN_TTL_SECS`,
    /// `ROLLCALL_ROTATION_TOLERANCE`, and `ROLLCALL_GEO_THRESHOLD` override
    /// the defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        let secret = std::env::var("ROLLCALL_HMAC_SECRET")
            .map_err(|_| ConfigError::Missing("ROLLCALL_HMAC_SECRET"))?;

        let mut config = Self::try_new(secret)?;

        if let Ok(ttl) = std::env::var("ROLLCALL_TOKEN_TTL_SECS") {
            let secs: u64 = ttl
                .parse()
                .map_err(|_| ConfigError::Invalid("ROLLCALL_TOKEN_TTL_SECS"))?;
            config = config.with_token_ttl(Duration::from_secs(secs))?;
        }

        if let Ok(tolerance) = std::env::var("ROLLCALL_ROTATION_TOLERANCE") {
            let steps: i64 = tolerance
                .parse()
                .map_err(|_| ConfigError::Invalid("ROLLCALL_ROTATION_TOLERANCE"))?;
            config = config.with_rotation_tolerance(steps);
        }

        if let Ok(threshold) = std::env::var("ROLLCALL_GEO_THRESHOLD") {
            let count: usize = threshold
                .parse()
                .map_err(|_| ConfigError::Invalid("ROLLCALL_GEO_THRESHOLD"))?;
            config = config.with_geo_dispersion_threshold(count);
        }

        Ok(config)
    }

    /// Set the token TTL / rotation interval.
    ///
    /// # Errors
    /// Returns error for a TTL under one second: issued-at alignment and
    /// the rotation timer both need a whole-second period.
    pub fn with_token_ttl(mut self, ttl: Duration) -> Result<Self, ConfigError> {
        if ttl.as_secs() == 0 {
            return Err(ConfigError::Invalid("token TTL must be at least one second"));
        }
        self.token_ttl = ttl;
        Ok(self)
    }

    /// Set the permitted clock skew
    pub fn with_clock_skew(mut self, skew: Duration) -> Self {
        self.clock_skew = skew;
        self
    }

    /// Set the rotation tolerance window
    pub fn with_rotation_tolerance(mut self, steps: i64) -> Self {
        self.rotation_tolerance = steps;
        self
    }

    /// Set the geo-dispersion threshold
    pub fn with_geo_dispersion_threshold(mut self, countries: usize) -> Self {
        self.geo_dispersion_threshold = countries;
        self
    }

    /// TTL in whole seconds (the alignment granularity for issued-at)
    pub fn token_ttl_secs(&self) -> i64 {
        self.token_ttl.as_secs() as i64
    }
}

/// Configuration error
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for environment variable: {0}")]
    Invalid(&'static str),
}
