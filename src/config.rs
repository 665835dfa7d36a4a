use crate::auth::challenge::NONCE_MARKER;
use std::env;
use std::time::Duration;
use zeroize::Zeroizing;

/// Minimum accepted length of the session signing secret, in bytes.
pub const MIN_JWT_SECRET_LEN: usize = 32;

#[derive(Clone)]
pub struct Config {
    // Session signing
    pub jwt_secret: Zeroizing<String>,

    // Redis
    pub redis_url: String,

    // Sign-in message
    pub app_name: String,

    // TTLs (in seconds)
    pub challenge_ttl_secs: u64,
    pub session_ttl_secs: u64,

    // Expiry sweep
    pub sweep_interval_secs: u64,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("jwt_secret", &"[REDACTED]")
            .field("redis_url", &"[REDACTED]")
            .field("app_name", &self.app_name)
            .field("challenge_ttl_secs", &self.challenge_ttl_secs)
            .field("session_ttl_secs", &self.session_ttl_secs)
            .field("sweep_interval_secs", &self.sweep_interval_secs)
            .finish()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingVar(String),

    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),

    #[error("Failed to parse {0}: {1}")]
    ParseError(String, String),
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        // Attempt to load .env file, but don't fail if it doesn't exist
        // (env vars may be set directly in production)
        let _ = dotenvy::dotenv();

        let jwt_secret = Zeroizing::new(
            env::var("JWT_SECRET").map_err(|_| ConfigError::MissingVar("JWT_SECRET".to_string()))?,
        );

        let redis_url =
            env::var("REDIS_URL").map_err(|_| ConfigError::MissingVar("REDIS_URL".to_string()))?;

        let app_name = env::var("APP_NAME").unwrap_or_else(|_| "WalletAuth".to_string());

        let challenge_ttl_secs = parse_env_or_default("CHALLENGE_TTL_SECS", 300)?;
        let session_ttl_secs = parse_env_or_default("SESSION_TTL_SECS", 86_400)?;
        let sweep_interval_secs = parse_env_or_default("SWEEP_INTERVAL_SECS", 60)?;

        let config = Config {
            jwt_secret,
            redis_url,
            app_name,
            challenge_ttl_secs,
            session_ttl_secs,
            sweep_interval_secs,
        };
        config.validate()?;

        Ok(config)
    }

    /// Check invariants that every constructed config must satisfy.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.jwt_secret.len() < MIN_JWT_SECRET_LEN {
            return Err(ConfigError::InvalidValue(
                "JWT_SECRET".to_string(),
                format!("must be at least {} bytes", MIN_JWT_SECRET_LEN),
            ));
        }

        // The marker must stay unique in the sign-in message
        if self.app_name.is_empty()
            || self.app_name.contains(NONCE_MARKER.trim_end())
            || self.app_name.contains('\n')
        {
            return Err(ConfigError::InvalidValue(
                "APP_NAME".to_string(),
                "must be non-empty, single-line, and must not contain the nonce marker"
                    .to_string(),
            ));
        }

        if self.challenge_ttl_secs == 0 {
            return Err(ConfigError::InvalidValue(
                "CHALLENGE_TTL_SECS".to_string(),
                "must be greater than zero".to_string(),
            ));
        }

        if self.session_ttl_secs == 0 {
            return Err(ConfigError::InvalidValue(
                "SESSION_TTL_SECS".to_string(),
                "must be greater than zero".to_string(),
            ));
        }

        if self.sweep_interval_secs == 0 {
            return Err(ConfigError::InvalidValue(
                "SWEEP_INTERVAL_SECS".to_string(),
                "must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }

    pub fn challenge_ttl(&self) -> Duration {
        Duration::from_secs(self.challenge_ttl_secs)
    }

    pub fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.session_ttl_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }
}

/// Helper function to parse environment variable with a default value
fn parse_env_or_default<T>(key: &str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(val) => val
            .parse::<T>()
            .map_err(|e| ConfigError::ParseError(key.to_string(), format!("{}: {}", e, val))),
        Err(_) => Ok(default),
    }
}
