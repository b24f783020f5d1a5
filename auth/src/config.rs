use std::env;
use std::time::Duration;

use config::Config as ConfigBuilder;
use config::ConfigError;
use config::Environment;
use config::File;
use serde::Deserialize;

use crate::jwt::KeyRing;
use crate::jwt::SigningKey;
use crate::rate_limit::RateLimitConfig;
use crate::service::TokenPolicy;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub tokens: TokensConfig,
    #[serde(default)]
    pub rate_limit: RateLimitSettings,
    #[serde(default)]
    pub revocation: RevocationConfig,
    #[serde(default)]
    pub upstream: UpstreamConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct TokensConfig {
    #[serde(default = "default_access_ttl_secs")]
    pub access_ttl_secs: i64,
    #[serde(default = "default_refresh_ttl_secs")]
    pub refresh_ttl_secs: i64,
    #[serde(default)]
    pub default_scope: Vec<String>,
    #[serde(default)]
    pub signing_keys: Vec<SigningKeyConfig>,
}

impl Default for TokensConfig {
    fn default() -> Self {
        Self {
            access_ttl_secs: default_access_ttl_secs(),
            refresh_ttl_secs: default_refresh_ttl_secs(),
            default_scope: Vec::new(),
            signing_keys: Vec::new(),
        }
    }
}

#[derive(Deserialize, Clone)]
pub struct SigningKeyConfig {
    pub key_id: String,
    pub secret: String,
    /// Unix timestamp from which the key signs new tokens
    #[serde(default)]
    pub valid_from: i64,
}

impl std::fmt::Debug for SigningKeyConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SigningKeyConfig")
            .field("key_id", &self.key_id)
            .field("secret", &"<redacted>")
            .field("valid_from", &self.valid_from)
            .finish()
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct RateLimitSettings {
    #[serde(default = "default_window_secs")]
    pub window_secs: u64,
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
}

impl Default for RateLimitSettings {
    fn default() -> Self {
        Self {
            window_secs: default_window_secs(),
            max_attempts: default_max_attempts(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct RevocationConfig {
    #[serde(default = "default_prune_interval_secs")]
    pub prune_interval_secs: u64,
}

impl Default for RevocationConfig {
    fn default() -> Self {
        Self {
            prune_interval_secs: default_prune_interval_secs(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct UpstreamConfig {
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_timeout_ms(),
        }
    }
}

fn default_access_ttl_secs() -> i64 {
    TokenPolicy::DEFAULT_ACCESS_TTL_SECS
}

fn default_refresh_ttl_secs() -> i64 {
    TokenPolicy::DEFAULT_REFRESH_TTL_SECS
}

fn default_window_secs() -> u64 {
    60
}

fn default_max_attempts() -> u32 {
    5
}

fn default_prune_interval_secs() -> u64 {
    60
}

fn default_timeout_ms() -> u64 {
    5_000
}

impl Config {
    /// Load configuration from files with environment variable overrides
    ///
    /// Priority (highest to lowest):
    /// 1. Environment variables (TOKENS__ACCESS_TTL_SECS, RATE_LIMIT__MAX_ATTEMPTS, etc.)
    /// 2. Environment-specific config file (config/{environment}.toml)
    /// 3. Default config file (config/default.toml)
    ///
    /// The result is validated before it is returned.
    pub fn load() -> Result<Self, ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let configuration = ConfigBuilder::builder()
            // Start with default configuration
            .add_source(File::with_name("config/default").required(false))
            // Layer on environment-specific configuration
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            // Layer on environment variables (with __ as separator)
            // Example: TOKENS__ACCESS_TTL_SECS=300 overrides tokens.access_ttl_secs
            .add_source(Environment::with_prefix("").separator("__"))
            .build()?;

        let config: Config = configuration.try_deserialize()?;
        config.validate()?;

        tracing::debug!(
            run_mode = %run_mode,
            signing_keys = config.tokens.signing_keys.len(),
            "Configuration loaded"
        );

        Ok(config)
    }

    /// Check cross-field constraints that deserialization cannot express.
    ///
    /// # Errors
    /// `ConfigError::Message` when:
    /// * access TTL is not positive or not shorter than the refresh TTL
    /// * the key ring is empty, has a short secret or a duplicate key id
    /// * the rate limit window or attempt count is zero
    /// * the prune interval or upstream timeout is zero
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.token_policy()?;
        self.key_ring()?;
        self.rate_limit_config()?;

        if self.revocation.prune_interval_secs == 0 {
            return Err(invalid("revocation.prune_interval_secs must be non-zero"));
        }

        if self.upstream.timeout_ms == 0 {
            return Err(invalid("upstream.timeout_ms must be non-zero"));
        }

        Ok(())
    }

    /// Build the signing key ring from `tokens.signing_keys`.
    pub fn key_ring(&self) -> Result<KeyRing, ConfigError> {
        let keys = self
            .tokens
            .signing_keys
            .iter()
            .map(|key| SigningKey::new(&key.key_id, key.secret.as_bytes(), key.valid_from))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| invalid(format!("tokens.signing_keys: {}", e)))?;

        KeyRing::new(keys).map_err(|e| invalid(format!("tokens.signing_keys: {}", e)))
    }

    pub fn token_policy(&self) -> Result<TokenPolicy, ConfigError> {
        let tokens = &self.tokens;

        let policy = TokenPolicy::new(tokens.access_ttl_secs, tokens.refresh_ttl_secs)
            .map_err(|e| invalid(format!("tokens: {}", e)))?;

        Ok(policy
            .with_default_scope(tokens.default_scope.iter().cloned())
            .with_upstream_timeout(self.upstream_timeout()))
    }

    pub fn rate_limit_config(&self) -> Result<RateLimitConfig, ConfigError> {
        if self.rate_limit.max_attempts == 0 {
            return Err(invalid("rate_limit.max_attempts must be at least 1"));
        }

        if self.rate_limit.window_secs == 0 {
            return Err(invalid("rate_limit.window_secs must be non-zero"));
        }

        Ok(RateLimitConfig::new(
            self.rate_limit.max_attempts,
            Duration::from_secs(self.rate_limit.window_secs),
        ))
    }

    pub fn prune_interval(&self) -> Duration {
        Duration::from_secs(self.revocation.prune_interval_secs)
    }

    pub fn upstream_timeout(&self) -> Duration {
        Duration::from_millis(self.upstream.timeout_ms)
    }
}

fn invalid(message: impl Into<String>) -> ConfigError {
    ConfigError::Message(message.into())
}
