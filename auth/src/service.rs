use std::collections::BTreeSet;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::DateTime;
use chrono::Utc;
use config::ConfigError;

use crate::clock::Clock;
use crate::config::Config;
use crate::errors::AuthError;
use crate::jwt::ClaimSet;
use crate::jwt::JwtError;
use crate::jwt::TokenCodec;
use crate::jwt::TokenPair;
use crate::jwt::TokenType;
use crate::password::PasswordHasher;
use crate::rate_limit::RateLimitConfig;
use crate::rate_limit::RateLimiter;
use crate::revocation::Revocation;
use crate::revocation::RevocationRegistry;
use crate::store::UserStore;

/// Port for authentication operations exposed to transport layers.
#[async_trait]
pub trait AuthServicePort: Send + Sync + 'static {
    /// Verify credentials and issue a fresh token pair.
    ///
    /// # Arguments
    /// * `identity` - Login name
    /// * `secret` - Plaintext password
    ///
    /// # Returns
    /// Access and refresh tokens, issued together
    ///
    /// # Errors
    /// * `RateLimited` - Too many attempts for this identity
    /// * `InvalidCredentials` - Unknown identity or wrong secret
    /// * `Timeout` - User store or hasher exceeded the upstream timeout
    /// * `Internal` - Collaborator failure or token encoding failed
    async fn login(&self, identity: &str, secret: &str) -> Result<TokenPair, AuthError>;

    /// Same as [`AuthServicePort::login`], additionally limiting attempts per
    /// client origin (for example a remote address).
    async fn login_from(
        &self,
        origin: &str,
        identity: &str,
        secret: &str,
    ) -> Result<TokenPair, AuthError>;

    /// Check an access token presented on a protected request.
    ///
    /// # Returns
    /// Verified claims
    ///
    /// # Errors
    /// * `Malformed` - Token does not parse
    /// * `SignatureMismatch` - Integrity tag invalid or key unknown
    /// * `Expired` - Token is past its expiry
    /// * `WrongTokenType` - A refresh token was presented
    async fn validate(&self, access_token: &str) -> Result<ClaimSet, AuthError>;

    /// Exchange a refresh token for a new pair, consuming the old token.
    ///
    /// # Errors
    /// * `Malformed`, `SignatureMismatch`, `Expired` - As for validate
    /// * `WrongTokenType` - An access token was presented
    /// * `TokenRevoked` - Token already used or logged out
    /// * `Internal` - New pair could not be issued; the old token stays revoked
    async fn refresh(&self, refresh_token: &str) -> Result<TokenPair, AuthError>;

    /// Revoke a refresh token.
    ///
    /// Succeeds for tokens that are already expired or revoked.
    ///
    /// # Errors
    /// * `Malformed`, `SignatureMismatch` - Token cannot be trusted
    /// * `WrongTokenType` - An access token was presented
    async fn logout(&self, refresh_token: &str) -> Result<(), AuthError>;
}

/// Lifetimes and scope applied to every issued pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenPolicy {
    access_ttl_secs: i64,
    refresh_ttl_secs: i64,
    default_scope: BTreeSet<String>,
    upstream_timeout: Duration,
}

impl TokenPolicy {
    /// 15 minutes
    pub const DEFAULT_ACCESS_TTL_SECS: i64 = 15 * 60;
    /// 7 days
    pub const DEFAULT_REFRESH_TTL_SECS: i64 = 7 * 24 * 60 * 60;
    pub const DEFAULT_UPSTREAM_TIMEOUT: Duration = Duration::from_secs(5);

    /// Create a policy.
    ///
    /// # Errors
    /// `ConfigError::Message` unless `0 < access_ttl_secs < refresh_ttl_secs`
    pub fn new(access_ttl_secs: i64, refresh_ttl_secs: i64) -> Result<Self, ConfigError> {
        if access_ttl_secs <= 0 {
            return Err(ConfigError::Message(
                "access TTL must be positive".to_string(),
            ));
        }

        if access_ttl_secs >= refresh_ttl_secs {
            return Err(ConfigError::Message(
                "access TTL must be shorter than refresh TTL".to_string(),
            ));
        }

        Ok(Self {
            access_ttl_secs,
            refresh_ttl_secs,
            default_scope: BTreeSet::new(),
            upstream_timeout: Self::DEFAULT_UPSTREAM_TIMEOUT,
        })
    }

    #[must_use]
    pub fn with_default_scope<I, S>(mut self, scope: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.default_scope = scope.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn with_upstream_timeout(mut self, timeout: Duration) -> Self {
        self.upstream_timeout = timeout;
        self
    }

    pub fn access_ttl_secs(&self) -> i64 {
        self.access_ttl_secs
    }

    pub fn refresh_ttl_secs(&self) -> i64 {
        self.refresh_ttl_secs
    }

    pub fn default_scope(&self) -> &BTreeSet<String> {
        &self.default_scope
    }

    pub fn upstream_timeout(&self) -> Duration {
        self.upstream_timeout
    }
}

impl Default for TokenPolicy {
    fn default() -> Self {
        Self {
            access_ttl_secs: Self::DEFAULT_ACCESS_TTL_SECS,
            refresh_ttl_secs: Self::DEFAULT_REFRESH_TTL_SECS,
            default_scope: BTreeSet::new(),
            upstream_timeout: Self::DEFAULT_UPSTREAM_TIMEOUT,
        }
    }
}

/// Authentication service coordinating credential checks, token issuance,
/// rotation and revocation.
///
/// Holds no per-request state; share it behind an `Arc`. The revocation
/// registry and rate limiter are owned here but can be swapped for shared
/// instances with [`AuthService::with_revocations`] and
/// [`AuthService::with_rate_limiter`].
pub struct AuthService<US, PH>
where
    US: UserStore,
    PH: PasswordHasher,
{
    user_store: Arc<US>,
    password_hasher: Arc<PH>,
    codec: TokenCodec,
    revocations: Arc<RevocationRegistry>,
    rate_limiter: Arc<RateLimiter>,
    clock: Arc<dyn Clock>,
    policy: TokenPolicy,
}

impl<US, PH> AuthService<US, PH>
where
    US: UserStore,
    PH: PasswordHasher,
{
    /// Create a new auth service with injected dependencies.
    ///
    /// Starts with the default token policy, a five-per-minute login limit and
    /// an empty revocation registry driven by `clock`.
    ///
    /// # Arguments
    /// * `user_store` - Credential lookup implementation
    /// * `password_hasher` - Secret verification implementation
    /// * `codec` - Token codec holding the signing key ring
    /// * `clock` - Time source for issuance and expiry
    pub fn new(
        user_store: Arc<US>,
        password_hasher: Arc<PH>,
        codec: TokenCodec,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            user_store,
            password_hasher,
            codec,
            revocations: Arc::new(RevocationRegistry::new(Arc::clone(&clock))),
            rate_limiter: Arc::new(RateLimiter::new(RateLimitConfig::default())),
            clock,
            policy: TokenPolicy::default(),
        }
    }

    /// Create a service from loaded configuration.
    ///
    /// # Errors
    /// `ConfigError::Message` if the configuration fails validation
    pub fn from_config(
        config: &Config,
        user_store: Arc<US>,
        password_hasher: Arc<PH>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;

        let codec = TokenCodec::new(config.key_ring()?);
        let rate_limiter = RateLimiter::new(config.rate_limit_config()?);

        Ok(Self::new(user_store, password_hasher, codec, clock)
            .with_policy(config.token_policy()?)
            .with_rate_limiter(Arc::new(rate_limiter)))
    }

    #[must_use]
    pub fn with_policy(mut self, policy: TokenPolicy) -> Self {
        self.policy = policy;
        self
    }

    #[must_use]
    pub fn with_rate_limiter(mut self, rate_limiter: Arc<RateLimiter>) -> Self {
        self.rate_limiter = rate_limiter;
        self
    }

    #[must_use]
    pub fn with_revocations(mut self, revocations: Arc<RevocationRegistry>) -> Self {
        self.revocations = revocations;
        self
    }

    pub fn policy(&self) -> &TokenPolicy {
        &self.policy
    }

    pub fn codec(&self) -> &TokenCodec {
        &self.codec
    }

    pub fn revocations(&self) -> &Arc<RevocationRegistry> {
        &self.revocations
    }

    pub fn rate_limiter(&self) -> &Arc<RateLimiter> {
        &self.rate_limiter
    }

    async fn authenticate(
        &self,
        origin: Option<&str>,
        identity: &str,
        secret: &str,
    ) -> Result<TokenPair, AuthError> {
        let now = self.clock.now();

        if let Some(origin) = origin {
            self.admit(&format!("origin:{}", origin), now)?;
        }
        let identity_key = format!("identity:{}", identity);
        self.admit(&identity_key, now)?;

        let Some(credential) = self.upstream(self.user_store.lookup(identity)).await? else {
            tracing::warn!(identity = %identity, "Login failed: unknown identity");
            return Err(AuthError::InvalidCredentials);
        };

        let is_valid = self
            .upstream(
                self.password_hasher
                    .verify(secret, &credential.secret_hash),
            )
            .await?;

        if !is_valid {
            tracing::warn!(identity = %identity, "Login failed: secret mismatch");
            return Err(AuthError::InvalidCredentials);
        }

        let pair = self.issue_pair(
            &credential.user_id,
            &self.policy.default_scope,
            now.timestamp(),
        )?;

        self.rate_limiter.reset(&identity_key);

        tracing::info!(
            subject = %credential.user_id,
            access_expires_at = pair.access_expires_at,
            refresh_expires_at = pair.refresh_expires_at,
            "Login succeeded"
        );

        Ok(pair)
    }

    fn admit(&self, key: &str, now: DateTime<Utc>) -> Result<(), AuthError> {
        let decision = self.rate_limiter.check_and_increment(key, now);

        if decision.allowed {
            return Ok(());
        }

        tracing::warn!(
            key = %key,
            retry_after_ms = decision.retry_after.as_millis() as u64,
            "Login attempt rate limited"
        );

        Err(AuthError::RateLimited {
            retry_after: decision.retry_after,
        })
    }

    /// Bound a collaborator call by the upstream timeout.
    async fn upstream<T, E, F>(&self, call: F) -> Result<T, AuthError>
    where
        F: Future<Output = Result<T, E>>,
        AuthError: From<E>,
    {
        match tokio::time::timeout(self.policy.upstream_timeout, call).await {
            Ok(result) => result.map_err(|e| {
                let err = AuthError::from(e);
                tracing::error!(error = %err, "Upstream call failed");
                err
            }),
            Err(_) => {
                tracing::error!(
                    timeout_ms = self.policy.upstream_timeout.as_millis() as u64,
                    "Upstream call timed out"
                );
                Err(AuthError::Timeout)
            }
        }
    }

    /// Issue both tokens or neither.
    fn issue_pair(
        &self,
        subject: &str,
        scope: &BTreeSet<String>,
        now: i64,
    ) -> Result<TokenPair, AuthError> {
        let mut access = ClaimSet::new(subject, TokenType::Access, now, self.policy.access_ttl_secs);
        access.scope = scope.clone();

        let mut refresh =
            ClaimSet::new(subject, TokenType::Refresh, now, self.policy.refresh_ttl_secs);
        refresh.scope = scope.clone();

        let access_token = self.codec.issue(&access)?;
        let refresh_token = self.codec.issue(&refresh)?;

        tracing::debug!(
            subject = %subject,
            access_id = %access.token_id,
            refresh_id = %refresh.token_id,
            "Token pair issued"
        );

        Ok(TokenPair {
            access_token,
            refresh_token,
            access_expires_at: access.expires_at,
            refresh_expires_at: refresh.expires_at,
        })
    }

    fn decode(&self, token: &str) -> Result<ClaimSet, AuthError> {
        self.codec.decode(token).map_err(|e| {
            match &e {
                JwtError::SignatureMismatch | JwtError::UnknownKey(_) => {
                    // Unverified claims, for tracing the source only
                    let claimed = self.codec.decode_unverified(token).ok();
                    tracing::warn!(
                        error = %e,
                        claimed_subject = ?claimed.as_ref().map(|c| c.subject.as_str()),
                        claimed_token_id = ?claimed.as_ref().map(|c| c.token_id),
                        "Token failed integrity check"
                    )
                }
                _ => tracing::debug!(error = %e, "Token rejected"),
            }
            AuthError::from(e)
        })
    }

    /// Decode, then reject expired tokens and tokens in the wrong slot.
    fn decode_live(
        &self,
        token: &str,
        expected: TokenType,
        now: i64,
    ) -> Result<ClaimSet, AuthError> {
        let claims = self.decode(token)?;

        if claims.is_expired(now) {
            tracing::debug!(
                token_id = %claims.token_id,
                expires_at = claims.expires_at,
                "Token expired"
            );
            return Err(AuthError::Expired);
        }

        check_type(&claims, expected)?;

        Ok(claims)
    }
}

fn check_type(claims: &ClaimSet, expected: TokenType) -> Result<(), AuthError> {
    if claims.token_type == expected {
        return Ok(());
    }

    tracing::warn!(
        token_id = %claims.token_id,
        expected = %expected,
        actual = %claims.token_type,
        "Token presented in the wrong slot"
    );

    Err(AuthError::WrongTokenType {
        expected,
        actual: claims.token_type,
    })
}

#[async_trait]
impl<US, PH> AuthServicePort for AuthService<US, PH>
where
    US: UserStore,
    PH: PasswordHasher,
{
    #[tracing::instrument(skip(self, secret))]
    async fn login(&self, identity: &str, secret: &str) -> Result<TokenPair, AuthError> {
        self.authenticate(None, identity, secret).await
    }

    #[tracing::instrument(skip(self, secret))]
    async fn login_from(
        &self,
        origin: &str,
        identity: &str,
        secret: &str,
    ) -> Result<TokenPair, AuthError> {
        self.authenticate(Some(origin), identity, secret).await
    }

    #[tracing::instrument(skip_all)]
    async fn validate(&self, access_token: &str) -> Result<ClaimSet, AuthError> {
        let claims = self.decode_live(access_token, TokenType::Access, self.clock.unix_now())?;

        tracing::debug!(
            subject = %claims.subject,
            token_id = %claims.token_id,
            "Access token validated"
        );

        Ok(claims)
    }

    #[tracing::instrument(skip_all)]
    async fn refresh(&self, refresh_token: &str) -> Result<TokenPair, AuthError> {
        let now = self.clock.unix_now();
        let claims = self.decode_live(refresh_token, TokenType::Refresh, now)?;

        // Check and revoke in one step: of two concurrent refreshes with the
        // same token, exactly one sees `Revoked`.
        match self.revocations.revoke(claims.token_id, claims.expires_at) {
            Revocation::Revoked => {}
            Revocation::AlreadyRevoked => {
                tracing::warn!(
                    subject = %claims.subject,
                    token_id = %claims.token_id,
                    "Revoked refresh token presented, possible token reuse"
                );
                return Err(AuthError::TokenRevoked);
            }
            // Expired between the check above and the registry lock
            Revocation::Expired => {
                tracing::debug!(
                    token_id = %claims.token_id,
                    expires_at = claims.expires_at,
                    "Refresh token expired during rotation"
                );
                return Err(AuthError::Expired);
            }
        }

        let pair = self
            .issue_pair(&claims.subject, &claims.scope, now)
            .map_err(|e| {
                tracing::error!(
                    subject = %claims.subject,
                    token_id = %claims.token_id,
                    error = %e,
                    "Refresh token consumed but new pair could not be issued"
                );
                e
            })?;

        tracing::info!(
            subject = %claims.subject,
            rotated_id = %claims.token_id,
            "Refresh token rotated"
        );

        Ok(pair)
    }

    #[tracing::instrument(skip_all)]
    async fn logout(&self, refresh_token: &str) -> Result<(), AuthError> {
        let claims = self.decode(refresh_token)?;
        check_type(&claims, TokenType::Refresh)?;

        let outcome = self.revocations.revoke(claims.token_id, claims.expires_at);

        tracing::info!(
            subject = %claims.subject,
            token_id = %claims.token_id,
            outcome = ?outcome,
            "Logged out"
        );

        Ok(())
    }
}
