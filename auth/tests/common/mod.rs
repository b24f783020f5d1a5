use std::sync::Arc;

use config::Config as ConfigBuilder;
use config::File;
use config::FileFormat;
use token_auth::config::Config;
use token_auth::Argon2PasswordHasher;
use token_auth::AuthService;
use token_auth::Credential;
use token_auth::InMemoryUserStore;
use token_auth::ManualClock;
use tracing_subscriber::EnvFilter;

pub const T0: i64 = 1_700_000_000;

pub const ALICE_ID: &str = "user-alice";
pub const ALICE_PASSWORD: &str = "correct-pw";

pub type TestService = AuthService<InMemoryUserStore, Argon2PasswordHasher>;

const TEST_CONFIG: &str = r#"
[tokens]
access_ttl_secs = 900
refresh_ttl_secs = 604800
default_scope = ["chat:read", "chat:write"]

[[tokens.signing_keys]]
key_id = "2023-11"
secret = "test-secret-key-for-jwt-signing-at-least-32-bytes"
valid_from = 0

[rate_limit]
window_secs = 60
max_attempts = 5

[upstream]
timeout_ms = 2000
"#;

/// Auth service wired to in-memory collaborators and a manual clock at `T0`
pub struct TestApp {
    pub service: Arc<TestService>,
    pub clock: Arc<ManualClock>,
    pub store: InMemoryUserStore,
    pub config: Config,
}

impl TestApp {
    pub async fn spawn() -> Self {
        Self::spawn_with(TEST_CONFIG).await
    }

    /// Build from a TOML document, with alice registered
    pub async fn spawn_with(toml: &str) -> Self {
        init_tracing();

        let config: Config = ConfigBuilder::builder()
            .add_source(File::from_str(toml, FileFormat::Toml))
            .build()
            .expect("Failed to build test configuration")
            .try_deserialize()
            .expect("Failed to deserialize test configuration");

        let hasher = Argon2PasswordHasher::new();
        let store = InMemoryUserStore::new();
        store
            .insert(Credential::new(
                ALICE_ID,
                "alice",
                hasher
                    .hash(ALICE_PASSWORD)
                    .expect("Failed to hash test password"),
            ))
            .await;

        let clock = Arc::new(ManualClock::at_unix(T0));
        let service = AuthService::from_config(
            &config,
            Arc::new(store.clone()),
            Arc::new(hasher),
            clock.clone(),
        )
        .expect("Invalid test configuration");

        Self {
            service: Arc::new(service),
            clock,
            store,
            config,
        }
    }

    /// Move the clock to `T0 + offset` seconds
    pub fn at(&self, offset: i64) {
        self.clock.set(
            chrono::DateTime::from_timestamp(T0 + offset, 0).expect("Timestamp out of range"),
        );
    }
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
