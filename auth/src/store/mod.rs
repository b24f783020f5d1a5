pub mod errors;
pub mod memory;
pub mod models;

use async_trait::async_trait;

pub use errors::StoreError;
pub use memory::InMemoryUserStore;
pub use models::Credential;

/// Lookup of stored credentials by login identity.
#[async_trait]
pub trait UserStore: Send + Sync + 'static {
    /// Retrieve the credential registered for an identity.
    ///
    /// # Arguments
    /// * `identity` - Login name presented by the client
    ///
    /// # Returns
    /// Optional credential (None if no such identity)
    ///
    /// # Errors
    /// * `Unavailable` - Backing store could not be reached
    /// * `Backend` - Backing store returned an error
    async fn lookup(&self, identity: &str) -> Result<Option<Credential>, StoreError>;
}
