//! Revocation list for refresh tokens.
//!
//! Entries live only until the token they name would have expired anyway, so
//! the registry never holds more entries than there are unexpired refresh
//! tokens. Access tokens are not tracked: they are short-lived and die on
//! their own, which leaves a window of at most one access TTL after a refresh
//! token is revoked.
//!
//! # Thread Safety
//!
//! The id map and the expiry index sit behind one mutex, so a lookup never
//! sees an entry in one structure and not the other.

use std::collections::BTreeSet;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::clock::Clock;

/// Result of a [`RevocationRegistry::revoke`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Revocation {
    /// This call revoked the token
    Revoked,
    /// The token was revoked earlier
    AlreadyRevoked,
    /// The token has expired, or its entry may already have been pruned
    Expired,
}

#[derive(Debug, Default)]
struct Entries {
    /// token id -> expiry (Unix timestamp)
    by_id: HashMap<Uuid, i64>,
    /// Ordered by expiry so pruning pops from the front
    by_expiry: BTreeSet<(i64, Uuid)>,
    /// Highest `now` any prune has run with. Ids expiring at or before it
    /// may have been dropped, so they are never inserted again.
    pruned_through: i64,
}

impl Entries {
    fn prune(&mut self, now: i64) -> usize {
        self.pruned_through = self.pruned_through.max(now);
        let mut removed = 0;

        while let Some(&(expires_at, token_id)) = self.by_expiry.first() {
            if expires_at > now {
                break;
            }
            self.by_expiry.pop_first();
            self.by_id.remove(&token_id);
            removed += 1;
        }

        removed
    }
}

/// Registry of revoked token identifiers.
pub struct RevocationRegistry {
    entries: Mutex<Entries>,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for RevocationRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RevocationRegistry")
            .field("len", &self.len())
            .finish_non_exhaustive()
    }
}

impl RevocationRegistry {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: Mutex::new(Entries::default()),
            clock,
        }
    }

    /// Revoke a token until its natural expiry.
    ///
    /// Idempotent. Also drops entries that have already expired.
    ///
    /// # Arguments
    /// * `token_id` - Token identifier (`jti`)
    /// * `expires_at` - Token expiry (Unix timestamp)
    ///
    /// # Returns
    /// * `Revoked` - This call revoked the token
    /// * `AlreadyRevoked` - An earlier call revoked it
    /// * `Expired` - The token is past its expiry, or a prune may already have
    ///   dropped its entry; nothing is recorded
    pub fn revoke(&self, token_id: Uuid, expires_at: i64) -> Revocation {
        let now = self.clock.unix_now();
        let mut entries = self.entries.lock();

        // Membership first: pruning below may drop this very entry
        if entries.by_id.contains_key(&token_id) {
            return Revocation::AlreadyRevoked;
        }

        let pruned = entries.prune(now);
        if pruned > 0 {
            tracing::trace!(pruned, "Expired revocations pruned");
        }

        if expires_at <= entries.pruned_through {
            return Revocation::Expired;
        }

        entries.by_id.insert(token_id, expires_at);
        entries.by_expiry.insert((expires_at, token_id));
        Revocation::Revoked
    }

    pub fn is_revoked(&self, token_id: &Uuid) -> bool {
        self.entries.lock().by_id.contains_key(token_id)
    }

    /// Remove every entry whose expiry is at or before `now`.
    ///
    /// # Returns
    /// Number of entries removed
    pub fn prune(&self, now: i64) -> usize {
        self.entries.lock().prune(now)
    }

    pub fn len(&self) -> usize {
        self.entries.lock().by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Prune on a fixed tick in the background.
    ///
    /// The task holds only a weak reference and stops once the registry is
    /// dropped. Abort the returned handle to stop it earlier.
    pub fn spawn_pruner(self: &Arc<Self>, interval: Duration) -> JoinHandle<()> {
        let registry = Arc::downgrade(self);

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;

                let Some(registry) = registry.upgrade() else {
                    tracing::debug!("Revocation registry dropped, pruner exiting");
                    break;
                };

                let removed = registry.prune(registry.clock.unix_now());
                if removed > 0 {
                    tracing::debug!(
                        removed,
                        remaining = registry.len(),
                        "Pruned expired revocations"
                    );
                }
            }
        })
    }
}
