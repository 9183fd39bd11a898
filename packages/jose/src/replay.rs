//! Single-use enforcement for tokens carrying a UUID identifier claim
//!
//! Identifiers are tracked until their token's `exp` has passed. Stale entries
//! are evicted lazily at the start of each validation, in expiry order.

use crate::clock::{Clock, SystemClock};
use crate::token::Jwt;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashSet};
use std::sync::Arc;
use uuid::Uuid;

#[derive(Debug, Default)]
struct Tracked {
    ids: HashSet<Uuid>,
    by_expiry: BinaryHeap<Reverse<(DateTime<Utc>, Uuid)>>,
}

/// Cache of consumed token identifiers.
///
/// Share one instance (behind an `Arc`) between every verifier that must agree
/// on which tokens were already used.
pub struct UsedTokenCache {
    id_claim: String,
    clock: Arc<dyn Clock>,
    tracked: Mutex<Tracked>,
}

impl std::fmt::Debug for UsedTokenCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UsedTokenCache")
            .field("id_claim", &self.id_claim)
            .field("tracked", &self.len())
            .finish()
    }
}

impl UsedTokenCache {
    /// Track identifiers found in `id_claim`, timed by the system clock
    pub fn new(id_claim: impl Into<String>) -> Self {
        Self::with_clock(id_claim, Arc::new(SystemClock))
    }

    /// Track identifiers found in `id_claim`, timed by `clock`
    pub fn with_clock(id_claim: impl Into<String>, clock: Arc<dyn Clock>) -> Self {
        Self {
            id_claim: id_claim.into(),
            clock,
            tracked: Mutex::new(Tracked::default()),
        }
    }

    /// Claim holding the identifier
    #[must_use]
    pub fn id_claim(&self) -> &str {
        &self.id_claim
    }

    /// Number of identifiers currently tracked
    #[must_use]
    pub fn len(&self) -> usize {
        self.tracked.lock().ids.len()
    }

    /// True when nothing is tracked
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Accept `token` if its identifier is unseen, recording it as used.
    ///
    /// Tokens without `exp` or without a UUID in the identifier claim are
    /// refused. An identifier is evicted once the current instant is strictly
    /// after its expiry.
    pub fn validate(&self, token: &dyn Jwt) -> bool {
        let now = self.clock.now();
        let mut tracked = self.tracked.lock();

        while let Some(Reverse((expires, id))) = tracked.by_expiry.peek().copied() {
            if now <= expires {
                break;
            }
            tracked.by_expiry.pop();
            tracked.ids.remove(&id);
        }

        let Some(expires) = token.expires_at() else {
            return false;
        };
        let Some(id) = token
            .claim(&self.id_claim)
            .and_then(|v| v.as_str())
            .and_then(|s| Uuid::parse_str(s).ok())
        else {
            return false;
        };

        if !tracked.ids.insert(id) {
            return false;
        }
        tracked.by_expiry.push(Reverse((expires, id)));
        true
    }
}
