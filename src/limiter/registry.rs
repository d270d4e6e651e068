//! Bucket registry: the two keyed bucket collections behind one lock.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::Serialize;
use uuid::Uuid;

use crate::limiter::bucket::Bucket;
use crate::limiter::clock::{Clock, SystemClock};
use crate::limiter::policy::Policy;

/// Key selecting a bucket and the collection it lives in.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum BucketKey {
    /// An authenticated user.
    Identity(Uuid),
    /// `"{client_ip}:{METHOD path}"`.
    Route(String),
}

impl BucketKey {
    pub fn route(client_ip: &str, descriptor: &str) -> Self {
        Self::Route(format!("{}:{}", client_ip, descriptor))
    }

    pub fn scope(&self) -> &'static str {
        match self {
            Self::Identity(_) => "identity",
            Self::Route(_) => "route",
        }
    }
}

#[derive(Debug, Default)]
struct Buckets {
    identities: HashMap<Uuid, Bucket>,
    routes: HashMap<String, Bucket>,
}

/// Bucket counts per collection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RegistrySnapshot {
    pub identities: usize,
    pub routes: usize,
}

/// Buckets removed by one sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    pub identities_removed: usize,
    pub routes_removed: usize,
}

impl SweepReport {
    pub fn total(&self) -> usize {
        self.identities_removed + self.routes_removed
    }
}

/// Owns every bucket. Shared by handle between the request pipeline and the
/// quota sweeper.
///
/// All lookups, inserts, refills and consumes for both collections run under
/// a single mutex, so two requests for the same key can never both spend the
/// same token.
pub struct BucketRegistry {
    buckets: Mutex<Buckets>,
    clock: Arc<dyn Clock>,
}

impl BucketRegistry {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            buckets: Mutex::new(Buckets::default()),
            clock,
        }
    }

    pub fn now_millis(&self) -> i64 {
        self.clock.now_millis()
    }

    /// Decide admission for `key` at the current clock reading.
    pub fn admit(&self, key: &BucketKey, policy: Option<&Policy>) -> bool {
        self.admit_at(key, policy, self.clock.now_millis())
    }

    /// Decide admission for `key` at `now` (ms since epoch).
    ///
    /// A missing policy admits without creating a bucket.
    pub fn admit_at(&self, key: &BucketKey, policy: Option<&Policy>, now: i64) -> bool {
        let Some(policy) = policy else {
            return true;
        };

        let mut buckets = self.lock();
        match key {
            BucketKey::Identity(id) => acquire(&mut buckets.identities, id, policy, now),
            BucketKey::Route(route) => acquire(&mut buckets.routes, route, policy, now),
        }
    }

    /// Remove every bucket whose last refill is strictly older than `cutoff`.
    pub fn sweep(&self, cutoff: i64) -> SweepReport {
        let mut buckets = self.lock();

        let identities_before = buckets.identities.len();
        buckets.identities.retain(|_, bucket| bucket.last_refill() >= cutoff);
        let routes_before = buckets.routes.len();
        buckets.routes.retain(|_, bucket| bucket.last_refill() >= cutoff);

        SweepReport {
            identities_removed: identities_before - buckets.identities.len(),
            routes_removed: routes_before - buckets.routes.len(),
        }
    }

    pub fn snapshot(&self) -> RegistrySnapshot {
        let buckets = self.lock();
        RegistrySnapshot {
            identities: buckets.identities.len(),
            routes: buckets.routes.len(),
        }
    }

    /// Copy of the bucket stored under `key`, if any.
    pub fn bucket(&self, key: &BucketKey) -> Option<Bucket> {
        let buckets = self.lock();
        match key {
            BucketKey::Identity(id) => buckets.identities.get(id).cloned(),
            BucketKey::Route(route) => buckets.routes.get(route).cloned(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Buckets> {
        // Every critical section leaves buckets consistent, so a panic in
        // another holder does not invalidate the data.
        self.buckets.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for BucketRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn acquire<K>(map: &mut HashMap<K, Bucket>, key: &K, policy: &Policy, now: i64) -> bool
where
    K: Hash + Eq + Clone,
{
    if let Some(bucket) = map.get_mut(key) {
        return bucket.try_acquire(now, policy);
    }

    let mut bucket = Bucket::new(policy.capacity(), now);
    let admitted = bucket.try_acquire(now, policy);
    map.insert(key.clone(), bucket);
    admitted
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::limiter::clock::ManualClock;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const MINUTE: i64 = 60_000;

    fn scenario_policy() -> Policy {
        Policy::new(1.0 / 60_000.0, 5.0).unwrap()
    }

    #[test]
    fn test_five_then_reject_then_refill() {
        let clock = Arc::new(ManualClock::new(1_700_000_000_000));
        let registry = BucketRegistry::with_clock(clock.clone());
        let policy = scenario_policy();
        let key = BucketKey::Identity(Uuid::new_v4());

        for _ in 0..5 {
            assert!(registry.admit(&key, Some(&policy)));
        }
        assert!(!registry.admit(&key, Some(&policy)));

        clock.advance(MINUTE);
        assert!(registry.admit(&key, Some(&policy)));
        assert!(!registry.admit(&key, Some(&policy)));
    }

    #[test]
    fn test_unmetered_never_rejects_or_allocates() {
        let registry = BucketRegistry::new();
        let key = BucketKey::route("10.0.0.1", "GET /students");

        for _ in 0..10_000 {
            assert!(registry.admit(&key, None));
        }
        assert_eq!(registry.snapshot(), RegistrySnapshot::default());
    }

    #[test]
    fn test_buckets_are_created_lazily() {
        let registry = BucketRegistry::new();
        assert_eq!(registry.snapshot(), RegistrySnapshot::default());

        let policy = scenario_policy();
        registry.admit_at(&BucketKey::Identity(Uuid::new_v4()), Some(&policy), 0);
        registry.admit_at(&BucketKey::route("10.0.0.1", "POST /login"), Some(&policy), 0);
        registry.admit_at(&BucketKey::route("10.0.0.2", "POST /login"), Some(&policy), 0);

        assert_eq!(
            registry.snapshot(),
            RegistrySnapshot {
                identities: 1,
                routes: 2
            }
        );
    }

    #[test]
    fn test_identity_and_route_collections_are_independent() {
        let registry = BucketRegistry::new();
        let policy = Policy::new(1.0 / 60_000.0, 1.0).unwrap();
        let route = BucketKey::route("10.0.0.1", "POST /login");

        assert!(registry.admit_at(&route, Some(&policy), 0));
        assert!(!registry.admit_at(&route, Some(&policy), 0));
        assert!(registry.admit_at(&BucketKey::Identity(Uuid::new_v4()), Some(&policy), 0));
    }

    #[test]
    fn test_concurrent_admits_never_double_spend() {
        let registry = BucketRegistry::new();
        let policy = Policy::new(1e-9, 25.0).unwrap();
        let key = BucketKey::Identity(Uuid::new_v4());
        let admitted = AtomicUsize::new(0);

        std::thread::scope(|scope| {
            for _ in 0..8 {
                scope.spawn(|| {
                    for _ in 0..20 {
                        if registry.admit_at(&key, Some(&policy), 5_000) {
                            admitted.fetch_add(1, Ordering::SeqCst);
                        }
                    }
                });
            }
        });

        assert_eq!(admitted.load(Ordering::SeqCst), 25);
    }

    #[test]
    fn test_sweep_drops_only_stale_buckets() {
        let registry = BucketRegistry::new();
        let policy = scenario_policy();
        let scheduled = 10 * 60 * MINUTE;
        let stale = BucketKey::Identity(Uuid::new_v4());
        let fresh = BucketKey::route("10.0.0.1", "POST /login");

        registry.admit_at(&stale, Some(&policy), scheduled - 90 * MINUTE);
        registry.admit_at(&fresh, Some(&policy), scheduled - 30 * MINUTE);

        let report = registry.sweep(scheduled - 60 * MINUTE);
        assert_eq!(
            report,
            SweepReport {
                identities_removed: 1,
                routes_removed: 0
            }
        );
        assert!(registry.bucket(&stale).is_none());
        assert!(registry.bucket(&fresh).is_some());
    }

    #[test]
    fn test_sweep_is_idempotent() {
        let registry = BucketRegistry::new();
        let policy = scenario_policy();
        for i in 0..10 {
            registry.admit_at(&BucketKey::route(&format!("10.0.0.{}", i), "POST /login"), Some(&policy), i * MINUTE);
        }

        let first = registry.sweep(5 * MINUTE);
        let second = registry.sweep(5 * MINUTE);
        assert_eq!(first.total(), 5);
        assert_eq!(second.total(), 0);
        assert_eq!(registry.snapshot().routes, 5);
    }

    #[test]
    fn test_bucket_at_cutoff_survives() {
        let registry = BucketRegistry::new();
        let key = BucketKey::Identity(Uuid::new_v4());
        registry.admit_at(&key, Some(&scenario_policy()), 1_000);
        assert_eq!(registry.sweep(1_000).total(), 0);
        assert_eq!(registry.sweep(1_001).total(), 1);
    }

    #[test]
    fn test_swept_key_restarts_full() {
        let registry = BucketRegistry::new();
        let policy = Policy::new(1e-9, 2.0).unwrap();
        let key = BucketKey::Identity(Uuid::new_v4());

        assert!(registry.admit_at(&key, Some(&policy), 0));
        assert!(registry.admit_at(&key, Some(&policy), 0));
        assert!(!registry.admit_at(&key, Some(&policy), 0));

        registry.sweep(1);
        assert!(registry.admit_at(&key, Some(&policy), 2));
        assert_eq!(registry.bucket(&key).unwrap().tokens(), 1.0);
    }
}
