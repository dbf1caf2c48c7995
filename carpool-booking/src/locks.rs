use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

/// One async mutex per ride.
///
/// Every seat-changing transition on a ride runs while holding that ride's
/// guard, so they execute one at a time. Different rides never contend.
/// A ride's entry lives only while someone holds or waits for its guard.
#[derive(Default)]
pub struct RideLocks {
    locks: DashMap<Uuid, Arc<Mutex<()>>>,
}

/// Held for the duration of a transition. Dropping it unlocks the ride and
/// forgets the ride's mutex once nobody else refers to it.
pub struct RideGuard<'a> {
    guard: Option<OwnedMutexGuard<()>>,
    ride_id: Uuid,
    locks: &'a DashMap<Uuid, Arc<Mutex<()>>>,
}

impl RideLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn acquire(&self, ride_id: Uuid) -> RideGuard<'_> {
        // Clone the Arc out so the shard lock is released before awaiting.
        let lock = self.locks.entry(ride_id).or_default().clone();
        let guard = lock.lock_owned().await;
        RideGuard {
            guard: Some(guard),
            ride_id,
            locks: &self.locks,
        }
    }

    pub(crate) fn tracked(&self) -> usize {
        self.locks.len()
    }
}

impl Drop for RideGuard<'_> {
    fn drop(&mut self) {
        // The owned guard keeps its own Arc; release it before counting.
        self.guard.take();
        // Waiters clone under the same shard lock, so a count of one means
        // only the map still refers to this mutex.
        self.locks
            .remove_if(&self.ride_id, |_, lock| Arc::strong_count(lock) == 1);
    }
}
