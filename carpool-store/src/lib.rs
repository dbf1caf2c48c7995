pub mod app_config;
pub mod booking_repo;
pub mod database;
pub mod error;
pub mod memory;
pub mod redis_repo;
pub mod ride_repo;
pub mod user_repo;

use std::sync::Arc;

use carpool_core::repository::{BookingRepository, RideRepository, SeatInventory, UserRepository};

pub use booking_repo::PgBookingRepository;
pub use database::DbClient;
pub use error::StoreError;
pub use memory::MemoryStore;
pub use redis_repo::RedisClient;
pub use ride_repo::PgRideRepository;
pub use user_repo::PgUserRepository;

/// The Durable Store as seen by the catalog and the ledger.
#[derive(Clone)]
pub struct Stores {
    pub users: Arc<dyn UserRepository>,
    pub rides: Arc<dyn RideRepository>,
    pub bookings: Arc<dyn BookingRepository>,
    pub inventory: Arc<dyn SeatInventory>,
}

impl Stores {
    pub fn memory() -> Self {
        Self::from_memory(Arc::new(MemoryStore::new()))
    }

    pub fn from_memory(store: Arc<MemoryStore>) -> Self {
        Self {
            users: store.clone(),
            rides: store.clone(),
            bookings: store.clone(),
            inventory: store,
        }
    }

    pub fn postgres(db: &DbClient) -> Self {
        let rides = Arc::new(PgRideRepository::new(db.pool.clone()));
        Self {
            users: Arc::new(PgUserRepository::new(db.pool.clone())),
            rides: rides.clone(),
            bookings: Arc::new(PgBookingRepository::new(db.pool.clone())),
            inventory: rides,
        }
    }
}
