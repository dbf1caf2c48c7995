use std::sync::Arc;

use carpool_booking::BookingLedger;
use carpool_catalog::RideCatalog;
use carpool_core::repository::UserRepository;
use carpool_store::app_config::{PagingConfig, RateLimitConfig};
use carpool_store::{RedisClient, Stores};

#[derive(Clone)]
pub struct AuthConfig {
    pub secret: String,
    pub expiration: u64,
}

#[derive(Clone)]
pub struct AppState {
    pub catalog: Arc<RideCatalog>,
    pub ledger: Arc<BookingLedger>,
    pub users: Arc<dyn UserRepository>,
    /// Rate limiting is skipped when no Redis is configured.
    pub redis: Option<Arc<RedisClient>>,
    pub auth: AuthConfig,
    pub paging: PagingConfig,
    pub rate_limit: RateLimitConfig,
}

impl AppState {
    pub fn new(stores: Stores, auth: AuthConfig) -> Self {
        let catalog = RideCatalog::new(stores.rides.clone(), stores.users.clone());
        let ledger = BookingLedger::new(
            stores.rides,
            stores.bookings,
            stores.users.clone(),
            stores.inventory,
        );
        Self {
            catalog: Arc::new(catalog),
            ledger: Arc::new(ledger),
            users: stores.users,
            redis: None,
            auth,
            paging: PagingConfig::default(),
            rate_limit: RateLimitConfig::default(),
        }
    }

    pub fn with_redis(mut self, redis: Arc<RedisClient>, rate_limit: RateLimitConfig) -> Self {
        self.redis = Some(redis);
        self.rate_limit = rate_limit;
        self
    }

    pub fn with_paging(mut self, paging: PagingConfig) -> Self {
        self.paging = paging;
        self
    }
}
