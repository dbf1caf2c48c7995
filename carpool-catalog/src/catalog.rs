use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use carpool_core::repository::{RideRepository, UserRepository};
use carpool_core::search::{RideSearchRequest, RideView};
use carpool_core::{CoreError, CoreResult};
use carpool_shared::{Page, PageRequest, Ride};

use crate::offer::NewRide;

/// Creates ride offers and answers search and listing queries.
pub struct RideCatalog {
    rides: Arc<dyn RideRepository>,
    users: Arc<dyn UserRepository>,
}

impl RideCatalog {
    pub fn new(rides: Arc<dyn RideRepository>, users: Arc<dyn UserRepository>) -> Self {
        Self { rides, users }
    }

    /// Publishes a ride with every seat free.
    pub async fn create_ride(&self, driver_id: Uuid, offer: NewRide) -> CoreResult<RideView> {
        let driver = self
            .users
            .get_user(driver_id)
            .await?
            .ok_or_else(|| CoreError::not_found("Driver", driver_id))?;

        offer.check_amounts()?;
        let ride = offer.into_ride(driver.id);
        self.rides.create_ride(&ride).await?;

        info!(ride_id = %ride.id, %driver_id, seats = ride.total_seats, "ride created");
        Ok(RideView::new(ride, driver.username))
    }

    pub async fn get_ride(&self, ride_id: Uuid) -> CoreResult<RideView> {
        let ride = self
            .rides
            .get_ride(ride_id)
            .await?
            .ok_or_else(|| CoreError::not_found("Ride", ride_id))?;
        let mut views = self.with_drivers(vec![ride]).await?;
        views.pop().ok_or_else(|| CoreError::Internal("ride view lost".to_string()))
    }

    /// Rides on a route and date that still have a free seat.
    pub async fn search_rides(
        &self,
        query: &RideSearchRequest,
        page: PageRequest,
    ) -> CoreResult<Page<RideView>> {
        let rides = self.rides.search_rides(&query.trimmed(), page).await?;
        self.page_with_drivers(rides).await
    }

    pub async fn list_driver_rides(
        &self,
        driver_id: Uuid,
        page: PageRequest,
    ) -> CoreResult<Page<RideView>> {
        let rides = self.rides.list_driver_rides(driver_id, page).await?;
        self.page_with_drivers(rides).await
    }

    async fn page_with_drivers(&self, page: Page<Ride>) -> CoreResult<Page<RideView>> {
        let Page {
            content,
            page,
            size,
            total_elements,
            total_pages,
        } = page;
        let content = self.with_drivers(content).await?;
        Ok(Page {
            content,
            page,
            size,
            total_elements,
            total_pages,
        })
    }

    async fn with_drivers(&self, rides: Vec<Ride>) -> CoreResult<Vec<RideView>> {
        let ids: Vec<Uuid> = rides.iter().map(|r| r.driver_id).collect();
        let names = self.users.usernames(&ids).await?;
        Ok(rides
            .into_iter()
            .map(|ride| {
                let name = names.get(&ride.driver_id).cloned().unwrap_or_default();
                RideView::new(ride, name)
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use carpool_shared::{Role, User};
    use carpool_store::MemoryStore;
    use chrono::{NaiveDate, NaiveTime};

    async fn setup() -> (RideCatalog, Arc<MemoryStore>, User) {
        let store = Arc::new(MemoryStore::new());
        let driver = User::new("dave".into(), "dave@example.com".into(), "x".into(), Role::Driver);
        store.create_user(&driver).await.unwrap();
        let catalog = RideCatalog::new(store.clone(), store.clone());
        (catalog, store, driver)
    }

    fn offer(date: NaiveDate, hour: u32, seats: i32) -> NewRide {
        NewRide {
            source: "Pune".into(),
            destination: "Mumbai".into(),
            ride_date: date,
            ride_time: NaiveTime::from_hms_opt(hour, 0, 0).unwrap(),
            total_seats: seats,
            price_per_seat: 150.0,
        }
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2030, 2, 14).unwrap()
    }

    #[tokio::test]
    async fn test_create_ride_starts_with_all_seats() {
        let (catalog, _, driver) = setup().await;
        let view = catalog.create_ride(driver.id, offer(date(), 9, 3)).await.unwrap();
        assert_eq!(view.total_seats, 3);
        assert_eq!(view.available_seats, 3);
        assert_eq!(view.booked_seats, 0);
        assert_eq!(view.driver_username, "dave");

        let fetched = catalog.get_ride(view.id).await.unwrap();
        assert_eq!(fetched, view);
    }

    #[tokio::test]
    async fn test_create_ride_for_unknown_driver() {
        let (catalog, _, _) = setup().await;
        let err = catalog
            .create_ride(Uuid::new_v4(), offer(date(), 9, 3))
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_search_is_case_insensitive_and_ordered() {
        let (catalog, _, driver) = setup().await;
        let late = catalog.create_ride(driver.id, offer(date(), 18, 2)).await.unwrap();
        let early = catalog.create_ride(driver.id, offer(date(), 7, 2)).await.unwrap();
        catalog
            .create_ride(driver.id, offer(date().succ_opt().unwrap(), 7, 2))
            .await
            .unwrap();

        let query = RideSearchRequest {
            source: "pune".into(),
            destination: "MUMBAI".into(),
            ride_date: date(),
        };
        let page = catalog.search_rides(&query, PageRequest::default()).await.unwrap();
        let ids: Vec<Uuid> = page.content.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![early.id, late.id]);
        assert_eq!(page.content[0].driver_username, "dave");
    }

    #[tokio::test]
    async fn test_search_skips_full_rides_but_listing_keeps_them() {
        let (catalog, store, driver) = setup().await;
        let ride = catalog.create_ride(driver.id, offer(date(), 9, 1)).await.unwrap();
        carpool_core::repository::SeatInventory::reserve(store.as_ref(), ride.id)
            .await
            .unwrap();

        let query = RideSearchRequest {
            source: "Pune".into(),
            destination: "Mumbai".into(),
            ride_date: date(),
        };
        let found = catalog.search_rides(&query, PageRequest::default()).await.unwrap();
        assert_eq!(found.total_elements, 0);

        let mine = catalog
            .list_driver_rides(driver.id, PageRequest::default())
            .await
            .unwrap();
        assert_eq!(mine.total_elements, 1);
        assert_eq!(mine.content[0].available_seats, 0);
    }

    #[tokio::test]
    async fn test_search_ignores_surrounding_whitespace() {
        let (catalog, _, driver) = setup().await;
        let ride = catalog.create_ride(driver.id, offer(date(), 9, 2)).await.unwrap();

        let query = RideSearchRequest {
            source: " Pune ".into(),
            destination: "\tmumbai  ".into(),
            ride_date: date(),
        };
        let found = catalog.search_rides(&query, PageRequest::default()).await.unwrap();
        assert_eq!(found.total_elements, 1);
        assert_eq!(found.content[0].id, ride.id);
    }
}
