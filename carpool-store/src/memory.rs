//! In-process store implementing every repository trait.
//!
//! Used by the `memory` backend and by tests. Rides live in a `DashMap`, so
//! seat updates on one ride only lock that ride's shard. Bookings and users
//! keep their unique indexes behind one lock per table, which makes the
//! check-and-insert a single step.

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use std::collections::{HashMap, HashSet};
use tokio::sync::RwLock;
use uuid::Uuid;

use carpool_core::repository::{
    BookingRepository, RideRepository, SeatInventory, SeatedTransition, UserRepository,
};
use carpool_core::search::RideSearchRequest;
use carpool_core::{ConflictKind, CoreError, CoreResult};
use carpool_shared::{Booking, BookingStatus, Page, PageRequest, Ride, User};

#[derive(Default)]
struct UserTable {
    by_id: HashMap<Uuid, User>,
    by_username: HashMap<String, Uuid>,
    emails: HashSet<String>,
}

#[derive(Default)]
struct BookingTable {
    by_id: HashMap<Uuid, Booking>,
    by_pair: HashMap<(Uuid, Uuid), Uuid>,
}

#[derive(Default)]
pub struct MemoryStore {
    users: RwLock<UserTable>,
    rides: DashMap<Uuid, Ride>,
    bookings: RwLock<BookingTable>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn ride_ids_of(&self, driver_id: Uuid) -> HashSet<Uuid> {
        self.rides
            .iter()
            .filter(|entry| entry.driver_id == driver_id)
            .map(|entry| *entry.key())
            .collect()
    }
}

#[async_trait]
impl UserRepository for MemoryStore {
    async fn create_user(&self, user: &User) -> CoreResult<()> {
        let mut table = self.users.write().await;
        if table.by_username.contains_key(&user.username) {
            return Err(ConflictKind::DuplicateUsername(user.username.clone()).into());
        }
        if table.emails.contains(user.email.expose()) {
            return Err(ConflictKind::DuplicateEmail.into());
        }
        table.by_username.insert(user.username.clone(), user.id);
        table.emails.insert(user.email.expose().clone());
        table.by_id.insert(user.id, user.clone());
        Ok(())
    }

    async fn get_user(&self, id: Uuid) -> CoreResult<Option<User>> {
        Ok(self.users.read().await.by_id.get(&id).cloned())
    }

    async fn find_by_username(&self, username: &str) -> CoreResult<Option<User>> {
        let table = self.users.read().await;
        Ok(table
            .by_username
            .get(username)
            .and_then(|id| table.by_id.get(id))
            .cloned())
    }

    async fn usernames(&self, ids: &[Uuid]) -> CoreResult<HashMap<Uuid, String>> {
        let table = self.users.read().await;
        Ok(ids
            .iter()
            .filter_map(|id| table.by_id.get(id).map(|u| (*id, u.username.clone())))
            .collect())
    }
}

#[async_trait]
impl RideRepository for MemoryStore {
    async fn create_ride(&self, ride: &Ride) -> CoreResult<()> {
        self.rides.insert(ride.id, ride.clone());
        Ok(())
    }

    async fn get_ride(&self, id: Uuid) -> CoreResult<Option<Ride>> {
        Ok(self.rides.get(&id).map(|r| r.clone()))
    }

    async fn search_rides(
        &self,
        query: &RideSearchRequest,
        page: PageRequest,
    ) -> CoreResult<Page<Ride>> {
        let mut matches: Vec<Ride> = self
            .rides
            .iter()
            .filter(|r| {
                r.has_free_seat() && r.matches_route(&query.source, &query.destination, query.ride_date)
            })
            .map(|r| r.clone())
            .collect();
        matches.sort_by(|a, b| a.ride_time.cmp(&b.ride_time).then(a.id.cmp(&b.id)));
        Ok(Page::from_sorted(matches, page))
    }

    async fn list_driver_rides(&self, driver_id: Uuid, page: PageRequest) -> CoreResult<Page<Ride>> {
        let mut rides: Vec<Ride> = self
            .rides
            .iter()
            .filter(|r| r.driver_id == driver_id)
            .map(|r| r.clone())
            .collect();
        rides.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));
        Ok(Page::from_sorted(rides, page))
    }
}

#[async_trait]
impl SeatInventory for MemoryStore {
    async fn reserve(&self, ride_id: Uuid) -> CoreResult<i32> {
        // get_mut holds the shard's write lock across the test and the decrement
        let mut ride = self
            .rides
            .get_mut(&ride_id)
            .ok_or_else(|| CoreError::not_found("Ride", ride_id))?;
        take_seat(&mut ride)
    }

    async fn release(&self, ride_id: Uuid) -> CoreResult<i32> {
        let mut ride = self
            .rides
            .get_mut(&ride_id)
            .ok_or_else(|| CoreError::not_found("Ride", ride_id))?;
        Ok(return_seat(&mut ride))
    }

    async fn confirm(&self, booking_id: Uuid, ride_id: Uuid) -> CoreResult<Option<SeatedTransition>> {
        // Bookings table first, then the ride's shard; nothing else nests them.
        let mut table = self.bookings.write().await;
        let mut ride = self
            .rides
            .get_mut(&ride_id)
            .ok_or_else(|| CoreError::not_found("Ride", ride_id))?;
        if !ride.has_free_seat() {
            return Err(ConflictKind::NoSeats.into());
        }
        let Some(booking) = table
            .by_id
            .get_mut(&booking_id)
            .filter(|b| b.status == BookingStatus::Requested)
        else {
            return Ok(None);
        };

        let available_seats = take_seat(&mut ride)?;
        booking.update_status(BookingStatus::Confirmed);
        Ok(Some(SeatedTransition {
            booking: booking.clone(),
            available_seats,
        }))
    }

    async fn cancel(
        &self,
        booking_id: Uuid,
        ride_id: Uuid,
        previous: BookingStatus,
    ) -> CoreResult<Option<SeatedTransition>> {
        let mut table = self.bookings.write().await;
        let mut ride = self
            .rides
            .get_mut(&ride_id)
            .ok_or_else(|| CoreError::not_found("Ride", ride_id))?;
        let Some(booking) = table
            .by_id
            .get_mut(&booking_id)
            .filter(|b| b.status == previous)
        else {
            return Ok(None);
        };

        let available_seats = if previous.holds_seat() {
            return_seat(&mut ride)
        } else {
            ride.available_seats
        };
        booking.update_status(BookingStatus::Cancelled);
        Ok(Some(SeatedTransition {
            booking: booking.clone(),
            available_seats,
        }))
    }
}

fn take_seat(ride: &mut Ride) -> CoreResult<i32> {
    if ride.available_seats <= 0 {
        return Err(ConflictKind::NoSeats.into());
    }
    ride.available_seats -= 1;
    ride.updated_at = Utc::now();
    Ok(ride.available_seats)
}

fn return_seat(ride: &mut Ride) -> i32 {
    ride.available_seats = (ride.available_seats + 1).min(ride.total_seats);
    ride.updated_at = Utc::now();
    ride.available_seats
}

#[async_trait]
impl BookingRepository for MemoryStore {
    async fn create_booking(&self, booking: &Booking) -> CoreResult<()> {
        let mut table = self.bookings.write().await;
        let pair = (booking.ride_id, booking.passenger_id);
        if table.by_pair.contains_key(&pair) {
            return Err(ConflictKind::DuplicateBooking.into());
        }
        table.by_pair.insert(pair, booking.id);
        table.by_id.insert(booking.id, booking.clone());
        Ok(())
    }

    async fn get_booking(&self, id: Uuid) -> CoreResult<Option<Booking>> {
        Ok(self.bookings.read().await.by_id.get(&id).cloned())
    }

    async fn find_by_ride_and_passenger(
        &self,
        ride_id: Uuid,
        passenger_id: Uuid,
    ) -> CoreResult<Option<Booking>> {
        let table = self.bookings.read().await;
        Ok(table
            .by_pair
            .get(&(ride_id, passenger_id))
            .and_then(|id| table.by_id.get(id))
            .cloned())
    }

    async fn list_passenger_bookings(
        &self,
        passenger_id: Uuid,
        page: PageRequest,
    ) -> CoreResult<Page<Booking>> {
        let mut bookings: Vec<Booking> = self
            .bookings
            .read()
            .await
            .by_id
            .values()
            .filter(|b| b.passenger_id == passenger_id)
            .cloned()
            .collect();
        bookings.sort_by(|a, b| b.booked_at.cmp(&a.booked_at).then(a.id.cmp(&b.id)));
        Ok(Page::from_sorted(bookings, page))
    }

    async fn list_driver_bookings(
        &self,
        driver_id: Uuid,
        page: PageRequest,
    ) -> CoreResult<Page<Booking>> {
        let ride_ids = self.ride_ids_of(driver_id);
        let mut bookings: Vec<Booking> = self
            .bookings
            .read()
            .await
            .by_id
            .values()
            .filter(|b| ride_ids.contains(&b.ride_id))
            .cloned()
            .collect();
        bookings.sort_by(|a, b| b.booked_at.cmp(&a.booked_at).then(a.id.cmp(&b.id)));
        Ok(Page::from_sorted(bookings, page))
    }

    async fn count_with_status(&self, ride_id: Uuid, status: BookingStatus) -> CoreResult<i64> {
        let table = self.bookings.read().await;
        Ok(table
            .by_id
            .values()
            .filter(|b| b.ride_id == ride_id && b.status == status)
            .count() as i64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveTime};
    use carpool_shared::Role;
    use std::sync::Arc;

    fn ride(driver_id: Uuid, seats: i32) -> Ride {
        Ride::new(
            driver_id,
            "Pune".to_string(),
            "Mumbai".to_string(),
            NaiveDate::from_ymd_opt(2030, 3, 1).unwrap(),
            NaiveTime::from_hms_opt(10, 0, 0).unwrap(),
            seats,
            120.0,
        )
    }

    #[tokio::test]
    async fn test_reserve_stops_at_zero_and_release_stops_at_total() {
        let store = MemoryStore::new();
        let r = ride(Uuid::new_v4(), 1);
        store.create_ride(&r).await.unwrap();

        assert_eq!(store.reserve(r.id).await.unwrap(), 0);
        let err = store.reserve(r.id).await.unwrap_err();
        assert_eq!(err.conflict_kind(), Some(&ConflictKind::NoSeats));

        assert_eq!(store.release(r.id).await.unwrap(), 1);
        assert_eq!(store.release(r.id).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_reserve_unknown_ride_is_not_found() {
        let store = MemoryStore::new();
        assert!(matches!(
            store.reserve(Uuid::new_v4()).await,
            Err(CoreError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_concurrent_reserves_never_oversell() {
        let store = Arc::new(MemoryStore::new());
        let r = ride(Uuid::new_v4(), 5);
        store.create_ride(&r).await.unwrap();
        let ride_id = r.id;

        let handles: Vec<_> = (0..20)
            .map(|_| {
                let store = store.clone();
                tokio::spawn(async move { store.reserve(ride_id).await.is_ok() })
            })
            .collect();

        let mut won = 0;
        for h in handles {
            if h.await.unwrap() {
                won += 1;
            }
        }
        assert_eq!(won, 5);
        assert_eq!(store.get_ride(r.id).await.unwrap().unwrap().available_seats, 0);
    }

    #[tokio::test]
    async fn test_booking_pair_is_unique() {
        let store = MemoryStore::new();
        let ride_id = Uuid::new_v4();
        let passenger = Uuid::new_v4();

        store.create_booking(&Booking::new(ride_id, passenger)).await.unwrap();
        let err = store
            .create_booking(&Booking::new(ride_id, passenger))
            .await
            .unwrap_err();
        assert_eq!(err.conflict_kind(), Some(&ConflictKind::DuplicateBooking));
    }

    #[tokio::test]
    async fn test_confirm_and_cancel_move_seat_with_status() {
        let store = MemoryStore::new();
        let r = ride(Uuid::new_v4(), 2);
        store.create_ride(&r).await.unwrap();
        let booking = Booking::new(r.id, Uuid::new_v4());
        store.create_booking(&booking).await.unwrap();

        let confirmed = store.confirm(booking.id, r.id).await.unwrap().unwrap();
        assert_eq!(confirmed.booking.status, BookingStatus::Confirmed);
        assert_eq!(confirmed.available_seats, 1);

        // Stale expectation: nothing is written.
        assert!(store.confirm(booking.id, r.id).await.unwrap().is_none());
        assert!(store
            .cancel(booking.id, r.id, BookingStatus::Requested)
            .await
            .unwrap()
            .is_none());
        assert_eq!(store.get_ride(r.id).await.unwrap().unwrap().available_seats, 1);

        let cancelled = store
            .cancel(booking.id, r.id, BookingStatus::Confirmed)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(cancelled.booking.status, BookingStatus::Cancelled);
        assert_eq!(cancelled.available_seats, 2);
    }

    #[tokio::test]
    async fn test_confirm_on_full_ride_leaves_booking_requested() {
        let store = MemoryStore::new();
        let r = ride(Uuid::new_v4(), 1);
        store.create_ride(&r).await.unwrap();
        store.reserve(r.id).await.unwrap();
        let booking = Booking::new(r.id, Uuid::new_v4());
        store.create_booking(&booking).await.unwrap();

        let err = store.confirm(booking.id, r.id).await.unwrap_err();
        assert_eq!(err.conflict_kind(), Some(&ConflictKind::NoSeats));
        let stored = store.get_booking(booking.id).await.unwrap().unwrap();
        assert_eq!(stored.status, BookingStatus::Requested);
        assert_eq!(store.get_ride(r.id).await.unwrap().unwrap().available_seats, 0);
    }

    #[tokio::test]
    async fn test_cancelling_a_request_keeps_the_counter() {
        let store = MemoryStore::new();
        let r = ride(Uuid::new_v4(), 2);
        store.create_ride(&r).await.unwrap();
        let booking = Booking::new(r.id, Uuid::new_v4());
        store.create_booking(&booking).await.unwrap();

        let cancelled = store
            .cancel(booking.id, r.id, BookingStatus::Requested)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(cancelled.available_seats, 2);
    }

    #[tokio::test]
    async fn test_duplicate_username_and_email() {
        let store = MemoryStore::new();
        let alice = User::new("alice".into(), "a@example.com".into(), "x".into(), Role::Driver);
        store.create_user(&alice).await.unwrap();

        let same_name = User::new("alice".into(), "b@example.com".into(), "x".into(), Role::Driver);
        assert_eq!(
            store.create_user(&same_name).await.unwrap_err().conflict_kind(),
            Some(&ConflictKind::DuplicateUsername("alice".into()))
        );

        let same_email = User::new("bob".into(), "a@example.com".into(), "x".into(), Role::Passenger);
        assert_eq!(
            store.create_user(&same_email).await.unwrap_err().conflict_kind(),
            Some(&ConflictKind::DuplicateEmail)
        );
    }

    #[tokio::test]
    async fn test_search_filters_full_rides_and_matches_case() {
        let store = MemoryStore::new();
        let driver = Uuid::new_v4();
        let open = ride(driver, 2);
        let mut full = ride(driver, 2);
        full.available_seats = 0;
        store.create_ride(&open).await.unwrap();
        store.create_ride(&full).await.unwrap();

        let query = RideSearchRequest {
            source: "PUNE".into(),
            destination: "mumbai".into(),
            ride_date: NaiveDate::from_ymd_opt(2030, 3, 1).unwrap(),
        };
        let page = store.search_rides(&query, PageRequest::default()).await.unwrap();
        assert_eq!(page.total_elements, 1);
        assert_eq!(page.content[0].id, open.id);

        let mine = store.list_driver_rides(driver, PageRequest::default()).await.unwrap();
        assert_eq!(mine.total_elements, 2);
    }
}
