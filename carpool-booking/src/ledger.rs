use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use carpool_core::repository::{
    BookingRepository, RideRepository, SeatInventory, SeatedTransition, UserRepository,
};
use carpool_core::search::BookingView;
use carpool_core::{AuthorizationGate, ConflictKind, CoreError, CoreResult};
use carpool_shared::{Booking, BookingStatus, Page, PageRequest, Ride};

use crate::locks::RideLocks;

/// Seat counts of one ride next to the bookings that account for them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeatAudit {
    pub ride_id: Uuid,
    pub total_seats: i32,
    pub available_seats: i32,
    pub confirmed_bookings: i64,
}

impl SeatAudit {
    pub fn is_consistent(&self) -> bool {
        (0..=self.total_seats).contains(&self.available_seats)
            && self.confirmed_bookings + self.available_seats as i64 == self.total_seats as i64
    }
}

/// The booking state machine.
///
/// ```text
/// (none) --book_ride--> Requested --confirm_booking--> Confirmed
///                           |                              |
///                           +------cancel_booking----------+--> Cancelled
/// ```
///
/// A `Requested` booking does not hold a seat: availability is checked when
/// the request is made, but the seat is only taken on confirmation. Several
/// requests may therefore be open on a ride with one seat left, and only the
/// first confirmation gets it.
pub struct BookingLedger {
    rides: Arc<dyn RideRepository>,
    bookings: Arc<dyn BookingRepository>,
    users: Arc<dyn UserRepository>,
    inventory: Arc<dyn SeatInventory>,
    locks: RideLocks,
}

impl BookingLedger {
    pub fn new(
        rides: Arc<dyn RideRepository>,
        bookings: Arc<dyn BookingRepository>,
        users: Arc<dyn UserRepository>,
        inventory: Arc<dyn SeatInventory>,
    ) -> Self {
        Self {
            rides,
            bookings,
            users,
            inventory,
            locks: RideLocks::new(),
        }
    }

    /// (none) → Requested
    pub async fn book_ride(&self, ride_id: Uuid, passenger_id: Uuid) -> CoreResult<BookingView> {
        let ride = self.load_ride(ride_id).await?;
        let passenger = self
            .users
            .get_user(passenger_id)
            .await?
            .ok_or_else(|| CoreError::not_found("Passenger", passenger_id))?;

        if AuthorizationGate::is_driver_of(passenger_id, &ride) {
            return Err(ConflictKind::SelfBooking.into());
        }

        if self
            .bookings
            .find_by_ride_and_passenger(ride_id, passenger_id)
            .await?
            .is_some()
        {
            return Err(ConflictKind::DuplicateBooking.into());
        }

        if !ride.has_free_seat() {
            return Err(ConflictKind::NoSeats.into());
        }

        // A concurrent request for the same pair loses here on the unique index.
        let booking = Booking::new(ride.id, passenger.id);
        self.bookings.create_booking(&booking).await?;

        info!(booking_id = %booking.id, %ride_id, %passenger_id, "booking requested");
        Ok(BookingView::new(booking, passenger.username))
    }

    /// Requested → Confirmed, taking one seat. Only the ride's driver may confirm.
    pub async fn confirm_booking(&self, booking_id: Uuid, driver_id: Uuid) -> CoreResult<BookingView> {
        let booking = self.load_booking(booking_id).await?;
        let ride = self.load_ride(booking.ride_id).await?;

        if !AuthorizationGate::is_driver_of(driver_id, &ride) {
            return Err(CoreError::Forbidden(
                "Only the ride driver can confirm a booking".to_string(),
            ));
        }

        let _guard = self.locks.acquire(ride.id).await;

        // Status may have moved while we waited for the guard.
        let booking = self.load_booking(booking_id).await?;
        if booking.status != BookingStatus::Requested {
            return Err(ConflictKind::InvalidTransition {
                from: booking.status,
                to: BookingStatus::Confirmed,
            }
            .into());
        }

        let Some(SeatedTransition {
            booking: confirmed,
            available_seats,
        }) = self.inventory.confirm(booking_id, ride.id).await?
        else {
            let current = self.load_booking(booking_id).await?;
            return Err(ConflictKind::InvalidTransition {
                from: current.status,
                to: BookingStatus::Confirmed,
            }
            .into());
        };

        info!(%booking_id, ride_id = %ride.id, available_seats, "booking confirmed");
        self.view(confirmed).await
    }

    /// Requested | Confirmed → Cancelled. The passenger or the ride's driver may
    /// cancel; a confirmed booking gives its seat back.
    pub async fn cancel_booking(&self, booking_id: Uuid, user_id: Uuid) -> CoreResult<BookingView> {
        let booking = self.load_booking(booking_id).await?;
        let ride = self.load_ride(booking.ride_id).await?;

        if !AuthorizationGate::can_cancel(user_id, &booking, &ride) {
            return Err(CoreError::Forbidden(
                "You don't have permission to cancel this booking".to_string(),
            ));
        }

        let _guard = self.locks.acquire(ride.id).await;

        let booking = self.load_booking(booking_id).await?;
        let previous = booking.status;
        if previous == BookingStatus::Cancelled {
            return Err(ConflictKind::AlreadyCancelled.into());
        }

        let Some(SeatedTransition {
            booking: cancelled,
            available_seats,
        }) = self.inventory.cancel(booking_id, ride.id, previous).await?
        else {
            let current = self.load_booking(booking_id).await?;
            return Err(match current.status {
                BookingStatus::Cancelled => ConflictKind::AlreadyCancelled,
                from => ConflictKind::InvalidTransition {
                    from,
                    to: BookingStatus::Cancelled,
                },
            }
            .into());
        };

        if previous.holds_seat() {
            info!(%booking_id, ride_id = %ride.id, available_seats, "confirmed booking cancelled, seat released");
        } else {
            info!(%booking_id, ride_id = %ride.id, "booking request cancelled");
        }

        self.view(cancelled).await
    }

    pub async fn get_booking(&self, booking_id: Uuid) -> CoreResult<BookingView> {
        let booking = self.load_booking(booking_id).await?;
        self.view(booking).await
    }

    pub async fn list_passenger_bookings(
        &self,
        passenger_id: Uuid,
        page: PageRequest,
    ) -> CoreResult<Page<BookingView>> {
        let bookings = self.bookings.list_passenger_bookings(passenger_id, page).await?;
        self.page_view(bookings).await
    }

    /// Bookings on every ride the driver owns.
    pub async fn list_driver_bookings(
        &self,
        driver_id: Uuid,
        page: PageRequest,
    ) -> CoreResult<Page<BookingView>> {
        let bookings = self.bookings.list_driver_bookings(driver_id, page).await?;
        self.page_view(bookings).await
    }

    /// Reads a ride's counter and its confirmed bookings under the ride's guard.
    pub async fn audit_ride(&self, ride_id: Uuid) -> CoreResult<SeatAudit> {
        self.load_ride(ride_id).await?;
        let _guard = self.locks.acquire(ride_id).await;
        let ride = self.load_ride(ride_id).await?;
        let confirmed_bookings = self
            .bookings
            .count_with_status(ride_id, BookingStatus::Confirmed)
            .await?;
        Ok(SeatAudit {
            ride_id,
            total_seats: ride.total_seats,
            available_seats: ride.available_seats,
            confirmed_bookings,
        })
    }

    async fn load_ride(&self, ride_id: Uuid) -> CoreResult<Ride> {
        self.rides
            .get_ride(ride_id)
            .await?
            .ok_or_else(|| CoreError::not_found("Ride", ride_id))
    }

    async fn load_booking(&self, booking_id: Uuid) -> CoreResult<Booking> {
        self.bookings
            .get_booking(booking_id)
            .await?
            .ok_or_else(|| CoreError::not_found("Booking", booking_id))
    }

    async fn view(&self, booking: Booking) -> CoreResult<BookingView> {
        let names = self.users.usernames(&[booking.passenger_id]).await?;
        let name = names.get(&booking.passenger_id).cloned().unwrap_or_default();
        Ok(BookingView::new(booking, name))
    }

    async fn page_view(&self, page: Page<Booking>) -> CoreResult<Page<BookingView>> {
        let ids: Vec<Uuid> = page.content.iter().map(|b| b.passenger_id).collect();
        let names = self.users.usernames(&ids).await?;
        Ok(page.map(|booking| {
            let name = names.get(&booking.passenger_id).cloned().unwrap_or_default();
            BookingView::new(booking, name)
        }))
    }
}
