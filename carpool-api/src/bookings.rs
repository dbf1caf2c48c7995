use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post, put},
    Extension, Json, Router,
};
use serde::Deserialize;
use uuid::Uuid;

use carpool_core::search::BookingView;
use carpool_core::Capability;
use carpool_shared::{Page, Principal};

use crate::error::AppError;
use crate::middleware::require_capability;
use crate::paging::PageParams;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct BookingRequest {
    pub ride_id: Uuid,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/bookings", post(book_ride))
        .route("/bookings/my-bookings", get(my_bookings))
        .route("/bookings/ride-bookings", get(ride_bookings))
        .route("/bookings/{id}", get(get_booking).delete(cancel_booking))
        .route("/bookings/{id}/confirm", put(confirm_booking))
}

async fn book_ride(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Json(req): Json<BookingRequest>,
) -> Result<(StatusCode, Json<BookingView>), AppError> {
    require_capability(&principal, Capability::RequestBookings)?;
    let booking = state.ledger.book_ride(req.ride_id, principal.user_id).await?;
    Ok((StatusCode::CREATED, Json(booking)))
}

async fn get_booking(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<BookingView>, AppError> {
    Ok(Json(state.ledger.get_booking(id).await?))
}

async fn my_bookings(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Query(params): Query<PageParams>,
) -> Result<Json<Page<BookingView>>, AppError> {
    require_capability(&principal, Capability::ListOwnBookings)?;
    let page = params.resolve(&state.paging);
    Ok(Json(
        state.ledger.list_passenger_bookings(principal.user_id, page).await?,
    ))
}

async fn ride_bookings(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Query(params): Query<PageParams>,
) -> Result<Json<Page<BookingView>>, AppError> {
    require_capability(&principal, Capability::ListRideBookings)?;
    let page = params.resolve(&state.paging);
    Ok(Json(
        state.ledger.list_driver_bookings(principal.user_id, page).await?,
    ))
}

async fn confirm_booking(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<Uuid>,
) -> Result<Json<BookingView>, AppError> {
    require_capability(&principal, Capability::ConfirmBookings)?;
    Ok(Json(state.ledger.confirm_booking(id, principal.user_id).await?))
}

async fn cancel_booking(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<Uuid>,
) -> Result<Json<BookingView>, AppError> {
    require_capability(&principal, Capability::CancelBookings)?;
    Ok(Json(state.ledger.cancel_booking(id, principal.user_id).await?))
}
