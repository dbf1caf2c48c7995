use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Extension, Json, Router,
};
use chrono::Utc;
use uuid::Uuid;

use carpool_catalog::NewRide;
use carpool_core::search::{RideSearchRequest, RideView};
use carpool_core::Capability;
use carpool_shared::{Page, Principal};

use crate::error::AppError;
use crate::middleware::require_capability;
use crate::paging::PageParams;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/rides", post(create_ride))
        .route("/rides/search", post(search_rides))
        .route("/rides/my-rides", get(my_rides))
        .route("/rides/{id}", get(get_ride))
}

async fn create_ride(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Json(offer): Json<NewRide>,
) -> Result<(StatusCode, Json<RideView>), AppError> {
    require_capability(&principal, Capability::OfferRides)?;
    offer.validate(Utc::now().date_naive())?;

    let ride = state.catalog.create_ride(principal.user_id, offer).await?;
    Ok((StatusCode::CREATED, Json(ride)))
}

async fn get_ride(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<RideView>, AppError> {
    Ok(Json(state.catalog.get_ride(id).await?))
}

async fn search_rides(
    State(state): State<AppState>,
    Query(params): Query<PageParams>,
    Json(query): Json<RideSearchRequest>,
) -> Result<Json<Page<RideView>>, AppError> {
    if !query.is_complete() {
        return Err(AppError::validation("Source and destination are required"));
    }
    let page = params.resolve(&state.paging);
    Ok(Json(state.catalog.search_rides(&query, page).await?))
}

async fn my_rides(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Query(params): Query<PageParams>,
) -> Result<Json<Page<RideView>>, AppError> {
    require_capability(&principal, Capability::ListOwnRides)?;
    let page = params.resolve(&state.paging);
    Ok(Json(
        state.catalog.list_driver_rides(principal.user_id, page).await?,
    ))
}
