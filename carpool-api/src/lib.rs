use axum::{
    extract::{ConnectInfo, State},
    http::{Method, StatusCode},
    response::{IntoResponse, Response},
    Router,
};
use std::net::SocketAddr;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub mod auth;
pub mod bookings;
pub mod error;
pub mod middleware;
pub mod paging;
pub mod password;
pub mod rides;
pub mod state;

pub use state::{AppState, AuthConfig};

pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            axum::http::header::AUTHORIZATION,
            axum::http::header::CONTENT_TYPE,
            axum::http::header::USER_AGENT,
        ]);

    let protected = Router::new()
        .merge(auth::routes())
        .merge(rides::routes())
        .merge(bookings::routes())
        .route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::auth_middleware,
        ));

    let mut router = Router::new()
        .merge(auth::public_routes())
        .merge(protected)
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    if state.redis.is_some() {
        router = router.layer(axum::middleware::from_fn_with_state(
            state.clone(),
            rate_limit_middleware,
        ));
    }

    router.with_state(state)
}

async fn rate_limit_middleware(
    State(state): State<AppState>,
    req: axum::extract::Request,
    next: axum::middleware::Next,
) -> Response {
    let (Some(redis), Some(ConnectInfo(addr))) = (
        state.redis.as_ref(),
        req.extensions().get::<ConnectInfo<SocketAddr>>().cloned(),
    ) else {
        return next.run(req).await;
    };

    let key = format!("ratelimit:{}", addr.ip());
    let limits = &state.rate_limit;
    match redis
        .check_rate_limit(&key, limits.requests, limits.window_seconds)
        .await
    {
        Ok(true) => next.run(req).await,
        Ok(false) => (StatusCode::TOO_MANY_REQUESTS, "Rate limit exceeded").into_response(),
        Err(e) => {
            // Fail open
            tracing::warn!("rate limiter unavailable: {}", e);
            next.run(req).await
        }
    }
}
