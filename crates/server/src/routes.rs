use std::sync::Arc;

use axum::{
    routing::{get, post},
    Json, Router,
};
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnFailure, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

use common::types::Health;
use service::bookings::BookingStore;

pub mod bookings;

/// Shared handler state: the booking store behind its trait, so tests and
/// alternative deployments can inject their own implementation.
#[derive(Clone)]
pub struct ServerState {
    pub bookings: Arc<dyn BookingStore>,
}

pub async fn health() -> Json<Health> {
    Json(Health { status: "ok" })
}

/// Build the full application router.
pub fn build_router(state: ServerState, cors: CorsLayer) -> Router {
    let api = Router::new()
        .route("/bookings", get(bookings::list_bookings).post(bookings::create_booking))
        .route("/bookings/count", get(bookings::count_bookings))
        .route("/bookings/search", get(bookings::search_bookings))
        .route("/bookings/paginated", get(bookings::paginated_bookings))
        .route("/bookings/time-range", get(bookings::bookings_by_time_range))
        .route(
            "/bookings/:id",
            get(bookings::get_booking)
                .put(bookings::update_booking)
                .delete(bookings::delete_booking),
        )
        .route("/bookings/:id/delivered", post(bookings::mark_booking_delivered));

    Router::new()
        .route("/health", get(health))
        .merge(api)
        .with_state(state)
        .layer(cors)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(
                    DefaultMakeSpan::new()
                        .level(Level::INFO)
                        .include_headers(false),
                )
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(
                    DefaultOnResponse::new()
                        .level(Level::INFO)
                        .include_headers(false),
                )
                .on_failure(DefaultOnFailure::new().level(Level::ERROR)),
        )
}
