use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use service::bookings::{BookingPayload, FoodBooking};

use crate::errors::JsonApiError;
use crate::routes::ServerState;

/// List all bookings.
pub async fn list_bookings(State(state): State<ServerState>) -> Json<Vec<FoodBooking>> {
    Json(state.bookings.list().await)
}

/// Create a booking.
pub async fn create_booking(
    State(state): State<ServerState>,
    Json(payload): Json<BookingPayload>,
) -> Result<Json<FoodBooking>, JsonApiError> {
    let created = state.bookings.create(payload).await?;
    info!(id = %created.id, food = %created.food_name, "created booking");
    Ok(Json(created))
}

/// Get a booking by id.
pub async fn get_booking(
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
) -> Result<Json<FoodBooking>, JsonApiError> {
    Ok(Json(state.bookings.get(id).await?))
}

/// Update a booking by id.
pub async fn update_booking(
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<BookingPayload>,
) -> Result<Json<FoodBooking>, JsonApiError> {
    let updated = state.bookings.update(id, payload).await?;
    info!(id = %updated.id, "updated booking");
    Ok(Json(updated))
}

/// Delete a booking by id; the removed record is returned to the caller.
pub async fn delete_booking(
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
) -> Result<Json<FoodBooking>, JsonApiError> {
    let removed = state.bookings.delete(id).await?;
    info!(id = %removed.id, "deleted booking");
    Ok(Json(removed))
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub keyword: String,
}

/// Keyword search over food names and delivery addresses.
pub async fn search_bookings(
    State(state): State<ServerState>,
    Query(q): Query<SearchQuery>,
) -> Json<Vec<FoodBooking>> {
    Json(state.bookings.search(&q.keyword).await)
}

#[derive(Debug, Serialize)]
pub struct CountResponse {
    pub count: usize,
}

/// Number of live bookings.
pub async fn count_bookings(State(state): State<ServerState>) -> Json<CountResponse> {
    Json(CountResponse { count: state.bookings.count().await })
}

#[derive(Debug, Deserialize)]
pub struct PageQuery {
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
}

fn default_page() -> u32 {
    1
}
fn default_page_size() -> u32 {
    20
}

/// One page of the booking list.
pub async fn paginated_bookings(
    State(state): State<ServerState>,
    Query(q): Query<PageQuery>,
) -> Json<Vec<FoodBooking>> {
    Json(state.bookings.paginate(q.page, q.page_size).await)
}

#[derive(Debug, Deserialize)]
pub struct TimeRangeQuery {
    /// RFC 3339 timestamp, inclusive lower bound.
    pub start: DateTime<Utc>,
    /// RFC 3339 timestamp, inclusive upper bound.
    pub end: DateTime<Utc>,
}

/// Bookings created within the given time range.
pub async fn bookings_by_time_range(
    State(state): State<ServerState>,
    Query(q): Query<TimeRangeQuery>,
) -> Json<Vec<FoodBooking>> {
    Json(state.bookings.by_time_range(q.start, q.end).await)
}

/// Mark a booking as delivered.
pub async fn mark_booking_delivered(
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
) -> Result<Json<FoodBooking>, JsonApiError> {
    let marked = state.bookings.mark_delivered(id).await?;
    info!(id = %marked.id, "marked booking delivered");
    Ok(Json(marked))
}
