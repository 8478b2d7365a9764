use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::ServiceError;

/// A food booking owned by the store.
/// - `id` and `created_at` are assigned at creation and never change.
/// - `updated_at` stays `None` until the first update; marking a booking
///   delivered also stamps it.
/// - `delivered` is only ever raised when the store runs with
///   [`BookingRules::delivered_flag`] enabled.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct FoodBooking {
    pub id: Uuid,
    pub food_name: String,
    pub quantity: u32,
    pub delivery_address: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub delivered: bool,
}

/// Caller-supplied fields for create/update: excludes id and timestamps.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct BookingPayload {
    pub food_name: String,
    pub quantity: u32,
    pub delivery_address: String,
}

impl BookingPayload {
    /// Unified validation for create and update.
    pub fn validate(&self) -> Result<(), ServiceError> {
        if self.food_name.trim().is_empty() {
            return Err(ServiceError::Validation("food_name must not be empty".into()));
        }
        if self.quantity == 0 {
            return Err(ServiceError::Validation("quantity must be a positive number".into()));
        }
        if self.delivery_address.trim().is_empty() {
            return Err(ServiceError::Validation("delivery_address must not be empty".into()));
        }
        Ok(())
    }
}

/// Behaviors that differ between deployments of the booking service.
#[derive(Clone, Copy, Debug)]
pub struct BookingRules {
    /// Reject create/update when another live booking has the same food
    /// name, compared case-insensitively.
    pub unique_food_names: bool,
    /// Track delivery with a dedicated boolean. When off, marking a
    /// booking delivered only stamps `updated_at`.
    pub delivered_flag: bool,
}

impl Default for BookingRules {
    fn default() -> Self {
        Self { unique_food_names: true, delivered_flag: false }
    }
}

/// Trait abstraction for booking storage (CRUD plus query predicates).
///
/// Failed operations leave the store unchanged.
#[async_trait]
pub trait BookingStore: Send + Sync {
    /// All bookings in store order.
    async fn list(&self) -> Vec<FoodBooking>;
    /// The booking with `id`, or `NotFound` naming the missing id.
    async fn get(&self, id: Uuid) -> Result<FoodBooking, ServiceError>;
    /// Validate, assign id/created_at, store, and return the new booking.
    async fn create(&self, payload: BookingPayload) -> Result<FoodBooking, ServiceError>;
    /// Replace the payload fields and stamp `updated_at`; id and
    /// created_at are preserved.
    async fn update(&self, id: Uuid, payload: BookingPayload) -> Result<FoodBooking, ServiceError>;
    /// Remove and return the booking.
    async fn delete(&self, id: Uuid) -> Result<FoodBooking, ServiceError>;
    /// Case-insensitive substring match over food name and delivery
    /// address. An empty keyword matches every booking.
    async fn search(&self, keyword: &str) -> Vec<FoodBooking>;
    /// Number of live bookings.
    async fn count(&self) -> usize;
    /// The `(page-1)*page_size ..` slice of `list`, clipped to bounds.
    /// Out-of-range pages yield an empty vec.
    async fn paginate(&self, page: u32, page_size: u32) -> Vec<FoodBooking>;
    /// Bookings whose `created_at` falls within `[start, end]` inclusive.
    async fn by_time_range(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> Vec<FoodBooking>;
    /// Stamp `updated_at` (and `delivered` when the rule is on) and
    /// return the updated booking.
    async fn mark_delivered(&self, id: Uuid) -> Result<FoodBooking, ServiceError>;
}
