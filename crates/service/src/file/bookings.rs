use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::{debug, info};
use uuid::Uuid;

use crate::bookings::{BookingPayload, BookingRules, BookingStore, FoodBooking};
use crate::errors::ServiceError;
use crate::pagination::Pagination;
use crate::storage::json_map_store::JsonMapStore;

/// File storage: the booking collection persisted as one JSON map file.
///
/// The `JsonMapStore` is keyed by booking id, so iteration is key-ordered
/// and stable, which is what `list` and `paginate` rely on. Compound
/// check-then-mutate operations (uniqueness, not-found) run inside
/// `update_map` so they hold the write lock for their whole duration.
#[derive(Clone)]
pub struct BookingFileStore {
    store: Arc<JsonMapStore<Uuid, FoodBooking>>,
    rules: BookingRules,
}

fn check_unique_name(
    map: &BTreeMap<Uuid, FoodBooking>,
    name: &str,
    exclude: Option<Uuid>,
) -> Result<(), ServiceError> {
    let lowered = name.to_lowercase();
    let clash = map
        .values()
        .any(|b| b.food_name.to_lowercase() == lowered && Some(b.id) != exclude);
    if clash {
        return Err(ServiceError::Conflict(format!(
            "a booking named '{}' already exists",
            name
        )));
    }
    Ok(())
}

impl BookingFileStore {
    /// Open the store, creating an empty file if none exists.
    pub async fn new<P: Into<std::path::PathBuf>>(
        path: P,
        rules: BookingRules,
    ) -> Result<Arc<Self>, ServiceError> {
        let store = JsonMapStore::<Uuid, FoodBooking>::new(path).await?;
        let records = store.len().await;
        info!(records, "booking store opened");
        Ok(Arc::new(Self { store, rules }))
    }

    /// List all bookings in store order.
    pub async fn list(&self) -> Vec<FoodBooking> {
        self.store.list().await.into_iter().map(|(_, v)| v).collect()
    }

    /// Get a booking by id.
    pub async fn get(&self, id: Uuid) -> Result<FoodBooking, ServiceError> {
        self.store
            .get(&id)
            .await
            .ok_or_else(|| ServiceError::not_found("booking", id))
    }

    /// Create a new booking from a validated payload.
    pub async fn create(&self, payload: BookingPayload) -> Result<FoodBooking, ServiceError> {
        payload.validate()?;
        let rules = self.rules;
        let record = FoodBooking {
            id: Uuid::new_v4(),
            food_name: payload.food_name,
            quantity: payload.quantity,
            delivery_address: payload.delivery_address,
            created_at: Utc::now(),
            updated_at: None,
            delivered: false,
        };
        let created = self
            .store
            .update_map(move |map| {
                if rules.unique_food_names {
                    check_unique_name(map, &record.food_name, None)?;
                }
                map.insert(record.id, record.clone());
                Ok(record)
            })
            .await?;
        debug!(id = %created.id, food = %created.food_name, "created booking");
        Ok(created)
    }

    /// Update an existing booking in place; id and created_at are preserved.
    pub async fn update(&self, id: Uuid, payload: BookingPayload) -> Result<FoodBooking, ServiceError> {
        payload.validate()?;
        let rules = self.rules;
        self.store
            .update_map(move |map| {
                if rules.unique_food_names {
                    check_unique_name(map, &payload.food_name, Some(id))?;
                }
                let existing = map
                    .get_mut(&id)
                    .ok_or_else(|| ServiceError::not_found("booking", id))?;
                existing.food_name = payload.food_name;
                existing.quantity = payload.quantity;
                existing.delivery_address = payload.delivery_address;
                existing.updated_at = Some(Utc::now());
                Ok(existing.clone())
            })
            .await
    }

    /// Remove a booking and return it.
    pub async fn delete(&self, id: Uuid) -> Result<FoodBooking, ServiceError> {
        let removed = self
            .store
            .remove(&id)
            .await?
            .ok_or_else(|| ServiceError::not_found("booking", id))?;
        debug!(id = %removed.id, "deleted booking");
        Ok(removed)
    }

    /// Case-insensitive substring search over food name and delivery address.
    pub async fn search(&self, keyword: &str) -> Vec<FoodBooking> {
        let needle = keyword.to_lowercase();
        self.list()
            .await
            .into_iter()
            .filter(|b| {
                b.food_name.to_lowercase().contains(&needle)
                    || b.delivery_address.to_lowercase().contains(&needle)
            })
            .collect()
    }

    /// Number of live bookings.
    pub async fn count(&self) -> usize {
        self.store.len().await
    }

    /// One page of `list`, clipped to bounds.
    pub async fn paginate(&self, page: u32, page_size: u32) -> Vec<FoodBooking> {
        let (page_idx, per_page) = Pagination { page, per_page: page_size }.normalize();
        self.list()
            .await
            .into_iter()
            .skip(page_idx.saturating_mul(per_page))
            .take(per_page)
            .collect()
    }

    /// Bookings created within `[start, end]` inclusive.
    pub async fn by_time_range(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Vec<FoodBooking> {
        self.list()
            .await
            .into_iter()
            .filter(|b| b.created_at >= start && b.created_at <= end)
            .collect()
    }

    /// Record a delivery. Stamps `updated_at`; raises `delivered` only
    /// when the store runs with the delivered-flag rule enabled.
    pub async fn mark_delivered(&self, id: Uuid) -> Result<FoodBooking, ServiceError> {
        let rules = self.rules;
        self.store
            .update_map(move |map| {
                let existing = map
                    .get_mut(&id)
                    .ok_or_else(|| ServiceError::not_found("booking", id))?;
                existing.updated_at = Some(Utc::now());
                if rules.delivered_flag {
                    existing.delivered = true;
                }
                Ok(existing.clone())
            })
            .await
    }
}

#[async_trait]
impl BookingStore for BookingFileStore {
    async fn list(&self) -> Vec<FoodBooking> {
        self.list().await
    }
    async fn get(&self, id: Uuid) -> Result<FoodBooking, ServiceError> {
        self.get(id).await
    }
    async fn create(&self, payload: BookingPayload) -> Result<FoodBooking, ServiceError> {
        self.create(payload).await
    }
    async fn update(&self, id: Uuid, payload: BookingPayload) -> Result<FoodBooking, ServiceError> {
        self.update(id, payload).await
    }
    async fn delete(&self, id: Uuid) -> Result<FoodBooking, ServiceError> {
        self.delete(id).await
    }
    async fn search(&self, keyword: &str) -> Vec<FoodBooking> {
        self.search(keyword).await
    }
    async fn count(&self) -> usize {
        self.count().await
    }
    async fn paginate(&self, page: u32, page_size: u32) -> Vec<FoodBooking> {
        self.paginate(page, page_size).await
    }
    async fn by_time_range(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> Vec<FoodBooking> {
        self.by_time_range(start, end).await
    }
    async fn mark_delivered(&self, id: Uuid) -> Result<FoodBooking, ServiceError> {
        self.mark_delivered(id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn payload(name: &str, quantity: u32, address: &str) -> BookingPayload {
        BookingPayload {
            food_name: name.into(),
            quantity,
            delivery_address: address.into(),
        }
    }

    async fn setup_store(rules: BookingRules) -> Arc<BookingFileStore> {
        let tmp = std::env::temp_dir().join(format!("bookings_{}.json", Uuid::new_v4()));
        BookingFileStore::new(&tmp, rules).await.expect("store init")
    }

    #[tokio::test]
    async fn create_then_get_returns_equal_record() {
        let store = setup_store(BookingRules::default()).await;

        let created = store
            .create(payload("Pizza", 2, "1 Main St"))
            .await
            .expect("create ok");
        assert_eq!(created.food_name, "Pizza");
        assert_eq!(created.quantity, 2);
        assert!(created.updated_at.is_none());
        assert!(!created.delivered);

        let fetched = store.get(created.id).await.expect("found");
        assert_eq!(fetched, created);
    }

    #[tokio::test]
    async fn create_validates_payload_fields() {
        let store = setup_store(BookingRules::default()).await;

        let err = store.create(payload("", 2, "1 Main St")).await.unwrap_err();
        assert!(matches!(err, ServiceError::Validation(ref m) if m.contains("food_name")));

        let err = store.create(payload("Pizza", 0, "1 Main St")).await.unwrap_err();
        assert!(matches!(err, ServiceError::Validation(ref m) if m.contains("quantity")));

        let err = store.create(payload("Pizza", 2, "  ")).await.unwrap_err();
        assert!(matches!(err, ServiceError::Validation(ref m) if m.contains("delivery_address")));

        assert_eq!(store.count().await, 0);
    }

    #[tokio::test]
    async fn duplicate_name_conflicts_case_insensitively() {
        let store = setup_store(BookingRules::default()).await;
        store.create(payload("Pizza", 2, "1 Main St")).await.expect("first");

        let err = store.create(payload("pizza", 1, "2 Oak Ave")).await.unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(_)));
        assert_eq!(store.count().await, 1);
    }

    #[tokio::test]
    async fn duplicate_names_allowed_when_rule_off() {
        let rules = BookingRules { unique_food_names: false, ..Default::default() };
        let store = setup_store(rules).await;
        store.create(payload("Pizza", 2, "1 Main St")).await.expect("first");
        store.create(payload("pizza", 1, "2 Oak Ave")).await.expect("second");
        assert_eq!(store.count().await, 2);
    }

    #[tokio::test]
    async fn update_replaces_payload_and_stamps_updated_at() {
        let store = setup_store(BookingRules::default()).await;
        let created = store.create(payload("Pizza", 2, "1 Main St")).await.expect("create");

        let updated = store
            .update(created.id, payload("Ramen", 3, "2 Oak Ave"))
            .await
            .expect("update ok");
        assert_eq!(updated.id, created.id);
        assert_eq!(updated.created_at, created.created_at);
        assert_eq!(updated.food_name, "Ramen");
        assert_eq!(updated.quantity, 3);
        assert_eq!(updated.delivery_address, "2 Oak Ave");
        let stamp = updated.updated_at.expect("stamped");
        assert!(stamp >= created.created_at);

        // same name on the same record is not a conflict
        let again = store
            .update(created.id, payload("Ramen", 4, "2 Oak Ave"))
            .await
            .expect("self-update ok");
        assert_eq!(again.quantity, 4);
    }

    #[tokio::test]
    async fn update_unknown_id_is_not_found_and_store_unchanged() {
        let store = setup_store(BookingRules::default()).await;
        store.create(payload("Pizza", 2, "1 Main St")).await.expect("create");

        let err = store
            .update(Uuid::new_v4(), payload("Ramen", 1, "2 Oak Ave"))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));

        let all = store.list().await;
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].food_name, "Pizza");
        assert!(all[0].updated_at.is_none());
    }

    #[tokio::test]
    async fn update_into_existing_name_conflicts() {
        let store = setup_store(BookingRules::default()).await;
        store.create(payload("Pizza", 2, "1 Main St")).await.expect("a");
        let b = store.create(payload("Ramen", 1, "2 Oak Ave")).await.expect("b");

        let err = store.update(b.id, payload("PIZZA", 1, "2 Oak Ave")).await.unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(_)));
    }

    #[tokio::test]
    async fn delete_returns_record_and_get_is_not_found_after() {
        let store = setup_store(BookingRules::default()).await;
        let created = store.create(payload("Pizza", 2, "1 Main St")).await.expect("create");

        let removed = store.delete(created.id).await.expect("delete ok");
        assert_eq!(removed, created);

        let err = store.get(created.id).await.unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(ref m) if m.contains(&created.id.to_string())));

        let err = store.delete(created.id).await.unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
    }

    #[tokio::test]
    async fn search_matches_name_and_address_case_insensitively() {
        let rules = BookingRules { unique_food_names: false, ..Default::default() };
        let store = setup_store(rules).await;
        store.create(payload("Pizza Margherita", 1, "1 Main St")).await.expect("a");
        store.create(payload("Ramen", 1, "12 Pizza Road")).await.expect("b");
        store.create(payload("Curry", 1, "3 Elm St")).await.expect("c");

        let hits = store.search("PIZZA").await;
        assert_eq!(hits.len(), 2);

        let hits = store.search("elm").await;
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].food_name, "Curry");

        // empty keyword matches everything
        assert_eq!(store.search("").await.len(), 3);

        assert!(store.search("sushi").await.is_empty());
    }

    #[tokio::test]
    async fn count_tracks_list_length() {
        let store = setup_store(BookingRules::default()).await;
        assert_eq!(store.count().await, 0);

        let a = store.create(payload("Pizza", 1, "1 Main St")).await.expect("a");
        store.create(payload("Ramen", 1, "2 Oak Ave")).await.expect("b");
        assert_eq!(store.count().await, store.list().await.len());
        assert_eq!(store.count().await, 2);

        store.delete(a.id).await.expect("delete");
        assert_eq!(store.count().await, 1);
    }

    #[tokio::test]
    async fn paginate_slices_list_and_clips_out_of_range() {
        let rules = BookingRules { unique_food_names: false, ..Default::default() };
        let store = setup_store(rules).await;
        for i in 0..5 {
            store
                .create(payload(&format!("Dish {}", i), 1, "1 Main St"))
                .await
                .expect("create");
        }

        let all = store.list().await;
        let first = store.paginate(1, 2).await;
        assert_eq!(first, all[0..2].to_vec());
        let second = store.paginate(2, 2).await;
        assert_eq!(second, all[2..4].to_vec());
        let third = store.paginate(3, 2).await;
        assert_eq!(third, all[4..5].to_vec());

        assert!(store.paginate(4, 2).await.is_empty());
        assert!(store.paginate(100, 2).await.is_empty());
        assert!(store.paginate(1, 0).await.is_empty());
        // page 0 behaves like page 1
        assert_eq!(store.paginate(0, 2).await, first);
    }

    #[tokio::test]
    async fn by_time_range_is_inclusive() {
        let store = setup_store(BookingRules::default()).await;
        let created = store.create(payload("Pizza", 1, "1 Main St")).await.expect("create");

        let hits = store.by_time_range(created.created_at, created.created_at).await;
        assert_eq!(hits.len(), 1);

        let before = created.created_at - Duration::hours(1);
        let after = created.created_at + Duration::hours(1);
        assert_eq!(store.by_time_range(before, after).await.len(), 1);
        assert!(store
            .by_time_range(before, before + Duration::minutes(1))
            .await
            .is_empty());
    }

    #[tokio::test]
    async fn mark_delivered_stamps_updated_at_only_by_default() {
        let store = setup_store(BookingRules::default()).await;
        let created = store.create(payload("Pizza", 1, "1 Main St")).await.expect("create");

        let marked = store.mark_delivered(created.id).await.expect("mark ok");
        assert!(marked.updated_at.is_some());
        assert!(!marked.delivered);
        assert_eq!(marked.food_name, created.food_name);

        let err = store.mark_delivered(Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
    }

    #[tokio::test]
    async fn mark_delivered_raises_flag_when_enabled() {
        let rules = BookingRules { delivered_flag: true, ..Default::default() };
        let store = setup_store(rules).await;
        let created = store.create(payload("Pizza", 1, "1 Main St")).await.expect("create");

        let marked = store.mark_delivered(created.id).await.expect("mark ok");
        assert!(marked.delivered);
        assert!(marked.updated_at.is_some());
    }

    #[tokio::test]
    async fn store_reloads_from_file() {
        let tmp = std::env::temp_dir().join(format!("bookings_{}.json", Uuid::new_v4()));
        let store = BookingFileStore::new(&tmp, BookingRules::default())
            .await
            .expect("store init");
        let created = store.create(payload("Pizza", 2, "1 Main St")).await.expect("create");

        let reloaded = BookingFileStore::new(&tmp, BookingRules::default())
            .await
            .expect("reload");
        assert_eq!(reloaded.get(created.id).await.expect("found"), created);
        assert_eq!(reloaded.count().await, 1);

        let _ = tokio::fs::remove_file(&tmp).await;
    }
}
