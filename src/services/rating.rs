use serde_json::Value;
use std::sync::Arc;
use tracing::{info, instrument};

use super::json_value;
use crate::{
    errors::ServiceError,
    events::{Event, EventSender},
    models::MenuItemRating,
    store::{paths, Document, DocumentStore, StoreError},
};

/// Rating aggregator.
///
/// Maintains the running-average `rating`/`ratingCount` pair on a catalog
/// menu-item document. This is the only operation in the crate that uses a
/// transactional read-modify-write; all other writes are plain sets/updates.
#[derive(Clone)]
pub struct RatingService {
    store: Arc<dyn DocumentStore>,
    event_sender: Arc<EventSender>,
}

impl RatingService {
    pub fn new(store: Arc<dyn DocumentStore>, event_sender: Arc<EventSender>) -> Self {
        Self {
            store,
            event_sender,
        }
    }

    /// Folds one user rating into the menu item's running average.
    ///
    /// Runs inside a document transaction so concurrent ratings never lose
    /// updates. Absent `rating`/`ratingCount` fields read as zero; all other
    /// fields of the menu-item document are preserved.
    #[instrument(skip(self))]
    pub async fn rate_menu_item(
        &self,
        restaurant_id: &str,
        menu_item_id: &str,
        user_rating: f64,
    ) -> Result<MenuItemRating, ServiceError> {
        if !user_rating.is_finite() {
            return Err(ServiceError::InvalidInput(
                "Rating must be a finite number".to_string(),
            ));
        }

        let result = self
            .store
            .run_transaction(
                &paths::menu_items(restaurant_id),
                menu_item_id,
                &move |current: Option<&Document>| {
                    let state = MenuItemRating {
                        rating: current
                            .and_then(|doc| doc.get("rating"))
                            .and_then(Value::as_f64)
                            .unwrap_or(0.0),
                        rating_count: current
                            .and_then(|doc| doc.get("ratingCount"))
                            .and_then(Value::as_i64)
                            .unwrap_or(0),
                    };
                    let folded = state.fold(user_rating);

                    let mut doc = current.cloned().unwrap_or_default();
                    doc.insert("rating".into(), Value::from(folded.rating));
                    doc.insert("ratingCount".into(), Value::from(folded.rating_count));
                    Ok(doc)
                },
            )
            .await;

        let updated = match result {
            Ok(doc) => doc,
            Err(StoreError::PermissionDenied(_)) => {
                return Err(ServiceError::Forbidden(
                    "You do not have permission to rate this item".to_string(),
                ));
            }
            Err(other) => return Err(other.into()),
        };

        let folded = MenuItemRating {
            rating: updated
                .get("rating")
                .and_then(Value::as_f64)
                .unwrap_or(0.0),
            rating_count: updated
                .get("ratingCount")
                .and_then(Value::as_i64)
                .unwrap_or(0),
        };

        self.event_sender
            .send_or_log(Event::MenuItemRated {
                restaurant_id: restaurant_id.to_string(),
                menu_item_id: menu_item_id.to_string(),
                rating: user_rating,
            })
            .await;

        info!(
            menu_item_id = %menu_item_id,
            rating = folded.rating,
            rating_count = folded.rating_count,
            "Updated menu item rating"
        );
        Ok(folded)
    }

    /// Stamps the rated order item with `userRating` and `isRated = true`.
    ///
    /// Deliberately a separate, non-transactional write from
    /// [`Self::rate_menu_item`]: the two can diverge if a failure lands
    /// between them. The per-item stamp is what gates "already rated" in
    /// callers.
    #[instrument(skip(self))]
    pub async fn save_user_rating_to_order(
        &self,
        order_id: &str,
        item_id: &str,
        rating: f64,
    ) -> Result<(), ServiceError> {
        let mut patch = Document::new();
        patch.insert("userRating".into(), json_value(&rating)?);
        patch.insert("isRated".into(), Value::from(true));

        self.store
            .update(&paths::order_items(order_id), item_id, patch)
            .await?;

        info!(order_id = %order_id, item_id = %item_id, "Saved user rating to order item");
        Ok(())
    }
}
