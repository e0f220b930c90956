use chrono::Utc;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;
use validator::Validate;

use super::json_value;
use crate::{
    errors::ServiceError,
    events::{Event, EventSender},
    models::{Cart, CartItem, CartStatus, CouponRef},
    store::{self, paths, Document, DocumentId, DocumentStore, Filter, OrderBy},
};

/// Cart aggregate manager.
///
/// Owns the "active cart" per user, its line items, totals and applied
/// coupon. Every mutating call issues one or more remote document writes;
/// there is no local caching layer and no rollback when a later write in a
/// multi-step sequence fails. [`CartService::update_cart_totals`] is the
/// single source of truth for `itemCount`/`totalAmount`; callers must never
/// trust stale copies.
#[derive(Clone)]
pub struct CartService {
    store: Arc<dyn DocumentStore>,
    event_sender: Arc<EventSender>,
}

impl CartService {
    pub fn new(store: Arc<dyn DocumentStore>, event_sender: Arc<EventSender>) -> Self {
        Self {
            store,
            event_sender,
        }
    }

    /// Returns the user's active cart, or `None` when no cart is active.
    ///
    /// Multiple active carts are not prevented at this layer; the oldest one
    /// (by `addedAt`) wins and the condition is logged.
    #[instrument(skip(self))]
    pub async fn get_active_cart(&self, user_id: &str) -> Result<Option<Cart>, ServiceError> {
        let matches = self
            .store
            .query(
                &paths::user_carts(user_id),
                &[Filter::eq("status", CartStatus::Active.to_string())],
                Some(&OrderBy::asc("addedAt")),
            )
            .await?;

        if matches.len() > 1 {
            warn!(
                user_id = %user_id,
                active_carts = matches.len(),
                "Multiple active carts found; using the oldest"
            );
        }

        match matches.into_iter().next() {
            Some((_, doc)) => Ok(Some(store::from_document(doc)?)),
            None => Ok(None),
        }
    }

    /// Creates a new active cart with zeroed counters and returns its id.
    #[instrument(skip(self, input), fields(user_id = %input.user_id))]
    pub async fn create_cart(&self, input: CreateCartInput) -> Result<String, ServiceError> {
        input.validate()?;

        let cart_id = Uuid::new_v4().to_string();
        let now = Utc::now();
        let cart = Cart {
            cart_id: cart_id.clone(),
            user_id: input.user_id.clone(),
            item_count: 0,
            total_amount: Decimal::ZERO,
            status: CartStatus::Active,
            delivery_type: input.delivery_type,
            applied_coupon: None,
            restaurant_id: input.restaurant_id,
            service_id: input.service_id,
            warehouse_id: input.warehouse_id,
            added_at: now,
            updated_at: now,
            used_for_order: false,
        };

        self.store
            .set(
                &paths::user_carts(&input.user_id),
                DocumentId::Assigned(cart_id.clone()),
                store::to_document(&cart)?,
            )
            .await?;

        self.event_sender
            .send_or_log(Event::CartCreated(cart_id.clone()))
            .await;

        info!(cart_id = %cart_id, "Created cart");
        Ok(cart_id)
    }

    /// Retrieves a cart together with its line items.
    #[instrument(skip(self))]
    pub async fn get_cart(
        &self,
        user_id: &str,
        cart_id: &str,
    ) -> Result<CartWithItems, ServiceError> {
        let doc = self
            .store
            .get(&paths::user_carts(user_id), cart_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Cart {} not found", cart_id)))?;
        let cart: Cart = store::from_document(doc)?;
        let items = self.get_cart_items(user_id, cart_id).await?;

        Ok(CartWithItems { cart, items })
    }

    /// All line items of a cart.
    pub async fn get_cart_items(
        &self,
        user_id: &str,
        cart_id: &str,
    ) -> Result<Vec<CartItem>, ServiceError> {
        let docs = self
            .store
            .query(&paths::cart_items(user_id, cart_id), &[], None)
            .await?;
        docs.into_iter()
            .map(|(_, doc)| store::from_document(doc).map_err(ServiceError::from))
            .collect()
    }

    /// Adds an item to the cart, or bumps its quantity by one when the same
    /// `productId` is already present. Cart totals are recomputed afterwards.
    #[instrument(skip(self, input), fields(user_id = %user_id, cart_id = %cart_id, product_id = %input.product_id))]
    pub async fn add_item_to_cart(
        &self,
        user_id: &str,
        cart_id: &str,
        input: AddCartItemInput,
    ) -> Result<(), ServiceError> {
        input.validate()?;

        let items_path = paths::cart_items(user_id, cart_id);
        let existing = self
            .store
            .query(
                &items_path,
                &[Filter::eq("productId", input.product_id.clone())],
                None,
            )
            .await?;

        if let Some((item_id, doc)) = existing.into_iter().next() {
            let item: CartItem = store::from_document(doc)?;
            let quantity = item.quantity + 1;
            let mut patch = Document::new();
            patch.insert("quantity".into(), Value::from(quantity));
            patch.insert(
                "totalPrice".into(),
                json_value(&(item.price * Decimal::from(quantity)))?,
            );
            self.store.update(&items_path, &item_id, patch).await?;
        } else {
            let item_id = Uuid::new_v4().to_string();
            let item = CartItem {
                item_id: item_id.clone(),
                user_id: user_id.to_string(),
                product_id: input.product_id.clone(),
                menu_item_id: input.menu_item_id,
                name: input.name,
                price: input.price,
                quantity: 1,
                total_price: input.price,
                customizations: input.customizations,
                notes: input.notes,
                added_at: Utc::now(),
            };
            self.store
                .set(
                    &items_path,
                    DocumentId::Assigned(item_id),
                    store::to_document(&item)?,
                )
                .await?;
        }

        self.update_cart_totals(user_id, cart_id).await?;

        self.event_sender
            .send_or_log(Event::CartItemAdded {
                cart_id: cart_id.to_string(),
                product_id: input.product_id,
            })
            .await;

        Ok(())
    }

    /// Updates a line's quantity; a quantity of zero or less removes the line
    /// entirely. Cart totals are recomputed afterwards.
    #[instrument(skip(self))]
    pub async fn update_item_quantity(
        &self,
        user_id: &str,
        cart_id: &str,
        item_id: &str,
        quantity: i32,
    ) -> Result<(), ServiceError> {
        let items_path = paths::cart_items(user_id, cart_id);

        if quantity <= 0 {
            self.store.delete(&items_path, item_id).await?;
            self.event_sender
                .send_or_log(Event::CartItemRemoved {
                    cart_id: cart_id.to_string(),
                    item_id: item_id.to_string(),
                })
                .await;
        } else {
            let doc = self
                .store
                .get(&items_path, item_id)
                .await?
                .ok_or_else(|| {
                    ServiceError::NotFound(format!("Cart item {} not found", item_id))
                })?;
            let item: CartItem = store::from_document(doc)?;

            let mut patch = Document::new();
            patch.insert("quantity".into(), Value::from(quantity));
            patch.insert(
                "totalPrice".into(),
                json_value(&(item.price * Decimal::from(quantity)))?,
            );
            self.store.update(&items_path, item_id, patch).await?;

            self.event_sender
                .send_or_log(Event::CartItemUpdated {
                    cart_id: cart_id.to_string(),
                    item_id: item_id.to_string(),
                })
                .await;
        }

        self.update_cart_totals(user_id, cart_id).await?;
        Ok(())
    }

    /// Removes one line from the cart and recomputes totals.
    #[instrument(skip(self))]
    pub async fn remove_item_from_cart(
        &self,
        user_id: &str,
        cart_id: &str,
        item_id: &str,
    ) -> Result<(), ServiceError> {
        self.store
            .delete(&paths::cart_items(user_id, cart_id), item_id)
            .await?;
        self.update_cart_totals(user_id, cart_id).await?;

        self.event_sender
            .send_or_log(Event::CartItemRemoved {
                cart_id: cart_id.to_string(),
                item_id: item_id.to_string(),
            })
            .await;

        Ok(())
    }

    /// Deletes all lines and zeroes the cart counters directly (there is
    /// nothing left to sum).
    #[instrument(skip(self))]
    pub async fn clear_cart(&self, user_id: &str, cart_id: &str) -> Result<(), ServiceError> {
        let items_path = paths::cart_items(user_id, cart_id);
        let items = self.store.query(&items_path, &[], None).await?;
        for (item_id, _) in items {
            self.store.delete(&items_path, &item_id).await?;
        }

        let mut patch = Document::new();
        patch.insert("itemCount".into(), Value::from(0));
        patch.insert("totalAmount".into(), json_value(&Decimal::ZERO)?);
        patch.insert("updatedAt".into(), json_value(&Utc::now())?);
        self.store
            .update(&paths::user_carts(user_id), cart_id, patch)
            .await?;

        self.event_sender
            .send_or_log(Event::CartCleared(cart_id.to_string()))
            .await;

        info!(cart_id = %cart_id, "Cleared cart");
        Ok(())
    }

    /// Recomputes `itemCount` and `totalAmount` from the stored line items
    /// and writes them back to the cart document.
    #[instrument(skip(self))]
    pub async fn update_cart_totals(
        &self,
        user_id: &str,
        cart_id: &str,
    ) -> Result<Cart, ServiceError> {
        let items = self.get_cart_items(user_id, cart_id).await?;

        let item_count: i32 = items.iter().map(|item| item.quantity).sum();
        let total_amount: Decimal = items.iter().map(|item| item.total_price).sum();

        let carts_path = paths::user_carts(user_id);
        let mut patch = Document::new();
        patch.insert("itemCount".into(), Value::from(item_count));
        patch.insert("totalAmount".into(), json_value(&total_amount)?);
        patch.insert("updatedAt".into(), json_value(&Utc::now())?);
        self.store.update(&carts_path, cart_id, patch).await?;

        info!(
            cart_id = %cart_id,
            item_count = item_count,
            total_amount = %total_amount,
            "Recalculated cart totals"
        );

        let doc = self
            .store
            .get(&carts_path, cart_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Cart {} not found", cart_id)))?;
        Ok(store::from_document(doc)?)
    }

    /// Sets the cart's applied coupon. Eligibility is not validated here.
    #[instrument(skip(self, coupon))]
    pub async fn apply_coupon(
        &self,
        user_id: &str,
        cart_id: &str,
        coupon: CouponRef,
    ) -> Result<(), ServiceError> {
        let coupon_id = coupon.resolve_coupon_id();

        let mut patch = Document::new();
        patch.insert("appliedCoupon".into(), json_value(&coupon)?);
        patch.insert("updatedAt".into(), json_value(&Utc::now())?);
        self.store
            .update(&paths::user_carts(user_id), cart_id, patch)
            .await?;

        self.event_sender
            .send_or_log(Event::CouponApplied {
                cart_id: cart_id.to_string(),
                coupon_id,
            })
            .await;

        Ok(())
    }

    /// Clears the cart's applied coupon.
    #[instrument(skip(self))]
    pub async fn remove_coupon(&self, user_id: &str, cart_id: &str) -> Result<(), ServiceError> {
        let mut patch = Document::new();
        patch.insert("appliedCoupon".into(), Value::Null);
        patch.insert("updatedAt".into(), json_value(&Utc::now())?);
        self.store
            .update(&paths::user_carts(user_id), cart_id, patch)
            .await?;

        self.event_sender
            .send_or_log(Event::CouponRemoved {
                cart_id: cart_id.to_string(),
            })
            .await;

        Ok(())
    }

    /// Marks the user's active cart as consumed by an order:
    /// `status = inactive`, `usedForOrder = true`. Returns the deactivated
    /// cart id, or `None` when no cart was active.
    #[instrument(skip(self))]
    pub async fn deactivate_active_cart(
        &self,
        user_id: &str,
    ) -> Result<Option<String>, ServiceError> {
        let Some(cart) = self.get_active_cart(user_id).await? else {
            warn!(user_id = %user_id, "No active cart to deactivate");
            return Ok(None);
        };

        let mut patch = Document::new();
        patch.insert("status".into(), json_value(&CartStatus::Inactive)?);
        patch.insert("usedForOrder".into(), Value::from(true));
        patch.insert("updatedAt".into(), json_value(&Utc::now())?);
        self.store
            .update(&paths::user_carts(user_id), &cart.cart_id, patch)
            .await?;

        self.event_sender
            .send_or_log(Event::CartDeactivated(cart.cart_id.clone()))
            .await;

        info!(cart_id = %cart.cart_id, "Deactivated cart");
        Ok(Some(cart.cart_id))
    }
}

/// Input for creating a cart
#[derive(Debug, Deserialize, Validate)]
pub struct CreateCartInput {
    #[validate(length(min = 1, message = "User id is required"))]
    pub user_id: String,
    pub delivery_type: Option<String>,
    pub restaurant_id: Option<String>,
    pub service_id: Option<String>,
    pub warehouse_id: Option<String>,
}

/// Input for adding an item to a cart
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct AddCartItemInput {
    #[validate(length(min = 1, message = "Product id is required"))]
    pub product_id: String,
    pub menu_item_id: Option<String>,
    #[validate(length(min = 1, message = "Item name is required"))]
    pub name: String,
    pub price: Decimal,
    #[serde(default)]
    pub customizations: Vec<String>,
    pub notes: Option<String>,
}

/// Cart with items
#[derive(Debug)]
pub struct CartWithItems {
    pub cart: Cart,
    pub items: Vec<CartItem>,
}
