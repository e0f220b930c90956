//! Collection path conventions consumed by the core services.
//!
//! Paths follow the `collection/{id}/subcollection` layout of the backing
//! document store. Carts and coupon-usage records live under the owning user;
//! orders are top-level and keyed by the generated `ORD_...` id.

/// Slash-separated path to a collection or subcollection.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CollectionPath(String);

impl CollectionPath {
    pub fn new(path: impl Into<String>) -> Self {
        Self(path.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CollectionPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// `users/{userId}/cart`
pub fn user_carts(user_id: &str) -> CollectionPath {
    CollectionPath(format!("users/{user_id}/cart"))
}

/// `users/{userId}/cart/{cartId}/cart_items`
pub fn cart_items(user_id: &str, cart_id: &str) -> CollectionPath {
    CollectionPath(format!("users/{user_id}/cart/{cart_id}/cart_items"))
}

/// `users/{userId}/coupon_usage`
pub fn coupon_usage(user_id: &str) -> CollectionPath {
    CollectionPath(format!("users/{user_id}/coupon_usage"))
}

/// `orders`
pub fn orders() -> CollectionPath {
    CollectionPath("orders".to_string())
}

/// `orders/{orderId}/order_items`
pub fn order_items(order_id: &str) -> CollectionPath {
    CollectionPath(format!("orders/{order_id}/order_items"))
}

/// `orders/{orderId}/payment`
pub fn order_payments(order_id: &str) -> CollectionPath {
    CollectionPath(format!("orders/{order_id}/payment"))
}

/// `orders/{orderId}/status_history`
pub fn order_status_history(order_id: &str) -> CollectionPath {
    CollectionPath(format!("orders/{order_id}/status_history"))
}

/// `restaurants/{restaurantId}/menu_items`
pub fn menu_items(restaurant_id: &str) -> CollectionPath {
    CollectionPath(format!("restaurants/{restaurant_id}/menu_items"))
}
