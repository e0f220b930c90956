//! Core services: cart aggregate management, order decomposition, coupon
//! usage bookkeeping, and the rating aggregator.

use serde::Serialize;
use serde_json::Value;

use crate::errors::ServiceError;

pub mod cart;
pub mod coupon_usage;
pub mod order_split;
pub mod rating;

pub use cart::{AddCartItemInput, CartService, CartWithItems, CreateCartInput};
pub use coupon_usage::{CouponUsageService, UsageOutcome};
pub use order_split::{
    generate_order_id, CouponUsageFailure, DeliveryAddressInput, GeoCoordinates, OrderLineInput,
    OrderSplitOutcome, OrderSplitService, OrderSubmission,
};
pub use rating::RatingService;

/// Serializes a field value for a document patch.
pub(crate) fn json_value<T: Serialize>(value: &T) -> Result<Value, ServiceError> {
    serde_json::to_value(value).map_err(|e| ServiceError::SerializationError(e.to_string()))
}
