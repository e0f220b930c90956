//! Stored document models.
//!
//! Field names serialize in camelCase because the persisted document shape is
//! a compatibility contract with existing data and downstream consumers.
//! Optional fields are omitted entirely (never written as empty strings) per
//! the same contract.

pub mod cart;
pub mod catalog;
pub mod coupon;
pub mod order;

pub use cart::{Cart, CartItem, CartStatus};
pub use catalog::MenuItemRating;
pub use coupon::{CouponRef, CouponUsage};
pub use order::{
    DeliveryAddress, GeoPoint, Order, OrderItem, OrderItemLinks, OrderItemType, PaymentRecord,
    StatusHistoryRecord,
};
