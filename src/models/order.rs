use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::coupon::CouponRef;

/// Top-level order document, keyed by the generated `ORD_...` id.
///
/// Created exactly once at checkout; mutated by downstream status updates;
/// never deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub order_id: String,
    pub user_id: String,
    pub customer_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub restaurant_id: Option<String>,
    pub delivery_address: DeliveryAddress,
    pub delivery_charges: Decimal,
    pub discount: Decimal,
    pub taxes: Decimal,
    pub total_amount: Decimal,
    pub final_amount: Decimal,
    pub payment_method: String,
    pub payment_status: String,
    pub status: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub applied_coupons: Vec<CouponRef>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scheduled_for: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimated_delivery_time: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actual_delivery_time: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cancellation_reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delivery_partner_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refund_amount: Option<Decimal>,
}

/// Normalized delivery address written into the order header. All keys are
/// always present (the header address is a fixed shape, unlike the pruned
/// order-item documents).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryAddress {
    pub address_id: String,
    pub contact_name: String,
    pub contact_phone: String,
    pub line1: String,
    pub line2: String,
    pub city: String,
    pub pincode: String,
    pub geo_point: GeoPoint,
    pub save_for_future: bool,
}

/// Store-native geo point. Defaults to `(0, 0)` when the caller supplied no
/// coordinates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

/// Order line classification: restaurant dishes vs. warehouse products.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum OrderItemType {
    MenuItem,
    Product,
}

/// Cross-references from an order item to catalog documents. Dropped from the
/// stored item entirely when every field is empty.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItemLinks {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub menu_item_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub restaurant_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warehouse_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_id: Option<String>,
}

impl OrderItemLinks {
    pub fn is_empty(&self) -> bool {
        self.menu_item_id.is_none()
            && self.product_id.is_none()
            && self.restaurant_id.is_none()
            && self.warehouse_id.is_none()
            && self.service_id.is_none()
    }
}

/// One stored order line. Immutable after creation except for `status`,
/// `userRating` and `isRated` (set once; items are never re-ratable).
///
/// Menu-item-only fields (`chefId`, `cuisine`, `prepTime`) are never present
/// on product items, and empty values are pruned before write rather than
/// stored as empty strings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub category: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chef_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cuisine: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub customizations: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub links: Option<OrderItemLinks>,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prep_time: Option<i32>,
    pub quantity: i32,
    pub status: String,
    pub total_price: Decimal,
    #[serde(rename = "type")]
    pub item_type: OrderItemType,
    pub unit_price: Decimal,
    pub customer_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_rating: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_rated: Option<bool>,
}

/// Payment record created alongside the order header; later mutated by
/// gateway callbacks outside this crate.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRecord {
    pub amount: Decimal,
    pub method: String,
    pub provider: String,
    pub status: String,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gateway_transaction_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refund_transaction_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,
    pub customer_id: String,
}

/// Append-only status log entry. One record is written at order creation;
/// later status changes append further entries.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusHistoryRecord {
    pub status: String,
    pub timestamp: DateTime<Utc>,
    pub notes: String,
    pub customer_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn order_item_type_serializes_snake_case() {
        assert_eq!(
            serde_json::to_value(OrderItemType::MenuItem).unwrap(),
            serde_json::json!("menu_item")
        );
        assert_eq!(
            serde_json::to_value(OrderItemType::Product).unwrap(),
            serde_json::json!("product")
        );
    }

    #[test]
    fn pruned_order_item_has_no_empty_keys() {
        let item = OrderItem {
            category: "General".into(),
            chef_id: None,
            cuisine: None,
            customizations: Vec::new(),
            links: Some(OrderItemLinks {
                product_id: Some("p1".into()),
                warehouse_id: Some("w1".into()),
                ..OrderItemLinks::default()
            }),
            name: "Olive Oil 500ml".into(),
            prep_time: None,
            quantity: 2,
            status: "pending".into(),
            total_price: dec!(18.50),
            item_type: OrderItemType::Product,
            unit_price: dec!(9.25),
            customer_id: "u1".into(),
            user_rating: None,
            is_rated: None,
        };

        let value = serde_json::to_value(&item).unwrap();
        assert!(value.get("chefId").is_none());
        assert!(value.get("cuisine").is_none());
        assert!(value.get("prepTime").is_none());
        assert!(value.get("customizations").is_none());
        assert_eq!(value["type"], "product");
        assert_eq!(value["links"]["productId"], "p1");
        assert!(value["links"].get("menuItemId").is_none());
    }

    #[test]
    fn links_emptiness_check() {
        assert!(OrderItemLinks::default().is_empty());
        assert!(!OrderItemLinks {
            service_id: Some("svc".into()),
            ..OrderItemLinks::default()
        }
        .is_empty());
    }

    #[test]
    fn geo_point_defaults_to_origin() {
        let point = GeoPoint::default();
        assert_eq!(point.latitude, 0.0);
        assert_eq!(point.longitude, 0.0);
    }
}
