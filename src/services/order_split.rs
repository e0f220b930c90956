use chrono::{DateTime, Utc};
use rand::Rng;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use validator::Validate;

use super::{
    cart::CartService,
    coupon_usage::{CouponUsageService, UsageOutcome},
};
use crate::{
    errors::ServiceError,
    events::{Event, EventSender},
    models::{
        CouponRef, DeliveryAddress, GeoPoint, Order, OrderItem, OrderItemLinks, OrderItemType,
        PaymentRecord, StatusHistoryRecord,
    },
    store::{self, paths, DocumentId, DocumentStore},
};

const DEFAULT_ORDER_STATUS: &str = "pending";
const DEFAULT_PAYMENT_METHOD: &str = "UPI";
const DEFAULT_PAYMENT_STATUS: &str = "pending";
const DEFAULT_ITEM_CATEGORY: &str = "General";

/// Order split writer.
///
/// Decomposes one flat order submission into the header document plus its
/// dependent subcollections: N order items, one payment record, one
/// status-history record, M coupon-usage records, and the deactivation of the
/// source cart. Writes are issued strictly in that order and each is awaited
/// before the next begins; there is no atomic transaction wrapping the
/// sequence, so a store failure mid-way leaves a partially-written order for
/// the caller to surface.
#[derive(Clone)]
pub struct OrderSplitService {
    store: Arc<dyn DocumentStore>,
    event_sender: Arc<EventSender>,
    coupon_usage: Arc<CouponUsageService>,
    carts: Arc<CartService>,
}

impl OrderSplitService {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        event_sender: Arc<EventSender>,
        coupon_usage: Arc<CouponUsageService>,
        carts: Arc<CartService>,
    ) -> Self {
        Self {
            store,
            event_sender,
            coupon_usage,
            carts,
        }
    }

    /// Fans an order submission out into its stored documents.
    ///
    /// Coupon-usage bookkeeping is best-effort per coupon: a coupon that
    /// cannot be recorded is reported in the returned
    /// [`OrderSplitOutcome::coupon_failures`] and does not abort the order.
    /// Header/item/payment/history write failures do abort, with no
    /// compensating rollback.
    #[instrument(skip(self, submission), fields(user_id = %submission.user_id))]
    pub async fn split_and_store_order(
        &self,
        submission: OrderSubmission,
    ) -> Result<OrderSplitOutcome, ServiceError> {
        submission.validate()?;

        let order_id = generate_order_id();

        // The id scheme is collision-avoiding, not collision-free. Refuse to
        // overwrite an existing order rather than silently clobbering it.
        if self.store.get(&paths::orders(), &order_id).await?.is_some() {
            return Err(ServiceError::Conflict(format!(
                "Order id {} already exists",
                order_id
            )));
        }

        let header = build_order_header(&order_id, &submission, Utc::now());
        self.create_main_order(&header).await?;

        let coupon_failures = self.track_coupon_usage(&header).await;

        let items_written = self
            .create_order_items(&order_id, &submission.items, &header.customer_id)
            .await?;
        self.create_payment_record(&header).await?;
        self.create_status_history(&header).await?;

        let deactivated_cart_id = self.carts.deactivate_active_cart(&header.user_id).await?;

        self.event_sender
            .send_or_log(Event::OrderCreated(order_id.clone()))
            .await;

        info!(
            order_id = %order_id,
            items = items_written,
            coupons = header.applied_coupons.len(),
            coupon_failures = coupon_failures.len(),
            "Order split complete"
        );

        Ok(OrderSplitOutcome {
            order_id,
            items_written,
            deactivated_cart_id,
            coupon_failures,
        })
    }

    /// Writes the order header, keyed by the generated order id.
    async fn create_main_order(&self, header: &Order) -> Result<(), ServiceError> {
        self.store
            .set(
                &paths::orders(),
                DocumentId::Assigned(header.order_id.clone()),
                store::to_document(header)?,
            )
            .await?;
        info!(order_id = %header.order_id, "Created order header");
        Ok(())
    }

    /// Records usage for each applied coupon. Failures and skips are
    /// collected, never propagated.
    async fn track_coupon_usage(&self, header: &Order) -> Vec<CouponUsageFailure> {
        let mut failures = Vec::new();

        for coupon in &header.applied_coupons {
            let coupon_id = coupon.resolve_coupon_id();
            let discount = coupon.resolve_discount(header.discount);

            match self
                .coupon_usage
                .add_coupon_usage(&header.user_id, &coupon_id, &header.order_id, discount)
                .await
            {
                Ok(UsageOutcome::Recorded { .. }) => {}
                Ok(UsageOutcome::Skipped { reason }) => {
                    failures.push(CouponUsageFailure { coupon_id, reason });
                }
                Err(e) => {
                    warn!(
                        order_id = %header.order_id,
                        coupon_id = %coupon_id,
                        error = %e,
                        "Coupon usage tracking failed"
                    );
                    failures.push(CouponUsageFailure {
                        coupon_id,
                        reason: e.to_string(),
                    });
                }
            }
        }

        failures
    }

    /// Writes one order-item document per cart line.
    async fn create_order_items(
        &self,
        order_id: &str,
        lines: &[OrderLineInput],
        customer_id: &str,
    ) -> Result<usize, ServiceError> {
        let items_path = paths::order_items(order_id);

        for line in lines {
            let item = build_order_item(line, customer_id);
            self.store
                .set(&items_path, DocumentId::Auto, store::to_document(&item)?)
                .await?;
        }

        info!(order_id = %order_id, count = lines.len(), "Created order items");
        Ok(lines.len())
    }

    /// Writes the initial payment record for the order.
    async fn create_payment_record(&self, header: &Order) -> Result<(), ServiceError> {
        let payment = PaymentRecord {
            amount: header.final_amount,
            method: header.payment_method.clone(),
            provider: payment_provider(&header.payment_method).to_string(),
            status: DEFAULT_PAYMENT_STATUS.to_string(),
            timestamp: header.created_at,
            transaction_id: None,
            gateway_transaction_id: None,
            refund_transaction_id: None,
            failure_reason: None,
            customer_id: header.customer_id.clone(),
        };

        self.store
            .set(
                &paths::order_payments(&header.order_id),
                DocumentId::Auto,
                store::to_document(&payment)?,
            )
            .await?;
        Ok(())
    }

    /// Writes the first entry of the order's append-only status log.
    async fn create_status_history(&self, header: &Order) -> Result<(), ServiceError> {
        let record = StatusHistoryRecord {
            status: header.status.clone(),
            timestamp: header.created_at,
            notes: format!("Order created with status: {}", header.status),
            customer_id: header.customer_id.clone(),
        };

        self.store
            .set(
                &paths::order_status_history(&header.order_id),
                DocumentId::Auto,
                store::to_document(&record)?,
            )
            .await?;
        Ok(())
    }
}

/// Generates an order id of the form `ORD_<6 timestamp digits><3 random digits>`.
///
/// Heuristic collision avoidance only; the split writer still checks for an
/// existing document before writing.
pub fn generate_order_id() -> String {
    let millis = Utc::now().timestamp_millis();
    let timestamp_part = (millis % 1_000_000) as u32;
    let random: u32 = rand::thread_rng().gen_range(0..1_000_000_000);
    let padded = format!("{random:09}");
    format!("ORD_{timestamp_part:06}{}", &padded[6..])
}

/// Maps a payment method onto the gateway provider recorded with the payment.
fn payment_provider(method: &str) -> &'static str {
    match method {
        "Cash on Delivery" => "Cash",
        "UPI" => "PhonePe",
        _ => "UPI",
    }
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value.filter(|s| !s.is_empty()).map(str::to_string)
}

/// Builds the normalized header document from the flat submission.
fn build_order_header(order_id: &str, submission: &OrderSubmission, now: DateTime<Utc>) -> Order {
    let customer_id = non_empty(submission.customer_id.as_deref())
        .unwrap_or_else(|| submission.user_id.clone());

    Order {
        order_id: order_id.to_string(),
        user_id: submission.user_id.clone(),
        customer_id,
        restaurant_id: non_empty(submission.restaurant_id.as_deref()),
        delivery_address: normalize_address(submission.delivery_address.as_ref()),
        delivery_charges: submission.delivery_charges.unwrap_or(Decimal::ZERO),
        discount: submission.discount.unwrap_or(Decimal::ZERO),
        taxes: submission.taxes.unwrap_or(Decimal::ZERO),
        total_amount: submission.total_amount.unwrap_or(Decimal::ZERO),
        final_amount: submission.final_amount.unwrap_or(Decimal::ZERO),
        payment_method: non_empty(submission.payment_method.as_deref())
            .unwrap_or_else(|| DEFAULT_PAYMENT_METHOD.to_string()),
        payment_status: non_empty(submission.payment_status.as_deref())
            .unwrap_or_else(|| DEFAULT_PAYMENT_STATUS.to_string()),
        status: non_empty(submission.status.as_deref())
            .unwrap_or_else(|| DEFAULT_ORDER_STATUS.to_string()),
        applied_coupons: submission.applied_coupons.clone(),
        created_at: now,
        updated_at: now,
        scheduled_for: submission.scheduled_for,
        estimated_delivery_time: submission.estimated_delivery_time,
        actual_delivery_time: None,
        instructions: non_empty(submission.instructions.as_deref()),
        cancellation_reason: None,
        delivery_partner_id: None,
        refund_amount: None,
    }
}

/// Normalizes the caller-supplied address into the fixed header shape,
/// converting coordinates into the store's geo-point type and defaulting to
/// the origin when absent.
fn normalize_address(input: Option<&DeliveryAddressInput>) -> DeliveryAddress {
    let Some(input) = input else {
        return DeliveryAddress::default();
    };

    DeliveryAddress {
        address_id: input.address_id.clone().unwrap_or_default(),
        contact_name: input.contact_name.clone().unwrap_or_default(),
        contact_phone: input.contact_phone.clone().unwrap_or_default(),
        line1: input.line1.clone().unwrap_or_default(),
        line2: input.line2.clone().unwrap_or_default(),
        city: input.city.clone().unwrap_or_default(),
        pincode: input.pincode.clone().unwrap_or_default(),
        geo_point: input
            .coordinates
            .map(|c| GeoPoint {
                latitude: c.latitude,
                longitude: c.longitude,
            })
            .unwrap_or_default(),
        save_for_future: input.save_for_future,
    }
}

/// Builds one stored order item from a cart line.
///
/// A line with a non-empty `restaurantId` is a menu item; everything else is
/// a warehouse product. Only the fields relevant to the classification are
/// populated, empty values are pruned, and the `links` object is dropped when
/// all of its fields are empty.
fn build_order_item(line: &OrderLineInput, customer_id: &str) -> OrderItem {
    let is_menu_item = line
        .restaurant_id
        .as_deref()
        .is_some_and(|s| !s.is_empty());

    let category = match line.category.as_deref() {
        Some(c) if !c.is_empty() && c != "Main" => c.to_string(),
        _ => DEFAULT_ITEM_CATEGORY.to_string(),
    };

    let links = if is_menu_item {
        OrderItemLinks {
            menu_item_id: non_empty(line.menu_item_id.as_deref()),
            restaurant_id: non_empty(line.restaurant_id.as_deref()),
            service_id: non_empty(line.service_id.as_deref()),
            ..OrderItemLinks::default()
        }
    } else {
        OrderItemLinks {
            product_id: non_empty(line.product_id.as_deref()),
            warehouse_id: non_empty(line.warehouse_id.as_deref()),
            service_id: non_empty(line.service_id.as_deref()),
            ..OrderItemLinks::default()
        }
    };

    OrderItem {
        category,
        chef_id: is_menu_item
            .then(|| non_empty(line.chef_id.as_deref()))
            .flatten(),
        cuisine: is_menu_item
            .then(|| non_empty(line.cuisine.as_deref()))
            .flatten(),
        customizations: line.customizations.clone(),
        links: (!links.is_empty()).then_some(links),
        name: line.name.clone(),
        prep_time: if is_menu_item { line.prep_time } else { None },
        quantity: line.quantity,
        status: DEFAULT_ORDER_STATUS.to_string(),
        total_price: line.price * Decimal::from(line.quantity),
        item_type: if is_menu_item {
            OrderItemType::MenuItem
        } else {
            OrderItemType::Product
        },
        unit_price: line.price,
        customer_id: customer_id.to_string(),
        user_rating: None,
        is_rated: None,
    }
}

/// Flat order submission handed over at checkout: cart snapshot plus
/// delivery, payment and pricing fields.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct OrderSubmission {
    #[validate(length(min = 1, message = "User id is required"))]
    pub user_id: String,
    pub customer_id: Option<String>,
    pub restaurant_id: Option<String>,
    pub delivery_address: Option<DeliveryAddressInput>,
    pub delivery_charges: Option<Decimal>,
    pub discount: Option<Decimal>,
    pub taxes: Option<Decimal>,
    pub total_amount: Option<Decimal>,
    pub final_amount: Option<Decimal>,
    pub payment_method: Option<String>,
    pub payment_status: Option<String>,
    pub status: Option<String>,
    #[serde(default)]
    pub applied_coupons: Vec<CouponRef>,
    #[serde(default)]
    pub items: Vec<OrderLineInput>,
    pub scheduled_for: Option<DateTime<Utc>>,
    pub estimated_delivery_time: Option<DateTime<Utc>>,
    pub instructions: Option<String>,
}

/// One cart line inside an order submission.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OrderLineInput {
    pub name: String,
    pub price: Decimal,
    pub quantity: i32,
    pub category: Option<String>,
    #[serde(default)]
    pub customizations: Vec<String>,
    pub menu_item_id: Option<String>,
    pub product_id: Option<String>,
    pub restaurant_id: Option<String>,
    pub warehouse_id: Option<String>,
    pub service_id: Option<String>,
    pub chef_id: Option<String>,
    pub cuisine: Option<String>,
    pub prep_time: Option<i32>,
}

/// Caller-supplied address, possibly partial.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DeliveryAddressInput {
    pub address_id: Option<String>,
    pub contact_name: Option<String>,
    pub contact_phone: Option<String>,
    pub line1: Option<String>,
    pub line2: Option<String>,
    pub city: Option<String>,
    pub pincode: Option<String>,
    pub coordinates: Option<GeoCoordinates>,
    #[serde(default)]
    pub save_for_future: bool,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct GeoCoordinates {
    pub latitude: f64,
    pub longitude: f64,
}

/// Result of one order split: what was written, and which coupons could not
/// be recorded (the degraded path is explicit, not just logged).
#[derive(Debug)]
pub struct OrderSplitOutcome {
    pub order_id: String,
    pub items_written: usize,
    pub deactivated_cart_id: Option<String>,
    pub coupon_failures: Vec<CouponUsageFailure>,
}

#[derive(Debug, Clone)]
pub struct CouponUsageFailure {
    pub coupon_id: String,
    pub reason: String,
}
