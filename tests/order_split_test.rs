mod common;

use common::TestApp;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::Value;
use storefront_core::{
    errors::ServiceError,
    models::{CartStatus, CouponRef, CouponUsage, Order, OrderItem, PaymentRecord,
        StatusHistoryRecord},
    services::{
        AddCartItemInput, CreateCartInput, DeliveryAddressInput, GeoCoordinates, OrderLineInput,
        OrderSubmission,
    },
    store::{self, paths},
};

fn assert_order_id_format(order_id: &str) {
    assert!(order_id.starts_with("ORD_"), "bad prefix: {order_id}");
    assert_eq!(order_id.len(), 13, "bad length: {order_id}");
    assert!(
        order_id[4..].chars().all(|c| c.is_ascii_digit()),
        "non-digit tail: {order_id}"
    );
}

fn menu_line(menu_item_id: &str, name: &str, price: Decimal, quantity: i32) -> OrderLineInput {
    OrderLineInput {
        name: name.to_string(),
        price,
        quantity,
        category: Some("Starters".to_string()),
        menu_item_id: Some(menu_item_id.to_string()),
        restaurant_id: Some("r1".to_string()),
        service_id: Some("svc1".to_string()),
        chef_id: Some("chef1".to_string()),
        cuisine: Some("South Indian".to_string()),
        prep_time: Some(15),
        ..OrderLineInput::default()
    }
}

fn product_line(product_id: &str, name: &str, price: Decimal, quantity: i32) -> OrderLineInput {
    OrderLineInput {
        name: name.to_string(),
        price,
        quantity,
        product_id: Some(product_id.to_string()),
        warehouse_id: Some("w1".to_string()),
        service_id: Some("svc1".to_string()),
        ..OrderLineInput::default()
    }
}

fn submission(user_id: &str) -> OrderSubmission {
    let mut coupon = CouponRef::from_code("SAVE50");
    coupon.discount_amount = Some(50.0);

    OrderSubmission {
        user_id: user_id.to_string(),
        restaurant_id: Some("r1".to_string()),
        delivery_address: Some(DeliveryAddressInput {
            address_id: Some("addr1".to_string()),
            contact_name: Some("Asha".to_string()),
            contact_phone: Some("9999999999".to_string()),
            line1: Some("12 MG Road".to_string()),
            city: Some("Bengaluru".to_string()),
            pincode: Some("560001".to_string()),
            coordinates: Some(GeoCoordinates {
                latitude: 12.9716,
                longitude: 77.5946,
            }),
            save_for_future: true,
            ..DeliveryAddressInput::default()
        }),
        delivery_charges: Some(dec!(40.00)),
        discount: Some(dec!(50.00)),
        taxes: Some(dec!(25.00)),
        total_amount: Some(dec!(500.00)),
        final_amount: Some(dec!(515.00)),
        payment_method: Some("UPI".to_string()),
        applied_coupons: vec![coupon],
        items: vec![
            menu_line("m1", "Paneer Tikka", dec!(180.00), 1),
            menu_line("m2", "Masala Dosa", dec!(80.00), 2),
            product_line("p1", "Olive Oil 500ml", dec!(160.00), 1),
        ],
        ..OrderSubmission::default()
    }
}

/// Seeds an active cart for the user so the split can consume it.
async fn seed_active_cart(app: &TestApp, user_id: &str) -> String {
    let carts = app.state.services.carts.clone();
    let cart_id = carts
        .create_cart(CreateCartInput {
            user_id: user_id.to_string(),
            delivery_type: Some("delivery".to_string()),
            restaurant_id: Some("r1".to_string()),
            service_id: None,
            warehouse_id: None,
        })
        .await
        .unwrap();
    carts
        .add_item_to_cart(
            user_id,
            &cart_id,
            AddCartItemInput {
                product_id: "p1".to_string(),
                menu_item_id: None,
                name: "Olive Oil 500ml".to_string(),
                price: dec!(160.00),
                customizations: Vec::new(),
                notes: None,
            },
        )
        .await
        .unwrap();
    cart_id
}

#[tokio::test]
async fn split_fans_out_into_all_dependent_documents() {
    let app = TestApp::new().await;
    let orders = app.state.services.orders.clone();
    let store = app.store();
    let cart_id = seed_active_cart(&app, "u1").await;

    let outcome = orders
        .split_and_store_order(submission("u1"))
        .await
        .unwrap();

    assert_order_id_format(&outcome.order_id);
    assert_eq!(outcome.items_written, 3);
    assert_eq!(outcome.deactivated_cart_id.as_deref(), Some(cart_id.as_str()));
    assert!(outcome.coupon_failures.is_empty());

    // Header document keyed by the generated id.
    let header: Order = store::from_document(
        store
            .get(&paths::orders(), &outcome.order_id)
            .await
            .unwrap()
            .expect("order header written"),
    )
    .unwrap();
    assert_eq!(header.order_id, outcome.order_id);
    assert_eq!(header.user_id, "u1");
    assert_eq!(header.customer_id, "u1");
    assert_eq!(header.status, "pending");
    assert_eq!(header.final_amount, dec!(515.00));
    assert_eq!(header.delivery_address.city, "Bengaluru");
    assert_eq!(header.delivery_address.geo_point.latitude, 12.9716);

    // Exactly three order items: two menu items, one product.
    let item_docs = store
        .query(&paths::order_items(&outcome.order_id), &[], None)
        .await
        .unwrap();
    assert_eq!(item_docs.len(), 3);

    let items: Vec<OrderItem> = item_docs
        .iter()
        .map(|(_, doc)| store::from_document(doc.clone()).unwrap())
        .collect();

    let menu_items: Vec<&OrderItem> = items
        .iter()
        .filter(|i| matches!(i.item_type, storefront_core::models::OrderItemType::MenuItem))
        .collect();
    let products: Vec<&OrderItem> = items
        .iter()
        .filter(|i| matches!(i.item_type, storefront_core::models::OrderItemType::Product))
        .collect();
    assert_eq!(menu_items.len(), 2);
    assert_eq!(products.len(), 1);

    for item in &menu_items {
        assert_eq!(item.chef_id.as_deref(), Some("chef1"));
        assert_eq!(item.cuisine.as_deref(), Some("South Indian"));
        let links = item.links.as_ref().expect("menu item links");
        assert_eq!(links.restaurant_id.as_deref(), Some("r1"));
        assert!(links.warehouse_id.is_none());
    }

    let product = products[0];
    assert_eq!(product.total_price, dec!(160.00));
    let links = product.links.as_ref().expect("product links");
    assert_eq!(links.warehouse_id.as_deref(), Some("w1"));
    assert_eq!(links.product_id.as_deref(), Some("p1"));

    // Pruning is about absent keys, not empty values: check the raw document.
    let (_, raw_product) = item_docs
        .iter()
        .find(|(_, doc)| doc.get("type") == Some(&Value::from("product")))
        .unwrap();
    assert!(raw_product.get("chefId").is_none());
    assert!(raw_product.get("cuisine").is_none());
    assert!(raw_product.get("prepTime").is_none());

    // One payment record with the provider derived from the method.
    let payment_docs = store
        .query(&paths::order_payments(&outcome.order_id), &[], None)
        .await
        .unwrap();
    assert_eq!(payment_docs.len(), 1);
    let payment: PaymentRecord = store::from_document(payment_docs[0].1.clone()).unwrap();
    assert_eq!(payment.method, "UPI");
    assert_eq!(payment.provider, "PhonePe");
    assert_eq!(payment.amount, dec!(515.00));
    assert_eq!(payment.status, "pending");

    // One status-history record reflecting the initial status.
    let history_docs = store
        .query(&paths::order_status_history(&outcome.order_id), &[], None)
        .await
        .unwrap();
    assert_eq!(history_docs.len(), 1);
    let history: StatusHistoryRecord = store::from_document(history_docs[0].1.clone()).unwrap();
    assert_eq!(history.status, "pending");
    assert_eq!(history.notes, "Order created with status: pending");

    // One coupon-usage record under the user.
    let usage_docs = store
        .query(&paths::coupon_usage("u1"), &[], None)
        .await
        .unwrap();
    assert_eq!(usage_docs.len(), 1);
    let usage: CouponUsage = store::from_document(usage_docs[0].1.clone()).unwrap();
    assert_eq!(usage.coupon_id, "SAVE50");
    assert_eq!(usage.order_id, outcome.order_id);
    assert_eq!(usage.discount_amount, dec!(50));
    assert_eq!(usage.status, "used");

    // The source cart is consumed.
    let cart = app
        .state
        .services
        .carts
        .get_cart("u1", &cart_id)
        .await
        .unwrap();
    assert_eq!(cart.cart.status, CartStatus::Inactive);
    assert!(cart.cart.used_for_order);
}

#[tokio::test]
async fn cash_on_delivery_maps_to_cash_provider() {
    let app = TestApp::new().await;
    let orders = app.state.services.orders.clone();

    let mut sub = submission("u2");
    sub.payment_method = Some("Cash on Delivery".to_string());
    let outcome = orders.split_and_store_order(sub).await.unwrap();

    let payment_docs = app
        .store()
        .query(&paths::order_payments(&outcome.order_id), &[], None)
        .await
        .unwrap();
    let payment: PaymentRecord = store::from_document(payment_docs[0].1.clone()).unwrap();
    assert_eq!(payment.provider, "Cash");
}

#[tokio::test]
async fn missing_payment_method_defaults_to_upi() {
    let app = TestApp::new().await;
    let orders = app.state.services.orders.clone();

    let mut sub = submission("u3");
    sub.payment_method = None;
    let outcome = orders.split_and_store_order(sub).await.unwrap();

    let header: Order = store::from_document(
        app.store()
            .get(&paths::orders(), &outcome.order_id)
            .await
            .unwrap()
            .unwrap(),
    )
    .unwrap();
    assert_eq!(header.payment_method, "UPI");
}

#[tokio::test]
async fn unresolvable_coupon_is_skipped_but_order_succeeds() {
    let app = TestApp::new().await;
    let orders = app.state.services.orders.clone();

    let mut sub = submission("u4");
    sub.applied_coupons = vec![CouponRef::default()];
    let outcome = orders.split_and_store_order(sub).await.unwrap();

    assert_eq!(outcome.coupon_failures.len(), 1);
    assert_eq!(outcome.coupon_failures[0].coupon_id, "unknown");

    let usage_docs = app
        .store()
        .query(&paths::coupon_usage("u4"), &[], None)
        .await
        .unwrap();
    assert!(usage_docs.is_empty(), "skip must not write");

    // The order itself is still fully created.
    assert!(app
        .store()
        .get(&paths::orders(), &outcome.order_id)
        .await
        .unwrap()
        .is_some());
}

#[tokio::test]
async fn nan_discount_coupon_is_skipped() {
    let app = TestApp::new().await;
    let orders = app.state.services.orders.clone();

    let mut coupon = CouponRef::from_code("BROKEN");
    coupon.discount_amount = Some(f64::NAN);
    let mut sub = submission("u5");
    sub.applied_coupons = vec![coupon];

    let outcome = orders.split_and_store_order(sub).await.unwrap();
    assert_eq!(outcome.coupon_failures.len(), 1);
    assert_eq!(outcome.coupon_failures[0].coupon_id, "BROKEN");

    let usage_docs = app
        .store()
        .query(&paths::coupon_usage("u5"), &[], None)
        .await
        .unwrap();
    assert!(usage_docs.is_empty());
}

#[tokio::test]
async fn coupon_discount_falls_back_to_header_discount() {
    let app = TestApp::new().await;
    let orders = app.state.services.orders.clone();

    // No per-coupon discount anywhere: the header discount applies.
    let mut sub = submission("u6");
    sub.applied_coupons = vec![CouponRef::from_code("HEADERFALL")];
    sub.discount = Some(dec!(35.00));

    let outcome = orders.split_and_store_order(sub).await.unwrap();
    assert!(outcome.coupon_failures.is_empty());

    let usage_docs = app
        .store()
        .query(&paths::coupon_usage("u6"), &[], None)
        .await
        .unwrap();
    let usage: CouponUsage = store::from_document(usage_docs[0].1.clone()).unwrap();
    assert_eq!(usage.discount_amount, dec!(35));
}

#[tokio::test]
async fn split_without_active_cart_still_creates_the_order() {
    let app = TestApp::new().await;
    let orders = app.state.services.orders.clone();

    let outcome = orders
        .split_and_store_order(submission("u7"))
        .await
        .unwrap();

    assert!(outcome.deactivated_cart_id.is_none());
    assert!(app
        .store()
        .get(&paths::orders(), &outcome.order_id)
        .await
        .unwrap()
        .is_some());
}

#[tokio::test]
async fn submission_without_user_id_is_rejected() {
    let app = TestApp::new().await;
    let orders = app.state.services.orders.clone();

    let err = orders
        .split_and_store_order(OrderSubmission::default())
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::ValidationError(_)));
}
