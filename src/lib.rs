//! Storefront Core Library
//!
//! Backend core for a mobile storefront (food/grocery ordering): cart
//! aggregate management, order decomposition into header + dependent
//! subcollections, coupon usage tracking, and a transactional rating
//! aggregator. All persistence goes through the [`store::DocumentStore`]
//! gateway; the production document backend lives outside this crate.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

// Core modules
pub mod config;
pub mod errors;
pub mod events;
pub mod logging;
pub mod models;
pub mod services;
pub mod store;

use std::sync::Arc;

use events::EventSender;
use services::{CartService, CouponUsageService, OrderSplitService, RatingService};
use store::DocumentStore;

/// Constructed service set sharing one store handle and event sender.
#[derive(Clone)]
pub struct AppServices {
    pub carts: Arc<CartService>,
    pub orders: Arc<OrderSplitService>,
    pub coupon_usage: Arc<CouponUsageService>,
    pub ratings: Arc<RatingService>,
}

impl AppServices {
    pub fn new(store: Arc<dyn DocumentStore>, event_sender: Arc<EventSender>) -> Self {
        let carts = Arc::new(CartService::new(store.clone(), event_sender.clone()));
        let coupon_usage = Arc::new(CouponUsageService::new(
            store.clone(),
            event_sender.clone(),
        ));
        let orders = Arc::new(OrderSplitService::new(
            store.clone(),
            event_sender.clone(),
            coupon_usage.clone(),
            carts.clone(),
        ));
        let ratings = Arc::new(RatingService::new(store, event_sender));

        Self {
            carts,
            orders,
            coupon_usage,
            ratings,
        }
    }
}

/// Application state bundling the store handle, configuration, event sender
/// and services.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn DocumentStore>,
    pub config: config::AppConfig,
    pub event_sender: EventSender,
    pub services: AppServices,
}

impl AppState {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        config: config::AppConfig,
        event_sender: EventSender,
    ) -> Self {
        let services = AppServices::new(store.clone(), Arc::new(event_sender.clone()));
        Self {
            store,
            config,
            event_sender,
            services,
        }
    }
}
