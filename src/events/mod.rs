use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{info, warn};

/// Events published by the core services.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    // Cart events
    CartCreated(String),
    CartItemAdded {
        cart_id: String,
        product_id: String,
    },
    CartItemUpdated {
        cart_id: String,
        item_id: String,
    },
    CartItemRemoved {
        cart_id: String,
        item_id: String,
    },
    CartCleared(String),
    CartDeactivated(String),
    CouponApplied {
        cart_id: String,
        coupon_id: String,
    },
    CouponRemoved {
        cart_id: String,
    },

    // Order events
    OrderCreated(String),
    CouponUsageRecorded {
        user_id: String,
        coupon_id: String,
        order_id: String,
    },

    // Rating events
    MenuItemRated {
        restaurant_id: String,
        menu_item_id: String,
        rating: f64,
    },
}

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Sends an event asynchronously.
    pub async fn send(&self, event: Event) -> Result<(), String> {
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("Failed to send event: {}", e))
    }

    /// Sends an event, downgrading a delivery failure to a warning. Event
    /// publication is never allowed to fail a service operation.
    pub async fn send_or_log(&self, event: Event) {
        if let Err(e) = self.send(event).await {
            warn!(error = %e, "Failed to publish event");
        }
    }
}

/// Drains the event channel and logs each event. Downstream consumers
/// (notifications, analytics) hook in here; the core only guarantees
/// publication order matches write order within one service call.
pub async fn process_events(mut rx: mpsc::Receiver<Event>) {
    info!("Starting event processing loop");

    while let Some(event) = rx.recv().await {
        match &event {
            Event::OrderCreated(order_id) => {
                info!(order_id = %order_id, "Order created");
            }
            Event::CouponUsageRecorded {
                user_id,
                coupon_id,
                order_id,
            } => {
                info!(user_id = %user_id, coupon_id = %coupon_id, order_id = %order_id, "Coupon usage recorded");
            }
            Event::MenuItemRated {
                restaurant_id,
                menu_item_id,
                rating,
            } => {
                info!(restaurant_id = %restaurant_id, menu_item_id = %menu_item_id, rating = %rating, "Menu item rated");
            }
            other => {
                info!(event = ?other, "Event received");
            }
        }
    }

    info!("Event processing loop stopped");
}
