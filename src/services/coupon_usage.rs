use chrono::Utc;
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::{
    errors::ServiceError,
    events::{Event, EventSender},
    models::{coupon::UNKNOWN_COUPON_ID, CouponUsage},
    store::{self, paths, DocumentId, DocumentStore},
};

/// Result of a single usage-recording attempt. Invalid input is a skip, not
/// an error; callers that want to react to skips can, and callers that do
/// not can ignore them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UsageOutcome {
    Recorded { usage_id: String },
    Skipped { reason: String },
}

/// Appends one audit record per coupon applied to an order, under the user's
/// `coupon_usage` subcollection.
#[derive(Clone)]
pub struct CouponUsageService {
    store: Arc<dyn DocumentStore>,
    event_sender: Arc<EventSender>,
}

impl CouponUsageService {
    pub fn new(store: Arc<dyn DocumentStore>, event_sender: Arc<EventSender>) -> Self {
        Self {
            store,
            event_sender,
        }
    }

    /// Records that `coupon_id` was applied to `order_id` by `user_id`.
    ///
    /// Input validation failures (missing ids, unresolved coupon, non-finite
    /// discount) log a warning and perform zero writes. There is no duplicate
    /// detection: calling twice with identical arguments creates two records.
    /// Store failures do propagate; the order split writer treats them as
    /// per-coupon best-effort.
    #[instrument(skip(self))]
    pub async fn add_coupon_usage(
        &self,
        user_id: &str,
        coupon_id: &str,
        order_id: &str,
        discount_amount: f64,
    ) -> Result<UsageOutcome, ServiceError> {
        if let Some(reason) = validate_usage(user_id, coupon_id, order_id, discount_amount) {
            warn!(
                user_id = %user_id,
                coupon_id = %coupon_id,
                order_id = %order_id,
                reason = %reason,
                "Skipping coupon usage record"
            );
            return Ok(UsageOutcome::Skipped { reason });
        }

        let usage_id = Uuid::new_v4().to_string();
        let usage = CouponUsage {
            usage_id: usage_id.clone(),
            user_id: user_id.to_string(),
            coupon_id: coupon_id.to_string(),
            order_id: order_id.to_string(),
            discount_amount: Decimal::from_f64_retain(discount_amount).unwrap_or(Decimal::ZERO),
            usage_date: Utc::now(),
            status: "used".to_string(),
        };

        self.store
            .set(
                &paths::coupon_usage(user_id),
                DocumentId::Assigned(usage_id.clone()),
                store::to_document(&usage)?,
            )
            .await?;

        self.event_sender
            .send_or_log(Event::CouponUsageRecorded {
                user_id: user_id.to_string(),
                coupon_id: coupon_id.to_string(),
                order_id: order_id.to_string(),
            })
            .await;

        info!(usage_id = %usage_id, coupon_id = %coupon_id, "Recorded coupon usage");
        Ok(UsageOutcome::Recorded { usage_id })
    }
}

fn validate_usage(
    user_id: &str,
    coupon_id: &str,
    order_id: &str,
    discount_amount: f64,
) -> Option<String> {
    if user_id.is_empty() {
        return Some("missing user id".to_string());
    }
    if coupon_id.is_empty() || coupon_id == UNKNOWN_COUPON_ID {
        return Some("unresolved coupon id".to_string());
    }
    if order_id.is_empty() {
        return Some("missing order id".to_string());
    }
    if !discount_amount.is_finite() {
        return Some("discount amount is not a finite number".to_string());
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_catches_each_missing_field() {
        assert_eq!(
            validate_usage("", "c", "o", 1.0).as_deref(),
            Some("missing user id")
        );
        assert_eq!(
            validate_usage("u", "", "o", 1.0).as_deref(),
            Some("unresolved coupon id")
        );
        assert_eq!(
            validate_usage("u", "unknown", "o", 1.0).as_deref(),
            Some("unresolved coupon id")
        );
        assert_eq!(
            validate_usage("u", "c", "", 1.0).as_deref(),
            Some("missing order id")
        );
        assert_eq!(
            validate_usage("u", "c", "o", f64::NAN).as_deref(),
            Some("discount amount is not a finite number")
        );
        assert_eq!(
            validate_usage("u", "c", "o", f64::INFINITY).as_deref(),
            Some("discount amount is not a finite number")
        );
        assert!(validate_usage("u", "c", "o", 0.0).is_none());
    }
}
