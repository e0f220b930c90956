use chrono::{DateTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Loose coupon shape as supplied by callers.
///
/// Stored carts and order submissions carry coupon objects whose identifying
/// field varies (`id`, `couponId`, or `code`) and whose discount lives in
/// either `discountAmount` or `appliedDiscount`. The resolution fallback
/// chains run here, once, rather than ad hoc at every read site.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CouponRef {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coupon_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discount_amount: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub applied_discount: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discount_type: Option<String>,
}

/// Placeholder id when no identifying field is present; usage tracking skips
/// coupons that resolve to this.
pub const UNKNOWN_COUPON_ID: &str = "unknown";

impl CouponRef {
    pub fn from_code(code: impl Into<String>) -> Self {
        Self {
            code: Some(code.into()),
            ..Self::default()
        }
    }

    /// `id ?? couponId ?? code ?? "unknown"`. Empty strings count as absent.
    pub fn resolve_coupon_id(&self) -> String {
        fn present(value: Option<&str>) -> Option<&str> {
            value.filter(|s| !s.is_empty())
        }

        present(self.id.as_deref())
            .or_else(|| present(self.coupon_id.as_deref()))
            .or_else(|| present(self.code.as_deref()))
            .unwrap_or(UNKNOWN_COUPON_ID)
            .to_string()
    }

    /// `discountAmount ?? appliedDiscount ?? headerDiscount ?? 0`.
    pub fn resolve_discount(&self, header_discount: Decimal) -> f64 {
        self.discount_amount
            .or(self.applied_discount)
            .unwrap_or_else(|| header_discount.to_f64().unwrap_or(0.0))
    }
}

/// Audit-trail record: a specific coupon applied to a specific order by a
/// specific user. Written once, never updated; not used for enforcing
/// redemption limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CouponUsage {
    pub usage_id: String,
    pub user_id: String,
    pub coupon_id: String,
    pub order_id: String,
    pub discount_amount: Decimal,
    pub usage_date: DateTime<Utc>,
    pub status: String,
}
