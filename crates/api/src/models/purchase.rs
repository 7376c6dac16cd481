//! Purchase types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use marquee_core::{CustomerId, Money, MovieId, PurchaseId, PurchaseStatus};

/// A ticket purchase.
///
/// `total_amount` is frozen at creation and stays authoritative even if the
/// movie's price changes later. Purchases are append-only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Purchase {
    pub id: PurchaseId,
    pub customer_id: CustomerId,
    pub movie_id: MovieId,
    pub quantity: i32,
    pub total_amount: Money,
    pub status: PurchaseStatus,
    pub payment_method: String,
    /// Display only, never a real card number.
    pub last4: Option<String>,
    pub payment_note: String,
    pub created_at: DateTime<Utc>,
}

/// Checkout input from a customer.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseRequest {
    pub movie_id: MovieId,
    pub quantity: i32,
    pub payment: PaymentInfo,
}

/// Simulated payment details. Any method, blank included, is accepted.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentInfo {
    pub method: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub last4: Option<String>,
}

impl PaymentInfo {
    /// Free-text note recorded with the purchase.
    #[must_use]
    pub fn note(&self) -> String {
        match self.name.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => format!("Payment by {name}"),
            _ => "Payment by customer".to_owned(),
        }
    }

    /// Trailing four characters of the submitted last-4 field.
    #[must_use]
    pub fn display_last4(&self) -> Option<String> {
        let digits = self.last4.as_deref()?.trim();
        if digits.is_empty() {
            return None;
        }
        let skip = digits.chars().count().saturating_sub(4);
        Some(digits.chars().skip(skip).collect())
    }
}

/// Administrator search over all purchases.
///
/// Every field is optional; present fields are combined with AND. The date
/// range is inclusive on both ends.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseFilter {
    pub customer_id: Option<CustomerId>,
    pub movie_id: Option<MovieId>,
    pub status: Option<PurchaseStatus>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
}

impl PurchaseFilter {
    /// Whether `purchase` satisfies every present filter.
    #[must_use]
    pub fn matches(&self, purchase: &Purchase) -> bool {
        self.customer_id.is_none_or(|id| purchase.customer_id == id)
            && self.movie_id.is_none_or(|id| purchase.movie_id == id)
            && self.status.is_none_or(|s| purchase.status == s)
            && self.start_date.is_none_or(|start| purchase.created_at >= start)
            && self.end_date.is_none_or(|end| purchase.created_at <= end)
    }
}

/// Revenue and ticket aggregates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseStats {
    /// Sum of totals over PAID purchases.
    pub total_revenue: Money,
    /// Sum of quantities over PAID purchases.
    pub total_tickets_sold: i64,
    /// Count of all purchases regardless of status.
    pub total_purchase_count: i64,
}
