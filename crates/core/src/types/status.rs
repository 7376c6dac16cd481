//! Purchase lifecycle status.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Purchase status.
///
/// Purchases created through the checkout workflow are recorded directly as
/// [`PurchaseStatus::Paid`]. The other states exist for administrative
/// corrections and for rows imported from elsewhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "purchase_status", rename_all = "SCREAMING_SNAKE_CASE")
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PurchaseStatus {
    #[default]
    Created,
    Paid,
    Cancelled,
}

impl PurchaseStatus {
    /// Wire and database representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Created => "CREATED",
            Self::Paid => "PAID",
            Self::Cancelled => "CANCELLED",
        }
    }

    /// Whether this purchase counts toward revenue and tickets sold.
    #[must_use]
    pub const fn is_settled(self) -> bool {
        matches!(self, Self::Paid)
    }
}

impl fmt::Display for PurchaseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for PurchaseStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CREATED" => Ok(Self::Created),
            "PAID" => Ok(Self::Paid),
            "CANCELLED" => Ok(Self::Cancelled),
            _ => Err(format!("unknown purchase status: {s}")),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_serde_uses_screaming_case() {
        assert_eq!(
            serde_json::to_string(&PurchaseStatus::Paid).unwrap(),
            "\"PAID\""
        );
        let parsed: PurchaseStatus = serde_json::from_str("\"CANCELLED\"").unwrap();
        assert_eq!(parsed, PurchaseStatus::Cancelled);
    }

    #[test]
    fn test_from_str() {
        assert_eq!("CREATED".parse::<PurchaseStatus>().unwrap(), PurchaseStatus::Created);
        assert!("paid".parse::<PurchaseStatus>().is_err());
    }

    #[test]
    fn test_only_paid_is_settled() {
        assert!(PurchaseStatus::Paid.is_settled());
        assert!(!PurchaseStatus::Created.is_settled());
        assert!(!PurchaseStatus::Cancelled.is_settled());
    }
}
