//! Revenue and ticket statistics.

use tracing::debug;

use crate::db::{PurchaseStore, RepositoryError};
use crate::models::PurchaseStats;

/// Aggregates over the purchase table, recomputed on every call.
pub struct StatsService<'a, P> {
    purchases: &'a P,
}

impl<'a, P: PurchaseStore> StatsService<'a, P> {
    #[must_use]
    pub const fn new(purchases: &'a P) -> Self {
        Self { purchases }
    }

    /// Current revenue, tickets sold and purchase count.
    ///
    /// Each figure comes from its own query.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if any of the queries fails.
    pub async fn get_stats(&self) -> Result<PurchaseStats, RepositoryError> {
        let total_revenue = self.purchases.total_revenue().await?;
        let total_tickets_sold = self.purchases.total_tickets_sold().await?;
        let total_purchase_count = self.purchases.count_all().await?;

        debug!(
            revenue = %total_revenue,
            tickets = total_tickets_sold,
            purchases = total_purchase_count,
            "Computed purchase stats"
        );

        Ok(PurchaseStats {
            total_revenue,
            total_tickets_sold,
            total_purchase_count,
        })
    }
}
