//! # Stock Ledger
//!
//! Batched, all-or-nothing stock reservation on top of the per-product
//! atomic decrement in the product repository.
//!
//! ## Batch Semantics
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │              All-or-Nothing Batch Reservation                           │
//! │                                                                         │
//! │  Order lines: [(P3, 1), (P1, 2), (P2, 1)]                              │
//! │       │                                                                 │
//! │       ▼  sort by product id (fixed global order)                       │
//! │  [(P1, 2), (P2, 1), (P3, 1)]                                           │
//! │       │                                                                 │
//! │       ▼  reserve one line at a time                                    │
//! │  P1 ✓ (stock 5 → 3)                                                    │
//! │  P2 ✗ (stock 0, conditional UPDATE matches no row)                     │
//! │       │                                                                 │
//! │       ▼  roll back what this attempt took                              │
//! │  release P1 (stock 3 → 5)                                              │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  InsufficientStock { product: P2 }                                     │
//! │                                                                         │
//! │  The fixed ordering means two concurrent batches over overlapping     │
//! │  products always contend in the same sequence - no livelock where     │
//! │  each grabs half and starves the other.                                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use tracing::{debug, warn};

use crate::error::{EngineError, EngineResult};
use orderflow_db::Database;

/// Batched reserve/release over the per-product stock ledger.
#[derive(Debug, Clone)]
pub struct StockLedger {
    db: Database,
}

impl StockLedger {
    /// Creates a new StockLedger.
    pub fn new(db: Database) -> Self {
        StockLedger { db }
    }

    /// Reserves every `(product_id, quantity)` line, or nothing.
    ///
    /// Lines are processed in ascending product-id order regardless of the
    /// caller's ordering. On the first failed line, every line this attempt
    /// already reserved is released before [`EngineError::InsufficientStock`]
    /// surfaces, naming the product that failed.
    pub async fn reserve_batch(&self, lines: &[(String, i64)]) -> EngineResult<()> {
        let products = self.db.products();

        let mut ordered: Vec<&(String, i64)> = lines.iter().collect();
        ordered.sort_by(|a, b| a.0.cmp(&b.0));

        let mut reserved: Vec<&(String, i64)> = Vec::with_capacity(ordered.len());

        for line in ordered {
            let (product_id, quantity) = line;

            if products.reserve_stock(product_id, *quantity).await? {
                reserved.push(line);
                continue;
            }

            warn!(product_id = %product_id, quantity = %quantity, "Reservation failed, rolling back batch");

            // Roll back this attempt's reservations before surfacing
            for (rid, rqty) in reserved {
                products.release_stock(rid, *rqty).await?;
            }

            let name = products
                .get_by_id(product_id)
                .await?
                .map(|p| p.name)
                .unwrap_or_else(|| product_id.clone());

            return Err(EngineError::InsufficientStock {
                product_id: product_id.clone(),
                name,
            });
        }

        debug!(lines = lines.len(), "Batch reserved");
        Ok(())
    }

    /// Releases every `(product_id, quantity)` line.
    ///
    /// Used when a reserved order is rolled back (failed persist) or
    /// cancelled/deleted before shipment. Callers must not double-release.
    pub async fn release_batch(&self, lines: &[(String, i64)]) -> EngineResult<()> {
        let products = self.db.products();

        for (product_id, quantity) in lines {
            products.release_stock(product_id, *quantity).await?;
        }

        debug!(lines = lines.len(), "Batch released");
        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
