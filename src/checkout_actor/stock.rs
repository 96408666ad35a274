//! # Stock Reconciliation
//!
//! Items added to the cart while the backend was unreachable carry the id of
//! an online stock check that finished (or will finish) in the background.
//! Reconciliation looks every such id up in the local cache, concurrently,
//! and reduces the answers into one readiness flag.
//!
//! A lookup that errors, times out or finds nothing leaves its item
//! unresolved. Unresolved items never fail the batch; only a resolved
//! out-of-stock answer does.

use crate::clients::StockCache;
use crate::model::{CartItem, StockCheckResult};
use futures::future::join_all;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Error recorded on an item whose check came back out of stock.
pub const OUT_OF_STOCK: &str = "Out of stock!";

#[derive(Debug, Clone, PartialEq)]
pub struct StockReport {
    /// Items whose check resolved, with `stock` (and any stock error) filled in.
    pub checked: Vec<CartItem>,
    /// Number of pending checks that stayed unresolved.
    pub unresolved: usize,
    /// `true` when no resolved item is out of stock.
    pub ok: bool,
}

impl StockReport {
    pub fn out_of_stock(&self) -> impl Iterator<Item = &CartItem> {
        self.checked
            .iter()
            .filter(|item| item.stock.as_ref().is_some_and(|stock| !stock.is_in_stock))
    }
}

async fn lookup(
    cache: &dyn StockCache,
    check_id: &str,
    timeout: Duration,
) -> Option<StockCheckResult> {
    match tokio::time::timeout(timeout, cache.lookup(check_id)).await {
        Ok(Ok(Some(result))) => Some(result),
        Ok(Ok(None)) => {
            debug!(check_id, "Stock check not resolved yet");
            None
        }
        Ok(Err(e)) => {
            error!(check_id, error = %e, "Stock cache lookup failed");
            None
        }
        Err(_) => {
            warn!(check_id, timeout_ms = timeout.as_millis() as u64, "Stock cache lookup timed out");
            None
        }
    }
}

/// Resolves every pending stock check among `items`.
pub async fn reconcile(
    cache: &dyn StockCache,
    items: Vec<CartItem>,
    timeout: Duration,
) -> StockReport {
    let pending: Vec<CartItem> = items
        .into_iter()
        .filter(|item| item.online_stock_check_id.is_some())
        .collect();

    let lookups = pending.iter().map(|item| {
        let check_id = item.online_stock_check_id.as_deref().unwrap_or_default();
        lookup(cache, check_id, timeout)
    });
    let results = join_all(lookups).await;

    let mut report = StockReport {
        checked: Vec::new(),
        unresolved: 0,
        ok: true,
    };
    for (mut item, result) in pending.into_iter().zip(results) {
        let Some(stock) = result else {
            report.unresolved += 1;
            continue;
        };
        if !stock.is_in_stock {
            report.ok = false;
            item.errors.insert("stock".to_string(), OUT_OF_STOCK.to_string());
        }
        item.stock = Some(stock);
        report.checked.push(item);
    }

    info!(
        checked = report.checked.len(),
        unresolved = report.unresolved,
        ok = report.ok,
        "Stock reconciliation finished"
    );
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CacheError;
    use async_trait::async_trait;
    use std::collections::HashMap;

    struct FixedCache(HashMap<&'static str, Result<Option<StockCheckResult>, CacheError>>);

    #[async_trait]
    impl StockCache for FixedCache {
        async fn lookup(&self, check_id: &str) -> Result<Option<StockCheckResult>, CacheError> {
            if check_id == "slow" {
                tokio::time::sleep(Duration::from_secs(60)).await;
            }
            self.0.get(check_id).cloned().unwrap_or(Ok(None))
        }
    }

    fn in_stock(is_in_stock: bool) -> Result<Option<StockCheckResult>, CacheError> {
        Ok(Some(StockCheckResult {
            is_in_stock,
            qty: None,
        }))
    }

    #[tokio::test]
    async fn test_one_out_of_stock_item_fails_the_batch() {
        let cache = FixedCache(HashMap::from([("a", in_stock(true)), ("b", in_stock(false))]));
        let items = vec![
            CartItem::new("A", "Alpha", 1, 1.0).with_stock_check("a"),
            CartItem::new("B", "Beta", 1, 1.0).with_stock_check("b"),
            CartItem::new("C", "Gamma", 1, 1.0),
        ];

        let report = reconcile(&cache, items, Duration::from_secs(1)).await;

        assert!(!report.ok);
        assert_eq!(report.checked.len(), 2);
        let failed: Vec<_> = report.out_of_stock().collect();
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].sku, "B");
        assert_eq!(failed[0].errors["stock"], OUT_OF_STOCK);
        assert!(report.checked[0].errors.is_empty());
    }

    #[tokio::test]
    async fn test_errors_and_missing_results_stay_unresolved() {
        let cache = FixedCache(HashMap::from([
            ("a", in_stock(true)),
            ("broken", Err(CacheError::Read("disk".into()))),
        ]));
        let items = vec![
            CartItem::new("A", "Alpha", 1, 1.0).with_stock_check("a"),
            CartItem::new("X", "Broken", 1, 1.0).with_stock_check("broken"),
            CartItem::new("M", "Missing", 1, 1.0).with_stock_check("missing"),
        ];

        let report = reconcile(&cache, items, Duration::from_secs(1)).await;

        assert!(report.ok);
        assert_eq!(report.checked.len(), 1);
        assert_eq!(report.unresolved, 2);
    }

    #[tokio::test]
    async fn test_slow_lookup_is_bounded_by_timeout() {
        let cache = FixedCache(HashMap::new());
        let items = vec![CartItem::new("S", "Slow", 1, 1.0).with_stock_check("slow")];

        let report = reconcile(&cache, items, Duration::from_millis(50)).await;

        assert!(report.ok);
        assert_eq!(report.unresolved, 1);
    }

    #[tokio::test]
    async fn test_cart_without_pending_checks_is_ok() {
        let cache = FixedCache(HashMap::new());
        let report = reconcile(&cache, vec![CartItem::new("A", "Alpha", 1, 1.0)], Duration::from_secs(1)).await;
        assert!(report.ok);
        assert!(report.checked.is_empty());
    }
}
