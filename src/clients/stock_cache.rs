use crate::error::CacheError;
use crate::model::StockCheckResult;
use async_trait::async_trait;

/// Local key-value cache holding results of asynchronous online stock checks.
///
/// `Ok(None)` means the check has not produced a result yet.
#[async_trait]
pub trait StockCache: Send + Sync {
    async fn lookup(&self, check_id: &str) -> Result<Option<StockCheckResult>, CacheError>;
}
