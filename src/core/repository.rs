//! Storage contracts used by the synchronization engine

use crate::core::asset::{Asset, AssetId};
use crate::core::price::sanitize_price;
use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Storage backend error: {0}")]
    Backend(#[from] fjall::Error),
    #[error("Corrupt record: {0}")]
    Corrupt(#[from] serde_json::Error),
    #[error("Storage unavailable: {0}")]
    Unavailable(String),
    #[error("Write failed: {0}")]
    Write(String),
    #[error("Refusing to record invalid price {0}")]
    InvalidPrice(f64),
}

impl StorageError {
    /// Whether the store as a whole is gone, as opposed to a single failed
    /// operation.
    pub fn is_fatal(&self) -> bool {
        matches!(self, StorageError::Unavailable(_))
    }
}

/// Rejects prices a history entry may not hold: non-finite, non-positive or
/// above the sanity ceiling. Stores call this before touching any record.
pub fn ensure_recordable(price: f64) -> Result<f64, StorageError> {
    sanitize_price(price).ok_or(StorageError::InvalidPrice(price))
}

/// One unit of work against the store.
///
/// A session is opened at the start of a sync cycle and dropped at its end;
/// implementations release whatever they hold on drop.
#[async_trait]
pub trait PriceRepository: Send + Sync {
    /// Assets with `active == true`, in no particular order.
    async fn list_active(&self) -> Result<Vec<Asset>, StorageError>;

    async fn get_asset(&self, id: AssetId) -> Result<Option<Asset>, StorageError>;

    /// Sets the asset's last price and appends one history entry, atomically.
    ///
    /// Returns `Ok(None)` when the asset no longer exists and
    /// `StorageError::InvalidPrice` when `price` is not a usable quote.
    async fn record_observation(
        &self,
        id: AssetId,
        price: f64,
    ) -> Result<Option<Asset>, StorageError>;
}

/// Hands out repository sessions.
#[async_trait]
pub trait Store: Send + Sync {
    async fn session(&self) -> Result<Box<dyn PriceRepository>, StorageError>;
}

pub const DEFAULT_HISTORY_LIMIT: usize = 100;
pub const MAX_HISTORY_LIMIT: usize = 1000;

/// Clamps a requested history page size to `1..=MAX_HISTORY_LIMIT`.
pub fn history_limit(requested: Option<usize>) -> usize {
    requested
        .unwrap_or(DEFAULT_HISTORY_LIMIT)
        .clamp(1, MAX_HISTORY_LIMIT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_history_limit() {
        assert_eq!(history_limit(None), DEFAULT_HISTORY_LIMIT);
        assert_eq!(history_limit(Some(20)), 20);
        assert_eq!(history_limit(Some(0)), 1);
        assert_eq!(history_limit(Some(50_000)), MAX_HISTORY_LIMIT);
    }

    #[test]
    fn test_only_unavailable_is_fatal() {
        assert!(StorageError::Unavailable("gone".into()).is_fatal());
        assert!(!StorageError::Write("busy".into()).is_fatal());
        assert!(!StorageError::InvalidPrice(-1.0).is_fatal());
    }

    #[test]
    fn test_ensure_recordable() {
        assert_eq!(ensure_recordable(61000.0).unwrap(), 61000.0);
        for bad in [f64::NAN, f64::INFINITY, 0.0, -5.0, 2e9] {
            assert!(matches!(
                ensure_recordable(bad),
                Err(StorageError::InvalidPrice(_))
            ));
        }
    }
}
