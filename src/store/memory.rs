use crate::core::asset::{Asset, AssetId, HistoryId, NewAsset, PriceHistoryEntry, ValidationError};
use crate::core::repository::{PriceRepository, StorageError, Store, ensure_recordable};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::Mutex;
use tracing::debug;

/// Kind of failure a [`MemoryStore`] can be told to produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    Transient,
    Unavailable,
}

impl Fault {
    fn to_error(self, operation: &str) -> StorageError {
        match self {
            Fault::Transient => StorageError::Write(format!("injected failure in {operation}")),
            Fault::Unavailable => {
                StorageError::Unavailable(format!("injected outage in {operation}"))
            }
        }
    }
}

#[derive(Default)]
struct State {
    assets: BTreeMap<AssetId, Asset>,
    history: Vec<PriceHistoryEntry>,
    next_asset_id: u64,
    next_history_id: u64,
    listing_fault: Option<Fault>,
    write_fault: Option<Fault>,
}

/// In-process store with the same atomicity contract as the disk store.
///
/// Every mutation happens under a single lock, so a reader never sees a
/// price without its history entry. Faults can be injected to exercise the
/// scheduler's error handling.
#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<State>>,
    open_sessions: Arc<AtomicUsize>,
    sessions_opened: Arc<AtomicUsize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn create_asset(&self, new_asset: NewAsset) -> Result<Asset, ValidationError> {
        new_asset.validate()?;
        let mut state = self.state.lock().await;
        state.next_asset_id += 1;
        let asset = new_asset.into_asset(AssetId(state.next_asset_id), Utc::now());
        state.assets.insert(asset.id, asset.clone());
        debug!("Created asset {} ({})", asset.id, asset.symbol);
        Ok(asset)
    }

    /// Seeds a last-known price without producing history.
    pub async fn set_last_price(&self, id: AssetId, price: Option<f64>) {
        if let Some(asset) = self.state.lock().await.assets.get_mut(&id) {
            asset.last_price = price;
        }
    }

    pub async fn set_active(&self, id: AssetId, active: bool) -> Option<Asset> {
        let mut state = self.state.lock().await;
        let asset = state.assets.get_mut(&id)?;
        asset.active = active;
        Some(asset.clone())
    }

    /// Hard delete, cascading to the asset's history.
    pub async fn remove_asset(&self, id: AssetId) -> bool {
        let mut state = self.state.lock().await;
        state.history.retain(|entry| entry.asset_id != id);
        state.assets.remove(&id).is_some()
    }

    pub async fn asset(&self, id: AssetId) -> Option<Asset> {
        self.state.lock().await.assets.get(&id).cloned()
    }

    /// History for one asset in insertion order.
    pub async fn history(&self, id: AssetId) -> Vec<PriceHistoryEntry> {
        self.state
            .lock()
            .await
            .history
            .iter()
            .filter(|entry| entry.asset_id == id)
            .cloned()
            .collect()
    }

    pub async fn fail_listing(&self, fault: Option<Fault>) {
        self.state.lock().await.listing_fault = fault;
    }

    pub async fn fail_writes(&self, fault: Option<Fault>) {
        self.state.lock().await.write_fault = fault;
    }

    /// Sessions currently held open.
    pub fn open_sessions(&self) -> usize {
        self.open_sessions.load(Ordering::SeqCst)
    }

    /// Sessions handed out since creation.
    pub fn sessions_opened(&self) -> usize {
        self.sessions_opened.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn session(&self) -> Result<Box<dyn PriceRepository>, StorageError> {
        self.sessions_opened.fetch_add(1, Ordering::SeqCst);
        self.open_sessions.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MemorySession {
            state: Arc::clone(&self.state),
            open_sessions: Arc::clone(&self.open_sessions),
        }))
    }
}

struct MemorySession {
    state: Arc<Mutex<State>>,
    open_sessions: Arc<AtomicUsize>,
}

impl Drop for MemorySession {
    fn drop(&mut self) {
        self.open_sessions.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl PriceRepository for MemorySession {
    async fn list_active(&self) -> Result<Vec<Asset>, StorageError> {
        let state = self.state.lock().await;
        if let Some(fault) = state.listing_fault {
            return Err(fault.to_error("list_active"));
        }
        Ok(state.assets.values().filter(|a| a.active).cloned().collect())
    }

    async fn get_asset(&self, id: AssetId) -> Result<Option<Asset>, StorageError> {
        Ok(self.state.lock().await.assets.get(&id).cloned())
    }

    async fn record_observation(
        &self,
        id: AssetId,
        price: f64,
    ) -> Result<Option<Asset>, StorageError> {
        let price = ensure_recordable(price)?;
        let mut guard = self.state.lock().await;
        if let Some(fault) = guard.write_fault {
            return Err(fault.to_error("record_observation"));
        }

        let State {
            assets,
            history,
            next_history_id,
            ..
        } = &mut *guard;
        let Some(asset) = assets.get_mut(&id) else {
            debug!("Asset {} vanished before its price was recorded", id);
            return Ok(None);
        };

        *next_history_id += 1;
        asset.last_price = Some(price);
        history.push(PriceHistoryEntry {
            id: HistoryId(*next_history_id),
            asset_id: id,
            price,
            recorded_at: Utc::now(),
        });
        Ok(Some(asset.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::asset::UserId;

    async fn seeded() -> (MemoryStore, Asset, Asset) {
        let store = MemoryStore::new();
        let btc = store
            .create_asset(NewAsset::new(UserId(1), "btc", 10.0, 100_000.0))
            .await
            .unwrap();
        let eth = store
            .create_asset(NewAsset::new(UserId(1), "eth", 10.0, 10_000.0))
            .await
            .unwrap();
        (store, btc, eth)
    }

    #[tokio::test]
    async fn test_list_active_skips_inactive() {
        let (store, btc, eth) = seeded().await;
        store.set_active(eth.id, false).await;

        let session = store.session().await.unwrap();
        let active = session.list_active().await.unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id, btc.id);
    }

    #[tokio::test]
    async fn test_record_observation_updates_price_and_history() {
        let (store, btc, _) = seeded().await;
        let session = store.session().await.unwrap();

        let updated = session
            .record_observation(btc.id, 61000.0)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.last_price, Some(61000.0));

        let history = store.history(btc.id).await;
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].price, 61000.0);
        assert_eq!(history[0].asset_id, btc.id);
        assert_eq!(
            session.get_asset(btc.id).await.unwrap().unwrap().last_price,
            Some(61000.0)
        );
    }

    #[tokio::test]
    async fn test_record_observation_for_missing_asset() {
        let (store, btc, _) = seeded().await;
        assert!(store.remove_asset(btc.id).await);

        let session = store.session().await.unwrap();
        let result = session.record_observation(btc.id, 1.0).await.unwrap();
        assert!(result.is_none());
        assert!(store.history(btc.id).await.is_empty());
    }

    #[tokio::test]
    async fn test_failed_write_changes_nothing() {
        let (store, btc, _) = seeded().await;
        store.set_last_price(btc.id, Some(60000.0)).await;
        store.fail_writes(Some(Fault::Transient)).await;

        let session = store.session().await.unwrap();
        let err = session.record_observation(btc.id, 1.0).await.unwrap_err();
        assert!(!err.is_fatal());
        assert_eq!(store.asset(btc.id).await.unwrap().last_price, Some(60000.0));
        assert!(store.history(btc.id).await.is_empty());
    }

    #[tokio::test]
    async fn test_invalid_price_is_refused() {
        let (store, btc, _) = seeded().await;
        store.set_last_price(btc.id, Some(60000.0)).await;
        let session = store.session().await.unwrap();

        for bad in [f64::NAN, -5.0, 0.0] {
            let err = session.record_observation(btc.id, bad).await.unwrap_err();
            assert!(matches!(err, StorageError::InvalidPrice(_)));
        }
        assert_eq!(store.asset(btc.id).await.unwrap().last_price, Some(60000.0));
        assert!(store.history(btc.id).await.is_empty());
    }

    #[tokio::test]
    async fn test_sessions_are_counted_until_dropped() {
        let store = MemoryStore::new();
        let first = store.session().await.unwrap();
        let second = store.session().await.unwrap();
        assert_eq!(store.open_sessions(), 2);

        drop(first);
        assert_eq!(store.open_sessions(), 1);
        drop(second);
        assert_eq!(store.open_sessions(), 0);
        assert_eq!(store.sessions_opened(), 2);
    }

    #[tokio::test]
    async fn test_create_asset_rejects_invalid_thresholds() {
        let store = MemoryStore::new();
        let result = store
            .create_asset(NewAsset::new(UserId(1), "BTC", 100.0, 50.0))
            .await;
        assert!(result.is_err());
    }
}
