use crate::core::asset::{Asset, AssetId, HistoryId, NewAsset, PriceHistoryEntry};
use crate::core::repository::{PriceRepository, StorageError, Store, ensure_recordable};
use anyhow::Context;
use async_trait::async_trait;
use chrono::Utc;
use fjall::{Config, PartitionCreateOptions, PersistMode, TxKeyspace, TxPartitionHandle};
use serde::de::DeserializeOwned;
use std::path::Path;
use std::time::Instant;
use tokio::runtime::RuntimeFlavor;
use tracing::{debug, warn};

const NEXT_ASSET_ID: &str = "next_asset_id";
const NEXT_HISTORY_ID: &str = "next_history_id";

fn asset_key(id: AssetId) -> [u8; 8] {
    id.0.to_be_bytes()
}

/// History keys sort by asset, then by insertion.
fn history_key(asset: AssetId, entry: HistoryId) -> [u8; 16] {
    let mut key = [0u8; 16];
    key[..8].copy_from_slice(&asset.0.to_be_bytes());
    key[8..].copy_from_slice(&entry.0.to_be_bytes());
    key
}

fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, StorageError> {
    Ok(serde_json::from_slice(bytes)?)
}

fn bump_counter(current: Option<impl AsRef<[u8]>>) -> Result<u64, StorageError> {
    let current: u64 = match current {
        Some(bytes) => decode(bytes.as_ref())?,
        None => 0,
    };
    Ok(current + 1)
}

/// Persistent store on a fjall transactional keyspace.
///
/// Assets, history and id counters live in separate partitions; every
/// multi-record change is a single write transaction.
#[derive(Clone)]
pub struct DiskStore {
    keyspace: TxKeyspace,
    assets: TxPartitionHandle,
    history: TxPartitionHandle,
    meta: TxPartitionHandle,
}

impl DiskStore {
    pub fn new(path: &Path) -> Result<Self, StorageError> {
        std::fs::create_dir_all(path).map_err(|e| {
            StorageError::Unavailable(format!("cannot create {}: {e}", path.display()))
        })?;

        let keyspace = Config::new(path.join("fjall_db")).open_transactional()?;
        let assets = keyspace.open_partition("assets", PartitionCreateOptions::default())?;
        let history = keyspace.open_partition("history", PartitionCreateOptions::default())?;
        let meta = keyspace.open_partition("meta", PartitionCreateOptions::default())?;
        debug!("Opened store at {}", path.display());

        Ok(Self {
            keyspace,
            assets,
            history,
            meta,
        })
    }

    pub fn create_asset(&self, new_asset: NewAsset) -> anyhow::Result<Asset> {
        new_asset.validate()?;

        let mut tx = self.keyspace.write_tx();
        let id = bump_counter(tx.get(&self.meta, NEXT_ASSET_ID)?)?;
        let asset = new_asset.into_asset(AssetId(id), Utc::now());
        tx.insert(&self.meta, NEXT_ASSET_ID, serde_json::to_vec(&id)?);
        tx.insert(&self.assets, asset_key(asset.id).to_vec(), serde_json::to_vec(&asset)?);
        tx.commit().context("Failed to commit new asset")?;

        debug!("Created asset {} ({})", asset.id, asset.symbol);
        Ok(asset)
    }

    /// Flips the active flag; `None` if the asset does not exist.
    pub fn set_active(&self, id: AssetId, active: bool) -> anyhow::Result<Option<Asset>> {
        let mut tx = self.keyspace.write_tx();
        let Some(bytes) = tx.get(&self.assets, asset_key(id))? else {
            return Ok(None);
        };
        let mut asset: Asset = decode(&bytes)?;
        asset.active = active;
        tx.insert(&self.assets, asset_key(id).to_vec(), serde_json::to_vec(&asset)?);
        tx.commit()
            .with_context(|| format!("Failed to update asset {id}"))?;
        Ok(Some(asset))
    }

    /// All assets ordered by id, optionally including soft-deleted ones.
    pub fn list_assets(&self, include_inactive: bool) -> Result<Vec<Asset>, StorageError> {
        let tx = self.keyspace.read_tx();
        let mut assets = Vec::new();
        for item in tx.iter(&self.assets) {
            let (_, value) = item?;
            let asset: Asset = decode(&value)?;
            if include_inactive || asset.active {
                assets.push(asset);
            }
        }
        Ok(assets)
    }

    pub fn find_asset(&self, id: AssetId) -> Result<Option<Asset>, StorageError> {
        self.assets
            .get(asset_key(id))?
            .map(|bytes| decode(&bytes))
            .transpose()
    }

    /// One page of an asset's history, newest first.
    pub fn history(
        &self,
        id: AssetId,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<PriceHistoryEntry>, StorageError> {
        let tx = self.keyspace.read_tx();
        tx.prefix(&self.history, asset_key(id))
            .rev()
            .skip(offset)
            .take(limit)
            .map(|item| {
                let (_, value) = item?;
                decode(&value)
            })
            .collect()
    }
}

#[async_trait]
impl Store for DiskStore {
    async fn session(&self) -> Result<Box<dyn PriceRepository>, StorageError> {
        Ok(Box::new(DiskSession {
            store: self.clone(),
            opened_at: Instant::now(),
        }))
    }
}

/// Cycle-scoped unit of work; flushes the journal when released.
struct DiskSession {
    store: DiskStore,
    opened_at: Instant,
}

fn flush(keyspace: &TxKeyspace) {
    if let Err(e) = keyspace.persist(PersistMode::SyncAll) {
        warn!(error = %e, "Failed to flush store at end of session");
    }
}

impl Drop for DiskSession {
    fn drop(&mut self) {
        // fsync blocks; hand this worker's other tasks off while it runs
        let multi_thread = tokio::runtime::Handle::try_current()
            .is_ok_and(|handle| handle.runtime_flavor() == RuntimeFlavor::MultiThread);
        if multi_thread {
            tokio::task::block_in_place(|| flush(&self.store.keyspace));
        } else {
            flush(&self.store.keyspace);
        }
        debug!("Session closed after {:?}", self.opened_at.elapsed());
    }
}

#[async_trait]
impl PriceRepository for DiskSession {
    async fn list_active(&self) -> Result<Vec<Asset>, StorageError> {
        self.store.list_assets(false)
    }

    async fn get_asset(&self, id: AssetId) -> Result<Option<Asset>, StorageError> {
        self.store.find_asset(id)
    }

    async fn record_observation(
        &self,
        id: AssetId,
        price: f64,
    ) -> Result<Option<Asset>, StorageError> {
        let price = ensure_recordable(price)?;
        let store = &self.store;
        let mut tx = store.keyspace.write_tx();

        // Dropping the transaction without commit discards it
        let Some(bytes) = tx.get(&store.assets, asset_key(id))? else {
            debug!("Asset {} vanished before its price was recorded", id);
            return Ok(None);
        };
        let mut asset: Asset = decode(&bytes)?;
        asset.last_price = Some(price);

        let history_id = HistoryId(bump_counter(tx.get(&store.meta, NEXT_HISTORY_ID)?)?);
        let entry = PriceHistoryEntry {
            id: history_id,
            asset_id: id,
            price,
            recorded_at: Utc::now(),
        };

        tx.insert(&store.meta, NEXT_HISTORY_ID, serde_json::to_vec(&history_id.0)?);
        tx.insert(&store.assets, asset_key(id).to_vec(), serde_json::to_vec(&asset)?);
        tx.insert(
            &store.history,
            history_key(id, history_id).to_vec(),
            serde_json::to_vec(&entry)?,
        );
        tx.commit()?;

        Ok(Some(asset))
    }
}
