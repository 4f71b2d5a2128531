use super::config::SyncConfig;
use super::report::{CycleReport, SyncError};
use crate::core::price::{PriceSource, sanitize_price};
use crate::core::repository::Store;
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Periodically refreshes the price of every active asset.
///
/// Cycles never overlap: the next one starts only after the previous
/// cycle's report and the following sleep. Every wait is raced against the
/// shutdown token.
pub struct Scheduler {
    source: Arc<dyn PriceSource>,
    store: Arc<dyn Store>,
    config: SyncConfig,
    shutdown: CancellationToken,
}

impl Scheduler {
    pub fn new(
        source: Arc<dyn PriceSource>,
        store: Arc<dyn Store>,
        config: SyncConfig,
        shutdown: CancellationToken,
    ) -> Self {
        Scheduler {
            source,
            store,
            config,
            shutdown,
        }
    }

    /// Runs cycles until the shutdown token is cancelled.
    pub async fn run(&self) {
        info!(
            steady = ?self.config.steady_interval,
            error = ?self.config.error_interval,
            "Price sync started"
        );

        loop {
            let outcome = self.run_cycle().await;
            if let Err(e) = &outcome {
                if !matches!(e, SyncError::Cancelled) {
                    error!(error = %e, "Sync cycle failed");
                }
            }

            let Some(delay) = self.config.delay_after(&outcome) else {
                break;
            };
            debug!("Next update in {:?}", delay);
            if self.pause(delay).await.is_err() {
                break;
            }
        }

        info!("Price sync stopped");
    }

    /// One pass over the active assets.
    ///
    /// Provider absence and isolated write failures are tallied in the
    /// report; only storage failures that make the rest of the pass
    /// pointless end it early.
    pub async fn run_cycle(&self) -> Result<CycleReport, SyncError> {
        if self.shutdown.is_cancelled() {
            return Err(SyncError::Cancelled);
        }

        // Released on every return path below
        let session = self.store.session().await?;
        let assets = session.list_active().await?;
        debug!("Refreshing {} active assets", assets.len());

        let mut report = CycleReport::new(assets.len());
        let mut consecutive_failures = 0;

        for (index, asset) in assets.iter().enumerate() {
            if index > 0 {
                self.pause(self.config.request_pause).await?;
            }

            let fetched = tokio::select! {
                _ = self.shutdown.cancelled() => return Err(SyncError::Cancelled),
                price = self.source.fetch_price(&asset.symbol) => price,
            };
            let Some(price) = fetched.and_then(sanitize_price) else {
                warn!("Failed to get price for {}", asset.symbol);
                report.skipped += 1;
                continue;
            };

            match session.record_observation(asset.id, price).await {
                Ok(Some(_)) => {
                    debug!("Updated {}: ${}", asset.symbol, price);
                    report.updated += 1;
                    consecutive_failures = 0;
                }
                Ok(None) => {
                    debug!("Asset {} no longer exists, skipping", asset.id);
                    report.missing += 1;
                }
                Err(e) if e.is_fatal() => {
                    return Err(SyncError::StorageUnavailable {
                        failures: consecutive_failures + 1,
                        source: e,
                    });
                }
                Err(e) => {
                    warn!(error = %e, "Failed to record price for {}", asset.symbol);
                    report.failed += 1;
                    consecutive_failures += 1;
                    if self.config.write_failures_exhausted(consecutive_failures) {
                        return Err(SyncError::StorageUnavailable {
                            failures: consecutive_failures,
                            source: e,
                        });
                    }
                }
            }
        }

        report.finished_at = Utc::now();
        info!("{report}");
        Ok(report)
    }

    async fn pause(&self, duration: Duration) -> Result<(), SyncError> {
        tokio::select! {
            _ = self.shutdown.cancelled() => Err(SyncError::Cancelled),
            _ = tokio::time::sleep(duration) => Ok(()),
        }
    }
}
