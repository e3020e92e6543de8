//! Background deletion of orphaned board images.
//!
//! Every orphaned identifier gets its own task. Tasks share a semaphore so a
//! board that lost many images cannot flood the remote store, and each call
//! is bounded by a timeout. Outcomes are logged and counted; nothing is
//! retried and nothing is reported back to the update that triggered it.

use std::pin::pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use metrics::counter;
use tokio::sync::{Notify, Semaphore};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::application::orphans::OrphanedAssets;
use crate::application::repos::AssetStore;
use crate::domain::assets::PublicId;

const METRIC_ASSET_DELETE: &str = "tierlist_asset_delete_total";
const METRIC_ASSET_UNRESOLVED: &str = "tierlist_asset_unresolved_total";

pub const DEFAULT_DELETE_CONCURRENCY: usize = 4;
pub const DEFAULT_DELETE_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Copy)]
pub struct JanitorConfig {
    pub concurrency: usize,
    pub timeout: Duration,
}

impl Default for JanitorConfig {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_DELETE_CONCURRENCY,
            timeout: DEFAULT_DELETE_TIMEOUT,
        }
    }
}

struct InFlight {
    count: AtomicUsize,
    idle: Notify,
}

impl InFlight {
    fn enter(self: &Arc<Self>) -> InFlightGuard {
        self.count.fetch_add(1, Ordering::SeqCst);
        InFlightGuard {
            in_flight: Arc::clone(self),
        }
    }
}

struct InFlightGuard {
    in_flight: Arc<InFlight>,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        if self.in_flight.count.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.in_flight.idle.notify_waiters();
        }
    }
}

#[derive(Clone)]
pub struct AssetJanitor {
    store: Option<Arc<dyn AssetStore>>,
    permits: Arc<Semaphore>,
    timeout: Duration,
    in_flight: Arc<InFlight>,
}

impl AssetJanitor {
    pub fn new(store: Arc<dyn AssetStore>, config: JanitorConfig) -> Self {
        Self::build(Some(store), config)
    }

    /// A janitor that only logs what it would have deleted.
    pub fn disabled() -> Self {
        Self::build(None, JanitorConfig::default())
    }

    fn build(store: Option<Arc<dyn AssetStore>>, config: JanitorConfig) -> Self {
        Self {
            store,
            permits: Arc::new(Semaphore::new(config.concurrency.max(1))),
            timeout: config.timeout,
            in_flight: Arc::new(InFlight {
                count: AtomicUsize::new(0),
                idle: Notify::new(),
            }),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.store.is_some()
    }

    /// Number of deletions spawned and not yet finished.
    pub fn in_flight(&self) -> usize {
        self.in_flight.count.load(Ordering::SeqCst)
    }

    /// Spawn one deletion per orphaned identifier and return immediately.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn dispatch(&self, board_id: Uuid, orphans: OrphanedAssets) {
        for (src, err) in &orphans.unresolved {
            counter!(METRIC_ASSET_UNRESOLVED).increment(1);
            warn!(%board_id, src = %src, error = %err, "skipping deletion of unresolvable image");
        }

        if orphans.public_ids.is_empty() {
            return;
        }

        let Some(store) = self.store.as_ref() else {
            info!(
                %board_id,
                count = orphans.public_ids.len(),
                "asset store not configured; orphaned images left in place"
            );
            return;
        };

        debug!(%board_id, count = orphans.public_ids.len(), "dispatching orphaned image deletions");

        for public_id in orphans.public_ids {
            let guard = self.in_flight.enter();
            let store = Arc::clone(store);
            let permits = Arc::clone(&self.permits);
            let timeout = self.timeout;
            tokio::spawn(async move {
                let _guard = guard;
                let Ok(_permit) = permits.acquire_owned().await else {
                    return;
                };
                delete_one(store.as_ref(), &public_id, timeout).await;
            });
        }
    }

    /// Wait until every dispatched deletion has finished.
    pub async fn drain(&self) {
        loop {
            let mut idle = pin!(self.in_flight.idle.notified());
            idle.as_mut().enable();
            if self.in_flight() == 0 {
                return;
            }
            idle.await;
        }
    }
}

async fn delete_one(store: &dyn AssetStore, public_id: &PublicId, timeout: Duration) {
    match tokio::time::timeout(timeout, store.destroy(public_id)).await {
        Ok(Ok(())) => {
            counter!(METRIC_ASSET_DELETE, "result" => "ok").increment(1);
            debug!(public_id = %public_id, "orphaned image deleted");
        }
        Ok(Err(err)) => {
            counter!(METRIC_ASSET_DELETE, "result" => "failed").increment(1);
            warn!(public_id = %public_id, error = %err, "orphaned image deletion failed");
        }
        Err(_) => {
            counter!(METRIC_ASSET_DELETE, "result" => "timeout").increment(1);
            warn!(
                public_id = %public_id,
                timeout_ms = timeout.as_millis() as u64,
                "orphaned image deletion timed out"
            );
        }
    }
}
