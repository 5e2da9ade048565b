//! Periodic eviction of finished jobs.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use super::store::JobStore;

/// Evict terminal jobs whose last update is older than `ttl`.
pub fn sweep_once(store: &dyn JobStore, ttl: Duration) -> usize {
    let Some(cutoff) = chrono::Duration::from_std(ttl)
        .ok()
        .and_then(|age| Utc::now().checked_sub_signed(age))
    else {
        return 0;
    };
    store.evict_finished_before(cutoff)
}

/// Run [`sweep_once`] every `every`, forever. Abort the handle to stop.
pub fn spawn_sweeper(store: Arc<dyn JobStore>, ttl: Duration, every: Duration) -> JoinHandle<()> {
    info!(ttl_secs = ttl.as_secs(), every_secs = every.as_secs(), "job sweeper started");
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            let evicted = sweep_once(store.as_ref(), ttl);
            if evicted > 0 {
                info!(evicted, "evicted finished jobs");
            } else {
                debug!("nothing to evict");
            }
        }
    })
}
