//! Scheduled full index rebuilds.
//!
//! The rebuild loop runs for the life of the process, one rebuild per
//! interval. A failed run is logged and the loop keeps going; the next
//! tick corrects whatever the failed run left behind, since the swap-in
//! rebuild never publishes a partial index.

use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info};

use payrail_core::index::{IndexMaintainer, IndexStore, RebuildStats, StoreError, TenantStore};

/// Runs one full rebuild, logging the outcome.
pub async fn rebuild_once<T, I>(
    maintainer: &IndexMaintainer<T, I>,
) -> Result<RebuildStats, StoreError>
where
    T: TenantStore,
    I: IndexStore,
{
    match maintainer.rebuild().await {
        Ok(stats) => {
            info!(
                tenants = stats.tenants_scanned,
                rows = stats.rows_indexed,
                "index rebuild complete"
            );
            Ok(stats)
        }
        Err(err) => {
            error!(%err, "index rebuild failed");
            Err(err)
        }
    }
}

/// Rebuilds on a fixed interval, forever.
///
/// The first rebuild runs immediately; failures do not stop the loop.
pub async fn run_rebuild_loop<T, I>(maintainer: Arc<IndexMaintainer<T, I>>, every: Duration) -> !
where
    T: TenantStore,
    I: IndexStore,
{
    let mut ticker = tokio::time::interval(every);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    loop {
        ticker.tick().await;
        // Errors were already logged; the loop's job is only to keep going.
        let _ = rebuild_once(maintainer.as_ref()).await;
    }
}
