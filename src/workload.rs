//! Demo background work so captures and snapshots are not empty.

use std::hint::black_box;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::runtime::EventProfile;

pub const PROFILE: &str = "workload";
/// Items kept alive in the `workload` profile at any time.
const LIVE_ITEMS: u64 = 16;

pub async fn run(items: Arc<EventProfile>, cancel: CancellationToken) {
    tracing::info!("workload started");
    let mut i: u64 = 0;
    loop {
        i += 1;
        let sum = tokio::task::spawn_blocking(move || spin(i)).await.unwrap_or(0);
        if let Err(err) = items.add(i) {
            tracing::warn!(error = %err, "workload item");
        }
        if i > LIVE_ITEMS {
            items.remove(i - LIVE_ITEMS);
        }
        tracing::debug!(i, sum, "workload tick");
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = tokio::time::sleep(Duration::from_millis(i % 100 + 1)) => {}
        }
    }
    tracing::info!(ticks = i, "workload stopped");
}

#[inline(never)]
fn spin(n: u64) -> u64 {
    let rounds = 100_000 * (n % 10 + 1);
    (0..rounds).fold(0u64, |acc, v| black_box(acc.wrapping_mul(31).wrapping_add(v)))
}
