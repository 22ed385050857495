use std::time::Duration;
use tokio::time::interval;

use crate::common::AppState;
use crate::session::RefreshKind;
use crate::sync::worker;

/// Keep the thing registry current.
///
/// The first pass is a full load; every later tick is an incremental
/// refresh so cluster colors stay comparable between renders.
pub async fn run_things_refresh(state: AppState) {
    let interval_secs = state.config.things_refresh_interval_seconds;
    let retry_delay_secs = state.config.refresh_retry_delay_seconds;
    let max_retries = state.config.refresh_retry_max;

    tracing::info!(interval_secs, "Starting thing registry refresh scheduler");

    let mut ticker = interval(Duration::from_secs(interval_secs.max(1)));
    let mut refresh = RefreshKind::Full;

    // Run initial load immediately
    ticker.tick().await;

    loop {
        let mut retries = 0;

        loop {
            match worker::refresh_things(&state, refresh).await {
                Ok(count) => {
                    tracing::debug!(things = count, "Registry refresh completed");
                    refresh = RefreshKind::Incremental;
                    break;
                }
                Err(e) => {
                    retries += 1;
                    if retries <= max_retries {
                        tracing::warn!(
                            error = %e,
                            retry = retries,
                            max_retries,
                            delay_secs = retry_delay_secs,
                            "Registry refresh failed, retrying"
                        );
                        tokio::time::sleep(Duration::from_secs(retry_delay_secs)).await;
                    } else {
                        tracing::error!(
                            error = %e,
                            max_retries,
                            "Registry refresh failed after max retries"
                        );
                        break;
                    }
                }
            }
        }

        // Wait for next tick
        ticker.tick().await;
    }
}
