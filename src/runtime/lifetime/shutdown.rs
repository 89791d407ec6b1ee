use std::time::Duration;

use tokio::signal;
use tracing::{info, warn};

use crate::services::TrackingDispatcher;

/// 追踪队列排空的最长等待时间（秒）
const DRAIN_TIMEOUT_SECS: u64 = 10;

/// Resolves once Ctrl+C arrived and the tracking queue drained.
pub async fn listen_for_shutdown(dispatcher: &TrackingDispatcher) {
    match signal::ctrl_c().await {
        Ok(()) => info!("Shutdown signal received, draining tracking queue..."),
        Err(e) => warn!(
            "Failed to listen for Ctrl+C: {}. Proceeding with shutdown anyway.",
            e
        ),
    }
    drain(dispatcher).await;
}

pub async fn drain(dispatcher: &TrackingDispatcher) {
    if dispatcher
        .shutdown(Duration::from_secs(DRAIN_TIMEOUT_SECS))
        .await
    {
        info!("Tracking queue drained, shutting down");
    } else {
        warn!(
            "Tracking jobs still pending after {}s, dropping them",
            DRAIN_TIMEOUT_SECS
        );
    }
}
