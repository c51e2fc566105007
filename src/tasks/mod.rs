//! Recurring background jobs. Call `spawn_all` once during startup.

use crate::config::TasksConfig;
use crate::services::SubscriptionService;
use chrono::Utc;
use std::time::Duration;

/// Spawn all background tasks. Detached via `tokio::spawn`; does not block.
pub fn spawn_all(config: &TasksConfig, subscription_service: SubscriptionService) {
    let interval = Duration::from_secs(config.expiry_sweep_interval_secs.max(1));

    // subscription expiry sweep
    tokio::spawn(async move {
        loop {
            match subscription_service.expire_due(Utc::now()).await {
                Ok(n) if n > 0 => log::info!("Expired subscriptions processed: {n}"),
                Ok(_) => {}
                Err(e) => log::error!("Failed to expire subscriptions: {e:?}"),
            }
            tokio::time::sleep(interval).await;
        }
    });
}
