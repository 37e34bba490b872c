use std::time::Duration;

use tokio::time::{MissedTickBehavior, interval};
use tracing::{info, warn};

use pepperpot_api::AppState;
use pepperpot_api::content::{daily_bundle, rotate_featured};

/// Runs the daily content job on a fixed interval: generate a bundle, then
/// rotate the featured set. The first run happens one interval after startup.
pub async fn run_content_schedule(state: AppState, every: Duration) {
    let mut ticker = interval(every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick completes immediately.
    ticker.tick().await;

    loop {
        ticker.tick().await;
        run_once(&state).await;
    }
}

async fn run_once(state: &AppState) {
    match daily_bundle(state).await {
        Ok(generated) => info!(
            tip = %generated.tip.id,
            hack = %generated.hack.id,
            trend = %generated.trend.id,
            "Scheduled content generated"
        ),
        Err(e) => warn!("Scheduled content generation failed: {}", e),
    }

    match rotate_featured(state).await {
        Ok(counts) => info!(
            tips = counts.tips,
            hacks = counts.hacks,
            trends = counts.trends,
            "Featured content rotated"
        ),
        Err(e) => warn!("Featured rotation failed: {}", e),
    }
}
