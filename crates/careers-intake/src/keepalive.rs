use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, warn};

const PING_PERIOD: Duration = Duration::from_secs(60);

/// Spawn the fire-and-forget self-ping loop that keeps the hosting
/// platform from idling the process. Failures are logged and ignored;
/// there is no retry or backoff beyond the next scheduled tick.
pub fn spawn(url: String) -> JoinHandle<()> {
    tokio::spawn(async move {
        let client = reqwest::Client::new();
        let mut ticker = interval_at(Instant::now() + PING_PERIOD, PING_PERIOD);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            match client.get(&url).send().await {
                Ok(response) => {
                    debug!(status = %response.status(), %url, "keep-alive ping sent");
                }
                Err(err) => {
                    warn!(%url, error = %err, "keep-alive ping failed");
                }
            }
        }
    })
}
