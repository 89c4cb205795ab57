//! Background feed updater.

use tokio::task::JoinHandle;
use tokio::time::{interval, Duration, MissedTickBehavior};
use tracing::{debug, error, info};

use super::fetcher::FeedFetcher;
use super::service::FeedService;
use crate::config::FeedsConfig;
use crate::db::Database;
use crate::Result;

/// Periodically refreshes every subscribed feed.
pub struct FeedUpdater {
    db: Database,
    fetcher: FeedFetcher,
    check_interval: Duration,
}

impl FeedUpdater {
    /// Create an updater from the `[feeds]` configuration.
    pub fn new(db: Database, config: &FeedsConfig) -> Result<Self> {
        Ok(Self {
            db,
            fetcher: FeedFetcher::new(config)?,
            check_interval: Duration::from_secs(config.update_interval_secs),
        })
    }

    /// Interval between two passes.
    pub fn check_interval(&self) -> Duration {
        self.check_interval
    }

    /// Run the updater loop forever. The first pass starts immediately.
    pub async fn run(&self) {
        info!(
            "Feed updater started (interval: {} seconds)",
            self.check_interval.as_secs()
        );

        let mut timer = interval(self.check_interval);
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            timer.tick().await;
            self.update_all().await;
        }
    }

    /// Run a single refresh pass.
    pub async fn update_all(&self) {
        debug!("Refreshing subscribed feeds");

        match FeedService::new(&self.db, &self.fetcher).refresh_all().await {
            Ok(summary) if summary.feeds == 0 => debug!("No subscribed feeds to refresh"),
            Ok(summary) => info!(
                feeds = summary.feeds,
                failed = summary.failed,
                new = summary.new_entries,
                updated = summary.updated_entries,
                "Feed refresh pass complete"
            ),
            Err(e) => error!("Failed to list feeds for refresh: {}", e),
        }
    }
}

/// Spawn the updater as a background task.
pub fn start_feed_updater(db: Database, config: &FeedsConfig) -> Result<JoinHandle<()>> {
    let updater = FeedUpdater::new(db, config)?;
    Ok(tokio::spawn(async move {
        updater.run().await;
    }))
}
