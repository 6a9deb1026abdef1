//! Publishing pipeline: dedup gate, send, history bookkeeping.
//!
//! The publisher owns the posting client and the history store. Candidate
//! messages that were already posted inside the dedup window are dropped;
//! everything else is sent and recorded. A send failure drops that one
//! message without aborting the rest of the batch; the change is only
//! re-announced if a later poll reproduces it.

use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::models::WatcherConfig;
use crate::services::PostClient;
use crate::storage::HistoryStore;
use crate::utils::backoff::Backoff;

/// Outcome counts for one delivery batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeliveryReport {
    pub posted: usize,
    pub duplicates: usize,
    pub failures: usize,
}

/// Sends approved messages and keeps the post history current.
pub struct Publisher {
    client: Box<dyn PostClient>,
    store: Box<dyn HistoryStore>,
    dedup_window_secs: i64,
    history_capacity: usize,
}

impl Publisher {
    pub fn new(
        client: Box<dyn PostClient>,
        store: Box<dyn HistoryStore>,
        config: &WatcherConfig,
    ) -> Self {
        Self {
            client,
            store,
            dedup_window_secs: config.dedup_window_secs as i64,
            history_capacity: config.history_capacity,
        }
    }

    /// Log in, retrying forever with growing jittered delays.
    ///
    /// This blocks until a session exists; there is no attempt limit.
    pub async fn ensure_session(&mut self, identifier: &str, password: &str) {
        let mut backoff = Backoff::new();
        loop {
            match self.client.login(identifier, password).await {
                Ok(()) => return,
                Err(e) => {
                    let delay = backoff.after_failure();
                    log::warn!(
                        "Login failed: {e}. Retrying in {:.1}s",
                        delay.as_secs_f64()
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    /// Make a single login attempt.
    pub async fn login_once(&mut self, identifier: &str, password: &str) -> Result<()> {
        self.client.login(identifier, password).await
    }

    /// Send every message that is not a recent duplicate, recording each
    /// success in the history before moving on.
    ///
    /// History write errors abort the batch; send errors only drop the one
    /// message they hit.
    pub async fn deliver(
        &mut self,
        messages: &[String],
        now: DateTime<Utc>,
    ) -> Result<DeliveryReport> {
        let mut report = DeliveryReport::default();
        if messages.is_empty() {
            return Ok(report);
        }

        let mut history = self.store.load().await?;
        for text in messages {
            let headline = text.lines().next().unwrap_or_default();
            if history.is_duplicate(text, now, self.dedup_window_secs) {
                log::info!("Skipping duplicate post: {headline}");
                report.duplicates += 1;
                continue;
            }

            match self.client.send_post(text).await {
                Ok(()) => {
                    history.record(text.clone(), now);
                    history.trim(self.history_capacity);
                    self.store.save(&history).await?;
                    log::info!("Posted update: {headline}");
                    report.posted += 1;
                }
                Err(e) => {
                    log::error!("Post failed, dropping message ({headline}): {e}");
                    report.failures += 1;
                }
            }
        }
        Ok(report)
    }
}
