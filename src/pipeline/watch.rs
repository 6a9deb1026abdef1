//! Poll loop orchestration.
//!
//! One cycle runs fetch, diff, compose, batch, and delivery in order. The
//! loop never terminates on its own: a failed cycle logs and cools down for
//! a shorter interval, then polling resumes. Stopping the watcher means
//! stopping the process.

use std::time::Duration;

use chrono::Utc;

use crate::error::Result;
use crate::models::WatcherConfig;
use crate::pipeline::compose::{combine, compose};
use crate::pipeline::diff::StatusDiff;
use crate::pipeline::publish::{DeliveryReport, Publisher};
use crate::services::Feed;

/// Outcome of one poll cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleReport {
    /// Lines present in the fetched snapshot
    pub lines: usize,

    /// Change events the snapshot produced
    pub events: usize,

    /// What happened to the resulting messages
    pub delivery: DeliveryReport,
}

/// Drives the poll loop over a feed, a diff engine, and a publisher.
pub struct Watcher {
    feed: Box<dyn Feed>,
    diff: StatusDiff,
    publisher: Publisher,
    config: WatcherConfig,
}

impl Watcher {
    pub fn new(feed: Box<dyn Feed>, publisher: Publisher, config: WatcherConfig) -> Self {
        Self {
            feed,
            diff: StatusDiff::new(),
            publisher,
            config,
        }
    }

    /// Make a single login attempt without retries.
    pub async fn login(&mut self, identifier: &str, password: &str) -> Result<()> {
        self.publisher.login_once(identifier, password).await
    }

    /// Record the current feed state without publishing anything.
    ///
    /// Everything already degraded at startup is absorbed into memory, so
    /// only subsequent transitions get announced.
    pub async fn prime(&mut self) -> Result<usize> {
        let snapshot = self.feed.fetch().await?;
        self.diff.observe(&snapshot);
        Ok(snapshot.len())
    }

    /// Run one fetch, diff, compose, deliver cycle.
    pub async fn run_cycle(&mut self) -> Result<CycleReport> {
        let snapshot = self.feed.fetch().await?;
        let events = self.diff.observe(&snapshot);

        let candidates: Vec<String> = events
            .iter()
            .map(|event| compose(event, self.config.max_post_chars))
            .collect();
        let messages = combine(candidates, self.config.max_post_chars);

        let delivery = self.publisher.deliver(&messages, Utc::now()).await?;
        Ok(CycleReport {
            lines: snapshot.len(),
            events: events.len(),
            delivery,
        })
    }

    /// Authenticate, then poll forever.
    ///
    /// Login blocks until it succeeds. After that every cycle ends in a
    /// sleep: the poll interval normally, the error cooldown when the cycle
    /// failed. No error escapes this loop.
    pub async fn run(&mut self, identifier: &str, password: &str) {
        self.publisher.ensure_session(identifier, password).await;

        if self.config.prime_on_start {
            match self.prime().await {
                Ok(lines) => log::info!("Primed with {lines} lines"),
                Err(e) => log::warn!("Priming fetch failed: {e}"),
            }
        }

        let poll = Duration::from_secs(self.config.poll_interval_secs);
        let cooldown = Duration::from_secs(self.config.error_cooldown_secs);
        loop {
            match self.run_cycle().await {
                Ok(report) => {
                    if report.events == 0 {
                        log::debug!("No changes across {} lines", report.lines);
                    } else {
                        log::info!(
                            "{} change(s): {} posted, {} duplicate(s), {} failed",
                            report.events,
                            report.delivery.posted,
                            report.delivery.duplicates,
                            report.delivery.failures
                        );
                    }
                    tokio::time::sleep(poll).await;
                }
                Err(e) => {
                    log::error!("Cycle failed: {e}. Next attempt in {}s", cooldown.as_secs());
                    tokio::time::sleep(cooldown).await;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Arc;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use tempfile::TempDir;

    use crate::error::AppError;
    use crate::models::LineStatus;
    use crate::services::PostClient;
    use crate::storage::LocalHistory;

    struct ScriptedFeed {
        snapshots: Mutex<VecDeque<Result<Vec<LineStatus>>>>,
        fetches: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl Feed for ScriptedFeed {
        async fn fetch(&self) -> Result<Vec<LineStatus>> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            self.snapshots
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(Vec::new()))
        }
    }

    #[derive(Default)]
    struct SinkClient {
        posted: Arc<Mutex<Vec<String>>>,
    }

    #[async_trait]
    impl PostClient for SinkClient {
        async fn login(&mut self, _identifier: &str, _password: &str) -> Result<()> {
            Ok(())
        }

        async fn send_post(&self, text: &str) -> Result<()> {
            self.posted.lock().unwrap().push(text.to_string());
            Ok(())
        }
    }

    fn line(name: &str, status: &str, reason: Option<&str>) -> LineStatus {
        LineStatus {
            name: name.to_string(),
            status: status.to_string(),
            reason: reason.map(str::to_string),
            info_url: None,
            disruptions: Vec::new(),
        }
    }

    struct Handles {
        posted: Arc<Mutex<Vec<String>>>,
        fetches: Arc<AtomicUsize>,
    }

    fn make_watcher(tmp: &TempDir, script: Vec<Result<Vec<LineStatus>>>) -> (Watcher, Handles) {
        let fetches = Arc::new(AtomicUsize::new(0));
        let feed = ScriptedFeed {
            snapshots: Mutex::new(script.into()),
            fetches: fetches.clone(),
        };

        let client = SinkClient::default();
        let posted = client.posted.clone();

        let config = WatcherConfig::default();
        let publisher = Publisher::new(
            Box::new(client),
            Box::new(LocalHistory::new(tmp.path())),
            &config,
        );

        let watcher = Watcher::new(Box::new(feed), publisher, config);
        (watcher, Handles { posted, fetches })
    }

    #[tokio::test]
    async fn degradation_is_posted_once() {
        let tmp = TempDir::new().unwrap();
        let (mut watcher, handles) = make_watcher(
            &tmp,
            vec![
                Ok(vec![line("Central", "Good Service", None)]),
                Ok(vec![line("Central", "Severe Delays", Some("Signal failure"))]),
                Ok(vec![line("Central", "Severe Delays", Some("Signal failure"))]),
            ],
        );

        let first = watcher.run_cycle().await.unwrap();
        assert_eq!(first.events, 0);
        assert_eq!(first.lines, 1);

        let second = watcher.run_cycle().await.unwrap();
        assert_eq!(second.events, 1);
        assert_eq!(second.delivery.posted, 1);
        assert_eq!(
            *handles.posted.lock().unwrap(),
            vec!["Central: Severe Delays\nSignal failure".to_string()]
        );

        let third = watcher.run_cycle().await.unwrap();
        assert_eq!(third.events, 0);
        assert_eq!(handles.posted.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn relapse_within_window_is_deduplicated() {
        let tmp = TempDir::new().unwrap();
        let degraded = || vec![line("Central", "Severe Delays", None)];
        let (mut watcher, handles) = make_watcher(
            &tmp,
            vec![
                Ok(degraded()),
                Ok(vec![line("Central", "Good Service", None)]),
                Ok(degraded()),
            ],
        );

        watcher.run_cycle().await.unwrap();
        watcher.run_cycle().await.unwrap();
        let third = watcher.run_cycle().await.unwrap();

        // The diff fires again after the recovery, but the identical text is
        // still inside the dedup window.
        assert_eq!(third.events, 1);
        assert_eq!(third.delivery.duplicates, 1);
        assert_eq!(third.delivery.posted, 0);
        assert_eq!(handles.posted.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn simultaneous_changes_combine_into_one_post() {
        let tmp = TempDir::new().unwrap();
        let (mut watcher, handles) = make_watcher(
            &tmp,
            vec![Ok(vec![
                line("Bakerloo", "Minor Delays", None),
                line("Central", "Part Closure", None),
            ])],
        );

        let report = watcher.run_cycle().await.unwrap();
        assert_eq!(report.events, 2);
        assert_eq!(report.delivery.posted, 1);
        assert_eq!(
            *handles.posted.lock().unwrap(),
            vec!["Bakerloo: Minor Delays\nCentral: Part Closure".to_string()]
        );
    }

    #[tokio::test]
    async fn fetch_error_fails_the_cycle() {
        let tmp = TempDir::new().unwrap();
        let (mut watcher, handles) = make_watcher(&tmp, vec![Err(AppError::feed("scripted outage"))]);

        assert!(watcher.run_cycle().await.is_err());
        assert!(handles.posted.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn prime_absorbs_the_starting_state() {
        let tmp = TempDir::new().unwrap();
        let degraded = || vec![line("Central", "Severe Delays", None)];
        let (mut watcher, handles) = make_watcher(&tmp, vec![Ok(degraded()), Ok(degraded())]);

        assert_eq!(watcher.prime().await.unwrap(), 1);

        let report = watcher.run_cycle().await.unwrap();
        assert_eq!(report.events, 0);
        assert!(handles.posted.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn loop_polls_then_cools_down_after_errors() {
        let tmp = TempDir::new().unwrap();
        let (mut watcher, handles) = make_watcher(
            &tmp,
            vec![
                Ok(vec![line("Central", "Good Service", None)]),
                Err(AppError::feed("scripted outage")),
                Ok(vec![line("Central", "Severe Delays", None)]),
            ],
        );

        let task = tokio::spawn(async move { watcher.run("handle", "secret").await });

        // Cycles land at t=0, t=300 (poll), t=360 (cooldown), t=660 (poll).
        tokio::time::sleep(Duration::from_secs(700)).await;

        assert_eq!(handles.fetches.load(Ordering::SeqCst), 4);
        assert_eq!(
            *handles.posted.lock().unwrap(),
            vec!["Central: Severe Delays".to_string()]
        );
        task.abort();
    }
}
