//! Poll loop wiring fetchers, the tracker and the reporter together
//!
//! ```text
//! ┌─────────────┐  IndexDocument  ┌─────────────┐  ChangeEvent  ┌─────────────┐
//! │ poll cycle  │────────────────▶│   tracker   │──────────────▶│  reporter   │
//! │ (fan-out)   │   (in order)    │ (one task)  │  (in order)   │ (one task)  │
//! └─────────────┘                 └─────────────┘               └─────────────┘
//! ```

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::Local;
use futures::future::join_all;
use tokio::sync::mpsc;
use tokio::task::{JoinError, JoinHandle};
use tokio::time::{MissedTickBehavior, sleep};
use tracing::{debug, error, info};

use crate::config::{Config, FETCH_STAGGER_DELAY_MS, Repository};
use crate::notify::composer::{compose, startup_messages};
use crate::notify::webhook::Notifier;
use crate::version::fetcher::{IndexFetcher, fetch_repository};
use crate::version::index::IndexDocument;
use crate::version::tracker::{ChangeEvent, VersionTracker, spawn_tracker};

/// Fetch every repository concurrently and queue the decoded documents.
///
/// Fetch and decode failures are logged per repository and do not affect
/// the others. Fetches start staggered to avoid bursts against one host.
/// Returns the number of documents queued.
pub async fn fetch_all_repositories(
    fetcher: &dyn IndexFetcher,
    repositories: &[Repository],
    documents: &mpsc::UnboundedSender<IndexDocument>,
) -> usize {
    let futures = repositories.iter().enumerate().map(|(i, repository)| {
        let delay = Duration::from_millis(FETCH_STAGGER_DELAY_MS * i as u64);
        async move {
            sleep(delay).await;
            match fetch_repository(fetcher, repository).await {
                Ok(document) => documents.send(document).is_ok(),
                Err(e) => {
                    error!("Could not fetch contents for {}: {}", repository.url, e);
                    false
                }
            }
        }
    });

    join_all(futures)
        .await
        .into_iter()
        .filter(|queued| *queued)
        .count()
}

/// Deliver change events one at a time, in arrival order.
///
/// Delivery failures are logged and the event is dropped.
pub fn spawn_reporter(
    config: Arc<Config>,
    notifier: Arc<dyn Notifier>,
    mut events: mpsc::UnboundedReceiver<ChangeEvent>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            let dependees = config.dependees_for_chart(&event.repository, &event.chart);
            let message = compose(&event, dependees);

            match notifier.send(&message).await {
                Ok(()) => info!(
                    "Reported {} {} from {}",
                    event.chart, event.version, event.repository
                ),
                Err(e) => error!(
                    "Failed to report {} {} from {}: {}",
                    event.chart, event.version, event.repository, e
                ),
            }
        }
        debug!("Reporter stopped");
    })
}

pub struct Monitor {
    config: Arc<Config>,
    fetcher: Arc<dyn IndexFetcher>,
    notifier: Arc<dyn Notifier>,
}

impl Monitor {
    pub fn new(
        config: Config,
        fetcher: Arc<dyn IndexFetcher>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            fetcher,
            notifier,
        }
    }

    /// Send the startup notifications, ignoring delivery failures
    pub async fn report_start(&self) {
        for message in startup_messages(&self.config, Local::now()) {
            if let Err(e) = self.notifier.send(&message).await {
                error!("Failed to send startup notification: {}", e);
            }
        }
    }

    /// Run a single poll cycle against a fresh tracker.
    ///
    /// Only baselines are recorded, so no notifications are sent.
    pub async fn poll_once(&self) -> Result<VersionTracker, JoinError> {
        let (document_tx, document_rx) = mpsc::unbounded_channel();
        let (event_tx, _event_rx) = mpsc::unbounded_channel();
        let tracker = spawn_tracker(document_rx, event_tx);

        fetch_all_repositories(
            self.fetcher.as_ref(),
            &self.config.repositories,
            &document_tx,
        )
        .await;
        drop(document_tx);

        tracker.await
    }

    /// Poll on the configured interval until `shutdown` completes.
    ///
    /// The first cycle starts immediately. On shutdown, in-flight fetches
    /// are abandoned while queued documents and events are drained. Returns
    /// the final tracker state.
    pub async fn run_until<F>(self, shutdown: F) -> Result<VersionTracker, JoinError>
    where
        F: Future<Output = ()>,
    {
        let (document_tx, document_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let tracker = spawn_tracker(document_rx, event_tx);
        let reporter = spawn_reporter(self.config.clone(), self.notifier.clone(), event_rx);

        if self.config.report_start {
            self.report_start().await;
        }

        let mut ticker = tokio::time::interval(self.config.check_interval.as_duration());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        info!(
            "Monitoring {} repositories every {}",
            self.config.repositories.len(),
            self.config.check_interval
        );

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("Shutdown requested");
                    break;
                }
                _ = ticker.tick() => {
                    tokio::select! {
                        _ = &mut shutdown => {
                            info!("Shutdown requested, abandoning in-flight fetches");
                            break;
                        }
                        queued = fetch_all_repositories(
                            self.fetcher.as_ref(),
                            &self.config.repositories,
                            &document_tx,
                        ) => {
                            debug!(
                                "Poll cycle queued {} of {} repositories",
                                queued,
                                self.config.repositories.len()
                            );
                        }
                    }
                }
            }
        }

        drop(document_tx);
        let tracker = tracker.await?;
        reporter.await?;
        info!("Stopped with {} tracked charts", tracker.len());
        Ok(tracker)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Chart;
    use crate::notify::NotifyError;
    use crate::notify::webhook::MockNotifier;
    use crate::version::error::FetchError;
    use crate::version::fetcher::MockIndexFetcher;
    use crate::version::semver::ChartVersion;

    const GOOD: &str = "https://good.example.com/index.yaml";
    const BAD: &str = "https://bad.example.com/index.yaml";

    fn repository(url: &str, chart: &str, dependees: &[&str]) -> Repository {
        Repository {
            url: url.to_string(),
            charts: vec![Chart {
                name: chart.to_string(),
                dependees: dependees.iter().map(|d| d.to_string()).collect(),
            }],
        }
    }

    #[tokio::test]
    async fn fetch_all_repositories_continues_after_failure() {
        let mut fetcher = MockIndexFetcher::new();
        fetcher.expect_fetch_index().times(2).returning(|url| {
            if url == BAD {
                Err(FetchError::Status {
                    url: url.to_string(),
                    status: 500,
                })
            } else {
                Ok(b"entries:\n  app:\n    - version: 1.0.0\n".to_vec())
            }
        });
        let repositories = vec![repository(BAD, "app", &[]), repository(GOOD, "app", &[])];
        let (tx, mut rx) = mpsc::unbounded_channel();

        let queued = fetch_all_repositories(&fetcher, &repositories, &tx).await;
        drop(tx);

        assert_eq!(queued, 1);
        let document = rx.recv().await.unwrap();
        assert_eq!(document.repository, GOOD);
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn fetch_all_repositories_skips_undecodable_index() {
        let mut fetcher = MockIndexFetcher::new();
        fetcher
            .expect_fetch_index()
            .returning(|_| Ok(b"entries: [unclosed".to_vec()));
        let repositories = vec![repository(GOOD, "app", &[])];
        let (tx, _rx) = mpsc::unbounded_channel();

        let queued = fetch_all_repositories(&fetcher, &repositories, &tx).await;

        assert_eq!(queued, 0);
    }

    #[tokio::test]
    async fn reporter_includes_configured_dependees() {
        let config = Arc::new(Config {
            repositories: vec![repository(GOOD, "app", &["web", "worker"])],
            ..Config::default()
        });
        let mut notifier = MockNotifier::new();
        notifier
            .expect_send()
            .withf(|message| message.text.ends_with("You might want to check: web, worker"))
            .times(1)
            .returning(|_| Ok(()));
        let (tx, rx) = mpsc::unbounded_channel();
        let reporter = spawn_reporter(config, Arc::new(notifier), rx);

        tx.send(ChangeEvent {
            repository: GOOD.to_string(),
            chart: "app".to_string(),
            version: ChartVersion::parse("1.1.0").unwrap(),
        })
        .unwrap();
        drop(tx);

        reporter.await.unwrap();
    }

    #[tokio::test]
    async fn reporter_continues_after_delivery_failure() {
        let config = Arc::new(Config::default());
        let mut notifier = MockNotifier::new();
        notifier
            .expect_send()
            .times(2)
            .returning(|_| Err(NotifyError::Status(502)));
        let (tx, rx) = mpsc::unbounded_channel();
        let reporter = spawn_reporter(config, Arc::new(notifier), rx);

        for version in ["1.1.0", "1.2.0"] {
            tx.send(ChangeEvent {
                repository: GOOD.to_string(),
                chart: "app".to_string(),
                version: ChartVersion::parse(version).unwrap(),
            })
            .unwrap();
        }
        drop(tx);

        reporter.await.unwrap();
    }

    #[tokio::test]
    async fn poll_once_records_baselines_without_notifying() {
        let mut fetcher = MockIndexFetcher::new();
        fetcher
            .expect_fetch_index()
            .returning(|_| Ok(b"entries:\n  app:\n    - version: 1.0.0\n    - version: 1.4.2\n".to_vec()));
        let mut notifier = MockNotifier::new();
        notifier.expect_send().never();
        let config = Config {
            repositories: vec![repository(GOOD, "app", &[])],
            ..Config::default()
        };
        let monitor = Monitor::new(config, Arc::new(fetcher), Arc::new(notifier));

        let tracker = monitor.poll_once().await.unwrap();

        assert_eq!(
            tracker.highest(GOOD, "app").map(ToString::to_string).as_deref(),
            Some("1.4.2")
        );
    }

    #[tokio::test]
    async fn report_start_sends_two_messages_and_ignores_failures() {
        let fetcher = MockIndexFetcher::new();
        let mut notifier = MockNotifier::new();
        notifier
            .expect_send()
            .times(2)
            .returning(|_| Err(NotifyError::Status(500)));
        let monitor = Monitor::new(Config::default(), Arc::new(fetcher), Arc::new(notifier));

        monitor.report_start().await;
    }
}
