//! Highest-version tracking across poll cycles
//!
//! The tracker owns the only mutable state in the monitor: the highest
//! version seen per (repository, chart). It is driven by one task that
//! receives documents over a channel, so transitions never interleave.

use std::collections::HashMap;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::version::index::IndexDocument;
use crate::version::semver::ChartVersion;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TrackerKey {
    pub repository: String,
    pub chart: String,
}

/// A chart's highest known version strictly increased
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    pub repository: String,
    pub chart: String,
    pub version: ChartVersion,
}

/// Outcome of observing one chart's versions
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Observation {
    /// First sighting; the baseline was recorded
    Baseline { version: ChartVersion },
    /// The highest version increased
    Increased {
        previous: ChartVersion,
        current: ChartVersion,
    },
    /// Same or lower highest version
    Unchanged,
    /// No versions in the document
    Empty,
}

#[derive(Debug, Default)]
pub struct VersionTracker {
    highest: HashMap<TrackerKey, ChartVersion>,
}

impl VersionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the highest of `versions` for a key.
    ///
    /// Only a strict increase over an already known version is reported as
    /// [`Observation::Increased`]; lower or equal maxima leave the state as is.
    pub fn observe(&mut self, key: TrackerKey, versions: &[ChartVersion]) -> Observation {
        let Some(max) = versions.iter().max() else {
            return Observation::Empty;
        };

        match self.highest.get_mut(&key) {
            None => {
                self.highest.insert(key, max.clone());
                Observation::Baseline {
                    version: max.clone(),
                }
            }
            Some(current) if *max > *current => {
                let previous = std::mem::replace(current, max.clone());
                Observation::Increased {
                    previous,
                    current: max.clone(),
                }
            }
            Some(_) => Observation::Unchanged,
        }
    }

    /// Apply a fetched document and return the resulting change events
    pub fn update(&mut self, document: &IndexDocument) -> Vec<ChangeEvent> {
        let mut events = Vec::new();

        for (chart, versions) in &document.charts {
            let key = TrackerKey {
                repository: document.repository.clone(),
                chart: chart.clone(),
            };

            match self.observe(key, versions) {
                Observation::Baseline { version } => {
                    debug!("Baseline for {} in {}: {}", chart, document.repository, version);
                }
                Observation::Increased { previous, current } => {
                    info!(
                        "{} in {} increased from {} to {}",
                        chart, document.repository, previous, current
                    );
                    events.push(ChangeEvent {
                        repository: document.repository.clone(),
                        chart: chart.clone(),
                        version: current,
                    });
                }
                Observation::Unchanged => {}
                Observation::Empty => {
                    debug!("No versions of {} in {}", chart, document.repository);
                }
            }
        }

        events
    }

    /// Highest version recorded for a chart in a repository
    pub fn highest(&self, repository: &str, chart: &str) -> Option<&ChartVersion> {
        self.highest.get(&TrackerKey {
            repository: repository.to_string(),
            chart: chart.to_string(),
        })
    }

    /// All recorded versions, sorted by repository then chart
    pub fn snapshot(&self) -> Vec<(TrackerKey, ChartVersion)> {
        let mut entries: Vec<_> = self
            .highest
            .iter()
            .map(|(key, version)| (key.clone(), version.clone()))
            .collect();
        entries.sort_by(|(a, _), (b, _)| {
            a.repository
                .cmp(&b.repository)
                .then_with(|| a.chart.cmp(&b.chart))
        });
        entries
    }

    pub fn len(&self) -> usize {
        self.highest.len()
    }

    pub fn is_empty(&self) -> bool {
        self.highest.is_empty()
    }
}

/// Run the tracker as the single consumer of fetched documents.
///
/// Events are forwarded in the order they are produced. The task ends when
/// the document channel closes and returns the final tracker state.
pub fn spawn_tracker(
    mut documents: mpsc::UnboundedReceiver<IndexDocument>,
    events: mpsc::UnboundedSender<ChangeEvent>,
) -> JoinHandle<VersionTracker> {
    tokio::spawn(async move {
        let mut tracker = VersionTracker::new();

        while let Some(document) = documents.recv().await {
            debug!(
                "Checking: {} (generated {})",
                document.repository,
                document.generated.as_deref().unwrap_or("unknown")
            );
            for event in tracker.update(&document) {
                if events.send(event).is_err() {
                    warn!("Reporter stopped, dropping change event");
                }
            }
        }

        debug!("Tracker stopped with {} tracked charts", tracker.len());
        tracker
    })
}
