//! Fake transports for monitor tests

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use tokio::sync::Notify;

use chart_version_monitor::notify::NotifyError;
use chart_version_monitor::notify::composer::Message;
use chart_version_monitor::notify::webhook::Notifier;
use chart_version_monitor::version::error::FetchError;
use chart_version_monitor::version::fetcher::IndexFetcher;

/// Build an `index.yaml` body with one chart and the given versions
pub fn index_body(chart: &str, versions: &[&str]) -> Vec<u8> {
    let mut body = format!("apiVersion: v1\nentries:\n  {}:\n", chart);
    for version in versions {
        body.push_str(&format!("    - version: \"{}\"\n", version));
    }
    body.into_bytes()
}

/// Fetcher that replays scripted responses per URL.
///
/// Each call consumes the next response; the last one repeats forever.
/// URLs without a script fail with a 404.
pub struct ScriptedFetcher {
    scripts: Mutex<HashMap<String, Vec<Vec<u8>>>>,
}

impl ScriptedFetcher {
    pub fn new() -> Self {
        Self {
            scripts: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_responses(self, url: &str, responses: Vec<Vec<u8>>) -> Self {
        self.scripts
            .lock()
            .unwrap()
            .insert(url.to_string(), responses);
        self
    }
}

#[async_trait]
impl IndexFetcher for ScriptedFetcher {
    async fn fetch_index(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let mut scripts = self.scripts.lock().unwrap();
        match scripts.get_mut(url) {
            Some(responses) if responses.len() > 1 => Ok(responses.remove(0)),
            Some(responses) if !responses.is_empty() => Ok(responses[0].clone()),
            _ => Err(FetchError::Status {
                url: url.to_string(),
                status: 404,
            }),
        }
    }
}

/// Notifier that records messages and wakes a waiter after `expected` of them
pub struct RecordingNotifier {
    messages: Mutex<Vec<Message>>,
    expected: usize,
    done: Notify,
}

impl RecordingNotifier {
    pub fn new(expected: usize) -> Self {
        Self {
            messages: Mutex::new(Vec::new()),
            expected,
            done: Notify::new(),
        }
    }

    pub fn messages(&self) -> Vec<Message> {
        self.messages.lock().unwrap().clone()
    }

    /// Resolves once the expected number of messages has arrived
    pub async fn wait(&self) {
        self.done.notified().await;
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, message: &Message) -> Result<(), NotifyError> {
        let count = {
            let mut messages = self.messages.lock().unwrap();
            messages.push(message.clone());
            messages.len()
        };
        if count == self.expected {
            self.done.notify_one();
        }
        Ok(())
    }
}
