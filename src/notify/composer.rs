use chrono::{DateTime, TimeZone};
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::version::tracker::ChangeEvent;

/// Webhook payload in the Slack incoming-webhook shape
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub text: String,
}

impl Message {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

/// Compose the message announcing a new chart version.
///
/// The recheck line is only added when the chart has dependees, listing
/// them in configured order.
pub fn compose(event: &ChangeEvent, dependees: &[String]) -> Message {
    let mut text = format!(
        "Chart *{}* in repo {} updated to version *{}*",
        event.chart, event.repository, event.version
    );

    if !dependees.is_empty() {
        text.push_str("\nYou might want to check: ");
        text.push_str(&dependees.join(", "));
    }

    Message { text }
}

/// Messages sent once at startup when `reportStart` is enabled
pub fn startup_messages<Tz>(config: &Config, now: DateTime<Tz>) -> Vec<Message>
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    vec![
        Message::new(format!(
            "{} :: Helmchart monitor started",
            now.format("%Y-%m-%d %H:%M:%S")
        )),
        Message::new(config.summary()),
    ]
}
