//! Notification layer
//!
//! Turns change events into webhook messages and delivers them.
//!
//! # Modules
//!
//! - [`composer`]: Builds message text for change events and startup
//! - [`webhook`]: Notifier trait and HTTP webhook delivery

pub mod composer;
pub mod webhook;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Webhook responded with status {0}")]
    Status(u16),
}
