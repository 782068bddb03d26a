pub mod config;
pub mod duration;
pub mod logging;
pub mod monitor;
pub mod notify;
pub mod version;
