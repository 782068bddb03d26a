//! Version tracking layer for chart repositories
//!
//! This module provides the core pipeline: fetching repository indexes,
//! parsing chart versions, and tracking the highest version per chart.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │   Fetcher   │────▶│    Index    │────▶│   Tracker   │
//! │  (HTTP GET) │     │  (filter)   │     │ (highest v) │
//! └─────────────┘     └─────────────┘     └─────────────┘
//!                            │
//!                            ▼
//!                     ┌─────────────┐
//!                     │   Semver    │
//!                     │ (parse/cmp) │
//!                     └─────────────┘
//! ```
//!
//! # Modules
//!
//! - [`fetcher`]: Index fetch trait, HTTP implementation, fetch-and-filter
//! - [`index`]: `index.yaml` decoding into watched-chart documents
//! - [`tracker`]: Highest-version state and change events
//! - [`semver`]: Version parsing and precedence
//! - [`error`]: Error types for fetch and decode failures

pub mod error;
pub mod fetcher;
pub mod index;
pub mod semver;
pub mod tracker;
