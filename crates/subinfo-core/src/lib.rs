//! Core engine for the subscription usage bot.
//!
//! Fetches usage headers and node lists for batches of subscription URLs under
//! a process-wide concurrency bound, and renders the results as one report.
//! Telegram lives behind the `MessagingPort` trait in the adapter crate.

pub mod config;
pub mod content;
pub mod context;
pub mod dispatcher;
pub mod domain;
pub mod errors;
pub mod fetcher;
pub mod formatting;
pub mod http;
pub mod input;
pub mod logging;
pub mod messaging;
pub mod providers;
pub mod region;
pub mod report;
pub mod usage;

pub use errors::{Error, Result};
