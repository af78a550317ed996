//! Chat-platform abstraction (Telegram today).

pub mod port;
pub mod types;
